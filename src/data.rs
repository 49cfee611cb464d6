use crate::config::{AppConfig, ColumnConfig};
use crate::types::{CountryDeathCount, CountryGeometry, DeathCounts, PersonRecord};
use anyhow::{Context, Result, anyhow};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;
use geo::MultiPolygon;
use geojson::GeoJson;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;
use topojson::TopoJson;
use tracing::{debug, error, info, warn};

/// One data row keyed by header name.
pub type Row = HashMap<String, String>;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Unsupported table format: {0}")]
    UnsupportedFormat(String),
    #[error("Workbook contains no sheets")]
    NoSheets,
    #[error("Required headers {missing:?} not found; the first row must contain these exact headers")]
    MissingColumns { missing: Vec<String> },
    #[error("No data rows found")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Spreadsheet,
    Csv,
}

impl TableFormat {
    pub fn from_source(source: &str) -> Result<Self, LoadError> {
        let extension = source_extension(source)
            .ok_or_else(|| LoadError::UnsupportedFormat(source.to_string()))?;

        match extension.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(Self::Spreadsheet),
            "csv" => Ok(Self::Csv),
            other => Err(LoadError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Header row plus the data rows below it.
#[derive(Debug, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

// Lowercased extension, ignoring any URL query or fragment
fn source_extension(source: &str) -> Option<String> {
    let path = source.split(['?', '#']).next().unwrap_or(source);
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
}

/// Read a local file or fetch an `http(s)` URL.
pub async fn fetch_bytes(source: &str) -> Result<Vec<u8>, LoadError> {
    if is_remote(source) {
        let response = reqwest::get(source).await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    } else {
        tokio::fs::read(source).await.map_err(|e| LoadError::Io {
            path: source.to_string(),
            source: e,
        })
    }
}

pub fn parse_table(bytes: Vec<u8>, format: TableFormat) -> Result<Table, LoadError> {
    match format {
        TableFormat::Spreadsheet => parse_spreadsheet(bytes),
        TableFormat::Csv => parse_csv(&bytes),
    }
}

fn parse_spreadsheet(bytes: Vec<u8>) -> Result<Table, LoadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    // Data is expected in the first sheet
    let first_sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(LoadError::NoSheets)?;
    let range = workbook.worksheet_range(&first_sheet)?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(|c| c.to_string().trim().to_string()).collect(),
        None => return Ok(Table::default()),
    };

    let mut records = Vec::new();
    for row in rows {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }

        let record: Row = headers
            .iter()
            .zip(row.iter())
            .filter(|(header, cell)| !header.is_empty() && !matches!(cell, Data::Empty))
            .map(|(header, cell)| (header.clone(), cell.to_string()))
            .collect();
        records.push(record);
    }

    Ok(Table { headers, rows: records })
}

fn parse_csv(bytes: &[u8]) -> Result<Table, LoadError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.clone(), value.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(Table { headers, rows })
}

/// Fetch, parse and validate a table, surfacing every failure.
pub async fn try_load_table(source: &str, required: &[&str]) -> Result<Vec<Row>, LoadError> {
    let format = TableFormat::from_source(source)?;
    let bytes = fetch_bytes(source).await?;
    let table = parse_table(bytes, format)?;

    if table.headers.is_empty() {
        return Err(LoadError::Empty);
    }

    let missing: Vec<String> = required
        .iter()
        .filter(|column| !table.headers.iter().any(|h| h.as_str() == **column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns { missing });
    }

    if table.rows.is_empty() {
        return Err(LoadError::Empty);
    }

    Ok(table.rows)
}

/// Load a table; failures are logged and yield an empty sequence.
pub async fn load_table(source: &str, required: &[&str]) -> Vec<Row> {
    match try_load_table(source, required).await {
        Ok(rows) => {
            info!(source, rows = rows.len(), "Loaded table");
            rows
        }
        Err(LoadError::Empty) => {
            warn!(source, "No data found in table or headers are incorrect");
            Vec::new()
        }
        Err(e) => {
            error!(source, error = %e, "Error loading or parsing table data");
            Vec::new()
        }
    }
}

pub async fn load_people(source: &str, columns: &ColumnConfig) -> Vec<PersonRecord> {
    let rows = load_table(source, &[columns.person_name.as_str(), columns.year_of_death.as_str()]).await;
    people_from_rows(&rows, columns)
}

pub fn people_from_rows(rows: &[Row], columns: &ColumnConfig) -> Vec<PersonRecord> {
    rows.iter()
        .map(|row| PersonRecord {
            name: row.get(&columns.person_name).cloned().unwrap_or_default(),
            year_of_death: row.get(&columns.year_of_death).cloned().unwrap_or_default(),
        })
        .collect()
}

pub async fn load_death_counts(source: &str, columns: &ColumnConfig) -> DeathCounts {
    let rows = load_table(source, &[columns.country.as_str(), columns.deaths.as_str()]).await;
    death_counts_from_rows(&rows, columns)
}

pub fn death_counts_from_rows(rows: &[Row], columns: &ColumnConfig) -> DeathCounts {
    let mut counts = DeathCounts::new();

    for row in rows {
        let Some(record) = parse_death_count(row, columns) else {
            warn!(?row, "Skipping row without a country or a numeric death count");
            continue;
        };
        counts.insert(record.country, record.deaths);
    }

    counts
}

fn parse_death_count(row: &Row, columns: &ColumnConfig) -> Option<CountryDeathCount> {
    let country = row.get(&columns.country)?.trim();
    if country.is_empty() {
        return None;
    }
    let deaths = parse_deaths(row.get(&columns.deaths).map(String::as_str).unwrap_or(""))?;
    Some(CountryDeathCount {
        country: country.to_string(),
        deaths,
    })
}

// Numeric coercion: blank is 0, decimals round, text is rejected
fn parse_deaths(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(0);
    }
    let value: f64 = raw.parse().ok()?;
    value.is_finite().then(|| value.round().max(0.0) as u32)
}

pub async fn load_boundaries(config: &AppConfig) -> Result<Vec<CountryGeometry>> {
    let source = config.input.boundaries.clone();
    let name_property = config.input.name_property.clone();
    info!(source = %source, "Loading boundaries");

    let countries = if source_extension(&source).as_deref() == Some("shp") {
        tokio::task::spawn_blocking(move || load_shapefile(Path::new(&source), &name_property)).await??
    } else {
        let bytes = fetch_bytes(&source)
            .await
            .map_err(|e| anyhow!("Failed to fetch boundaries from {}: {}", source, e))?;
        parse_boundaries_json(&bytes, &config.input.boundaries_object, &name_property)?
    };

    info!(countries = countries.len(), "Loaded boundaries");
    Ok(countries)
}

/// Parse a TopoJSON topology or a GeoJSON FeatureCollection.
pub fn parse_boundaries_json(bytes: &[u8], object: &str, name_property: &str) -> Result<Vec<CountryGeometry>> {
    let text = std::str::from_utf8(bytes).context("Boundaries file is not valid UTF-8")?;
    let value: serde_json::Value = serde_json::from_str(text).context("Failed to parse boundaries JSON")?;

    let collection = match value.get("type").and_then(|t| t.as_str()) {
        Some("Topology") => {
            let topology = match text
                .parse::<TopoJson>()
                .map_err(|e| anyhow!("Failed to parse TopoJSON: {:?}", e))?
            {
                TopoJson::Topology(topology) => topology,
                _ => return Err(anyhow!("TopoJSON root must be a Topology")),
            };
            let extracted = topojson::to_geojson(&topology, object)
                .map_err(|e| anyhow!("Failed to extract object '{}' from topology: {:?}", object, e))?;
            // Round-trip through JSON so the features use this crate's geojson types
            let value = serde_json::to_value(&extracted).context("Failed to serialize extracted features")?;
            match GeoJson::from_json_value(value).context("Failed to read extracted features")? {
                GeoJson::FeatureCollection(fc) => fc,
                _ => return Err(anyhow!("Topology object '{}' is not a feature collection", object)),
            }
        }
        _ => match GeoJson::from_json_value(value).context("Failed to parse GeoJSON")? {
            GeoJson::FeatureCollection(fc) => fc,
            _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
        },
    };

    Ok(collection
        .features
        .into_iter()
        .filter_map(|feature| feature_to_country(feature, name_property))
        .collect())
}

fn feature_to_country(feature: geojson::Feature, name_property: &str) -> Option<CountryGeometry> {
    let name = match feature.properties.as_ref().and_then(|props| props.get(name_property)) {
        Some(serde_json::Value::String(s)) => s.clone(),
        _ => return None, // Skip if no name
    };

    let geometry: geo::Geometry<f64> = match feature.geometry?.value.try_into() {
        Ok(geometry) => geometry,
        Err(e) => {
            debug!(name = %name, error = ?e, "Skipping feature with unconvertible geometry");
            return None;
        }
    };

    let geometry = match geometry {
        geo::Geometry::MultiPolygon(mp) => mp,
        geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
        _ => return None, // Skip points/lines
    };

    Some(CountryGeometry { name, geometry })
}

fn load_shapefile(path: &Path, name_property: &str) -> Result<Vec<CountryGeometry>> {
    let mut reader = shapefile::Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", path))?;

    let mut countries = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        let name = match record.get(name_property) {
            Some(shapefile::dbase::FieldValue::Character(Some(s))) => s.trim().to_string(),
            Some(shapefile::dbase::FieldValue::Character(None)) => continue, // Skip if null
            Some(_) => return Err(anyhow!("Shapefile name column must be a string")),
            None => return Err(anyhow!("Name column '{}' not found in Shapefile", name_property)),
        };

        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygon: {:?}", e))?,
            shapefile::Shape::PolygonM(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonM: {:?}", e))?,
            shapefile::Shape::PolygonZ(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonZ: {:?}", e))?,
            _ => continue, // Skip non-polygon shapes
        };

        countries.push(CountryGeometry { name, geometry });
    }

    Ok(countries)
}
