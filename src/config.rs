use std::collections::HashMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub icon_chart: IconChartConfig,
    pub map: MapConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub people: String,   // Path or URL of the spreadsheet
    pub deaths_csv: String,
    pub boundaries: String, // TopoJSON, GeoJSON or Shapefile
    pub boundaries_object: String, // Object name inside a TopoJSON topology
    pub name_property: String,
    pub columns: ColumnConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ColumnConfig {
    pub person_name: String,
    pub year_of_death: String,
    pub country: String,
    pub deaths: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IconChartConfig {
    pub width: f64,
    pub icon_size: f64,
    pub padding: f64,
    pub icons_per_row: usize,
    pub fill: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub width: f64,
    pub height: f64,
    pub scale_divisor: f64, // projection scale = width / scale_divisor
    pub title: String,
    pub color_domain: Vec<f64>,
    pub color_range: Vec<String>,
    pub fallback_fill: String,
    pub name_corrections: HashMap<String, String>,
    pub zoom: ZoomConfig,
    pub legend: LegendConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ZoomConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    pub target_country: String,
    pub fit_padding: f64,
    pub delay_ms: u64,
    pub duration_ms: u64,
    pub keyframes: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LegendConfig {
    pub title: String,
    pub breaks: Vec<f64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            people: "journalists_killed_gaza_2023_2025.xlsx".to_string(),
            deaths_csv: "places_most_death_2023_2025.csv".to_string(),
            boundaries: "https://cdn.jsdelivr.net/npm/world-atlas@2/countries-50m.json".to_string(),
            boundaries_object: "countries".to_string(),
            name_property: "name".to_string(),
            columns: ColumnConfig::default(),
        }
    }
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            person_name: "Nome".to_string(),
            year_of_death: "Data da Morte".to_string(),
            country: "country".to_string(),
            deaths: "deaths".to_string(),
        }
    }
}

impl Default for IconChartConfig {
    fn default() -> Self {
        Self {
            width: 900.0,
            icon_size: 45.0,
            padding: 8.0,
            icons_per_row: 14,
            fill: "red".to_string(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        let mut name_corrections = HashMap::new();
        name_corrections.insert(
            "Israel".to_string(),
            "Israel and the Occupied Palestinian Territory".to_string(),
        );

        Self {
            width: 960.0,
            height: 600.0,
            scale_divisor: 6.5,
            title: "Journalists killed worldwide between 2023 and 2025".to_string(),
            color_domain: vec![0.0, 80.0, 160.0],
            color_range: vec!["white".to_string(), "reds(0.8)".to_string(), "black".to_string()],
            fallback_fill: "#eee".to_string(),
            name_corrections,
            zoom: ZoomConfig::default(),
            legend: LegendConfig::default(),
        }
    }
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min_scale: 1.0,
            max_scale: 8.0,
            target_country: "Israel".to_string(),
            fit_padding: 0.9,
            delay_ms: 3000,
            duration_ms: 5000,
            keyframes: 120,
        }
    }
}

impl Default for LegendConfig {
    fn default() -> Self {
        Self {
            title: "Incidence of Deaths".to_string(),
            breaks: vec![0.0, 20.0, 40.0, 80.0, 120.0, 160.0],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("output") }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
