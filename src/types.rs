use geo::MultiPolygon;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRecord {
    pub name: String,
    pub year_of_death: String, // Kept as text, the sheet may hold "2024" or a full date
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryDeathCount {
    pub country: String,
    pub deaths: u32,
}

// Country name (as written in the CSV) -> deaths
pub type DeathCounts = HashMap<String, u32>;

#[derive(Debug, Clone)]
pub struct CountryGeometry {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// Text revealed on hover: a bold title line and one detail line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tooltip {
    pub title: String,
    pub detail: String,
}
