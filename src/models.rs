use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One yearly population count for a city (the bare input of the forecaster).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub year: i32,
    pub population: u64,
}

impl Observation {
    pub fn new(year: i32, population: u64) -> Self {
        Self { year, population }
    }
}

/// A city, the subject of a population series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub region: String,
}

/// Persisted row: one city's population for one year, with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationRecord {
    pub id: u64,
    pub city_id: u64,
    pub year: i32,
    pub population_count: u64,
    #[serde(default)]
    pub source: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl From<&PopulationRecord> for Observation {
    fn from(r: &PopulationRecord) -> Self {
        Self {
            year: r.year,
            population: r.population_count,
        }
    }
}

/// Roles a stored user can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    SuperAdmin,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::SuperAdmin => f.write_str("superadmin"),
            Role::Admin => f.write_str("admin"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
}

/// Year-over-year growth entry. `growth` is `None` for the first observation
/// and whenever the previous population is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthRecord {
    pub record_id: Option<u64>,
    pub year: i32,
    pub population: u64,
    pub source: String,
    pub growth: Option<f64>,
}

/// Next-year estimate. `year == None` (with population 0) means "no data".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    pub year: Option<i32>,
    pub population: i64,
}

impl Projection {
    pub const NO_DATA: Projection = Projection {
        year: None,
        population: 0,
    };
}

/// Per-city payload: identity, projection and growth history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityReport {
    pub id: u64,
    pub name: String,
    pub region: String,
    pub predicted_year: Option<i32>,
    pub predicted_population: i64,
    pub history: Vec<GrowthRecord>,
}

/// Totals across every stored city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationStats {
    pub total_cities: usize,
    pub predicted_total_population: i64,
}
