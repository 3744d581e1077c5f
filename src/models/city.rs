// src/models/city.rs

//! Cities to visit and their population tiers.

use serde::{Deserialize, Serialize};

/// A city from the reference gazetteer.
///
/// Identity is the position in the population-ordered list, which doubles as
/// the resume cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub population: u64,
}

impl City {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64, population: u64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
            population,
        }
    }

    /// Population bucket controlling how many pages are requested.
    pub fn tier(&self) -> PopulationTier {
        PopulationTier::from_population(self.population)
    }

    /// Search center in the `@lat,lon,zoomz` form the search API expects.
    pub fn search_center(&self, zoom: u8) -> String {
        format!("@{},{},{}z", self.latitude, self.longitude, zoom)
    }
}

/// Population-based bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopulationTier {
    Low,
    Mid,
    High,
}

impl PopulationTier {
    /// Lower bound (inclusive) of the HIGH tier.
    pub const HIGH_THRESHOLD: u64 = 100_000;
    /// Lower bound (inclusive) of the MID tier.
    pub const MID_THRESHOLD: u64 = 10_000;

    pub fn from_population(population: u64) -> Self {
        if population >= Self::HIGH_THRESHOLD {
            Self::High
        } else if population >= Self::MID_THRESHOLD {
            Self::Mid
        } else {
            Self::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "high (>= 100k)",
            Self::Mid => "mid (10k-100k)",
            Self::Low => "low (< 10k)",
        }
    }
}
