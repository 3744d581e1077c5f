//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::PopulationTier;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Search API settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Page budgets and credit limit
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Input and output locations
    #[serde(default)]
    pub paths: PathsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.search.endpoint.trim().is_empty() {
            return Err(AppError::validation("search.endpoint is empty"));
        }
        if self.search.language.trim().is_empty() {
            return Err(AppError::validation("search.language is empty"));
        }
        if self.search.timeout_secs == 0 {
            return Err(AppError::validation("search.timeout_secs must be > 0"));
        }
        if !(1..=21).contains(&self.search.zoom) {
            return Err(AppError::validation("search.zoom must be within 1..=21"));
        }
        if self.budget.pages().is_empty() {
            return Err(AppError::validation(
                "budget: at least one tier needs a page budget > 0",
            ));
        }
        if self.paths.country_code.trim().is_empty() {
            return Err(AppError::validation("paths.country_code is empty"));
        }
        Ok(())
    }
}

/// Search API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Endpoint receiving one POST per page
    #[serde(default = "defaults::endpoint")]
    pub endpoint: String,

    /// Result language (`hl`)
    #[serde(default = "defaults::language")]
    pub language: String,

    /// Map zoom level used in the search center
    #[serde(default = "defaults::zoom")]
    pub zoom: u8,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::endpoint(),
            language: defaults::language(),
            zoom: defaults::zoom(),
            timeout_secs: defaults::timeout(),
            user_agent: defaults::user_agent(),
        }
    }
}

/// Per-tier page budgets and the credit ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    #[serde(default = "defaults::high_pages")]
    pub high_pages: u32,

    #[serde(default = "defaults::mid_pages")]
    pub mid_pages: u32,

    #[serde(default = "defaults::low_pages")]
    pub low_pages: u32,

    /// Maximum cumulative credits; prompted for when absent
    #[serde(default)]
    pub max_credits: Option<u64>,
}

impl BudgetConfig {
    pub fn pages(&self) -> TierPages {
        TierPages {
            high: self.high_pages,
            mid: self.mid_pages,
            low: self.low_pages,
        }
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            high_pages: defaults::high_pages(),
            mid_pages: defaults::mid_pages(),
            low_pages: defaults::low_pages(),
            max_credits: None,
        }
    }
}

/// Maximum pages requested per city, by tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPages {
    pub high: u32,
    pub mid: u32,
    pub low: u32,
}

impl TierPages {
    pub fn new(high: u32, mid: u32, low: u32) -> Self {
        Self { high, mid, low }
    }

    pub fn for_tier(&self, tier: PopulationTier) -> u32 {
        match tier {
            PopulationTier::High => self.high,
            PopulationTier::Mid => self.mid,
            PopulationTier::Low => self.low,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.high == 0 && self.mid == 0 && self.low == 0
    }
}

/// Input and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Tab-separated gazetteer (19-column GeoNames format)
    #[serde(default = "defaults::cities_file")]
    pub cities_file: PathBuf,

    /// Directory holding the output table and checkpoint
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,

    /// Only cities with this country code are visited
    #[serde(default = "defaults::country_code")]
    pub country_code: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cities_file: defaults::cities_file(),
            output_dir: defaults::output_dir(),
            country_code: defaults::country_code(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Search defaults
    pub fn endpoint() -> String {
        "https://google.serper.dev/maps".into()
    }
    pub fn language() -> String {
        "de".into()
    }
    pub fn zoom() -> u8 {
        13
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn user_agent() -> String {
        concat!("listing-crawler/", env!("CARGO_PKG_VERSION")).into()
    }

    // Budget defaults
    pub fn high_pages() -> u32 {
        5
    }
    pub fn mid_pages() -> u32 {
        3
    }
    pub fn low_pages() -> u32 {
        1
    }

    // Path defaults
    pub fn cities_file() -> PathBuf {
        PathBuf::from("cities1000.txt")
    }
    pub fn output_dir() -> PathBuf {
        PathBuf::from("output")
    }
    pub fn country_code() -> String {
        "DE".into()
    }
}
