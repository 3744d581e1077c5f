// src/services/cities.rs

//! City list provider backed by a GeoNames-style gazetteer.

use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};

use crate::error::{AppError, Result};
use crate::models::City;

const COL_NAME: usize = 1;
const COL_LATITUDE: usize = 4;
const COL_LONGITUDE: usize = 5;
const COL_COUNTRY: usize = 8;
const COL_POPULATION: usize = 14;

/// Loads the ordered city list for one country.
#[derive(Debug, Clone)]
pub struct CitySource {
    path: PathBuf,
    country_code: String,
}

impl CitySource {
    pub fn new(path: impl Into<PathBuf>, country_code: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            country_code: country_code.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read, filter to the configured country and sort by population
    /// descending.
    ///
    /// Ties keep file order, so the same file always yields the same
    /// sequence and the resume cursor stays meaningful.
    pub fn load(&self) -> Result<Vec<City>> {
        if !self.path.exists() {
            return Err(AppError::config(format!(
                "Cannot find city reference file {}",
                self.path.display()
            )));
        }

        log::info!("Reading cities from {}", self.path.display());

        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .quoting(false)
            .flexible(true)
            .from_path(&self.path)?;

        let mut cities = Vec::new();
        let mut malformed = 0usize;

        for record in reader.records() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    log::debug!("Skipping unreadable gazetteer row: {}", e);
                    malformed += 1;
                    continue;
                }
            };

            if record.get(COL_COUNTRY).map(str::trim) != Some(self.country_code.as_str()) {
                continue;
            }

            match parse_city(&record) {
                Some(city) => cities.push(city),
                None => malformed += 1,
            }
        }

        if malformed > 0 {
            log::warn!("Skipped {} malformed gazetteer rows", malformed);
        }

        sort_by_population(&mut cities);
        log::info!("Found {} cities for {}", cities.len(), self.country_code);
        Ok(cities)
    }
}

/// Stable sort, largest population first.
pub fn sort_by_population(cities: &mut [City]) {
    cities.sort_by(|a, b| b.population.cmp(&a.population));
}

fn parse_city(record: &StringRecord) -> Option<City> {
    if record.len() < COL_POPULATION + 1 {
        return None;
    }

    let name = record.get(COL_NAME)?.trim();
    if name.is_empty() {
        return None;
    }
    let latitude = record.get(COL_LATITUDE)?.trim().parse::<f64>().ok()?;
    let longitude = record.get(COL_LONGITUDE)?.trim().parse::<f64>().ok()?;
    let population = match record.get(COL_POPULATION)?.trim() {
        "" => 0,
        raw => raw.parse::<u64>().ok()?,
    };

    Some(City::new(name, latitude, longitude, population))
}
