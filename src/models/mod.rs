// src/models/mod.rs

//! Domain models for the listing crawler.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod checkpoint;
mod city;
mod config;
mod entry;

// Re-export all public types
pub use checkpoint::Checkpoint;
pub use city::{City, PopulationTier};
pub use config::{BudgetConfig, Config, PathsConfig, SearchConfig, TierPages};
pub use entry::{EntryRow, PlaceEntry, TABLE_HEADER};
