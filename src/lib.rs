// src/lib.rs

//! Listing Crawler Library
//!
//! Walks a population-sorted city list, pulls a bounded number of result
//! pages per city from a maps search API, and appends unique listings to a
//! per-query table with a checkpoint after every city.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
