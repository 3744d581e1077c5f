// src/models/checkpoint.rs

//! Resume checkpoint record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Position of the last fully processed city plus the spend up to and
/// including it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub last_index: usize,
    pub credits_used: u64,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Checkpoint {
    /// Spend per city assumed for bare-integer checkpoints.
    pub const LEGACY_CREDITS_PER_CITY: u64 = 9;

    pub fn new(last_index: usize, credits_used: u64) -> Self {
        Self {
            last_index,
            credits_used,
            updated_at: Some(Utc::now()),
        }
    }

    /// First city index still to be processed.
    pub fn next_index(&self) -> usize {
        self.last_index.saturating_add(1)
    }

    /// Whether this record was reconstructed from a bare integer.
    pub fn is_legacy(&self) -> bool {
        self.updated_at.is_none()
    }

    /// Parse checkpoint file content.
    ///
    /// Accepts the JSON record or a bare non-negative integer.
    pub fn parse(content: &str) -> Result<Self> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(AppError::checkpoint("checkpoint file is empty"));
        }

        let checkpoint = match trimmed.parse::<usize>() {
            Ok(last_index) => Self {
                last_index,
                credits_used: (last_index as u64).saturating_mul(Self::LEGACY_CREDITS_PER_CITY),
                updated_at: None,
            },
            Err(_) => serde_json::from_str(trimmed).map_err(|e| {
                AppError::checkpoint(format!("unrecognized checkpoint content: {e}"))
            })?,
        };

        // No city list is that long; the value can only come from corruption.
        if checkpoint.last_index == usize::MAX {
            return Err(AppError::checkpoint(format!(
                "last index {} is out of range",
                checkpoint.last_index
            )));
        }
        Ok(checkpoint)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
