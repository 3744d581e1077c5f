//! Resume planning.
//!
//! The checkpoint and the output table are only trusted together. A
//! checkpoint without its table restarts from zero, and a table without a
//! usable checkpoint is kept (its ids still dedupe) while the walk restarts
//! at the first city.

use std::collections::HashSet;

use crate::error::Result;
use crate::models::Checkpoint;
use crate::storage::ListingStore;

/// Why a run starts where it does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeReason {
    /// Resume was not requested.
    FreshStart,
    /// Resume requested but there is no table to resume into.
    TableMissing { had_checkpoint: bool },
    /// Continuing after a stored checkpoint.
    FromCheckpoint { last_index: usize, legacy: bool },
    /// Table present, no checkpoint stored.
    NoCheckpoint,
    /// Table present, checkpoint unreadable.
    InvalidCheckpoint { message: String },
}

/// Where to start and what to carry over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePlan {
    pub start_index: usize,
    pub credits_used: u64,
    pub reset_table: bool,
    pub reason: ResumeReason,
}

impl ResumePlan {
    fn from_zero(reset_table: bool, reason: ResumeReason) -> Self {
        Self {
            start_index: 0,
            credits_used: 0,
            reset_table,
            reason,
        }
    }
}

/// Decide the starting point from the resume flag and what is on disk.
pub fn plan_resume(
    resume: bool,
    table_exists: bool,
    checkpoint: Result<Option<Checkpoint>>,
) -> ResumePlan {
    if !resume {
        return ResumePlan::from_zero(true, ResumeReason::FreshStart);
    }

    if !table_exists {
        let had_checkpoint = !matches!(checkpoint, Ok(None));
        return ResumePlan::from_zero(true, ResumeReason::TableMissing { had_checkpoint });
    }

    match checkpoint {
        Ok(Some(checkpoint)) => ResumePlan {
            start_index: checkpoint.next_index(),
            credits_used: checkpoint.credits_used,
            reset_table: false,
            reason: ResumeReason::FromCheckpoint {
                last_index: checkpoint.last_index,
                legacy: checkpoint.is_legacy(),
            },
        },
        Ok(None) => ResumePlan::from_zero(false, ResumeReason::NoCheckpoint),
        Err(e) => ResumePlan::from_zero(
            false,
            ResumeReason::InvalidCheckpoint {
                message: e.to_string(),
            },
        ),
    }
}

/// Bring the store in line with the plan and load the seen-ID set.
///
/// The seen set is read after any reset, so a fresh run starts empty.
pub fn prepare_store(
    store: &dyn ListingStore,
    resume: bool,
) -> Result<(ResumePlan, HashSet<String>)> {
    let checkpoint = if resume {
        store.read_checkpoint()
    } else {
        Ok(None)
    };
    let plan = plan_resume(resume, store.table_exists(), checkpoint);

    match &plan.reason {
        ResumeReason::FreshStart => log::info!("Starting a fresh run"),
        ResumeReason::TableMissing { had_checkpoint: true } => log::warn!(
            "Checkpoint found but the output table is missing; starting from the beginning"
        ),
        ResumeReason::TableMissing {
            had_checkpoint: false,
        } => log::info!("Nothing to resume; starting from the beginning"),
        ResumeReason::FromCheckpoint { last_index, legacy } => {
            log::info!("Resuming after city index {}", last_index);
            if *legacy {
                log::warn!(
                    "Checkpoint has no spend record; estimated {} credits used so far",
                    plan.credits_used
                );
            }
        }
        ResumeReason::NoCheckpoint => {
            log::info!("No resume point found; starting from the beginning, keeping the table")
        }
        ResumeReason::InvalidCheckpoint { message } => log::warn!(
            "No valid resume point found ({}); starting from the beginning, keeping the table",
            message
        ),
    }

    if plan.reset_table {
        store.reset_table()?;
        store.clear_checkpoint()?;
    } else {
        store.repair_table()?;
    }

    let seen = store.load_seen_ids()?;
    log::info!("Found {} existing entries", seen.len());
    Ok((plan, seen))
}
