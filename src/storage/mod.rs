//! Storage abstractions for listing persistence.
//!
//! A store owns two artifacts per query:
//! - the output table: one row per unique `placeId`, append-only after the
//!   header is written
//! - the checkpoint: last fully processed city index and spend so far,
//!   overwritten after each city
//!
//! ## Directory Structure
//!
//! ```text
//! output/
//! ├── business_entries_{keyword}.csv   # Output table
//! └── last_processed_{keyword}.json    # Checkpoint
//! ```
//!
//! Every operation is synchronous. The run loop only awaits while a page
//! request is in flight, so an interrupted run can never stop halfway
//! through a write.

pub mod local;

use std::collections::HashSet;

use crate::error::Result;
use crate::models::{Checkpoint, EntryRow, PlaceEntry};

// Re-export for convenience
pub use local::LocalStore;

/// Trait for listing storage backends.
pub trait ListingStore: Send + Sync {
    /// Whether the output table exists.
    fn table_exists(&self) -> bool;

    /// Replace the table with a header-only one.
    fn reset_table(&self) -> Result<()>;

    /// Drop a trailing partial row left by a hard kill. No-op if absent.
    fn repair_table(&self) -> Result<()>;

    /// All keys already present in the table; empty if there is no table.
    fn load_seen_ids(&self) -> Result<HashSet<String>>;

    /// Append the unseen entries, growing `seen`. Durable on return.
    ///
    /// Returns the number of rows written.
    fn append(&self, entries: Vec<PlaceEntry>, seen: &mut HashSet<String>) -> Result<usize>;

    /// Stored checkpoint, `None` if there is none.
    fn read_checkpoint(&self) -> Result<Option<Checkpoint>>;

    /// Overwrite the checkpoint.
    fn write_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()>;

    /// Remove the checkpoint. No-op if absent.
    fn clear_checkpoint(&self) -> Result<()>;
}

/// Keep entries whose key is absent from `seen`, adding each kept key.
///
/// Entries without a key are dropped silently. Duplicates within the same
/// batch are caught too, since `seen` grows as we go.
pub fn select_new(entries: Vec<PlaceEntry>, seen: &mut HashSet<String>) -> Vec<EntryRow> {
    entries
        .into_iter()
        .filter_map(PlaceEntry::into_row)
        .filter(|row| seen.insert(row.place_id.clone()))
        .collect()
}
