//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {output_dir}/
//! ├── business_entries_{keyword}.csv   # Output table (append-only)
//! └── last_processed_{keyword}.json    # Checkpoint (atomic overwrite)
//! ```
//!
//! ## Durability
//!
//! - **Table appends** are flushed and fsynced before `append` returns.
//! - **Header writes and checkpoints** go to a temp file that is renamed
//!   over the target.
//! - **Tail repair**: a row cut short by a hard kill is truncated before
//!   resuming, including one torn inside a quoted multi-line field.
//!
//! A bare-integer `last_processed.txt` left in the output directory by
//! older runs is read as a fallback checkpoint.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use csv::{ByteRecord, ReaderBuilder, WriterBuilder};

use crate::error::{AppError, Result};
use crate::models::{Checkpoint, PlaceEntry, TABLE_HEADER};
use crate::storage::{ListingStore, select_new};
use crate::utils::normalize_keyword;

const KEY_COLUMN: &str = "placeId";
const LEGACY_CHECKPOINT: &str = "last_processed.txt";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStore {
    table_path: PathBuf,
    checkpoint_path: PathBuf,
    legacy_checkpoint_path: Option<PathBuf>,
}

impl LocalStore {
    /// Create a store over explicit table and checkpoint paths.
    pub fn new(table_path: impl Into<PathBuf>, checkpoint_path: impl Into<PathBuf>) -> Self {
        Self {
            table_path: table_path.into(),
            checkpoint_path: checkpoint_path.into(),
            legacy_checkpoint_path: None,
        }
    }

    /// Store for a search query, named after its normalized keyword.
    pub fn for_query(output_dir: impl AsRef<Path>, query: &str) -> Self {
        let keyword = normalize_keyword(query);
        let dir = output_dir.as_ref();
        Self {
            legacy_checkpoint_path: Some(dir.join(LEGACY_CHECKPOINT)),
            ..Self::new(
                dir.join(format!("business_entries_{keyword}.csv")),
                dir.join(format!("last_processed_{keyword}.json")),
            )
        }
    }

    pub fn table_path(&self) -> &Path {
        &self.table_path
    }

    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    /// Number of data rows in the table (0 if absent).
    pub fn row_count(&self) -> Result<usize> {
        if !self.table_exists() {
            return Ok(0);
        }
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.table_path)?;
        let mut count = 0;
        for record in reader.records() {
            record?;
            count += 1;
        }
        Ok(count)
    }

    /// Ensure parent directory exists.
    fn ensure_dir(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
        Self::ensure_dir(path)?;

        let tmp = path.with_extension("tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn header_bytes() -> Result<Vec<u8>> {
        let mut writer = WriterBuilder::new().from_writer(Vec::new());
        writer.write_record(TABLE_HEADER)?;
        writer.into_inner().map_err(|e| AppError::Io(e.into_error()))
    }
}

/// Byte offset just past the last complete record, or 0 if not even the
/// header is complete.
///
/// The reader accepts a record cut off at end of file, even inside quotes,
/// so only the last record needs checking: it is complete when it ends in a
/// newline that follows an even number of quote characters.
fn end_of_complete_records(path: &Path) -> Result<u64> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut record = ByteRecord::new();
    let mut last_start = None;
    while reader.read_byte_record(&mut record)? {
        last_start = record.position().map(|pos| pos.byte());
    }
    let Some(start) = last_start else {
        return Ok(0);
    };

    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(start))?;
    let mut tail = Vec::new();
    file.read_to_end(&mut tail)?;

    let quotes = tail.iter().filter(|&&b| b == b'"').count();
    if tail.ends_with(b"\n") && quotes % 2 == 0 {
        Ok(start + tail.len() as u64)
    } else {
        Ok(start)
    }
}

impl ListingStore for LocalStore {
    fn table_exists(&self) -> bool {
        self.table_path.is_file()
    }

    fn reset_table(&self) -> Result<()> {
        Self::write_atomic(&self.table_path, &Self::header_bytes()?)?;
        log::info!("Initialized {}", self.table_path.display());
        Ok(())
    }

    fn repair_table(&self) -> Result<()> {
        let file = match OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.table_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let len = file.metadata()?.len();
        if len == 0 {
            drop(file);
            log::warn!("{} is empty, rewriting header", self.table_path.display());
            return self.reset_table();
        }

        let keep = end_of_complete_records(&self.table_path)?;
        if keep == len {
            return Ok(());
        }
        if keep == 0 {
            drop(file);
            log::warn!(
                "{} has no complete header line, rewriting header",
                self.table_path.display()
            );
            return self.reset_table();
        }

        log::warn!(
            "Truncating {} partial trailing bytes from {}",
            len - keep,
            self.table_path.display()
        );
        file.set_len(keep)?;
        file.sync_all()?;
        Ok(())
    }

    fn load_seen_ids(&self) -> Result<HashSet<String>> {
        let mut seen = HashSet::new();
        if !self.table_exists() {
            return Ok(seen);
        }

        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.table_path)?;
        let column = reader
            .headers()?
            .iter()
            .position(|h| h == KEY_COLUMN)
            .ok_or_else(|| {
                AppError::validation(format!(
                    "{} has no {} column",
                    self.table_path.display(),
                    KEY_COLUMN
                ))
            })?;

        for record in reader.records() {
            let record = record?;
            if let Some(id) = record.get(column).filter(|id| !id.is_empty()) {
                seen.insert(id.to_string());
            }
        }
        Ok(seen)
    }

    fn append(&self, entries: Vec<PlaceEntry>, seen: &mut HashSet<String>) -> Result<usize> {
        let rows = select_new(entries, seen);
        if rows.is_empty() {
            return Ok(0);
        }
        if !self.table_exists() {
            self.reset_table()?;
        }

        let file = OpenOptions::new().append(true).open(&self.table_path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        for row in &rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| AppError::Io(e.into_error()))?;
        file.sync_all()?;

        Ok(rows.len())
    }

    fn read_checkpoint(&self) -> Result<Option<Checkpoint>> {
        if let Some(checkpoint) = read_checkpoint_file(&self.checkpoint_path)? {
            return Ok(Some(checkpoint));
        }
        let Some(legacy) = &self.legacy_checkpoint_path else {
            return Ok(None);
        };
        let checkpoint = read_checkpoint_file(legacy)?;
        if checkpoint.is_some() {
            log::warn!("Using legacy checkpoint {}", legacy.display());
        }
        Ok(checkpoint)
    }

    fn write_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        Self::write_atomic(&self.checkpoint_path, checkpoint.to_json()?.as_bytes())
    }

    fn clear_checkpoint(&self) -> Result<()> {
        remove_if_present(&self.checkpoint_path)?;
        if let Some(legacy) = &self.legacy_checkpoint_path {
            remove_if_present(legacy)?;
        }
        Ok(())
    }
}

fn read_checkpoint_file(path: &Path) -> Result<Option<Checkpoint>> {
    match fs::read_to_string(path) {
        Ok(content) => Checkpoint::parse(&content).map(Some),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: &str, title: &str) -> PlaceEntry {
        PlaceEntry {
            place_id: Some(id.to_string()),
            title: Some(title.to_string()),
            primary_type: Some("cafe".to_string()),
            types: Some(vec!["cafe".to_string(), "food".to_string()]),
            ..PlaceEntry::default()
        }
    }

    fn store(tmp: &TempDir) -> LocalStore {
        LocalStore::for_query(tmp.path().join("output"), "Coffee Shop")
    }

    #[test]
    fn test_paths_follow_keyword() {
        let store = LocalStore::for_query("out", "Coffee Shop");
        assert_eq!(
            store.table_path(),
            Path::new("out/business_entries_coffee_shop.csv")
        );
        assert_eq!(
            store.checkpoint_path(),
            Path::new("out/last_processed_coffee_shop.json")
        );
    }

    #[test]
    fn test_reset_writes_header_only() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);

        store.reset_table().unwrap();
        let content = fs::read_to_string(store.table_path()).unwrap();
        assert_eq!(
            content,
            "placeId,title,address,latitude,longitude,rating,ratingCount,primaryType,types,website,phoneNumber\n"
        );
        assert_eq!(store.row_count().unwrap(), 0);
    }

    #[test]
    fn test_append_dedupes_and_round_trips_seen_ids() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        store.reset_table().unwrap();

        let mut seen = store.load_seen_ids().unwrap();
        assert!(seen.is_empty());

        let written = store
            .append(vec![entry("X", "Café, Mitte"), entry("Y", "Rösterei")], &mut seen)
            .unwrap();
        assert_eq!(written, 2);

        let written = store
            .append(vec![entry("X", "Café, Mitte"), entry("Z", "Bar")], &mut seen)
            .unwrap();
        assert_eq!(written, 1);

        let reloaded = store.load_seen_ids().unwrap();
        assert_eq!(reloaded, seen);
        assert_eq!(store.row_count().unwrap(), 3);

        let content = fs::read_to_string(store.table_path()).unwrap();
        assert!(content.contains("X,\"Café, Mitte\",,,,,,cafe,\"cafe, food\",,\n"));
    }

    #[test]
    fn test_append_without_new_rows_leaves_table_untouched() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);

        let mut seen = HashSet::new();
        assert_eq!(store.append(Vec::new(), &mut seen).unwrap(), 0);
        assert!(!store.table_exists());
    }

    #[test]
    fn test_load_seen_ids_requires_key_column() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        fs::create_dir_all(store.table_path().parent().unwrap()).unwrap();
        fs::write(store.table_path(), "id,title\n1,x\n").unwrap();

        assert!(matches!(
            store.load_seen_ids(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_repair_truncates_partial_row() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        store.reset_table().unwrap();
        let mut seen = HashSet::new();
        store.append(vec![entry("A", "Kept")], &mut seen).unwrap();

        let mut file = OpenOptions::new()
            .append(true)
            .open(store.table_path())
            .unwrap();
        file.write_all(b"B,Half writ").unwrap();
        drop(file);

        store.repair_table().unwrap();
        let ids = store.load_seen_ids().unwrap();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains("A"));
        assert!(fs::read_to_string(store.table_path()).unwrap().ends_with('\n'));
    }

    fn entry_at(id: &str, address: &str) -> PlaceEntry {
        PlaceEntry {
            place_id: Some(id.to_string()),
            address: Some(address.to_string()),
            ..PlaceEntry::default()
        }
    }

    fn tear(store: &LocalStore, bytes: &[u8]) {
        let mut file = OpenOptions::new()
            .append(true)
            .open(store.table_path())
            .unwrap();
        file.write_all(bytes).unwrap();
    }

    #[test]
    fn test_repair_truncates_row_torn_inside_quoted_newline() {
        for torn in [&b"B,,\"Ring 2\n10115 Ber"[..], &b"B,,\"Ring 2\n"[..]] {
            let tmp = TempDir::new().unwrap();
            let store = store(&tmp);
            store.reset_table().unwrap();
            let mut seen = HashSet::new();
            store.append(vec![entry("A", "Kept")], &mut seen).unwrap();
            tear(&store, torn);

            store.repair_table().unwrap();
            let mut seen = store.load_seen_ids().unwrap();
            assert_eq!(seen, HashSet::from(["A".to_string()]));

            let written = store
                .append(
                    vec![entry_at("B", "Ring 2\n10115 Berlin"), entry_at("C", "Weg 3")],
                    &mut seen,
                )
                .unwrap();
            assert_eq!(written, 2);

            let reloaded = store.load_seen_ids().unwrap();
            assert_eq!(reloaded.len(), 3);
            assert!(reloaded.contains("B") && reloaded.contains("C"));
            assert_eq!(store.row_count().unwrap(), 3);
        }
    }

    #[test]
    fn test_repair_keeps_complete_multiline_row() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        store.reset_table().unwrap();
        let mut seen = HashSet::new();
        store
            .append(vec![entry_at("A", "Ring 2\n10115 Berlin")], &mut seen)
            .unwrap();
        let before = fs::read(store.table_path()).unwrap();

        store.repair_table().unwrap();
        assert_eq!(fs::read(store.table_path()).unwrap(), before);
        assert_eq!(store.load_seen_ids().unwrap(), seen);
    }

    #[test]
    fn test_repair_rewrites_torn_header() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        fs::create_dir_all(store.table_path().parent().unwrap()).unwrap();
        fs::write(store.table_path(), "placeId,tit").unwrap();

        store.repair_table().unwrap();
        assert!(store.load_seen_ids().unwrap().is_empty());
        assert_eq!(
            fs::read(store.table_path()).unwrap(),
            LocalStore::header_bytes().unwrap()
        );
    }

    #[test]
    fn test_repair_rewrites_empty_table() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        fs::create_dir_all(store.table_path().parent().unwrap()).unwrap();
        fs::write(store.table_path(), "").unwrap();

        store.repair_table().unwrap();
        assert!(store.load_seen_ids().unwrap().is_empty());
        assert!(
            fs::read_to_string(store.table_path())
                .unwrap()
                .starts_with("placeId,")
        );
    }

    #[test]
    fn test_repair_without_table_is_noop() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        store.repair_table().unwrap();
        assert!(!store.table_exists());
    }

    #[test]
    fn test_checkpoint_write_read_clear() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        assert_eq!(store.read_checkpoint().unwrap(), None);

        let checkpoint = Checkpoint::new(4, 45);
        store.write_checkpoint(&checkpoint).unwrap();
        store.write_checkpoint(&Checkpoint::new(5, 48)).unwrap();
        let loaded = store.read_checkpoint().unwrap().unwrap();
        assert_eq!(loaded.last_index, 5);
        assert_eq!(loaded.credits_used, 48);

        store.clear_checkpoint().unwrap();
        assert_eq!(store.read_checkpoint().unwrap(), None);
        store.clear_checkpoint().unwrap();
    }

    #[test]
    fn test_legacy_text_checkpoint_is_fallback() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let legacy = tmp.path().join("output").join("last_processed.txt");
        fs::create_dir_all(legacy.parent().unwrap()).unwrap();
        fs::write(&legacy, "7\n").unwrap();

        let loaded = store.read_checkpoint().unwrap().unwrap();
        assert_eq!(loaded.last_index, 7);
        assert_eq!(loaded.credits_used, 63);
        assert!(loaded.is_legacy());

        store.write_checkpoint(&Checkpoint::new(9, 80)).unwrap();
        assert_eq!(store.read_checkpoint().unwrap().unwrap().last_index, 9);

        store.clear_checkpoint().unwrap();
        assert!(!legacy.exists());
        assert_eq!(store.read_checkpoint().unwrap(), None);
    }

    #[test]
    fn test_explicit_paths_ignore_legacy_checkpoint() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("last_processed.txt"), "7").unwrap();
        let store = LocalStore::new(tmp.path().join("t.csv"), tmp.path().join("c.json"));

        assert_eq!(store.read_checkpoint().unwrap(), None);
    }

    #[test]
    fn test_malformed_checkpoint_is_error() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        fs::create_dir_all(store.checkpoint_path().parent().unwrap()).unwrap();
        fs::write(store.checkpoint_path(), "{not json").unwrap();

        assert!(matches!(
            store.read_checkpoint(),
            Err(AppError::Checkpoint(_))
        ));
    }
}
