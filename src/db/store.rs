// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Directory-backed activity store.
//!
//! Each activity lives in `<data_dir>/<id>.json`. Nothing is cached between
//! calls: every query rescans the directory, so a fresh `ActivityStore`
//! always reflects what is on disk. Files that cannot be read or parsed are
//! logged and skipped.

use crate::error::AppError;
use crate::models::ActivityRecord;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const RECORD_EXTENSION: &str = "json";

/// Identifiers and newest start time of everything on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreIndex {
    pub ids: BTreeSet<u64>,
    /// Latest parseable start date, or `DateTime::<Utc>::MIN_UTC` when empty.
    pub watermark: DateTime<Utc>,
}

/// Activity store rooted at a directory.
#[derive(Debug, Clone)]
pub struct ActivityStore {
    dir: PathBuf,
}

impl ActivityStore {
    /// Open the store, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, AppError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            AppError::StoreWrite(format!("Failed to create {}: {}", dir.display(), e))
        })?;
        tracing::info!(path = %dir.display(), "Activity store opened");
        Ok(Self { dir })
    }

    fn record_path(&self, id: u64) -> PathBuf {
        self.dir.join(format!("{}.{}", id, RECORD_EXTENSION))
    }

    /// True if a record file exists for `id`, readable or not.
    pub fn contains(&self, id: u64) -> bool {
        self.record_path(id).is_file()
    }

    /// Load one record; `None` if it is missing or unreadable.
    pub fn get(&self, id: u64) -> Option<ActivityRecord> {
        read_record(&self.record_path(id))
    }

    /// Persist a new record.
    ///
    /// Records are immutable: writing an id that already exists fails.
    /// The file is written under a temporary name and renamed into place
    /// so concurrent readers never see a partial record.
    pub fn put(&self, record: &ActivityRecord) -> Result<(), AppError> {
        let path = self.record_path(record.id);
        if path.exists() {
            return Err(AppError::StoreWrite(format!(
                "Activity {} already stored",
                record.id
            )));
        }

        let body = serde_json::to_vec(record)
            .map_err(|e| AppError::StoreWrite(format!("Failed to encode {}: {}", record.id, e)))?;

        let tmp_path = self.dir.join(format!("{}.{}.tmp", record.id, RECORD_EXTENSION));
        fs::write(&tmp_path, body).map_err(|e| {
            AppError::StoreWrite(format!("Failed to write {}: {}", tmp_path.display(), e))
        })?;
        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(AppError::StoreWrite(format!(
                "Failed to move {} into place: {}",
                path.display(),
                e
            )));
        }

        tracing::debug!(activity_id = record.id, "Activity stored");
        Ok(())
    }

    /// Every parseable record, ordered by id.
    pub fn all(&self) -> Vec<ActivityRecord> {
        self.record_paths()
            .into_iter()
            .filter_map(|(_, path)| read_record(&path))
            .collect()
    }

    /// Records whose start date (in its own offset) falls on `date`.
    pub fn list_by_date(&self, date: NaiveDate) -> Vec<ActivityRecord> {
        self.all()
            .into_iter()
            .filter(|r| r.start_time().is_some_and(|t| t.date_naive() == date))
            .collect()
    }

    /// Latest start date across all parseable records.
    pub fn watermark(&self) -> DateTime<Utc> {
        self.index().watermark
    }

    /// Scan the directory once for ids and watermark.
    pub fn index(&self) -> StoreIndex {
        let mut ids = BTreeSet::new();
        let mut watermark = DateTime::<Utc>::MIN_UTC;

        for (id, path) in self.record_paths() {
            ids.insert(id);
            if let Some(start) = read_record(&path).and_then(|r| r.start_time()) {
                watermark = watermark.max(start.with_timezone(&Utc));
            }
        }

        StoreIndex { ids, watermark }
    }

    /// `(id, path)` for every `<id>.json` file, sorted by id.
    fn record_paths(&self) -> Vec<(u64, PathBuf)> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.dir.display(), error = %e, "Failed to scan store");
                return Vec::new();
            }
        };

        let mut paths: Vec<(u64, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension().and_then(|ext| ext.to_str()) == Some(RECORD_EXTENSION)
            })
            .filter_map(|path| {
                let id = path.file_stem()?.to_str()?.parse::<u64>().ok()?;
                Some((id, path))
            })
            .collect();

        paths.sort_unstable_by_key(|(id, _)| *id);
        paths
    }
}

/// Read and validate one record file.
///
/// A record counts as corrupt if it is not valid JSON, lacks a required
/// field, or has a start date that cannot be parsed.
fn read_record(path: &Path) -> Option<ActivityRecord> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable activity");
            return None;
        }
    };

    let record: ActivityRecord = match serde_json::from_slice(&bytes) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Skipping corrupt activity");
            return None;
        }
    };

    if record.start_time().is_none() {
        tracing::warn!(
            path = %path.display(),
            start_date = %record.start_date,
            "Skipping activity with unparseable start date"
        );
        return None;
    }

    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, start_date: &str) -> ActivityRecord {
        ActivityRecord {
            name: format!("Ride {}", id),
            id,
            start_date: start_date.to_string(),
            power: vec![Some(100.0), None, Some(200.0)],
            time: vec![0.0, 1.0, 2.0],
        }
    }

    #[test]
    fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = ActivityStore::open(dir.path()).unwrap();

        assert!(!store.contains(1));
        store.put(&record(1, "2024-01-01T08:00:00Z")).unwrap();
        assert!(store.contains(1));
        assert_eq!(store.get(1), Some(record(1, "2024-01-01T08:00:00Z")));
        assert!(!dir.path().join("1.json.tmp").exists());
    }

    #[test]
    fn test_put_duplicate_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = ActivityStore::open(dir.path()).unwrap();
        store.put(&record(1, "2024-01-01T08:00:00Z")).unwrap();

        let err = store.put(&record(1, "2024-01-01T08:00:00Z")).unwrap_err();
        assert!(matches!(err, AppError::StoreWrite(_)));
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = ActivityStore::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert!(store.all().is_empty());
    }

    #[test]
    fn test_empty_store_watermark_is_min() {
        let dir = tempfile::tempdir().unwrap();
        let store = ActivityStore::open(dir.path()).unwrap();
        assert_eq!(store.watermark(), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn test_ignores_non_record_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ActivityStore::open(dir.path()).unwrap();
        store.put(&record(3, "2024-01-01T08:00:00Z")).unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        fs::write(dir.path().join("backup.json"), "{}").unwrap();

        let index = store.index();
        assert_eq!(index.ids.into_iter().collect::<Vec<_>>(), vec![3]);
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn test_unparseable_start_date_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = ActivityStore::open(dir.path()).unwrap();
        store.put(&record(1, "sometime")).unwrap();

        assert!(store.contains(1));
        assert!(store.get(1).is_none());
        assert!(store.all().is_empty());
        assert_eq!(store.watermark(), DateTime::<Utc>::MIN_UTC);
    }
}
