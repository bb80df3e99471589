#![deny(unsafe_code)]

//! Dated, immutable metadata snapshots ("vintages") and the sync history.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MetadataError;
use crate::files::{SyncHistoryFile, SyncRecord, read_yaml, write_yaml};
use crate::hash::sha256_hex;
use crate::paths::MetadataPaths;

/// Maximum number of sync-history entries retained (newest first).
pub const SYNC_HISTORY_CAP: usize = 50;

/// `vintages/<date>/summary.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VintageSummary {
    /// Vintage date, `YYYY-MM-DD`.
    pub vintage_date: String,
    pub created_at: DateTime<Utc>,
    /// Item counts per metadata type.
    #[serde(default)]
    pub counts: BTreeMap<String, usize>,
    /// Snapshotted files with their checksums, sorted by path.
    #[serde(default)]
    pub files: Vec<VintageFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VintageFile {
    /// Path relative to the vintage directory, `/`-separated.
    pub path: String,
    pub sha256: String,
}

/// Copy the current metadata files into `vintages/<date>/` and write a
/// checksummed summary. An existing snapshot for the same date is
/// overwritten (a vintage is immutable only once the date has passed).
pub fn write_vintage(
    paths: &MetadataPaths,
    date: &str,
    created_at: DateTime<Utc>,
    counts: BTreeMap<String, usize>,
) -> Result<VintageSummary, MetadataError> {
    let vintage_dir = paths.vintage_dir(date);
    std::fs::create_dir_all(&vintage_dir).map_err(|e| MetadataError::io(&vintage_dir, e))?;

    let mut files = Vec::new();
    for source in [
        paths.indicators_file(),
        paths.fallbacks_file(),
        paths.regions_file(),
        paths.countries_file(),
    ] {
        if source.is_file() {
            files.push(snapshot_file(&source, &vintage_dir, None)?);
        }
    }

    let schemas_dir = paths.schemas_dir();
    if schemas_dir.is_dir() {
        let mut entries: Vec<_> = std::fs::read_dir(&schemas_dir)
            .map_err(|e| MetadataError::io(&schemas_dir, e))?
            .collect::<Result<_, _>>()
            .map_err(|e| MetadataError::io(&schemas_dir, e))?;
        entries.sort_by_key(std::fs::DirEntry::file_name);
        for entry in entries {
            let path = entry.path();
            if path.is_file() {
                files.push(snapshot_file(&path, &vintage_dir, Some("schemas"))?);
            }
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));

    let summary = VintageSummary {
        vintage_date: date.to_string(),
        created_at,
        counts,
        files,
    };
    write_yaml(&paths.vintage_summary_file(date), &summary)?;
    debug!(date, files = summary.files.len(), "vintage snapshot written");
    Ok(summary)
}

fn snapshot_file(
    source: &Path,
    vintage_dir: &Path,
    subdir: Option<&str>,
) -> Result<VintageFile, MetadataError> {
    let name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| MetadataError::Invalid {
            path: source.to_path_buf(),
            message: "file name is not valid UTF-8".to_string(),
        })?;
    let (relative, target) = match subdir {
        Some(sub) => (format!("{sub}/{name}"), vintage_dir.join(sub).join(name)),
        None => (name.to_string(), vintage_dir.join(name)),
    };
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| MetadataError::io(parent, e))?;
    }

    let bytes = std::fs::read(source).map_err(|e| MetadataError::io(source, e))?;
    std::fs::write(&target, &bytes).map_err(|e| MetadataError::io(&target, e))?;
    Ok(VintageFile {
        path: relative,
        sha256: sha256_hex(&bytes),
    })
}

pub fn read_vintage_summary(
    paths: &MetadataPaths,
    date: &str,
) -> Result<VintageSummary, MetadataError> {
    let file = paths.vintage_summary_file(date);
    if !file.is_file() {
        return Err(MetadataError::UnknownVintage {
            date: date.to_string(),
        });
    }
    read_yaml(&file)
}

/// Re-hash every file of a vintage against its summary.
pub fn verify_vintage(paths: &MetadataPaths, date: &str) -> Result<VintageSummary, MetadataError> {
    let summary = read_vintage_summary(paths, date)?;
    let vintage_dir = paths.vintage_dir(date);
    for file in &summary.files {
        let path = vintage_dir.join(&file.path);
        let bytes = std::fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MetadataError::MissingFile { path: path.clone() }
            } else {
                MetadataError::io(&path, e)
            }
        })?;
        let actual = sha256_hex(&bytes);
        let expected = file.sha256.to_ascii_lowercase();
        if actual != expected {
            return Err(MetadataError::Sha256Mismatch {
                path,
                expected,
                actual,
            });
        }
    }
    Ok(summary)
}

/// Vintage dates present on disk, newest first.
pub fn list_vintages(paths: &MetadataPaths) -> Vec<String> {
    let dir = paths.vintages_dir();
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut dates: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    dates.sort();
    dates.reverse();
    dates
}

/// Load the sync history; a missing file is an empty history.
pub fn load_sync_history(paths: &MetadataPaths) -> Result<SyncHistoryFile, MetadataError> {
    let file = paths.sync_history_file();
    if !file.is_file() {
        return Ok(SyncHistoryFile::default());
    }
    read_yaml(&file)
}

/// Prepend `record` to the history (newest first) and truncate to the cap.
pub fn append_sync_record(
    paths: &MetadataPaths,
    record: SyncRecord,
) -> Result<SyncHistoryFile, MetadataError> {
    let mut history = load_sync_history(paths)?;
    history.vintages.insert(0, record);
    history.vintages.truncate(SYNC_HISTORY_CAP);
    write_yaml(&paths.sync_history_file(), &history)?;
    Ok(history)
}
