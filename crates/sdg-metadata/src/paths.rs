#![deny(unsafe_code)]

//! Metadata directory path resolution.

use std::path::{Path, PathBuf};

/// Environment variable for overriding the metadata directory.
pub const METADATA_ENV_VAR: &str = "SDG_METADATA_DIR";

/// File and directory layout under one metadata root.
#[derive(Debug, Clone)]
pub struct MetadataPaths {
    root: PathBuf,
}

impl MetadataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the metadata root.
    ///
    /// Resolution order:
    /// 1. `SDG_METADATA_DIR` environment variable
    /// 2. `metadata/` directory relative to the workspace root
    pub fn resolve() -> Self {
        if let Ok(root) = std::env::var(METADATA_ENV_VAR) {
            return Self::new(root);
        }
        Self::new(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../metadata"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn indicators_file(&self) -> PathBuf {
        self.root.join("indicators.yaml")
    }

    pub fn fallbacks_file(&self) -> PathBuf {
        self.root.join("fallback_sequences.yaml")
    }

    pub fn regions_file(&self) -> PathBuf {
        self.root.join("regions.yaml")
    }

    pub fn countries_file(&self) -> PathBuf {
        self.root.join("countries.yaml")
    }

    pub fn schemas_dir(&self) -> PathBuf {
        self.root.join("schemas")
    }

    pub fn schema_file(&self, dataflow_id: &str) -> PathBuf {
        self.schemas_dir().join(format!("{dataflow_id}.yaml"))
    }

    pub fn sync_history_file(&self) -> PathBuf {
        self.root.join("sync_history.yaml")
    }

    pub fn vintages_dir(&self) -> PathBuf {
        self.root.join("vintages")
    }

    pub fn vintage_dir(&self, date: &str) -> PathBuf {
        self.vintages_dir().join(date)
    }

    pub fn vintage_summary_file(&self, date: &str) -> PathBuf {
        self.vintage_dir(date).join("summary.yaml")
    }
}
