#![deny(unsafe_code)]

//! Health report over the metadata set.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::files::Watermark;
use crate::paths::MetadataPaths;
use crate::store::{MetadataSources, MetadataStore};
use crate::vintage::{list_vintages, load_sync_history};

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetadataDoctor {
    pub schema: String,
    pub schema_version: u32,
    pub root: String,
    pub sources: MetadataSources,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark: Option<Watermark>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_days: Option<i64>,
    pub stale: bool,
    pub counts: BTreeMap<String, usize>,
    pub vintages: Vec<String>,
    pub sync_history_len: usize,
}

impl MetadataDoctor {
    pub fn inspect(store: &MetadataStore, now: DateTime<Utc>) -> Self {
        let loaded = store.load();
        let paths: &MetadataPaths = store.paths();

        let mut counts = BTreeMap::new();
        counts.insert("indicators".to_string(), loaded.indicators.len());
        counts.insert("fallback_prefixes".to_string(), loaded.fallbacks.len());
        counts.insert("regions".to_string(), loaded.aggregates.len());

        let history_len = load_sync_history(paths)
            .map(|h| h.vintages.len())
            .unwrap_or(0);

        Self {
            schema: "sdg-data.metadata-doctor".to_string(),
            schema_version: 1,
            root: paths.root().display().to_string(),
            sources: loaded.sources,
            watermark: loaded.watermark.clone(),
            age_days: loaded.age(now).map(|age| age.num_days()),
            stale: store.is_stale(),
            counts,
            vintages: list_vintages(paths),
            sync_history_len: history_len,
        }
    }
}
