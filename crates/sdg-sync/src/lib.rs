//! Metadata sync engine.
//!
//! Re-downloads dataflow structures and rebuilds the indicator catalog
//! from the SDMX structure API, preserving the on-disk file shapes
//! exactly (other clients of the warehouse parse the same files). Each
//! run writes a dated vintage snapshot and appends to the capped sync
//! history. Not performance-critical; correctness of the contract is
//! what matters.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use sdg_client::{ClientConfig, StructureClient};
use sdg_metadata::files::{IndicatorsFile, SyncRecord, Watermark, read_yaml, write_yaml};
use sdg_metadata::{MetadataPaths, StructureProvider as _, vintage};
use sdg_model::{DataflowSchema, GLOBAL_DATAFLOW, IndicatorMetadata};

/// Dimensions that are structural, not disaggregations.
const STRUCTURAL_DIMENSIONS: &[&str] = &["REF_AREA", "INDICATOR"];

/// Outcome of one sync run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SyncReport {
    pub vintage_date: String,
    pub synced_at: DateTime<Utc>,
    pub dataflows: usize,
    pub schemas_written: usize,
    pub indicators: usize,
    pub errors: Vec<String>,
}

/// Sync engine over the structure endpoint and one metadata directory.
pub struct SyncEngine {
    config: ClientConfig,
    structure: StructureClient,
    paths: MetadataPaths,
}

impl SyncEngine {
    pub fn new(config: ClientConfig, structure: StructureClient, paths: MetadataPaths) -> Self {
        Self {
            config,
            structure,
            paths,
        }
    }

    /// Run a full sync at `now`.
    ///
    /// `progress` is called once per dataflow with (done, total, id).
    pub fn sync_all(
        &self,
        now: DateTime<Utc>,
        mut progress: impl FnMut(usize, usize, &str),
    ) -> Result<SyncReport> {
        let stubs = self
            .structure
            .list_dataflows()
            .context("list dataflows from the structure endpoint")?;
        info!(dataflows = stubs.len(), "sync started");

        let mut errors = Vec::new();
        let mut schemas = Vec::new();
        for (index, stub) in stubs.iter().enumerate() {
            progress(index + 1, stubs.len(), &stub.id);
            match self.structure.dataflow_schema(&stub.id) {
                Ok(schema) => {
                    write_yaml(&self.paths.schema_file(&schema.id), &schema)
                        .with_context(|| format!("write schema for {}", schema.id))?;
                    schemas.push(schema);
                }
                Err(error) => {
                    warn!(dataflow = %stub.id, %error, "schema refresh failed");
                    errors.push(format!("{}: {error}", stub.id));
                }
            }
        }

        let indicators = self.rebuild_catalog(&schemas, now)?;

        let mut counts = BTreeMap::new();
        counts.insert("dataflows".to_string(), stubs.len());
        counts.insert("schemas".to_string(), schemas.len());
        counts.insert("indicators".to_string(), indicators);

        let vintage_date = now.format("%Y-%m-%d").to_string();
        vintage::write_vintage(&self.paths, &vintage_date, now, counts.clone())
            .context("write vintage snapshot")?;
        vintage::append_sync_record(
            &self.paths,
            SyncRecord {
                vintage_date: vintage_date.clone(),
                synced_at: now,
                counts,
                errors: errors.clone(),
            },
        )
        .context("append sync history")?;

        info!(
            schemas = schemas.len(),
            indicators,
            errors = errors.len(),
            "sync finished"
        );
        Ok(SyncReport {
            vintage_date,
            synced_at: now,
            dataflows: stubs.len(),
            schemas_written: schemas.len(),
            indicators,
            errors,
        })
    }

    /// Rebuild `indicators.yaml` from the refreshed schemas, preserving
    /// names and tiers already in the catalog (the structure endpoint
    /// only carries codes).
    fn rebuild_catalog(&self, schemas: &[DataflowSchema], now: DateTime<Utc>) -> Result<usize> {
        let existing: BTreeMap<String, IndicatorMetadata> =
            read_yaml::<IndicatorsFile>(&self.paths.indicators_file())
                .map(|file| file.indicators)
                .unwrap_or_default();

        let mut catalog: BTreeMap<String, IndicatorMetadata> = BTreeMap::new();
        for schema in schemas {
            let Some(indicator_dim) = schema.dimension("INDICATOR") else {
                continue;
            };
            for code in &indicator_dim.values {
                let entry = catalog
                    .entry(code.clone())
                    .or_insert_with(|| IndicatorMetadata {
                        code: code.clone(),
                        name: existing
                            .get(code)
                            .map(|meta| meta.name.clone())
                            .unwrap_or_else(|| code.clone()),
                        dataflows: Vec::new(),
                        tier: existing.get(code).and_then(|meta| meta.tier),
                        disaggregations: Default::default(),
                        disaggregations_with_totals: Default::default(),
                    });
                if !entry.dataflows.contains(&schema.id) {
                    entry.dataflows.push(schema.id.clone());
                }
                for dimension in &schema.dimensions {
                    if STRUCTURAL_DIMENSIONS.contains(&dimension.id.as_str()) {
                        continue;
                    }
                    entry.disaggregations.insert(dimension.id.clone());
                    if dimension.has_total() {
                        entry.disaggregations_with_totals.insert(dimension.id.clone());
                    }
                }
            }
        }

        // The catch-all dataflow is always last when present.
        for meta in catalog.values_mut() {
            if let Some(index) = meta.dataflows.iter().position(|d| d == GLOBAL_DATAFLOW)
                && index + 1 != meta.dataflows.len()
            {
                let catch_all = meta.dataflows.remove(index);
                meta.dataflows.push(catch_all);
            }
        }

        let count = catalog.len();
        let file = IndicatorsFile {
            metadata: Some(Watermark {
                platform: "rust".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                synced_at: now,
                source: self.config.base_url.clone(),
                agency: self.config.agency.clone(),
                content_type: "indicators".to_string(),
            }),
            indicators: catalog,
        };
        write_yaml(&self.paths.indicators_file(), &file).context("write indicator catalog")?;
        Ok(count)
    }
}
