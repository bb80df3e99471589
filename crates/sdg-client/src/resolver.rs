//! Dataflow resolution with fallback.
//!
//! Maps an indicator code to the ordered list of candidate dataflows the
//! fetcher should try. Resolution is a pure function of the code and the
//! current metadata contents; it never fails for a well-typed code and
//! never returns an empty list.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use sdg_metadata::MetadataStore;
use sdg_model::{GLOBAL_DATAFLOW, code_prefix};

/// A table-driven special case: an indicator family that is always
/// queried against one specific dataflow, with fixed dimension values
/// injected into the query. Checked before every other resolution step;
/// new exceptions are rows added here, not code.
#[derive(Debug, Clone)]
pub struct IndicatorOverride {
    /// The family: indicator codes starting with this prefix.
    pub code_prefix: String,
    pub dataflow: String,
    /// Dimension id -> code, injected into the series key.
    pub forced_dimensions: BTreeMap<String, String>,
}

/// The shipped override rows: the WASH facility families live in their
/// own dataflows and pin the facility-type dimension.
pub fn default_overrides() -> Vec<IndicatorOverride> {
    let mut households = BTreeMap::new();
    households.insert("RESIDENCE".to_string(), "_T".to_string());
    let mut schools = BTreeMap::new();
    schools.insert("EDUCATION_LEVEL".to_string(), "_T".to_string());
    vec![
        IndicatorOverride {
            code_prefix: "WS_HH".to_string(),
            dataflow: "WASH_HOUSEHOLDS".to_string(),
            forced_dimensions: households,
        },
        IndicatorOverride {
            code_prefix: "WS_SCH".to_string(),
            dataflow: "WASH_SCHOOLS".to_string(),
            forced_dimensions: schools,
        },
    ]
}

/// Resolution result: candidates to try in order, plus dimension values
/// forced by an override row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub candidates: Vec<String>,
    pub forced_dimensions: BTreeMap<String, String>,
}

/// Candidate-list resolver over the metadata store.
pub struct DataflowResolver {
    store: Arc<MetadataStore>,
    overrides: Vec<IndicatorOverride>,
}

impl DataflowResolver {
    pub fn new(store: Arc<MetadataStore>) -> Self {
        Self {
            store,
            overrides: default_overrides(),
        }
    }

    pub fn with_overrides(mut self, overrides: Vec<IndicatorOverride>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Resolve the candidate dataflows for `indicator`.
    ///
    /// Priority order:
    /// 0. override table (forces one dataflow + fixed dimension values)
    /// 1. explicit dataflow, with the prefix fallbacks appended in case
    ///    the explicit guess is wrong
    /// 2. the catalog entry's dataflow list
    /// 3. the prefix fallback sequence
    /// 4. the `DEFAULT` sequence, or the generic catch-all
    pub fn resolve(&self, indicator: &str, explicit: Option<&str>) -> Resolution {
        let loaded = self.store.load();

        for row in &self.overrides {
            if indicator.starts_with(row.code_prefix.as_str()) {
                debug!(
                    indicator,
                    dataflow = %row.dataflow,
                    "override row forces dataflow"
                );
                return Resolution {
                    candidates: vec![row.dataflow.clone()],
                    forced_dimensions: row.forced_dimensions.clone(),
                };
            }
        }

        let prefix_sequence = loaded
            .fallback_sequence(code_prefix(indicator))
            .map(<[String]>::to_vec);

        let candidates = if let Some(explicit) = explicit {
            let mut list = vec![explicit.to_string()];
            if let Some(sequence) = prefix_sequence {
                list.extend(sequence);
            }
            list
        } else if let Some(meta) = loaded.get_indicator(indicator)
            && !meta.dataflows.is_empty()
        {
            meta.dataflows.clone()
        } else if let Some(sequence) = prefix_sequence {
            sequence
        } else if let Some(default) = loaded.fallbacks.default_sequence() {
            default.to_vec()
        } else {
            vec![GLOBAL_DATAFLOW.to_string()]
        };

        Resolution {
            candidates: dedup_preserving(candidates),
            forced_dimensions: BTreeMap::new(),
        }
    }
}

/// Remove later duplicates, preserving first-occurrence order.
fn dedup_preserving(candidates: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}
