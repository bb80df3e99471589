//! Indicator catalog entries.
//!
//! One entry per indicator code, produced by the sync engine from the
//! warehouse's codelists and dataflow structures, and consumed read-only
//! by the resolver and the normalizer.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Metadata for a single indicator, keyed by its code.
///
/// Codes are case-sensitive and unique within a catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorMetadata {
    /// Indicator code, e.g. `CME_MRY0T4`.
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// Dataflows containing this indicator, primary first, catch-all last.
    ///
    /// The ordering is enforced when the catalog is built, not at lookup
    /// time.
    #[serde(default)]
    pub dataflows: Vec<String>,
    /// SDG tier classification, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<u8>,
    /// Dimension ids this indicator is disaggregated by.
    #[serde(default)]
    pub disaggregations: BTreeSet<String>,
    /// Subset of `disaggregations` whose value set includes a total code.
    #[serde(default)]
    pub disaggregations_with_totals: BTreeSet<String>,
}

impl IndicatorMetadata {
    /// The first (preferred) dataflow, when the entry names any.
    pub fn primary_dataflow(&self) -> Option<&str> {
        self.dataflows.first().map(String::as_str)
    }

    /// Whether `dimension` carries a total code for this indicator.
    pub fn has_totals(&self, dimension: &str) -> bool {
        self.disaggregations_with_totals.contains(dimension)
    }

    /// Whether this indicator is disaggregated by `dimension` at all.
    pub fn is_disaggregated_by(&self, dimension: &str) -> bool {
        self.disaggregations.contains(dimension)
    }

    /// Case-insensitive match of `term` against code and name.
    pub fn matches_search(&self, term: &str) -> bool {
        let needle = term.to_uppercase();
        self.code.to_uppercase().contains(&needle)
            || self.name.to_uppercase().contains(&needle)
    }
}
