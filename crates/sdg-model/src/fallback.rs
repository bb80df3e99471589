//! Prefix-keyed dataflow fallback sequences.
//!
//! When an indicator has no direct catalog entry, the resolver derives the
//! leading `_`-separated token of its code and looks it up here to get an
//! ordered list of candidate dataflows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Key of the sequence used when no prefix matches.
pub const DEFAULT_SEQUENCE_KEY: &str = "DEFAULT";

/// Returns the fallback prefix of an indicator code: the leading token of
/// the code split on `_` (e.g. `CME` from `CME_MRY0T4`).
pub fn code_prefix(code: &str) -> &str {
    code.split('_').next().unwrap_or(code)
}

/// Ordered candidate dataflows per indicator-code prefix, plus a `DEFAULT`
/// entry. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FallbackTable {
    sequences: BTreeMap<String, Vec<String>>,
}

impl FallbackTable {
    /// Build a table, collapsing consecutive duplicate dataflows in each
    /// sequence (the sequence invariant: never retry the same dataflow
    /// twice in a row).
    pub fn new(sequences: BTreeMap<String, Vec<String>>) -> Self {
        let sequences = sequences
            .into_iter()
            .map(|(prefix, seq)| (prefix, dedup_consecutive(seq)))
            .collect();
        Self { sequences }
    }

    pub fn get(&self, prefix: &str) -> Option<&[String]> {
        self.sequences.get(prefix).map(Vec::as_slice)
    }

    /// The `DEFAULT` sequence, when present.
    pub fn default_sequence(&self) -> Option<&[String]> {
        self.get(DEFAULT_SEQUENCE_KEY)
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.sequences
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

fn dedup_consecutive(seq: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(seq.len());
    for flow in seq {
        if out.last().map(String::as_str) != Some(flow.as_str()) {
            out.push(flow);
        }
    }
    out
}
