#![deny(unsafe_code)]

//! On-disk metadata document shapes.
//!
//! These structs are the cross-implementation contract: field names mirror
//! the YAML keys one for one. Unknown keys are ignored on read and never
//! emitted on write. Every independent client of the warehouse loads these
//! files identically.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use sdg_model::IndicatorMetadata;

use crate::error::MetadataError;

/// Watermark block written at the top of the indicator catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Watermark {
    pub platform: String,
    pub version: String,
    pub synced_at: DateTime<Utc>,
    pub source: String,
    pub agency: String,
    pub content_type: String,
}

/// `indicators.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicatorsFile {
    #[serde(
        rename = "_metadata",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub metadata: Option<Watermark>,
    #[serde(default)]
    pub indicators: BTreeMap<String, IndicatorMetadata>,
}

/// `fallback_sequences.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FallbacksFile {
    #[serde(default)]
    pub fallback_sequences: BTreeMap<String, Vec<String>>,
    /// Per-dataflow effective total codes: dataflow -> dimension -> code
    /// used as the default where no literal total code exists.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub effective_totals: BTreeMap<String, BTreeMap<String, String>>,
}

/// `regions.yaml` — the aggregate code set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionsFile {
    #[serde(default)]
    pub regions: BTreeMap<String, String>,
}

/// `countries.yaml` — ISO3 to country name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountriesFile {
    #[serde(default)]
    pub countries: BTreeMap<String, String>,
}

/// `sync_history.yaml` — newest-first, capped at
/// [`crate::vintage::SYNC_HISTORY_CAP`] entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncHistoryFile {
    #[serde(default)]
    pub vintages: Vec<SyncRecord>,
}

/// One sync attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRecord {
    /// Vintage date, `YYYY-MM-DD`.
    pub vintage_date: String,
    pub synced_at: DateTime<Utc>,
    /// Item counts per metadata type (indicators, schemas, regions, ...).
    #[serde(default)]
    pub counts: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, MetadataError> {
    let raw = std::fs::read_to_string(path).map_err(|e| MetadataError::io(path, e))?;
    serde_yaml::from_str(&raw).map_err(|e| MetadataError::yaml(path, e))
}

pub fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<(), MetadataError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| MetadataError::io(parent, e))?;
    }
    let rendered = serde_yaml::to_string(value).map_err(|e| MetadataError::Serialize {
        what: path.display().to_string(),
        source: e,
    })?;
    std::fs::write(path, rendered).map_err(|e| MetadataError::io(path, e))
}

/// Parse a bundled (compiled-in) document.
pub fn parse_bundled<T: DeserializeOwned>(
    what: &'static str,
    raw: &str,
) -> Result<T, MetadataError> {
    serde_yaml::from_str(raw).map_err(|e| MetadataError::Bundled { what, source: e })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicators_file_parses_contract_shape() {
        let raw = r#"
_metadata:
  platform: rust
  version: 0.1.0
  synced_at: 2026-07-01T00:00:00Z
  source: https://sdmx.data.unicef.org/ws/public/sdmxapi/rest
  agency: UNICEF
  content_type: indicators
indicators:
  CME_MRY0T4:
    code: CME_MRY0T4
    name: Under-five mortality rate
    dataflows: [CME, GLOBAL_DATAFLOW]
    tier: 1
    disaggregations: [SEX]
    disaggregations_with_totals: [SEX]
"#;
        let file: IndicatorsFile = serde_yaml::from_str(raw).expect("parse indicators file");
        let watermark = file.metadata.expect("watermark");
        assert_eq!(watermark.agency, "UNICEF");
        assert_eq!(watermark.content_type, "indicators");
        let entry = file.indicators.get("CME_MRY0T4").expect("entry");
        assert_eq!(entry.dataflows, ["CME", "GLOBAL_DATAFLOW"]);
    }

    #[test]
    fn fallbacks_file_tolerates_missing_effective_totals() {
        let raw = "fallback_sequences:\n  DEFAULT: [GLOBAL_DATAFLOW]\n";
        let file: FallbacksFile = serde_yaml::from_str(raw).expect("parse fallbacks");
        assert_eq!(
            file.fallback_sequences.get("DEFAULT").map(Vec::as_slice),
            Some(["GLOBAL_DATAFLOW".to_string()].as_slice())
        );
        assert!(file.effective_totals.is_empty());
    }

    #[test]
    fn sync_history_round_trips() {
        let mut counts = BTreeMap::new();
        counts.insert("indicators".to_string(), 12usize);
        let file = SyncHistoryFile {
            vintages: vec![SyncRecord {
                vintage_date: "2026-08-01".to_string(),
                synced_at: "2026-08-01T04:30:00Z".parse().expect("timestamp"),
                counts,
                errors: vec!["schema fetch failed for PT_FGM".to_string()],
            }],
        };
        let rendered = serde_yaml::to_string(&file).expect("render");
        let back: SyncHistoryFile = serde_yaml::from_str(&rendered).expect("reparse");
        assert_eq!(back.vintages.len(), 1);
        assert_eq!(back.vintages[0].counts.get("indicators"), Some(&12));
        assert_eq!(back.vintages[0].errors.len(), 1);
    }
}
