//! Dataflow references and dimension schemas.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::TOTAL_CODE;

/// A fully qualified SDMX dataflow reference: agency, id, version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataflowRef {
    pub agency: String,
    pub id: String,
    pub version: String,
}

impl DataflowRef {
    pub fn new(
        agency: impl Into<String>,
        id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            agency: agency.into(),
            id: id.into(),
            version: version.into(),
        }
    }

    /// Parse a dataflow reference.
    ///
    /// Accepts either a bare id (`CME`) or the full `AGENCY,ID,VERSION`
    /// form; missing parts are filled from the defaults.
    pub fn parse(
        raw: &str,
        default_agency: &str,
        default_version: &str,
    ) -> Result<Self, ParseDataflowError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ParseDataflowError {
                raw: raw.to_string(),
                message: "reference is empty".to_string(),
            });
        }

        let parts: Vec<&str> = trimmed.split(',').collect();
        let (agency, id, version) = match parts.as_slice() {
            [id] => (default_agency, *id, default_version),
            [agency, id] => (*agency, *id, default_version),
            [agency, id, version] => (*agency, *id, *version),
            _ => {
                return Err(ParseDataflowError {
                    raw: raw.to_string(),
                    message: "expected at most AGENCY,ID,VERSION".to_string(),
                });
            }
        };

        if !is_valid_id(id) {
            return Err(ParseDataflowError {
                raw: raw.to_string(),
                message: format!("invalid dataflow id `{id}`"),
            });
        }

        Ok(Self::new(agency.trim(), id.trim(), version.trim()))
    }
}

impl fmt::Display for DataflowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.agency, self.id, self.version)
    }
}

fn is_valid_id(id: &str) -> bool {
    let id = id.trim();
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid dataflow reference `{raw}`: {message}")]
pub struct ParseDataflowError {
    pub raw: String,
    pub message: String,
}

/// One dimension of a dataflow's data structure definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionMeta {
    /// Dimension id, e.g. `SEX`.
    pub id: String,
    /// Zero-based position in the series key.
    pub position: usize,
    /// Codelist backing this dimension, when enumerated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codelist: Option<String>,
    /// Codes observed for this dimension. May be truncated for very large
    /// codelists; `is_exhaustive` records whether it is complete.
    #[serde(default)]
    pub values: Vec<String>,
    /// Smallest observed value for non-enumerated dimensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_min: Option<String>,
    /// Largest observed value for non-enumerated dimensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_max: Option<String>,
    /// Whether `values` lists every code of the dimension.
    #[serde(default = "default_true")]
    pub is_exhaustive: bool,
}

fn default_true() -> bool {
    true
}

impl DimensionMeta {
    /// Whether the literal total code appears in the value set.
    pub fn has_total(&self) -> bool {
        self.values.iter().any(|v| v == TOTAL_CODE)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.values.iter().any(|v| v == code)
    }
}

/// Dimensional structure of one dataflow.
///
/// Built once per dataflow id on first access (from the structure endpoint
/// or a cached schema file) and never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataflowSchema {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    /// Key dimensions in series-key order; the time dimension is separate.
    pub dimensions: Vec<DimensionMeta>,
    pub time_dimension: String,
    pub primary_measure: String,
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl DataflowSchema {
    pub fn dimension(&self, id: &str) -> Option<&DimensionMeta> {
        self.dimensions.iter().find(|d| d.id == id)
    }

    /// Dimension ids in key order.
    pub fn dimension_ids(&self) -> impl Iterator<Item = &str> {
        self.dimensions.iter().map(|d| d.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bare_id_fills_defaults() {
        let r = DataflowRef::parse("CME", "UNICEF", "1.0").unwrap();
        assert_eq!(r.to_string(), "UNICEF,CME,1.0");
    }

    #[test]
    fn parse_full_reference() {
        let r = DataflowRef::parse("UNICEF,NUTRITION,2.1", "X", "9.9").unwrap();
        assert_eq!(r.agency, "UNICEF");
        assert_eq!(r.id, "NUTRITION");
        assert_eq!(r.version, "2.1");
    }

    #[test]
    fn parse_rejects_empty_and_garbage() {
        assert!(DataflowRef::parse("", "UNICEF", "1.0").is_err());
        assert!(DataflowRef::parse("   ", "UNICEF", "1.0").is_err());
        assert!(DataflowRef::parse("UNICEF,C M E", "UNICEF", "1.0").is_err());
        assert!(DataflowRef::parse("A,B,C,D", "UNICEF", "1.0").is_err());
    }

    #[test]
    fn dimension_total_detection() {
        let dim = DimensionMeta {
            id: "SEX".to_string(),
            position: 2,
            codelist: Some("CL_SEX".to_string()),
            values: vec!["F".to_string(), "M".to_string(), "_T".to_string()],
            values_min: None,
            values_max: None,
            is_exhaustive: true,
        };
        assert!(dim.has_total());
        assert!(dim.contains("F"));
        assert!(!dim.contains("U"));
    }
}
