//! Canonical observation rows.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether a row reports a single country or a regional/income-group
/// aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoType {
    Country,
    Aggregate,
}

impl GeoType {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Country => "country",
            Self::Aggregate => "aggregate",
        }
    }
}

impl fmt::Display for GeoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One normalized observation. Produced fresh per fetch; never persisted
/// by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRow {
    pub indicator: String,
    pub iso3: String,
    pub country_name: String,
    /// Time period as a decimal year; `None` when the raw period was
    /// unparseable.
    pub period: Option<f64>,
    pub value: Option<f64>,
    pub geo_type: GeoType,
    /// Disaggregation dimension values (sex, age, residence, ...), keyed
    /// by canonical column name.
    #[serde(default)]
    pub dimensions: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obs_status: Option<String>,
}

impl ObservationRow {
    /// Value of a disaggregation dimension, when present.
    pub fn dimension(&self, name: &str) -> Option<&str> {
        self.dimensions.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geo_type_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&GeoType::Aggregate).unwrap(),
            "\"aggregate\""
        );
        assert_eq!(GeoType::Country.to_string(), "country");
    }
}
