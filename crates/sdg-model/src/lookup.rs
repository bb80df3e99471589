//! Static lookups: aggregate geography codes and country names.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::observation::GeoType;

/// ISO3-like codes that denote regions, income groups, or other reporting
/// aggregates rather than sovereign countries. Immutable per load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateCodes {
    codes: BTreeMap<String, String>,
}

impl AggregateCodes {
    pub fn new(codes: BTreeMap<String, String>) -> Self {
        Self { codes }
    }

    pub fn contains(&self, iso3: &str) -> bool {
        self.codes.contains_key(iso3)
    }

    /// Name of the aggregate, when known.
    pub fn name(&self, iso3: &str) -> Option<&str> {
        self.codes.get(iso3).map(String::as_str)
    }

    pub fn classify(&self, iso3: &str) -> GeoType {
        if self.contains(iso3) {
            GeoType::Aggregate
        } else {
            GeoType::Country
        }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.codes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Country-name lookup by ISO3 code. Lookups are case-insensitive on the
/// code; the stored name is returned verbatim.
#[derive(Debug, Clone, Default)]
pub struct CountryNames {
    names: BTreeMap<String, String>,
}

impl CountryNames {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut names = BTreeMap::new();
        for (code, name) in pairs {
            names
                .entry(code.as_ref().to_ascii_uppercase())
                .or_insert_with(|| name.into());
        }
        Self { names }
    }

    pub fn get(&self, iso3: &str) -> Option<&str> {
        self.names
            .get(&iso3.to_ascii_uppercase())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_known_aggregates() {
        let mut codes = BTreeMap::new();
        for (code, name) in [
            ("WLD", "World"),
            ("SSA", "Sub-Saharan Africa"),
            ("LDC", "Least developed countries"),
            ("HIC", "High income"),
            ("EAP", "East Asia and Pacific"),
        ] {
            codes.insert(code.to_string(), name.to_string());
        }
        let aggregates = AggregateCodes::new(codes);

        for agg in ["WLD", "SSA", "LDC", "HIC", "EAP"] {
            assert_eq!(aggregates.classify(agg), GeoType::Aggregate, "{agg}");
        }
        for country in ["AFG", "KEN", "BRA", "NOR", "FJI"] {
            assert_eq!(aggregates.classify(country), GeoType::Country, "{country}");
        }
    }

    #[test]
    fn country_name_lookup_is_case_insensitive() {
        let names = CountryNames::new([("AFG", "Afghanistan"), ("KEN", "Kenya")]);
        assert_eq!(names.get("afg"), Some("Afghanistan"));
        assert_eq!(names.get("KEN"), Some("Kenya"));
        assert_eq!(names.get("XXX"), None);
    }
}
