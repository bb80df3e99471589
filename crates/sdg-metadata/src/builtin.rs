#![deny(unsafe_code)]

//! Bundled and builtin metadata fallbacks.
//!
//! The bundled documents are compiled-in copies of the metadata files,
//! used when the on-disk copies are missing or corrupt. The builtin
//! tables below are the last-resort floor: with them the client still
//! resolves every indicator to the generic catch-all dataflow.

use std::collections::BTreeMap;

use sdg_model::GLOBAL_DATAFLOW;
use sdg_model::fallback::DEFAULT_SEQUENCE_KEY;

pub const BUNDLED_INDICATORS: &str = include_str!("../bundled/indicators.yaml");
pub const BUNDLED_FALLBACKS: &str = include_str!("../bundled/fallback_sequences.yaml");
pub const BUNDLED_REGIONS: &str = include_str!("../bundled/regions.yaml");
pub const BUNDLED_COUNTRIES: &str = include_str!("../bundled/countries.yaml");

/// Minimal fallback table: everything degrades to the catch-all.
pub fn builtin_fallback_sequences() -> BTreeMap<String, Vec<String>> {
    let mut sequences = BTreeMap::new();
    sequences.insert(
        DEFAULT_SEQUENCE_KEY.to_string(),
        vec![GLOBAL_DATAFLOW.to_string()],
    );
    sequences
}

/// Per-dataflow effective total codes: dataflow -> dimension -> code.
///
/// Some dataflows carry no literal `_T` on a dimension and use a specific
/// band code as the effective total instead. New cases are additions to
/// this table.
pub fn builtin_effective_totals() -> BTreeMap<String, BTreeMap<String, String>> {
    let mut totals = BTreeMap::new();
    let mut dm = BTreeMap::new();
    dm.insert("AGE".to_string(), "Y0T4".to_string());
    totals.insert("DM".to_string(), dm);
    totals
}

/// Minimal aggregate code set.
pub fn builtin_regions() -> BTreeMap<String, String> {
    let mut regions = BTreeMap::new();
    for (code, name) in [
        ("WLD", "World"),
        ("SSA", "Sub-Saharan Africa"),
        ("LDC", "Least developed countries"),
        ("LIC", "Low income"),
        ("HIC", "High income"),
    ] {
        regions.insert(code.to_string(), name.to_string());
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::{CountriesFile, FallbacksFile, IndicatorsFile, RegionsFile, parse_bundled};

    #[test]
    fn bundled_documents_parse() {
        let indicators: IndicatorsFile =
            parse_bundled("indicators", BUNDLED_INDICATORS).expect("bundled indicators");
        assert!(indicators.indicators.contains_key("CME_MRY0T4"));
        assert!(indicators.metadata.is_some());

        let fallbacks: FallbacksFile =
            parse_bundled("fallback sequences", BUNDLED_FALLBACKS).expect("bundled fallbacks");
        assert_eq!(
            fallbacks.fallback_sequences.get("PT").map(Vec::as_slice),
            Some(
                [
                    "PT".to_string(),
                    "PT_CM".to_string(),
                    "PT_FGM".to_string(),
                    "GLOBAL_DATAFLOW".to_string()
                ]
                .as_slice()
            )
        );
        assert!(fallbacks.fallback_sequences.contains_key("DEFAULT"));

        let regions: RegionsFile =
            parse_bundled("regions", BUNDLED_REGIONS).expect("bundled regions");
        assert!(regions.regions.contains_key("WLD"));

        let countries: CountriesFile =
            parse_bundled("countries", BUNDLED_COUNTRIES).expect("bundled countries");
        assert_eq!(countries.countries.get("KEN").map(String::as_str), Some("Kenya"));
    }

    #[test]
    fn builtin_floor_always_reaches_the_catch_all() {
        let sequences = builtin_fallback_sequences();
        assert_eq!(
            sequences.get("DEFAULT").map(Vec::as_slice),
            Some(["GLOBAL_DATAFLOW".to_string()].as_slice())
        );
    }
}
