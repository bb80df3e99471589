use std::collections::{BTreeMap, BTreeSet};

use sdg_model::{AggregateCodes, CountryNames, GeoType, IndicatorMetadata, RawTable};
use sdg_normalization::{NormalizeOptions, normalize, to_raw_table};

fn raw_table() -> RawTable {
    let mut table = RawTable::new(
        [
            "REF_AREA",
            "INDICATOR",
            "SEX",
            "TIME_PERIOD",
            "OBS_VALUE",
            "UNIT_MEASURE",
            "OBS_STATUS",
        ]
        .iter()
        .map(|c| (*c).to_string())
        .collect(),
    );
    for (area, sex, period, value) in [
        ("KEN", "_T", "2020", "41.2"),
        ("KEN", "F", "2020", "38.1"),
        ("KEN", "M", "2020", "44.0"),
        ("SSA", "_T", "2020-06", "74.6"),
    ] {
        table.push_row(vec![
            area.to_string(),
            "CME_MRY0T4".to_string(),
            sex.to_string(),
            period.to_string(),
            value.to_string(),
            "D_PER_1000".to_string(),
            String::new(),
        ]);
    }
    table
}

fn meta() -> IndicatorMetadata {
    IndicatorMetadata {
        code: "CME_MRY0T4".to_string(),
        name: "Under-five mortality rate".to_string(),
        dataflows: vec!["CME".to_string()],
        tier: Some(1),
        disaggregations: BTreeSet::from(["SEX".to_string()]),
        disaggregations_with_totals: BTreeSet::from(["SEX".to_string()]),
    }
}

fn aggregates() -> AggregateCodes {
    let mut codes = BTreeMap::new();
    codes.insert("SSA".to_string(), "Sub-Saharan Africa".to_string());
    AggregateCodes::new(codes)
}

fn countries() -> CountryNames {
    CountryNames::new([("KEN", "Kenya")])
}

#[test]
fn defaults_to_totals_and_classifies_geography() {
    let rows = normalize(
        &raw_table(),
        Some(&meta()),
        &aggregates(),
        &countries(),
        &NormalizeOptions::new(),
    );

    // SEX defaults to _T, so the F and M rows are filtered out.
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.dimension("sex") == Some("_T")));

    let kenya = rows.iter().find(|r| r.iso3 == "KEN").expect("KEN row");
    assert_eq!(kenya.geo_type, GeoType::Country);
    assert_eq!(kenya.country_name, "Kenya");
    assert_eq!(kenya.period, Some(2020.0));
    assert_eq!(kenya.value, Some(41.2));
    assert_eq!(kenya.unit.as_deref(), Some("D_PER_1000"));

    let region = rows.iter().find(|r| r.iso3 == "SSA").expect("SSA row");
    assert_eq!(region.geo_type, GeoType::Aggregate);
    assert!((region.period.expect("period") - 2020.5).abs() < 1e-9);
}

#[test]
fn explicit_value_and_all_override_the_default() {
    let female_only = normalize(
        &raw_table(),
        Some(&meta()),
        &aggregates(),
        &countries(),
        &NormalizeOptions::new().with_value("SEX", "F"),
    );
    assert_eq!(female_only.len(), 1);
    assert_eq!(female_only[0].iso3, "KEN");

    let everything = normalize(
        &raw_table(),
        Some(&meta()),
        &aggregates(),
        &countries(),
        &NormalizeOptions::new().with_all("SEX"),
    );
    assert_eq!(everything.len(), 4);
}

#[test]
fn missing_requested_value_drops_the_filter_not_the_rows() {
    let rows = normalize(
        &raw_table(),
        Some(&meta()),
        &aggregates(),
        &countries(),
        &NormalizeOptions::new().with_value("SEX", "NO_SUCH_CODE"),
    );
    // The impossible constraint is dropped, not applied.
    assert_eq!(rows.len(), 4);
}

#[test]
fn effective_total_code_replaces_the_literal_total() {
    let mut table = RawTable::new(vec![
        "REF_AREA".to_string(),
        "INDICATOR".to_string(),
        "AGE".to_string(),
        "TIME_PERIOD".to_string(),
        "OBS_VALUE".to_string(),
    ]);
    for (age, value) in [("Y0T4", "6018"), ("Y0", "1203")] {
        table.push_row(vec![
            "KEN".to_string(),
            "DM_POP_U5".to_string(),
            age.to_string(),
            "2020".to_string(),
            value.to_string(),
        ]);
    }
    let meta = IndicatorMetadata {
        code: "DM_POP_U5".to_string(),
        name: "Population under age 5".to_string(),
        dataflows: vec!["DM".to_string()],
        tier: None,
        disaggregations: BTreeSet::from(["AGE".to_string()]),
        disaggregations_with_totals: BTreeSet::from(["AGE".to_string()]),
    };
    let mut totals = BTreeMap::new();
    totals.insert("AGE".to_string(), "Y0T4".to_string());

    let rows = normalize(
        &table,
        Some(&meta),
        &aggregates(),
        &countries(),
        &NormalizeOptions::new().with_effective_totals(totals),
    );
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].dimension("age"), Some("Y0T4"));
}

#[test]
fn normalization_is_idempotent() {
    let options = NormalizeOptions::new();
    let once = normalize(
        &raw_table(),
        Some(&meta()),
        &aggregates(),
        &countries(),
        &options,
    );
    let twice = normalize(
        &to_raw_table(&once),
        Some(&meta()),
        &aggregates(),
        &countries(),
        &options,
    );
    assert_eq!(once, twice);
}

#[test]
fn blank_name_column_is_enriched_from_the_lookup() {
    let mut table = RawTable::new(vec![
        "REF_AREA".to_string(),
        "COUNTRY_NAME".to_string(),
        "TIME_PERIOD".to_string(),
        "OBS_VALUE".to_string(),
    ]);
    table.push_row(vec![
        "KEN".to_string(),
        String::new(),
        "2020".to_string(),
        "41.2".to_string(),
    ]);
    let rows = normalize(
        &table,
        Some(&meta()),
        &aggregates(),
        &countries(),
        &NormalizeOptions::new(),
    );
    assert_eq!(rows[0].country_name, "Kenya");
}

#[test]
fn populated_name_column_is_left_alone() {
    let mut table = RawTable::new(vec![
        "REF_AREA".to_string(),
        "COUNTRY_NAME".to_string(),
        "TIME_PERIOD".to_string(),
        "OBS_VALUE".to_string(),
    ]);
    table.push_row(vec![
        "KEN".to_string(),
        "Republic of Kenya".to_string(),
        "2020".to_string(),
        "41.2".to_string(),
    ]);
    let rows = normalize(
        &table,
        None,
        &aggregates(),
        &countries(),
        &NormalizeOptions::new(),
    );
    assert_eq!(rows[0].country_name, "Republic of Kenya");
    // Without catalog metadata the indicator falls back to empty.
    assert_eq!(rows[0].indicator, "");
}
