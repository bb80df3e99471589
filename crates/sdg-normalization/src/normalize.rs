//! Raw-table normalization into canonical observation rows.
//!
//! Every step is a total function over its input: no I/O, no failure
//! modes beyond producing fewer (filtered) or annotated rows. Running the
//! pipeline on an already-canonical table changes nothing.

use std::collections::BTreeMap;

use tracing::warn;

use sdg_model::{
    AggregateCodes, CountryNames, IndicatorMetadata, ObservationRow, RawTable, TOTAL_CODE,
};

use crate::period::parse_period;

/// Known raw-to-canonical column renames. Unknown columns pass through
/// unchanged, which also makes the rename step idempotent.
const COLUMN_RENAMES: &[(&str, &str)] = &[
    ("REF_AREA", "iso3"),
    ("Geographic area", "country_name"),
    ("COUNTRY_NAME", "country_name"),
    ("INDICATOR", "indicator"),
    ("TIME_PERIOD", "period"),
    ("OBS_VALUE", "value"),
    ("UNIT_MEASURE", "unit"),
    ("OBS_STATUS", "obs_status"),
    ("SEX", "sex"),
    ("AGE", "age"),
    ("RESIDENCE", "residence"),
    ("WEALTH_QUINTILE", "wealth_quintile"),
    ("MATERNAL_EDU_LVL", "maternal_edu_lvl"),
    ("EDUCATION_LEVEL", "education_level"),
    ("DISABILITY_STATUS", "disability_status"),
];

/// Columns with dedicated `ObservationRow` fields; everything else becomes
/// a disaggregation dimension.
const CORE_COLUMNS: &[&str] = &[
    "indicator",
    "iso3",
    "country_name",
    "period",
    "value",
    "unit",
    "obs_status",
];

/// Caller intent for one disaggregation dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimensionFilter {
    /// Keep only rows with this code.
    Value(String),
    /// Remove the default totals filter entirely.
    All,
}

/// Options for normalization.
#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    /// Caller-supplied dimension filters, keyed by SDMX dimension id
    /// (e.g. `SEX`). Absent dimensions get the totals default.
    pub overrides: BTreeMap<String, DimensionFilter>,
    /// Per-dimension effective total codes for the winning dataflow,
    /// where a non-`_T` code stands in for the total.
    pub effective_totals: BTreeMap<String, String>,
}

impl NormalizeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, dimension: impl Into<String>, code: impl Into<String>) -> Self {
        self.overrides
            .insert(dimension.into(), DimensionFilter::Value(code.into()));
        self
    }

    pub fn with_all(mut self, dimension: impl Into<String>) -> Self {
        self.overrides
            .insert(dimension.into(), DimensionFilter::All);
        self
    }

    pub fn with_effective_totals(mut self, totals: BTreeMap<String, String>) -> Self {
        self.effective_totals = totals;
        self
    }

    /// The code this dimension should be filtered to, if any.
    fn desired_code(&self, dimension: &str, meta: Option<&IndicatorMetadata>) -> Option<String> {
        match self.overrides.get(dimension) {
            Some(DimensionFilter::All) => None,
            Some(DimensionFilter::Value(code)) => Some(code.clone()),
            None => {
                let has_totals = meta.is_some_and(|m| m.has_totals(dimension));
                if has_totals {
                    Some(
                        self.effective_totals
                            .get(dimension)
                            .cloned()
                            .unwrap_or_else(|| TOTAL_CODE.to_string()),
                    )
                } else {
                    None
                }
            }
        }
    }
}

/// Normalize a raw response table into canonical observation rows.
pub fn normalize(
    table: &RawTable,
    meta: Option<&IndicatorMetadata>,
    aggregates: &AggregateCodes,
    countries: &CountryNames,
    options: &NormalizeOptions,
) -> Vec<ObservationRow> {
    let mut table = table.clone();

    // Step 1: canonical column names.
    for (from, to) in COLUMN_RENAMES {
        table.rename_column(from, to);
    }

    // Step 4 (before row construction so steps 2-3 see fewer rows):
    // totals defaults and caller filters, per dimension.
    for dimension in filterable_dimensions(meta, options) {
        let Some(column) = dimension_column(&table, &dimension) else {
            continue;
        };
        let Some(want) = options.desired_code(&dimension, meta) else {
            continue;
        };
        if table.distinct_values(&column).iter().any(|v| *v == want) {
            table.retain_rows(|row| row.get(&column) == Some(want.as_str()));
        } else {
            // An impossible constraint would silently empty the result;
            // drop the filter and say so instead.
            warn!(
                dimension = %dimension,
                requested = %want,
                "requested disaggregation value absent from response; leaving dimension unfiltered"
            );
        }
    }

    // Step 5 precondition: only enrich when the name column is blank.
    let enrich_names = table.column_is_blank("country_name");

    let dimension_columns: Vec<String> = table
        .columns()
        .iter()
        .filter(|c| !CORE_COLUMNS.contains(&c.as_str()))
        .cloned()
        .collect();

    let fallback_indicator = meta.map(|m| m.code.clone()).unwrap_or_default();

    let mut rows = Vec::with_capacity(table.row_count());
    for idx in 0..table.row_count() {
        let cell = |column: &str| table.cell(idx, column).unwrap_or("").trim().to_string();

        let iso3 = cell("iso3");
        let country_name = if enrich_names {
            countries.get(&iso3).unwrap_or("").to_string()
        } else {
            cell("country_name")
        };
        let indicator = {
            let from_table = cell("indicator");
            if from_table.is_empty() {
                fallback_indicator.clone()
            } else {
                from_table
            }
        };

        let mut dimensions = BTreeMap::new();
        for column in &dimension_columns {
            let value = cell(column);
            if !value.is_empty() {
                dimensions.insert(column.clone(), value);
            }
        }

        let geo_type = aggregates.classify(&iso3);
        rows.push(ObservationRow {
            indicator,
            iso3,
            country_name,
            period: parse_period(&cell("period")),
            value: cell("value").parse::<f64>().ok(),
            geo_type,
            dimensions,
            unit: non_empty(cell("unit")),
            obs_status: non_empty(cell("obs_status")),
        });
    }
    rows
}

/// Render normalized rows back into a canonical table (used by the wide
/// reshapes and by callers exporting CSV).
pub fn to_raw_table(rows: &[ObservationRow]) -> RawTable {
    let mut dimension_columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.dimensions.keys() {
            if !dimension_columns.contains(key) {
                dimension_columns.push(key.clone());
            }
        }
    }
    dimension_columns.sort();

    let mut columns: Vec<String> = CORE_COLUMNS.iter().map(|c| (*c).to_string()).collect();
    columns.extend(dimension_columns.iter().cloned());
    let mut table = RawTable::new(columns);

    for row in rows {
        let mut cells = vec![
            row.indicator.clone(),
            row.iso3.clone(),
            row.country_name.clone(),
            row.period.map(format_period).unwrap_or_default(),
            row.value.map(|v| v.to_string()).unwrap_or_default(),
            row.unit.clone().unwrap_or_default(),
            row.obs_status.clone().unwrap_or_default(),
        ];
        for column in &dimension_columns {
            cells.push(row.dimension(column).unwrap_or("").to_string());
        }
        table.push_row(cells);
    }
    table
}

/// Format a decimal year without a trailing `.0` for whole years.
pub fn format_period(period: f64) -> String {
    if period.fract() == 0.0 {
        format!("{}", period as i64)
    } else {
        period.to_string()
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// Union of the catalog's disaggregations and the caller's overrides, in
/// stable order.
fn filterable_dimensions(
    meta: Option<&IndicatorMetadata>,
    options: &NormalizeOptions,
) -> Vec<String> {
    let mut dimensions: Vec<String> = meta
        .map(|m| m.disaggregations.iter().cloned().collect())
        .unwrap_or_default();
    for dimension in options.overrides.keys() {
        if !dimensions.contains(dimension) {
            dimensions.push(dimension.clone());
        }
    }
    dimensions
}

/// The table column carrying a dimension: canonical (lowercased) name
/// first, raw SDMX id second.
fn dimension_column(table: &RawTable, dimension_id: &str) -> Option<String> {
    let canonical = dimension_id.to_ascii_lowercase();
    if table.has_column(&canonical) {
        return Some(canonical);
    }
    if table.has_column(dimension_id) {
        return Some(dimension_id.to_string());
    }
    None
}
