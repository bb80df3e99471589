//! Request-key and URL construction.

use std::collections::BTreeMap;

use sdg_model::{DataflowSchema, IndicatorMetadata, TOTAL_CODE};
use sdg_normalization::DimensionFilter;

use crate::config::ClientConfig;

/// Filters for one data request.
#[derive(Debug, Clone, Default)]
pub struct DataQuery {
    /// Indicator codes, joined with `+` in the series key.
    pub indicators: Vec<String>,
    /// Optional ISO3 country filter.
    pub countries: Vec<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    /// Caller filters per SDMX dimension id.
    pub dimensions: BTreeMap<String, DimensionFilter>,
}

/// Series-key position of the geography dimension.
const REF_AREA: &str = "REF_AREA";
/// Series-key position of the indicator dimension.
const INDICATOR: &str = "INDICATOR";

/// Build the series key for one dataflow.
///
/// Dimensions appear in schema order. Each disaggregation defaults to its
/// total code when the catalog marks it as having one; callers override
/// any default with a specific code or remove it entirely (`All`). Without
/// a schema the key carries only geography and indicator, leaving the
/// remaining dimensions unconstrained.
pub fn series_key(
    query: &DataQuery,
    schema: Option<&DataflowSchema>,
    meta: Option<&IndicatorMetadata>,
    effective_totals: &BTreeMap<String, String>,
    forced_dimensions: &BTreeMap<String, String>,
) -> String {
    let countries = query.countries.join("+");
    let indicators = query.indicators.join("+");

    let Some(schema) = schema else {
        return format!("{countries}.{indicators}");
    };

    let mut segments = Vec::with_capacity(schema.dimensions.len());
    for dimension in &schema.dimensions {
        let segment = match dimension.id.as_str() {
            REF_AREA => countries.clone(),
            INDICATOR => indicators.clone(),
            id => dimension_segment(id, query, meta, effective_totals, forced_dimensions),
        };
        segments.push(segment);
    }
    segments.join(".")
}

fn dimension_segment(
    id: &str,
    query: &DataQuery,
    meta: Option<&IndicatorMetadata>,
    effective_totals: &BTreeMap<String, String>,
    forced_dimensions: &BTreeMap<String, String>,
) -> String {
    if let Some(forced) = forced_dimensions.get(id) {
        return forced.clone();
    }
    match query.dimensions.get(id) {
        Some(DimensionFilter::Value(code)) => code.clone(),
        Some(DimensionFilter::All) => String::new(),
        None => {
            if meta.is_some_and(|m| m.has_totals(id)) {
                effective_totals
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| TOTAL_CODE.to_string())
            } else {
                String::new()
            }
        }
    }
}

/// Build the full data URL for one page.
pub fn build_data_url(
    config: &ClientConfig,
    dataflow_id: &str,
    key: &str,
    query: &DataQuery,
    start_index: usize,
) -> String {
    let mut url = format!(
        "{base}/data/{agency},{dataflow},{version}/{key}?format=csv&labels=id",
        base = config.base_url,
        agency = config.agency,
        dataflow = dataflow_id,
        version = config.dataflow_version,
    );
    if let Some(start) = query.start_year {
        url.push_str(&format!("&startPeriod={start}"));
    }
    if let Some(end) = query.end_year {
        url.push_str(&format!("&endPeriod={end}"));
    }
    url.push_str(&format!(
        "&startIndex={start_index}&count={page_size}",
        page_size = config.page_size
    ));
    url
}
