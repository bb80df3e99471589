//! Top-level fetch orchestration.
//!
//! Validates the request, resolves candidate dataflows, tries them in
//! order until one claims the indicator, and normalizes the winning
//! response. Candidates are strictly sequential: the first `Found`
//! terminates the search even when it carries zero rows, because "the
//! dataflow knows this indicator" and "rows matched the filters" are
//! distinct signals.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use sdg_metadata::{MetadataStore, SchemaCache};
use sdg_model::{DataflowRef, IndicatorMetadata, ObservationRow, RawTable};
use sdg_normalization::{
    DimensionFilter, NormalizeOptions, normalize, to_raw_table, wide_by_indicator, wide_by_year,
};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::fetcher::{FetchOutcome, SdmxFetcher};
use crate::query::DataQuery;
use crate::resolver::DataflowResolver;
use crate::structure::StructureClient;
use crate::transport::{HttpTransport, Transport};

/// One fetch request, the programmatic entry point's argument shape.
#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    pub indicators: Vec<String>,
    /// Explicit dataflow override; still backed by fallbacks.
    pub dataflow: Option<String>,
    pub countries: Vec<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    /// Disaggregation overrides keyed by SDMX dimension id.
    pub dimensions: BTreeMap<String, DimensionFilter>,
}

impl FetchRequest {
    pub fn indicator(code: impl Into<String>) -> Self {
        Self {
            indicators: vec![code.into()],
            ..Self::default()
        }
    }
}

/// Output shape of [`SdgClient::fetch_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputShape {
    /// One row per observation.
    #[default]
    Long,
    /// Years as columns.
    Wide,
    /// Indicator codes as columns.
    WideByIndicator,
}

/// A successful fetch: normalized rows plus provenance.
#[derive(Debug)]
pub struct FetchResult {
    pub rows: Vec<ObservationRow>,
    /// The dataflow that claimed the indicator.
    pub dataflow: String,
    /// Every dataflow tried, in order, winner last.
    pub attempted: Vec<String>,
}

/// The data-access client.
///
/// Shares the metadata store and schema cache by `Arc`; independent
/// fetches may run concurrently from separate threads.
pub struct SdgClient {
    store: Arc<MetadataStore>,
    resolver: DataflowResolver,
    fetcher: SdmxFetcher,
    schemas: Arc<SchemaCache>,
    structure: StructureClient,
}

impl SdgClient {
    pub fn new(
        config: ClientConfig,
        store: Arc<MetadataStore>,
        schemas: Arc<SchemaCache>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            resolver: DataflowResolver::new(Arc::clone(&store)),
            fetcher: SdmxFetcher::new(config.clone(), Arc::clone(&transport)),
            structure: StructureClient::new(config, transport),
            store,
            schemas,
        }
    }

    /// Construct with the real HTTP transport and default metadata paths.
    pub fn with_http(config: ClientConfig) -> Result<Self, ClientError> {
        let paths = sdg_metadata::MetadataPaths::resolve();
        let schemas = Arc::new(SchemaCache::new(Some(paths.schemas_dir())));
        let store = Arc::new(MetadataStore::new(paths));
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config)?);
        Ok(Self::new(config, store, schemas, transport))
    }

    pub fn store(&self) -> &Arc<MetadataStore> {
        &self.store
    }

    /// Fetch and normalize observations for a request.
    pub fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, ClientError> {
        validate(request)?;

        let loaded = self.store.load();
        let primary = &request.indicators[0];
        let meta = loaded.get_indicator(primary).cloned();
        let resolution = self.resolver.resolve(primary, request.dataflow.as_deref());
        debug!(
            indicator = %primary,
            candidates = ?resolution.candidates,
            "resolved candidate dataflows"
        );

        let query = DataQuery {
            indicators: request.indicators.clone(),
            countries: request.countries.clone(),
            start_year: request.start_year,
            end_year: request.end_year,
            dimensions: request.dimensions.clone(),
        };

        let mut attempted = Vec::new();
        for candidate in &resolution.candidates {
            attempted.push(candidate.clone());

            let schema = match self.schemas.get(candidate, &self.structure) {
                Ok(schema) => Some(schema),
                Err(error) => {
                    warn!(
                        dataflow = %candidate,
                        %error,
                        "schema unavailable, querying unconstrained"
                    );
                    None
                }
            };
            let effective_totals = loaded
                .effective_totals
                .get(candidate)
                .cloned()
                .unwrap_or_default();

            let outcome = self.fetcher.fetch_one(
                candidate,
                &query,
                meta.as_ref(),
                schema.as_deref(),
                &effective_totals,
                &resolution.forced_dimensions,
            )?;

            match outcome {
                FetchOutcome::NotFound => {
                    debug!(dataflow = %candidate, "not found, trying next candidate");
                }
                FetchOutcome::Found(raw) => {
                    info!(
                        dataflow = %candidate,
                        rows = raw.row_count(),
                        "dataflow claimed the indicator"
                    );
                    let options = normalize_options(request, &resolution.forced_dimensions)
                        .with_effective_totals(effective_totals);
                    let rows = normalize(
                        &raw,
                        meta.as_ref(),
                        &loaded.aggregates,
                        &loaded.countries,
                        &options,
                    );
                    return Ok(FetchResult {
                        rows,
                        dataflow: candidate.clone(),
                        attempted,
                    });
                }
            }
        }

        Err(ClientError::IndicatorNotFound {
            indicator: request.indicators.join("+"),
            attempted,
        })
    }

    /// Fetch and reshape into a table in one call.
    pub fn fetch_table(
        &self,
        request: &FetchRequest,
        shape: OutputShape,
    ) -> Result<RawTable, ClientError> {
        let result = self.fetch(request)?;
        Ok(match shape {
            OutputShape::Long => to_raw_table(&result.rows),
            OutputShape::Wide => wide_by_year(&result.rows),
            OutputShape::WideByIndicator => wide_by_indicator(&result.rows),
        })
    }

    /// All catalog indicators, sorted by code.
    pub fn indicators(&self) -> Vec<IndicatorMetadata> {
        self.store.load().indicators.values().cloned().collect()
    }

    /// Catalog indicators matching a search term.
    pub fn search(&self, term: &str) -> Vec<IndicatorMetadata> {
        self.store
            .load()
            .search(term)
            .into_iter()
            .cloned()
            .collect()
    }
}

/// Forced dimension values from an override row beat caller filters.
fn normalize_options(
    request: &FetchRequest,
    forced_dimensions: &BTreeMap<String, String>,
) -> NormalizeOptions {
    let mut options = NormalizeOptions::new();
    options.overrides = request.dimensions.clone();
    for (dimension, code) in forced_dimensions {
        options
            .overrides
            .insert(dimension.clone(), DimensionFilter::Value(code.clone()));
    }
    options
}

/// Reject malformed input before any network call.
fn validate(request: &FetchRequest) -> Result<(), ClientError> {
    if request.indicators.is_empty() {
        return Err(ClientError::invalid("no indicator code given"));
    }
    for indicator in &request.indicators {
        if indicator.trim().is_empty() {
            return Err(ClientError::invalid("indicator code is blank"));
        }
    }
    for country in &request.countries {
        if country.trim().is_empty() {
            return Err(ClientError::invalid("country code is blank"));
        }
    }
    for (label, year) in [
        ("start year", request.start_year),
        ("end year", request.end_year),
    ] {
        if let Some(year) = year
            && !(1000..=9999).contains(&year)
        {
            return Err(ClientError::invalid(format!(
                "{label} must be a 4-digit year, got {year}"
            )));
        }
    }
    if let (Some(start), Some(end)) = (request.start_year, request.end_year)
        && start > end
    {
        return Err(ClientError::invalid(format!(
            "start year {start} is after end year {end}"
        )));
    }
    if let Some(dataflow) = &request.dataflow {
        DataflowRef::parse(dataflow, "", "")
            .map_err(|error| ClientError::invalid(error.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_rejects_malformed_input() {
        let empty = FetchRequest::default();
        assert!(matches!(
            validate(&empty),
            Err(ClientError::InvalidRequest { .. })
        ));

        let blank = FetchRequest::indicator("   ");
        assert!(validate(&blank).is_err());

        let mut bad_year = FetchRequest::indicator("CME_MRY0T4");
        bad_year.start_year = Some(99);
        assert!(validate(&bad_year).is_err());

        let mut inverted = FetchRequest::indicator("CME_MRY0T4");
        inverted.start_year = Some(2020);
        inverted.end_year = Some(2010);
        assert!(validate(&inverted).is_err());

        let mut bad_flow = FetchRequest::indicator("CME_MRY0T4");
        bad_flow.dataflow = Some("NOT A FLOW".to_string());
        assert!(validate(&bad_flow).is_err());

        let mut fine = FetchRequest::indicator("CME_MRY0T4");
        fine.dataflow = Some("CME".to_string());
        fine.start_year = Some(2010);
        fine.end_year = Some(2020);
        assert!(validate(&fine).is_ok());
    }
}
