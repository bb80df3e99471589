//! Paged fetch with retry against one candidate dataflow.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use sdg_model::{DataflowSchema, IndicatorMetadata, RawTable};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::query::{DataQuery, build_data_url, series_key};
use crate::transport::{HttpResponse, Transport};

/// Outcome of trying one dataflow. "Not found" is an expected signal for
/// the candidate loop, not an error; an empty-but-valid table is `Found`.
#[derive(Debug)]
pub enum FetchOutcome {
    Found(RawTable),
    NotFound,
}

/// Fetches observation pages from one dataflow at a time.
pub struct SdmxFetcher {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl SdmxFetcher {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Try one candidate dataflow.
    ///
    /// Pages are requested with an advancing `startIndex` until a page
    /// comes back shorter than the page size, and concatenated in request
    /// order. A 404 maps to [`FetchOutcome::NotFound`]; transient
    /// failures are retried with exponential backoff and only surface as
    /// an error once the attempts are exhausted.
    pub fn fetch_one(
        &self,
        dataflow_id: &str,
        query: &DataQuery,
        meta: Option<&IndicatorMetadata>,
        schema: Option<&DataflowSchema>,
        effective_totals: &BTreeMap<String, String>,
        forced_dimensions: &BTreeMap<String, String>,
    ) -> Result<FetchOutcome, ClientError> {
        let key = series_key(query, schema, meta, effective_totals, forced_dimensions);

        let mut combined = RawTable::default();
        let mut start_index = 0usize;
        loop {
            let url = build_data_url(&self.config, dataflow_id, &key, query, start_index);
            let response = self.get_with_retry(&url)?;
            if response.is_not_found() {
                debug!(dataflow = dataflow_id, "dataflow reports key not present");
                return Ok(FetchOutcome::NotFound);
            }

            let page = parse_csv_page(&url, &response.body)?;
            let page_rows = page.row_count();
            combined.extend_from(page);
            debug!(
                dataflow = dataflow_id,
                start_index,
                page_rows,
                total_rows = combined.row_count(),
                "page fetched"
            );

            if page_rows < self.config.page_size {
                break;
            }
            start_index += self.config.page_size;
        }

        Ok(FetchOutcome::Found(combined))
    }

    /// GET with retry. 404 and 2xx return immediately; anything else
    /// (transport errors, other statuses) is retried with the delay
    /// doubling per attempt.
    fn get_with_retry(&self, url: &str) -> Result<HttpResponse, ClientError> {
        let attempts = self.config.max_retries.max(1);
        let mut delay = Duration::from_millis(self.config.retry_base_delay_ms);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.transport.get(url) {
                Ok(response) if response.is_success() || response.is_not_found() => {
                    return Ok(response);
                }
                Ok(response) => {
                    last_error = format!("HTTP {}", response.status);
                }
                Err(error) => {
                    last_error = error.to_string();
                }
            }
            if attempt < attempts {
                warn!(url, attempt, error = %last_error, "request failed, retrying");
                std::thread::sleep(delay);
                delay *= 2;
            }
        }

        Err(ClientError::FetchFailed {
            url: url.to_string(),
            attempts,
            message: last_error,
        })
    }
}

/// Parse one CSV page. An empty body is an empty table.
fn parse_csv_page(url: &str, body: &str) -> Result<RawTable, ClientError> {
    if body.trim().is_empty() {
        return Ok(RawTable::default());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| ClientError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })?
        .iter()
        .map(|h| h.trim_matches('\u{feff}').to_string())
        .collect();

    let mut table = RawTable::new(columns);
    for record in reader.records() {
        let record = record.map_err(|e| ClientError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        table.push_row(record.iter().map(str::to_string).collect());
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_page_parses_headers_and_rows() {
        let body = "REF_AREA,OBS_VALUE\nKEN,41.2\nAFG,60.1\n";
        let table = parse_csv_page("http://example", body).expect("parse page");
        assert_eq!(table.columns(), ["REF_AREA", "OBS_VALUE"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(1, "REF_AREA"), Some("AFG"));
    }

    #[test]
    fn empty_body_is_an_empty_table() {
        let table = parse_csv_page("http://example", "  \n").expect("parse empty");
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
    }
}
