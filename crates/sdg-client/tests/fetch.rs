use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use sdg_client::{
    ClientConfig, ClientError, FetchRequest, HttpResponse, SdgClient, Transport, TransportError,
};
use sdg_metadata::{MetadataPaths, MetadataStore, SchemaCache};

/// Scriptable transport: a handler per URL, with every call recorded.
struct MockTransport {
    handler: Box<dyn Fn(&str) -> Result<HttpResponse, TransportError> + Send + Sync>,
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    fn new(
        handler: impl Fn(&str) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// URLs of data requests only, in call order.
    fn data_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|url| url.contains("/data/"))
            .cloned()
            .collect()
    }
}

impl Transport for MockTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.calls.lock().unwrap().push(url.to_string());
        (self.handler)(url)
    }
}

fn ok(body: &str) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse {
        status: 200,
        body: body.to_string(),
    })
}

fn status(code: u16) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse {
        status: code,
        body: String::new(),
    })
}

fn write(path: &std::path::Path, contents: &str) {
    std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    std::fs::write(path, contents).expect("write fixture");
}

fn seed_store(root: &std::path::Path) -> Arc<MetadataStore> {
    let paths = MetadataPaths::new(root);
    write(
        &paths.indicators_file(),
        r#"
indicators:
  CME_MRY0T4:
    code: CME_MRY0T4
    name: Under-five mortality rate
    dataflows: [CME, GLOBAL_DATAFLOW]
"#,
    );
    write(
        &paths.fallbacks_file(),
        "fallback_sequences:\n  CME: [CME, GLOBAL_DATAFLOW]\n  DEFAULT: [GLOBAL_DATAFLOW]\n",
    );
    write(&paths.regions_file(), "regions:\n  SSA: Sub-Saharan Africa\n");
    write(&paths.countries_file(), "countries:\n  KEN: Kenya\n");
    Arc::new(MetadataStore::new(paths))
}

fn client_with(
    root: &std::path::Path,
    config: ClientConfig,
    transport: Arc<MockTransport>,
) -> SdgClient {
    let store = seed_store(root);
    let schemas = Arc::new(SchemaCache::new(None));
    SdgClient::new(config, store, schemas, transport)
}

const HEADERS: &str = "REF_AREA,INDICATOR,TIME_PERIOD,OBS_VALUE";

fn dataflow_of(url: &str) -> &str {
    // .../data/UNICEF,{FLOW},1.0/...
    url.split("/data/UNICEF,")
        .nth(1)
        .and_then(|tail| tail.split(',').next())
        .unwrap_or("")
}

fn start_index_of(url: &str) -> usize {
    url.split("startIndex=")
        .nth(1)
        .and_then(|tail| tail.split('&').next())
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(0)
}

#[test]
fn first_found_short_circuits_even_with_zero_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = MockTransport::new(move |url| {
        if !url.contains("/data/") {
            return status(404); // structure endpoint: no schema available
        }
        assert_eq!(dataflow_of(url), "CME", "later candidates must not be tried");
        ok(&format!("{HEADERS}\n"))
    });
    let client = client_with(
        dir.path(),
        ClientConfig::default().with_retry_base_delay_ms(1),
        Arc::clone(&transport),
    );

    let result = client
        .fetch(&FetchRequest::indicator("CME_MRY0T4"))
        .expect("zero-rows fetch still succeeds");

    // Found-with-zero-rows stops the search: the dataflow claims the
    // indicator even when no row matches the filters.
    assert!(result.rows.is_empty());
    assert_eq!(result.dataflow, "CME");
    assert_eq!(result.attempted, ["CME"]);
    assert_eq!(transport.data_calls().len(), 1);
}

#[test]
fn all_candidates_not_found_is_an_explicit_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = MockTransport::new(|url| {
        if !url.contains("/data/") {
            return status(404);
        }
        status(404)
    });
    let client = client_with(
        dir.path(),
        ClientConfig::default().with_retry_base_delay_ms(1),
        Arc::clone(&transport),
    );

    let error = client
        .fetch(&FetchRequest::indicator("CME_MRY0T4"))
        .expect_err("all candidates 404");
    match error {
        ClientError::IndicatorNotFound {
            indicator,
            attempted,
        } => {
            assert_eq!(indicator, "CME_MRY0T4");
            assert_eq!(attempted, ["CME", "GLOBAL_DATAFLOW"]);
        }
        other => panic!("expected IndicatorNotFound, got {other}"),
    }
    assert_eq!(transport.data_calls().len(), 2);
}

#[test]
fn transient_failures_are_retried_with_backoff() {
    let dir = tempfile::tempdir().expect("tempdir");
    let failures = Arc::new(AtomicUsize::new(0));
    let failures_in_handler = Arc::clone(&failures);
    let transport = MockTransport::new(move |url| {
        if !url.contains("/data/") {
            return status(404);
        }
        if failures_in_handler.fetch_add(1, Ordering::SeqCst) < 2 {
            return status(503);
        }
        ok(&format!("{HEADERS}\nKEN,CME_MRY0T4,2020,41.2\n"))
    });
    let client = client_with(
        dir.path(),
        ClientConfig::default().with_retry_base_delay_ms(1),
        Arc::clone(&transport),
    );

    let result = client
        .fetch(&FetchRequest::indicator("CME_MRY0T4"))
        .expect("third attempt succeeds");
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].iso3, "KEN");
    assert_eq!(result.rows[0].country_name, "Kenya");
    assert_eq!(transport.data_calls().len(), 3);
}

#[test]
fn exhausted_retries_become_a_fatal_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = MockTransport::new(|url| {
        if !url.contains("/data/") {
            return status(404);
        }
        Err(TransportError {
            message: "connection reset".to_string(),
        })
    });
    let client = client_with(
        dir.path(),
        ClientConfig::default().with_retry_base_delay_ms(1),
        Arc::clone(&transport),
    );

    let error = client
        .fetch(&FetchRequest::indicator("CME_MRY0T4"))
        .expect_err("no attempt succeeds");
    match error {
        ClientError::FetchFailed {
            attempts, message, ..
        } => {
            assert_eq!(attempts, 3);
            assert!(message.contains("connection reset"));
        }
        other => panic!("expected FetchFailed, got {other}"),
    }
    // Fatal errors do not advance the candidate loop.
    assert_eq!(transport.data_calls().len(), 3);
}

#[test]
fn pages_are_concatenated_in_request_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let page_size = 100_000usize;
    let partial = 4321usize;
    let transport = MockTransport::new(move |url| {
        if !url.contains("/data/") {
            return status(404);
        }
        let start = start_index_of(url);
        let rows = if start < 3 * page_size { page_size } else { partial };
        let mut body = String::with_capacity(rows * 28 + HEADERS.len() + 1);
        body.push_str(HEADERS);
        body.push('\n');
        for i in 0..rows {
            body.push_str(&format!("KEN,CME_MRY0T4,2020,{}\n", start + i));
        }
        ok(&body)
    });
    let client = client_with(
        dir.path(),
        ClientConfig::default().with_retry_base_delay_ms(1),
        Arc::clone(&transport),
    );

    let result = client
        .fetch(&FetchRequest::indicator("CME_MRY0T4"))
        .expect("paged fetch succeeds");
    assert_eq!(result.rows.len(), 3 * page_size + partial);

    let starts: Vec<usize> = transport.data_calls().iter().map(|u| start_index_of(u)).collect();
    assert_eq!(starts, [0, page_size, 2 * page_size, 3 * page_size]);

    // Concatenation preserved request order: values count up monotonically.
    assert_eq!(result.rows[0].value, Some(0.0));
    assert_eq!(
        result.rows[3 * page_size + partial - 1].value,
        Some((3 * page_size + partial - 1) as f64)
    );
}

#[test]
fn wrong_explicit_dataflow_falls_back_to_the_prefix_sequence() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = MockTransport::new(|url| {
        if !url.contains("/data/") {
            return status(404);
        }
        match dataflow_of(url) {
            "NUTRITION" => status(404),
            "CME" => ok(&format!("{HEADERS}\nKEN,CME_MRY0T4,2020,41.2\n")),
            other => panic!("unexpected dataflow {other}"),
        }
    });
    let client = client_with(
        dir.path(),
        ClientConfig::default().with_retry_base_delay_ms(1),
        Arc::clone(&transport),
    );

    let mut request = FetchRequest::indicator("CME_MRY0T4");
    request.dataflow = Some("NUTRITION".to_string());
    let result = client.fetch(&request).expect("fallback succeeds");
    assert_eq!(result.dataflow, "CME");
    assert_eq!(result.attempted, ["NUTRITION", "CME"]);
}

#[test]
fn fetch_table_reshapes_years_into_columns() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = MockTransport::new(|url| {
        if !url.contains("/data/") {
            return status(404);
        }
        ok(&format!(
            "{HEADERS}\nKEN,CME_MRY0T4,2019,44.0\nKEN,CME_MRY0T4,2020,41.2\n"
        ))
    });
    let client = client_with(
        dir.path(),
        ClientConfig::default().with_retry_base_delay_ms(1),
        Arc::clone(&transport),
    );

    let table = client
        .fetch_table(
            &FetchRequest::indicator("CME_MRY0T4"),
            sdg_client::OutputShape::Wide,
        )
        .expect("fetch table");
    assert_eq!(
        table.columns(),
        ["indicator", "iso3", "country_name", "2019", "2020"]
    );
    assert_eq!(table.row_count(), 1);
    assert_eq!(table.cell(0, "2019"), Some("44"));
    assert_eq!(table.cell(0, "2020"), Some("41.2"));
}

#[test]
fn aggregates_are_classified_from_the_region_set() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = MockTransport::new(|url| {
        if !url.contains("/data/") {
            return status(404);
        }
        ok(&format!(
            "{HEADERS}\nKEN,CME_MRY0T4,2020,41.2\nSSA,CME_MRY0T4,2020,74.6\n"
        ))
    });
    let client = client_with(
        dir.path(),
        ClientConfig::default().with_retry_base_delay_ms(1),
        Arc::clone(&transport),
    );

    let result = client
        .fetch(&FetchRequest::indicator("CME_MRY0T4"))
        .expect("fetch succeeds");
    let geo: Vec<&str> = result.rows.iter().map(|r| r.geo_type.label()).collect();
    assert_eq!(geo, ["country", "aggregate"]);
}
