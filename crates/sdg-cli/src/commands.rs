//! Subcommand implementations.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use sdg_client::{
    ClientConfig, FetchRequest, HttpTransport, SdgClient, StructureClient, Transport,
};
use sdg_metadata::{MetadataDoctor, MetadataPaths, MetadataStore};
use sdg_model::RawTable;
use sdg_normalization::{DimensionFilter, to_raw_table, wide_by_indicator, wide_by_year};
use sdg_sync::SyncEngine;

use crate::cli::{Cli, DoctorArgs, FetchArgs, SearchArgs, ShapeArg};

/// Rows shown in the terminal before truncating (CSV output is never
/// truncated).
const MAX_TABLE_ROWS: usize = 50;

pub fn load_config(cli: &Cli) -> Result<ClientConfig> {
    match &cli.config {
        Some(path) => ClientConfig::from_toml_file(path)
            .with_context(|| format!("load configuration from {}", path.display())),
        None => Ok(ClientConfig::default()),
    }
}

pub fn metadata_paths(cli: &Cli) -> MetadataPaths {
    match &cli.metadata_dir {
        Some(dir) => MetadataPaths::new(dir),
        None => MetadataPaths::resolve(),
    }
}

fn client(cli: &Cli) -> Result<SdgClient> {
    let config = load_config(cli)?;
    let paths = metadata_paths(cli);
    let schemas = std::sync::Arc::new(sdg_metadata::SchemaCache::new(Some(paths.schemas_dir())));
    let store = std::sync::Arc::new(MetadataStore::new(paths));
    let transport: std::sync::Arc<dyn Transport> =
        std::sync::Arc::new(HttpTransport::new(&config)?);
    Ok(SdgClient::new(config, store, schemas, transport))
}

pub fn run_fetch(cli: &Cli, args: &FetchArgs) -> Result<()> {
    let client = client(cli)?;
    let request = FetchRequest {
        indicators: args.indicators.clone(),
        dataflow: args.dataflow.clone(),
        countries: args.countries.clone(),
        start_year: args.start_year,
        end_year: args.end_year,
        dimensions: parse_dimension_filters(&args.dimensions)?,
    };

    let result = client.fetch(&request)?;
    info!(
        dataflow = %result.dataflow,
        rows = result.rows.len(),
        attempted = ?result.attempted,
        "fetch complete"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result.rows)?);
        return Ok(());
    }

    let table = match args.shape {
        ShapeArg::Long => to_raw_table(&result.rows),
        ShapeArg::Wide => wide_by_year(&result.rows),
        ShapeArg::WideByIndicator => wide_by_indicator(&result.rows),
    };

    match &args.output {
        Some(path) => {
            write_csv(&table, path)?;
            println!(
                "{} rows from {} written to {}",
                table.row_count(),
                result.dataflow,
                path.display()
            );
        }
        None => {
            print_raw_table(&table);
            if result.rows.is_empty() {
                println!(
                    "no rows matched in {} (dataflows tried: {})",
                    result.dataflow,
                    result.attempted.join(", ")
                );
            }
        }
    }
    Ok(())
}

pub fn run_indicators(cli: &Cli) -> Result<()> {
    let client = client(cli)?;
    print_indicator_table(&client.indicators());
    Ok(())
}

pub fn run_search(cli: &Cli, args: &SearchArgs) -> Result<()> {
    let client = client(cli)?;
    let matches = client.search(&args.term);
    if matches.is_empty() {
        println!("no indicators match `{}`", args.term);
        return Ok(());
    }
    print_indicator_table(&matches);
    Ok(())
}

pub fn run_sync(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let paths = metadata_paths(cli);
    let transport: std::sync::Arc<dyn Transport> =
        std::sync::Arc::new(HttpTransport::new(&config)?);
    let structure = StructureClient::new(config.clone(), transport);
    let engine = SyncEngine::new(config, structure, paths);

    let bar = ProgressBar::no_length();
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{pos}/{len}] {msg}")
            .expect("progress template"),
    );
    let report = engine.sync_all(Utc::now(), |done, total, dataflow| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
        bar.set_message(dataflow.to_string());
    })?;
    bar.finish_and_clear();

    println!(
        "vintage {}: {} dataflows, {} schemas refreshed, {} indicators",
        report.vintage_date, report.dataflows, report.schemas_written, report.indicators
    );
    if !report.errors.is_empty() {
        println!("{} dataflow(s) failed:", report.errors.len());
        for error in &report.errors {
            println!("  {error}");
        }
    }
    Ok(())
}

pub fn run_doctor(cli: &Cli, args: &DoctorArgs) -> Result<()> {
    let store = MetadataStore::new(metadata_paths(cli));
    let report = MetadataDoctor::inspect(&store, Utc::now());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("metadata root: {}", report.root);
    println!(
        "sources: indicators={} fallbacks={} regions={} countries={}",
        report.sources.indicators.label(),
        report.sources.fallbacks.label(),
        report.sources.regions.label(),
        report.sources.countries.label()
    );
    match report.age_days {
        Some(age) => println!(
            "catalog age: {age} day(s){}",
            if report.stale { " (STALE)" } else { "" }
        ),
        None => println!("catalog age: unknown (no watermark)"),
    }
    for (what, count) in &report.counts {
        println!("{what}: {count}");
    }
    println!("vintages: {}", report.vintages.len());
    println!("sync history entries: {}", report.sync_history_len);
    Ok(())
}

/// Parse repeated `DIMENSION=CODE` arguments; `ALL` drops the default.
fn parse_dimension_filters(
    raw: &[String],
) -> Result<BTreeMap<String, DimensionFilter>> {
    let mut filters = BTreeMap::new();
    for entry in raw {
        let Some((dimension, code)) = entry.split_once('=') else {
            bail!("invalid --dim `{entry}`: expected DIMENSION=CODE");
        };
        let dimension = dimension.trim();
        let code = code.trim();
        if dimension.is_empty() || code.is_empty() {
            bail!("invalid --dim `{entry}`: expected DIMENSION=CODE");
        }
        let filter = if code.eq_ignore_ascii_case("ALL") {
            DimensionFilter::All
        } else {
            DimensionFilter::Value(code.to_string())
        };
        filters.insert(dimension.to_string(), filter);
    }
    Ok(filters)
}

fn print_indicator_table(indicators: &[sdg_model::IndicatorMetadata]) {
    let mut table = Table::new();
    table.set_header(vec!["Code", "Name", "Dataflows", "Tier"]);
    apply_table_style(&mut table);
    for meta in indicators {
        table.add_row(vec![
            meta.code.clone(),
            meta.name.clone(),
            meta.dataflows.join(", "),
            meta.tier.map(|t| t.to_string()).unwrap_or_default(),
        ]);
    }
    println!("{table}");
}

fn print_raw_table(raw: &RawTable) {
    let mut table = Table::new();
    table.set_header(raw.columns().to_vec());
    apply_table_style(&mut table);
    for (index, row) in raw.rows().enumerate() {
        if index == MAX_TABLE_ROWS {
            break;
        }
        table.add_row(row.to_vec());
    }
    println!("{table}");
    if raw.row_count() > MAX_TABLE_ROWS {
        println!(
            "... {} more rows (use --output to export all of them)",
            raw.row_count() - MAX_TABLE_ROWS
        );
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn write_csv(raw: &RawTable, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("create {}", path.display()))?;
    writer.write_record(raw.columns())?;
    for row in raw.rows() {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
