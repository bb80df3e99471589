#![deny(unsafe_code)]

//! Read-mostly accessor over the cached metadata files.
//!
//! The store is an explicit cache object: construct one per process, share
//! it behind an `Arc`, and thread it into the resolver and normalizer.
//! State is populated on first access and dropped by [`MetadataStore::clear`];
//! the next access reloads from disk.
//!
//! Each metadata kind loads through three tiers: the on-disk file, the
//! bundled compiled-in copy, then a hardcoded minimal default. A tier
//! failure is logged as a warning, never a fatal error, so the client stays
//! usable (with reduced fallback intelligence) with no metadata present.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use sdg_model::{AggregateCodes, CountryNames, FallbackTable, IndicatorMetadata};

use crate::builtin;
use crate::files::{
    CountriesFile, FallbacksFile, IndicatorsFile, RegionsFile, Watermark, parse_bundled,
    read_yaml,
};
use crate::paths::MetadataPaths;

/// Default staleness threshold for the indicator catalog.
pub const DEFAULT_MAX_AGE_DAYS: i64 = 30;

/// Which tier a metadata kind was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataSource {
    Disk,
    Bundled,
    Builtin,
}

impl MetadataSource {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Disk => "disk",
            Self::Bundled => "bundled",
            Self::Builtin => "builtin",
        }
    }
}

/// Source tier per metadata kind, for diagnostics.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetadataSources {
    pub indicators: MetadataSource,
    pub fallbacks: MetadataSource,
    pub regions: MetadataSource,
    pub countries: MetadataSource,
}

/// One immutable load of the full metadata set.
#[derive(Debug, Clone)]
pub struct LoadedMetadata {
    pub sources: MetadataSources,
    pub watermark: Option<Watermark>,
    pub indicators: BTreeMap<String, IndicatorMetadata>,
    pub fallbacks: FallbackTable,
    pub effective_totals: BTreeMap<String, BTreeMap<String, String>>,
    pub aggregates: AggregateCodes,
    pub countries: CountryNames,
}

impl LoadedMetadata {
    pub fn get_indicator(&self, code: &str) -> Option<&IndicatorMetadata> {
        self.indicators.get(code)
    }

    pub fn fallback_sequence(&self, prefix: &str) -> Option<&[String]> {
        self.fallbacks.get(prefix)
    }

    /// Effective total code for `dimension` in `dataflow`, where a
    /// non-literal total applies.
    pub fn effective_total(&self, dataflow: &str, dimension: &str) -> Option<&str> {
        self.effective_totals
            .get(dataflow)?
            .get(dimension)
            .map(String::as_str)
    }

    /// Age of the catalog watermark at `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.watermark
            .as_ref()
            .map(|w| now.signed_duration_since(w.synced_at))
    }

    /// Indicators whose code or name contains `term`, case-insensitive.
    pub fn search(&self, term: &str) -> Vec<&IndicatorMetadata> {
        self.indicators
            .values()
            .filter(|meta| meta.matches_search(term))
            .collect()
    }
}

/// Lazily loaded, clearable metadata cache.
#[derive(Debug)]
pub struct MetadataStore {
    paths: MetadataPaths,
    max_age: Duration,
    state: Mutex<Option<Arc<LoadedMetadata>>>,
}

impl MetadataStore {
    pub fn new(paths: MetadataPaths) -> Self {
        Self {
            paths,
            max_age: Duration::days(DEFAULT_MAX_AGE_DAYS),
            state: Mutex::new(None),
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn paths(&self) -> &MetadataPaths {
        &self.paths
    }

    /// Get the loaded metadata, populating on first access.
    ///
    /// Never fails: the builtin tier is always available.
    pub fn load(&self) -> Arc<LoadedMetadata> {
        let mut state = self.state.lock().expect("metadata store lock poisoned");
        if let Some(loaded) = state.as_ref() {
            return Arc::clone(loaded);
        }
        let loaded = Arc::new(self.load_all());
        *state = Some(Arc::clone(&loaded));
        loaded
    }

    /// Drop all in-memory state; the next access reloads from disk.
    ///
    /// Readers holding an `Arc<LoadedMetadata>` keep their consistent
    /// snapshot; the swap itself happens under the lock.
    pub fn clear(&self) {
        let mut state = self.state.lock().expect("metadata store lock poisoned");
        *state = None;
    }

    pub fn get_indicator(&self, code: &str) -> Option<IndicatorMetadata> {
        self.load().get_indicator(code).cloned()
    }

    pub fn fallback_sequence(&self, prefix: &str) -> Option<Vec<String>> {
        self.load().fallback_sequence(prefix).map(<[String]>::to_vec)
    }

    /// Whether the catalog watermark is older than the configured
    /// threshold. An absent watermark counts as stale.
    pub fn is_stale(&self) -> bool {
        match self.load().age(Utc::now()) {
            Some(age) => age > self.max_age,
            None => true,
        }
    }

    fn load_all(&self) -> LoadedMetadata {
        let (indicators, watermark, indicators_source) = self.load_indicators();
        let (sequences, effective_totals, fallbacks_source) = self.load_fallbacks();
        let (regions, regions_source) = self.load_regions();
        let (countries, countries_source) = self.load_countries();

        let loaded = LoadedMetadata {
            sources: MetadataSources {
                indicators: indicators_source,
                fallbacks: fallbacks_source,
                regions: regions_source,
                countries: countries_source,
            },
            watermark,
            indicators,
            fallbacks: FallbackTable::new(sequences),
            effective_totals,
            aggregates: AggregateCodes::new(regions),
            countries: CountryNames::new(countries),
        };

        if let Some(age) = loaded.age(Utc::now())
            && age > self.max_age
        {
            warn!(
                age_days = age.num_days(),
                max_age_days = self.max_age.num_days(),
                "indicator catalog is stale; run a metadata sync"
            );
        }

        debug!(
            indicators = loaded.indicators.len(),
            fallback_prefixes = loaded.fallbacks.len(),
            aggregates = loaded.aggregates.len(),
            source = loaded.sources.indicators.label(),
            "metadata loaded"
        );
        loaded
    }

    fn load_indicators(
        &self,
    ) -> (
        BTreeMap<String, IndicatorMetadata>,
        Option<Watermark>,
        MetadataSource,
    ) {
        let path = self.paths.indicators_file();
        match read_yaml::<IndicatorsFile>(&path) {
            Ok(file) => return (file.indicators, file.metadata, MetadataSource::Disk),
            Err(error) => {
                warn!(path = %path.display(), %error, "indicator catalog unavailable on disk");
            }
        }
        match parse_bundled::<IndicatorsFile>("indicators", builtin::BUNDLED_INDICATORS) {
            Ok(file) => (file.indicators, file.metadata, MetadataSource::Bundled),
            Err(error) => {
                warn!(%error, "bundled indicator catalog unreadable");
                (BTreeMap::new(), None, MetadataSource::Builtin)
            }
        }
    }

    fn load_fallbacks(
        &self,
    ) -> (
        BTreeMap<String, Vec<String>>,
        BTreeMap<String, BTreeMap<String, String>>,
        MetadataSource,
    ) {
        let path = self.paths.fallbacks_file();
        match read_yaml::<FallbacksFile>(&path) {
            Ok(file) => {
                let totals = merge_effective_totals(file.effective_totals);
                return (file.fallback_sequences, totals, MetadataSource::Disk);
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "fallback sequences unavailable on disk");
            }
        }
        match parse_bundled::<FallbacksFile>("fallback sequences", builtin::BUNDLED_FALLBACKS) {
            Ok(file) => {
                let totals = merge_effective_totals(file.effective_totals);
                (file.fallback_sequences, totals, MetadataSource::Bundled)
            }
            Err(error) => {
                warn!(%error, "bundled fallback sequences unreadable");
                (
                    builtin::builtin_fallback_sequences(),
                    builtin::builtin_effective_totals(),
                    MetadataSource::Builtin,
                )
            }
        }
    }

    fn load_regions(&self) -> (BTreeMap<String, String>, MetadataSource) {
        let path = self.paths.regions_file();
        match read_yaml::<RegionsFile>(&path) {
            Ok(file) => return (file.regions, MetadataSource::Disk),
            Err(error) => {
                warn!(path = %path.display(), %error, "region codes unavailable on disk");
            }
        }
        match parse_bundled::<RegionsFile>("regions", builtin::BUNDLED_REGIONS) {
            Ok(file) => (file.regions, MetadataSource::Bundled),
            Err(error) => {
                warn!(%error, "bundled region codes unreadable");
                (builtin::builtin_regions(), MetadataSource::Builtin)
            }
        }
    }

    fn load_countries(&self) -> (BTreeMap<String, String>, MetadataSource) {
        let path = self.paths.countries_file();
        match read_yaml::<CountriesFile>(&path) {
            Ok(file) => return (file.countries, MetadataSource::Disk),
            Err(error) => {
                warn!(path = %path.display(), %error, "country names unavailable on disk");
            }
        }
        match parse_bundled::<CountriesFile>("countries", builtin::BUNDLED_COUNTRIES) {
            Ok(file) => (file.countries, MetadataSource::Bundled),
            Err(error) => {
                warn!(%error, "bundled country names unreadable");
                (BTreeMap::new(), MetadataSource::Builtin)
            }
        }
    }
}

/// File-provided overrides win; builtin rows fill the gaps.
fn merge_effective_totals(
    from_file: BTreeMap<String, BTreeMap<String, String>>,
) -> BTreeMap<String, BTreeMap<String, String>> {
    let mut merged = builtin::builtin_effective_totals();
    for (dataflow, dims) in from_file {
        merged.entry(dataflow).or_default().extend(dims);
    }
    merged
}
