#![deny(unsafe_code)]

//! Process-lifetime cache of dataflow dimension schemas.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use sdg_model::DataflowSchema;

use crate::error::MetadataError;
use crate::files::read_yaml;

/// Source of dataflow structure definitions, implemented by the SDMX
/// structure-endpoint client (and by mocks in tests).
pub trait StructureProvider {
    fn dataflow_schema(&self, dataflow_id: &str) -> Result<DataflowSchema, MetadataError>;
}

/// Lazily populated, clearable schema cache.
///
/// Lookup order on a miss: the on-disk `schemas/` directory when one is
/// configured, then the structure provider. Entries are immutable once
/// cached.
#[derive(Debug, Default)]
pub struct SchemaCache {
    schemas_dir: Option<PathBuf>,
    state: Mutex<HashMap<String, Arc<DataflowSchema>>>,
}

impl SchemaCache {
    pub fn new(schemas_dir: Option<PathBuf>) -> Self {
        Self {
            schemas_dir,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Get the schema for `dataflow_id`, fetching and caching on a miss.
    pub fn get(
        &self,
        dataflow_id: &str,
        provider: &dyn StructureProvider,
    ) -> Result<Arc<DataflowSchema>, MetadataError> {
        if let Some(schema) = self.get_cached(dataflow_id) {
            return Ok(schema);
        }

        if let Some(dir) = &self.schemas_dir {
            let path = dir.join(format!("{dataflow_id}.yaml"));
            if path.is_file() {
                match read_yaml::<DataflowSchema>(&path) {
                    Ok(schema) => return Ok(self.insert(schema)),
                    Err(error) => {
                        warn!(path = %path.display(), %error, "cached schema unreadable, refetching");
                    }
                }
            }
        }

        debug!(dataflow = dataflow_id, "fetching dataflow structure");
        let schema = provider.dataflow_schema(dataflow_id)?;
        Ok(self.insert(schema))
    }

    pub fn get_cached(&self, dataflow_id: &str) -> Option<Arc<DataflowSchema>> {
        let state = self.state.lock().expect("schema cache lock poisoned");
        state.get(dataflow_id).map(Arc::clone)
    }

    /// Cache a schema directly (used by the sync engine after a refresh).
    pub fn insert(&self, schema: DataflowSchema) -> Arc<DataflowSchema> {
        let schema = Arc::new(schema);
        let mut state = self.state.lock().expect("schema cache lock poisoned");
        state.insert(schema.id.clone(), Arc::clone(&schema));
        schema
    }

    /// Drop all cached schemas; subsequent lookups repopulate.
    pub fn clear(&self) {
        let mut state = self.state.lock().expect("schema cache lock poisoned");
        state.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("schema cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    impl StructureProvider for CountingProvider {
        fn dataflow_schema(&self, dataflow_id: &str) -> Result<DataflowSchema, MetadataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(DataflowSchema {
                id: dataflow_id.to_string(),
                name: String::new(),
                version: "1.0".to_string(),
                dimensions: Vec::new(),
                time_dimension: "TIME_PERIOD".to_string(),
                primary_measure: "OBS_VALUE".to_string(),
                attributes: Vec::new(),
            })
        }
    }

    #[test]
    fn second_lookup_hits_the_cache() {
        let cache = SchemaCache::new(None);
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
        };
        cache.get("CME", &provider).expect("first fetch");
        cache.get("CME", &provider).expect("cached fetch");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_forces_a_refetch() {
        let cache = SchemaCache::new(None);
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
        };
        cache.get("CME", &provider).expect("first fetch");
        cache.clear();
        assert!(cache.is_empty());
        cache.get("CME", &provider).expect("refetch");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }
}
