#![deny(unsafe_code)]

pub mod builtin;
pub mod doctor;
pub mod error;
pub mod files;
pub mod hash;
pub mod paths;
pub mod schema_cache;
pub mod store;
pub mod vintage;

pub use crate::doctor::MetadataDoctor;
pub use crate::error::MetadataError;
pub use crate::files::{SyncRecord, Watermark};
pub use crate::paths::MetadataPaths;
pub use crate::schema_cache::{SchemaCache, StructureProvider};
pub use crate::store::{LoadedMetadata, MetadataSource, MetadataStore};
pub use crate::vintage::{SYNC_HISTORY_CAP, VintageSummary};
