pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod query;
pub mod resolver;
pub mod structure;
pub mod transport;

pub use crate::client::{FetchRequest, FetchResult, OutputShape, SdgClient};
pub use crate::config::ClientConfig;
pub use crate::error::ClientError;
pub use crate::fetcher::{FetchOutcome, SdmxFetcher};
pub use crate::query::DataQuery;
pub use crate::resolver::{DataflowResolver, IndicatorOverride, Resolution};
pub use crate::structure::{DataflowStub, StructureClient};
pub use crate::transport::{HttpResponse, HttpTransport, Transport, TransportError};
