pub mod dataflow;
pub mod fallback;
pub mod indicator;
pub mod lookup;
pub mod observation;
pub mod table;

pub use crate::dataflow::{DataflowRef, DataflowSchema, DimensionMeta, ParseDataflowError};
pub use crate::fallback::{FallbackTable, code_prefix};
pub use crate::indicator::IndicatorMetadata;
pub use crate::lookup::{AggregateCodes, CountryNames};
pub use crate::observation::{GeoType, ObservationRow};
pub use crate::table::RawTable;

/// Sentinel code meaning "aggregated across all categories of a dimension".
pub const TOTAL_CODE: &str = "_T";

/// The generic catch-all dataflow tried when nothing more specific matches.
pub const GLOBAL_DATAFLOW: &str = "GLOBAL_DATAFLOW";
