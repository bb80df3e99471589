pub mod normalize;
pub mod period;
pub mod wide;

pub use crate::normalize::{
    DimensionFilter, NormalizeOptions, format_period, normalize, to_raw_table,
};
pub use crate::period::parse_period;
pub use crate::wide::{wide_by_indicator, wide_by_year};
