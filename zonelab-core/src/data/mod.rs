//! Series preparation: validation and timeframe resampling.
//!
//! The core never touches files or the network; loaders hand it an ordered
//! bar series and it checks the series before simulating.

pub mod resample;
pub mod validate;

pub use resample::{resample, BucketLabel};
pub use validate::validate_series;
