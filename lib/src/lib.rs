//! Generalization (downsampling) of time series.
//!
//! Series are reduced with Douglas-Peucker simplification or Largest
//! Triangle Three Buckets sampling, selected from a flat option bag.
//! [`GeneralizingDataService`] applies the selected algorithm on top of
//! any [`DataService`] and falls back to the raw data when it fails.

mod douglas_peucker;
mod error;
mod generalizer;
mod lttb;
pub mod options;
mod sample;
mod service;

pub use douglas_peucker::*;
pub use error::*;
pub use generalizer::*;
pub use lttb::*;
pub use options::GeneralizationOptions;
pub use sample::*;
pub use service::*;
