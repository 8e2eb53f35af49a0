//! Output datasets for DP21 projections.
//!
//! Every dataset has the dimensions `samples`, `years` and `locations`, a
//! `sea_level_change` variable in mm stored as f32 with NaN fill, per-location
//! `lat`/`lon`, and provenance attributes. Datasets are persisted as
//! gzip-compressed JSON.

pub mod dataset;
mod float_repr;

pub use dataset::{DatasetAttributes, SeaLevelDataset, SeaLevelVariable};
