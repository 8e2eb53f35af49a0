//! Core types for DP21 Antarctic ice-sheet sea-level projections.
//!
//! Shared by the projection, localization and dataset crates: the error
//! enum, the scenario and ice-sheet component labels, the ensemble pool,
//! the projection result and the site set.

pub mod component;
pub mod error;
pub mod pool;
pub mod projection;
pub mod scenario;
pub mod site;

pub use component::IceSheet;
pub use error::{Dp21Error, Result};
pub use pool::EnsemblePool;
pub use projection::ProjectionResult;
pub use scenario::Scenario;
pub use site::SiteSet;
