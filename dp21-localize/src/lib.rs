//! Localization stage of the DP21 Antarctic ice-sheet workflow.
//!
//! Scales global EAIS/WAIS samples by per-site fingerprints to produce
//! `(sample, year, location)` fields.

pub mod fingerprint;
pub mod localize;

pub use fingerprint::{FingerprintCache, FingerprintGrid, FingerprintLookup, GridFileLookup};
pub use localize::{
    localize_with_fingerprints, scale_by_fingerprint, LocalRows, LocalizeOptions,
    LocalizedProjection, SiteFingerprints,
};
