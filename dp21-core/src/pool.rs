use crate::error::{Dp21Error, Result};
use ndarray::{Array2, Array3, Axis};

/// Pre-computed ice-sheet trajectories available for bootstrap resampling.
///
/// Both component arrays are indexed `(year, member, branch)`. A pool built
/// for a single scenario has one branch; the temperature-driven pool stacks
/// the three benchmark scenarios in [`crate::Scenario`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsemblePool {
    /// Data years, strictly increasing
    pub years: Vec<i32>,
    /// East Antarctic contributions in mm
    pub eais: Array3<f64>,
    /// West Antarctic contributions in mm
    pub wais: Array3<f64>,
    /// Provenance scenario label, passed through to outputs
    pub scenario: String,
    /// Base year the trajectories are referenced to
    pub baseyear: i32,
}

impl EnsemblePool {
    /// Build a pool, checking that the EAIS and WAIS arrays agree with each
    /// other and with the year axis.
    pub fn new(
        years: Vec<i32>,
        eais: Array3<f64>,
        wais: Array3<f64>,
        scenario: impl Into<String>,
        baseyear: i32,
    ) -> Result<Self> {
        if eais.dim() != wais.dim() {
            return Err(Dp21Error::DimensionMismatch(format!(
                "EAIS pool shape {:?} differs from WAIS pool shape {:?}",
                eais.dim(),
                wais.dim()
            )));
        }
        if eais.len_of(Axis(0)) != years.len() {
            return Err(Dp21Error::DimensionMismatch(format!(
                "pool has {} year rows but the year axis has {} entries",
                eais.len_of(Axis(0)),
                years.len()
            )));
        }
        if years.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Dp21Error::Parse(
                "pool year axis must be strictly increasing".to_string(),
            ));
        }
        Ok(Self {
            years,
            eais,
            wais,
            scenario: scenario.into(),
            baseyear,
        })
    }

    /// Build a single-branch pool from `(year, member)` arrays.
    pub fn from_single(
        years: Vec<i32>,
        eais: Array2<f64>,
        wais: Array2<f64>,
        scenario: impl Into<String>,
        baseyear: i32,
    ) -> Result<Self> {
        Self::new(
            years,
            eais.insert_axis(Axis(2)),
            wais.insert_axis(Axis(2)),
            scenario,
            baseyear,
        )
    }

    /// Number of ensemble members shared by EAIS and WAIS.
    pub fn pool_size(&self) -> usize {
        self.eais.len_of(Axis(1))
    }

    /// Number of scenario branches stacked in this pool.
    pub fn branches(&self) -> usize {
        self.eais.len_of(Axis(2))
    }
}
