//! Bootstrap resampling of the ice-sheet ensemble pool.

use crate::selector::pick_scenarios;
use crate::temperature::TemperatureSource;
use dp21_core::error::{Dp21Error, Result};
use dp21_core::{EnsemblePool, ProjectionResult, Scenario};
use dp21_utils::years::{intersect_years, target_years, YearAlignment};
use log::{info, warn};
use ndarray::{Array2, Array3};
use rand::seq::index;
use rand::Rng;

/// Requested projection years and how strictly they must match the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionWindow {
    pub start: i32,
    pub end: i32,
    pub step: i32,
    /// Fail instead of dropping target years the pool does not carry
    pub strict: bool,
}

impl Default for ProjectionWindow {
    fn default() -> Self {
        Self {
            start: 2020,
            end: 2100,
            step: 10,
            strict: false,
        }
    }
}

/// Align the window against the pool year axis.
pub fn align_years(pool_years: &[i32], window: &ProjectionWindow) -> Result<YearAlignment> {
    let targets = target_years(window.start, window.end, window.step)?;
    let alignment = intersect_years(pool_years, &targets);
    if !alignment.dropped.is_empty() {
        if window.strict {
            return Err(Dp21Error::DroppedYears(alignment.dropped));
        }
        warn!(
            "Dropping projection years not present in the ensemble pool: {:?}",
            alignment.dropped
        );
    }
    if alignment.is_empty() {
        if window.strict {
            return Err(Dp21Error::EmptyYearIntersection);
        }
        warn!("No projection years overlap the ensemble pool; output has no years");
    }
    Ok(alignment)
}

/// Draw `nsamps` member indices from `[0, pool_size)`.
///
/// With replacement this consumes exactly `nsamps` range draws from `rng`.
pub fn draw_sample_indices<R: Rng + ?Sized>(
    rng: &mut R,
    pool_size: usize,
    nsamps: usize,
    replace: bool,
) -> Result<Vec<usize>> {
    if nsamps == 0 {
        return Ok(Vec::new());
    }
    if pool_size == 0 || (!replace && nsamps > pool_size) {
        return Err(Dp21Error::InvalidSampleSize {
            requested: nsamps,
            pool_size,
        });
    }
    if replace {
        Ok((0..nsamps).map(|_| rng.gen_range(0..pool_size)).collect())
    } else {
        Ok(index::sample(rng, pool_size, nsamps).into_vec())
    }
}

/// Pull `(sample, year)` values out of a `(year, member, branch)` array.
fn gather(
    component: &Array3<f64>,
    data_idx: &[usize],
    members: &[usize],
    branches: &[usize],
) -> Array2<f64> {
    Array2::from_shape_fn((members.len(), data_idx.len()), |(sample, year)| {
        component[[data_idx[year], members[sample], branches[sample]]]
    })
}

fn build_result(
    pool: &EnsemblePool,
    alignment: YearAlignment,
    members: &[usize],
    branches: &[usize],
) -> Result<ProjectionResult> {
    let eais = gather(&pool.eais, &alignment.data_idx, members, branches);
    let wais = gather(&pool.wais, &alignment.data_idx, members, branches);
    ProjectionResult::new(
        eais,
        wais,
        pool.scenario.clone(),
        pool.baseyear,
        alignment.retained,
    )
}

/// Resample a fixed-scenario pool.
///
/// Uses the first branch of the pool; a stacked pool should be projected
/// with [`project_icesheet_temperature_driven`] instead.
pub fn project_icesheet<R: Rng + ?Sized>(
    pool: &EnsemblePool,
    window: &ProjectionWindow,
    nsamps: usize,
    replace: bool,
    rng: &mut R,
) -> Result<ProjectionResult> {
    let alignment = align_years(&pool.years, window)?;
    let members = draw_sample_indices(rng, pool.pool_size(), nsamps, replace)?;
    let branches = vec![0; members.len()];
    info!(
        "Drew {} samples from a pool of {} for {} years",
        members.len(),
        pool.pool_size(),
        alignment.retained.len()
    );
    build_result(pool, alignment, &members, &branches)
}

/// Temperature-driven projection: one sample per temperature member, each
/// drawn from the scenario branch its integrated temperature selects.
///
/// Draw order on `rng`: one selector variate per temperature member, then
/// the member indices. The same member index is used whichever branch a
/// sample lands in.
pub fn project_icesheet_temperature_driven<R: Rng + ?Sized>(
    pool: &EnsemblePool,
    source: &dyn TemperatureSource,
    window: &ProjectionWindow,
    replace: bool,
    rng: &mut R,
) -> Result<(ProjectionResult, Vec<Scenario>)> {
    if pool.branches() != Scenario::ALL.len() {
        return Err(Dp21Error::DimensionMismatch(format!(
            "temperature-driven projection needs {} scenario branches, pool has {}",
            Scenario::ALL.len(),
            pool.branches()
        )));
    }
    let assignment = pick_scenarios(source, &pool.scenario, rng)?;
    let alignment = align_years(&pool.years, window)?;
    let members = draw_sample_indices(rng, pool.pool_size(), assignment.len(), replace)?;
    let branches: Vec<usize> = assignment.iter().map(Scenario::branch).collect();
    info!(
        "Drew {} temperature-driven samples from a pool of {}",
        members.len(),
        pool.pool_size()
    );
    let result = build_result(pool, alignment, &members, &branches)?;
    Ok((result, assignment))
}
