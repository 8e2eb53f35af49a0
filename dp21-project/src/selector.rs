//! Probabilistic assignment of samples to the three benchmark scenario pools
//! based on integrated 21st-century temperature.

use crate::temperature::{integrated_temperature, TemperatureSource, TemperatureWindows};
use dp21_core::error::Result;
use dp21_core::Scenario;
use log::info;
use rand::Rng;

/// Integrated 2000-2099 temperature (degree-years) of the CCSM runs behind
/// the RCP2.6, RCP4.5 and RCP8.5 pools.
pub const ISAT_MARKERS: [f64; 3] = [133.0, 167.0, 245.0];

fn ramp(value: f64, low: f64, high: f64) -> f64 {
    ((value - low) / (high - low)).clamp(0.0, 1.0)
}

/// Probability of promotion out of the low pool.
pub fn first_stage_probability(covariate: f64) -> f64 {
    ramp(covariate, ISAT_MARKERS[0], ISAT_MARKERS[1])
}

/// Probability of promotion from the middle to the high pool.
pub fn second_stage_probability(covariate: f64) -> f64 {
    ramp(covariate, ISAT_MARKERS[1], ISAT_MARKERS[2])
}

/// Two-stage promotion for one sample.
///
/// Stage one promotes to the middle pool when `selector < f1`. Samples whose
/// covariate exceeds the middle marker are always at least in the middle pool
/// and are promoted to the high pool when the same `selector < f2`.
pub fn assign_scenario(covariate: f64, selector: f64) -> Scenario {
    let mut label = if selector < first_stage_probability(covariate) {
        Scenario::Rcp45
    } else {
        Scenario::Rcp26
    };
    if covariate > ISAT_MARKERS[1] {
        label = if selector < second_stage_probability(covariate) {
            Scenario::Rcp85
        } else {
            Scenario::Rcp45
        };
    }
    label
}

/// Draw one selector variate per covariate, in order, and assign pools.
pub fn assign_scenarios<R: Rng + ?Sized>(covariates: &[f64], rng: &mut R) -> Vec<Scenario> {
    let selectors: Vec<f64> = covariates.iter().map(|_| rng.gen::<f64>()).collect();
    covariates
        .iter()
        .zip(&selectors)
        .map(|(&covariate, &selector)| assign_scenario(covariate, selector))
        .collect()
}

/// Read a scenario's temperature ensemble and assign every member to a pool.
///
/// Consumes exactly one uniform draw per temperature member from `rng`.
pub fn pick_scenarios<R: Rng + ?Sized>(
    source: &dyn TemperatureSource,
    scenario: &str,
    rng: &mut R,
) -> Result<Vec<Scenario>> {
    let ensemble = source.surface_temperature(scenario)?;
    let covariates = integrated_temperature(&ensemble, &TemperatureWindows::default())?;
    let assignment = assign_scenarios(&covariates, rng);
    let counts = scenario_counts(&assignment);
    info!(
        "Assigned {} temperature members from {}: rcp26={} rcp45={} rcp85={}",
        assignment.len(),
        scenario,
        counts[0],
        counts[1],
        counts[2]
    );
    Ok(assignment)
}

/// Number of samples assigned to each pool, in branch order.
pub fn scenario_counts(assignment: &[Scenario]) -> [usize; 3] {
    let mut counts = [0usize; 3];
    for scenario in assignment {
        counts[scenario.branch()] += 1;
    }
    counts
}
