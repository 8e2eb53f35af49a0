//! Integrated-temperature diagnostic for a temperature ensemble.

use crate::config::CovariateConfig;
use anyhow::Context;
use dp21_core::Scenario;
use dp21_project::seeded_rng;
use dp21_project::selector::{
    assign_scenarios, first_stage_probability, scenario_counts, second_stage_probability,
};
use dp21_project::temperature::{
    integrated_temperature, TemperatureFile, TemperatureSource, TemperatureWindows,
};
use log::info;
use serde::Serialize;
use std::io::Write;

/// One row of the diagnostic table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CovariateRow {
    pub member: usize,
    pub integrated_temperature: f64,
    pub p_stage_one: f64,
    pub p_stage_two: f64,
    pub scenario: Scenario,
}

/// Covariates and the assignment a projection seeded with `seed` would use.
pub fn covariate_rows(
    source: &dyn TemperatureSource,
    scenario: &str,
    seed: u64,
) -> anyhow::Result<Vec<CovariateRow>> {
    let ensemble = source.surface_temperature(scenario)?;
    let covariates = integrated_temperature(&ensemble, &TemperatureWindows::default())?;
    let mut rng = seeded_rng(seed);
    let assignment = assign_scenarios(&covariates, &mut rng);
    Ok(covariates
        .iter()
        .zip(assignment)
        .enumerate()
        .map(|(member, (&covariate, scenario))| CovariateRow {
            member,
            integrated_temperature: covariate,
            p_stage_one: first_stage_probability(covariate),
            p_stage_two: second_stage_probability(covariate),
            scenario,
        })
        .collect())
}

fn write_rows<W: Write>(writer: W, rows: &[CovariateRow]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn run_covariate(config: &CovariateConfig) -> anyhow::Result<()> {
    let source = TemperatureFile::open(&config.climate_data_file).with_context(|| {
        format!("Failed to read climate data {}", config.climate_data_file.display())
    })?;
    let rows = covariate_rows(&source, &config.scenario, config.seed)?;
    match &config.output_csv {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_rows(file, &rows)?;
        }
        None => write_rows(std::io::stdout().lock(), &rows)?,
    }

    let assignment: Vec<Scenario> = rows.iter().map(|row| row.scenario).collect();
    let counts = scenario_counts(&assignment);
    info!(
        "{} members of {}: rcp26={} rcp45={} rcp85={}",
        rows.len(),
        config.scenario,
        counts[0],
        counts[1],
        counts[2]
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Members flat at 0 until 1900, then constant offsets of 1.0 and 3.0
    /// degrees: integrated over 2000..2100 that is 100 and 300.
    fn source() -> TemperatureFile {
        let years: Vec<i32> = (1850..=2300).collect();
        let rows: Vec<[f64; 2]> = years
            .iter()
            .map(|&y| if y < 1900 { [0.0, 0.0] } else { [1.0, 3.0] })
            .collect();
        let json = serde_json::json!({
            "year": years,
            "ssp245": { "surface_temperature": rows },
        });
        TemperatureFile::from_json_str("test", &json.to_string()).unwrap()
    }

    #[test]
    fn test_covariate_rows() {
        let rows = covariate_rows(&source(), "ssp245", 1342).unwrap();
        assert_eq!(rows.len(), 2);
        assert!((rows[0].integrated_temperature - 100.0).abs() < 1e-9);
        assert_eq!(rows[0].scenario, Scenario::Rcp26);
        assert_eq!(rows[0].p_stage_one, 0.0);
        assert_eq!(rows[1].scenario, Scenario::Rcp85);
        assert_eq!(rows[1].p_stage_two, 1.0);
    }

    #[test]
    fn test_rows_written_as_csv() {
        let rows = covariate_rows(&source(), "ssp245", 7).unwrap();
        let mut out = Vec::new();
        write_rows(&mut out, &rows).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("member,integrated_temperature,p_stage_one,p_stage_two,scenario")
        );
        assert!(lines.next().unwrap().ends_with(",rcp26"));
    }

    #[test]
    fn test_unknown_scenario_key() {
        assert!(covariate_rows(&source(), "ssp585", 1).is_err());
    }
}
