//! Surface-temperature ensembles used to drive scenario selection.

use dp21_core::error::{Dp21Error, Result};
use dp21_utils::io::open_input;
use dp21_utils::years::year_index;
use log::{debug, warn};
use ndarray::{s, Array2, Axis};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Temperature trajectories for one scenario, `(year, member)` in kelvin or
/// degrees; only differences are used.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureEnsemble {
    pub years: Vec<i32>,
    pub values: Array2<f64>,
}

impl TemperatureEnsemble {
    pub fn members(&self) -> usize {
        self.values.len_of(Axis(1))
    }
}

/// Anything able to hand out a temperature ensemble by scenario key.
pub trait TemperatureSource {
    /// Human readable origin, used in error messages.
    fn source_name(&self) -> String;

    /// Fails with [`Dp21Error::ScenarioNotFound`] when the key is absent.
    fn surface_temperature(&self, scenario: &str) -> Result<TemperatureEnsemble>;
}

#[derive(Debug, Deserialize)]
struct ScenarioGroup {
    surface_temperature: Vec<Vec<f64>>,
}

/// Top level of the file as written: `year` plus arbitrary other keys.
#[derive(Debug, Deserialize)]
struct RawDocument {
    year: Vec<i32>,
    #[serde(flatten)]
    entries: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(try_from = "RawDocument")]
struct TemperatureDocument {
    year: Vec<i32>,
    scenarios: BTreeMap<String, ScenarioGroup>,
}

impl TryFrom<RawDocument> for TemperatureDocument {
    type Error = Dp21Error;

    /// Scenario groups are the objects whose `surface_temperature` is an
    /// array; descriptive keys next to them are skipped.
    fn try_from(raw: RawDocument) -> Result<Self> {
        let mut scenarios = BTreeMap::new();
        for (key, value) in raw.entries {
            if !value.get("surface_temperature").is_some_and(|t| t.is_array()) {
                debug!("Skipping non-scenario key {} in temperature source", key);
                continue;
            }
            scenarios.insert(key, serde_json::from_value(value)?);
        }
        Ok(Self {
            year: raw.year,
            scenarios,
        })
    }
}

/// Temperature source backed by a JSON document (optionally gzipped):
///
/// ```json
/// { "year": [1850, 1851, ...],
///   "ssp585": { "surface_temperature": [[t_m0, t_m1, ...], ...] } }
/// ```
///
/// Each `surface_temperature` row is one year, each column one member.
#[derive(Debug)]
pub struct TemperatureFile {
    name: String,
    document: TemperatureDocument,
}

impl TemperatureFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = open_input(path)?;
        let document: TemperatureDocument = serde_json::from_reader(reader)?;
        let source = Self {
            name: path.display().to_string(),
            document,
        };
        debug!(
            "Loaded temperature source {} with scenarios {:?}",
            source.name,
            source.scenarios().collect::<Vec<_>>()
        );
        Ok(source)
    }

    pub fn from_json_str(name: &str, json: &str) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            document: serde_json::from_str(json)?,
        })
    }

    pub fn scenarios(&self) -> impl Iterator<Item = &str> {
        self.document.scenarios.keys().map(String::as_str)
    }
}

impl TemperatureSource for TemperatureFile {
    fn source_name(&self) -> String {
        self.name.clone()
    }

    fn surface_temperature(&self, scenario: &str) -> Result<TemperatureEnsemble> {
        let group = self
            .document
            .scenarios
            .get(scenario)
            .ok_or_else(|| {
                warn!(
                    "{} has no scenario {}; available: {:?}",
                    self.name,
                    scenario,
                    self.scenarios().collect::<Vec<_>>()
                );
                Dp21Error::ScenarioNotFound {
                    scenario: scenario.to_string(),
                    source_name: self.name.clone(),
                }
            })?;
        let rows = &group.surface_temperature;
        let years = &self.document.year;
        if rows.len() != years.len() {
            return Err(Dp21Error::DimensionMismatch(format!(
                "{}: {} temperature rows for {} years",
                scenario,
                rows.len(),
                years.len()
            )));
        }
        let members = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != members) {
            return Err(Dp21Error::DimensionMismatch(format!(
                "{}: temperature rows have differing member counts",
                scenario
            )));
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let values = Array2::from_shape_vec((years.len(), members), flat)
            .map_err(|e| Dp21Error::DimensionMismatch(e.to_string()))?;
        Ok(TemperatureEnsemble {
            years: years.clone(),
            values,
        })
    }
}

/// Year windows used to turn raw temperatures into a per-member covariate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperatureWindows {
    /// First year of the reference mean
    pub reference_start: i32,
    /// Reference mean stops before this year
    pub reference_end: i32,
    /// Analysis window, inclusive
    pub analysis_start: i32,
    pub analysis_end: i32,
    /// Integration window, `[start, end)`
    pub integrate_start: i32,
    pub integrate_end: i32,
}

impl Default for TemperatureWindows {
    fn default() -> Self {
        Self {
            reference_start: 1850,
            reference_end: 1900,
            analysis_start: 1900,
            analysis_end: 2300,
            integrate_start: 2000,
            integrate_end: 2100,
        }
    }
}

fn required_index(years: &[i32], year: i32) -> Result<usize> {
    year_index(years, year).ok_or_else(|| Dp21Error::MissingReferenceYear {
        year,
        context: "temperature year axis".to_string(),
    })
}

/// Temperature anomalies relative to each member's reference mean, cropped
/// to the analysis window. Returns the cropped year axis and the
/// `(year, member)` anomalies.
pub fn normalized_anomalies(
    ensemble: &TemperatureEnsemble,
    windows: &TemperatureWindows,
) -> Result<(Vec<i32>, Array2<f64>)> {
    let years = &ensemble.years;
    let ref_start = required_index(years, windows.reference_start)?;
    let ref_end = required_index(years, windows.reference_end)?;
    let start = required_index(years, windows.analysis_start)?;
    let end = required_index(years, windows.analysis_end)? + 1;
    if ref_end <= ref_start || end <= start {
        return Err(Dp21Error::Configuration(
            "temperature windows must be non-empty and increasing".to_string(),
        ));
    }

    let reference = ensemble
        .values
        .slice(s![ref_start..ref_end, ..])
        .mean_axis(Axis(0))
        .ok_or_else(|| Dp21Error::Configuration("empty reference window".to_string()))?;
    let anomalies = &ensemble.values.slice(s![start..end, ..]) - &reference;
    Ok((years[start..end].to_vec(), anomalies))
}

/// Integrated temperature ("temperature-years") per member over the
/// integration window.
pub fn integrated_temperature(
    ensemble: &TemperatureEnsemble,
    windows: &TemperatureWindows,
) -> Result<Vec<f64>> {
    let (years, anomalies) = normalized_anomalies(ensemble, windows)?;
    let mut covariate = vec![0.0; anomalies.len_of(Axis(1))];
    for (row, year) in anomalies.outer_iter().zip(&years) {
        if *year >= windows.integrate_start && *year < windows.integrate_end {
            for (total, value) in covariate.iter_mut().zip(row.iter()) {
                *total += value;
            }
        }
    }
    Ok(covariate)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a JSON source where member `m` sits `offsets[m]` degrees above
    /// a flat 1850-1899 baseline from 1900 on.
    pub(crate) fn step_source(scenario: &str, offsets: &[f64]) -> String {
        let years: Vec<i32> = (1850..=2300).collect();
        let rows: Vec<Vec<f64>> = years
            .iter()
            .map(|&y| {
                offsets
                    .iter()
                    .map(|off| if y < 1900 { 14.0 } else { 14.0 + off })
                    .collect()
            })
            .collect();
        serde_json::json!({
            "year": years,
            scenario: { "surface_temperature": rows },
        })
        .to_string()
    }

    #[test]
    fn test_missing_scenario() {
        let source = TemperatureFile::from_json_str("mem", &step_source("ssp585", &[1.0])).unwrap();
        let err = source.surface_temperature("ssp126").unwrap_err();
        assert!(matches!(err, Dp21Error::ScenarioNotFound { .. }));
    }

    #[test]
    fn test_descriptive_top_level_keys_skipped() {
        let json = serde_json::json!({
            "description": "FaIR surface temperature ensemble",
            "units": { "surface_temperature": "K" },
            "model_version": 2,
            "provenance": { "institution": "somewhere" },
            "year": [2000, 2001],
            "ssp245": { "surface_temperature": [[1.0, 2.0], [3.0, 4.0]] },
        })
        .to_string();
        let source = TemperatureFile::from_json_str("mem", &json).unwrap();
        let ensemble = source.surface_temperature("ssp245").unwrap();
        assert_eq!(ensemble.values.dim(), (2, 2));
        assert_eq!(source.scenarios().collect::<Vec<_>>(), vec!["ssp245"]);
        assert!(matches!(
            source.surface_temperature("units"),
            Err(Dp21Error::ScenarioNotFound { .. })
        ));
    }

    #[test]
    fn test_malformed_scenario_group_rejected() {
        let json = r#"{"year": [2000], "ssp245": {"surface_temperature": [["warm"]]}}"#;
        assert!(matches!(
            TemperatureFile::from_json_str("mem", json),
            Err(Dp21Error::Json(_))
        ));
    }

    #[test]
    fn test_integrated_temperature_of_constant_offset() {
        let source =
            TemperatureFile::from_json_str("mem", &step_source("ssp245", &[1.0, 2.5])).unwrap();
        let ensemble = source.surface_temperature("ssp245").unwrap();
        assert_eq!(ensemble.members(), 2);
        let covariate = integrated_temperature(&ensemble, &TemperatureWindows::default()).unwrap();
        assert!((covariate[0] - 100.0).abs() < 1e-9);
        assert!((covariate[1] - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_anomaly_window_is_cropped() {
        let source = TemperatureFile::from_json_str("mem", &step_source("x", &[0.5])).unwrap();
        let ensemble = source.surface_temperature("x").unwrap();
        let (years, anomalies) =
            normalized_anomalies(&ensemble, &TemperatureWindows::default()).unwrap();
        assert_eq!(years.first(), Some(&1900));
        assert_eq!(years.last(), Some(&2300));
        assert_eq!(anomalies.dim(), (401, 1));
        assert!((anomalies[[0, 0]] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_reference_year_required() {
        let json = serde_json::json!({
            "year": [2000, 2001],
            "x": { "surface_temperature": [[1.0], [2.0]] },
        })
        .to_string();
        let source = TemperatureFile::from_json_str("mem", &json).unwrap();
        let ensemble = source.surface_temperature("x").unwrap();
        let err = integrated_temperature(&ensemble, &TemperatureWindows::default()).unwrap_err();
        assert!(matches!(err, Dp21Error::MissingReferenceYear { year: 1850, .. }));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let json = serde_json::json!({
            "year": [2000, 2001],
            "x": { "surface_temperature": [[1.0, 2.0], [2.0]] },
        })
        .to_string();
        let source = TemperatureFile::from_json_str("mem", &json).unwrap();
        assert!(matches!(
            source.surface_temperature("x"),
            Err(Dp21Error::DimensionMismatch(_))
        ));
    }
}
