//! Assembly of the ensemble pool from per-scenario, per-component tables.

use dp21_core::error::{Dp21Error, Result};
use dp21_core::{EnsemblePool, Scenario};
use dp21_utils::io::open_input;
use dp21_utils::years::year_index;
use csv::ReaderBuilder;
use log::{debug, info};
use ndarray::{stack, Array2, Axis};
use std::path::{Path, PathBuf};

/// EAIS and WAIS table paths for one scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInputs {
    pub eais: PathBuf,
    pub wais: PathBuf,
}

/// The six ensemble tables feeding a projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolInputs {
    pub rcp26: ComponentInputs,
    pub rcp45: ComponentInputs,
    pub rcp85: ComponentInputs,
}

impl PoolInputs {
    pub fn scenario(&self, scenario: Scenario) -> &ComponentInputs {
        match scenario {
            Scenario::Rcp26 => &self.rcp26,
            Scenario::Rcp45 => &self.rcp45,
            Scenario::Rcp85 => &self.rcp85,
        }
    }
}

/// One ensemble table: a year axis and `(year, member)` values in mm.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleTable {
    pub years: Vec<i32>,
    pub values: Array2<f64>,
}

impl EnsembleTable {
    /// Parse a CSV table whose header row is `year,<member>,<member>,...` and
    /// whose rows hold one year each.
    pub fn parse(contents: impl std::io::Read, origin: &str) -> Result<EnsembleTable> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b',')
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(contents);
        let members = rdr.headers()?.len().saturating_sub(1);
        if members == 0 {
            return Err(Dp21Error::Parse(format!("{}: no ensemble member columns", origin)));
        }
        let mut years = Vec::new();
        let mut flat = Vec::new();
        for (line, row) in rdr.records().enumerate() {
            let record = row?;
            let year = record[0].parse::<i32>().map_err(|_| {
                Dp21Error::Parse(format!("{} row {}: invalid year {:?}", origin, line + 2, &record[0]))
            })?;
            years.push(year);
            for field in record.iter().skip(1) {
                let value = field.parse::<f64>().map_err(|_| {
                    Dp21Error::Parse(format!("{} row {}: invalid value {:?}", origin, line + 2, field))
                })?;
                flat.push(value);
            }
        }
        let values = Array2::from_shape_vec((years.len(), members), flat)
            .map_err(|e| Dp21Error::DimensionMismatch(format!("{}: {}", origin, e)))?;
        Ok(EnsembleTable { years, values })
    }

    pub fn read(path: &Path) -> Result<EnsembleTable> {
        let table = EnsembleTable::parse(open_input(path)?, &path.display().to_string())?;
        debug!(
            "Read {} years x {} members from {}",
            table.years.len(),
            table.values.ncols(),
            path.display()
        );
        Ok(table)
    }

    /// Shift every member so its value at `baseyear` is zero.
    pub fn rebase(&mut self, baseyear: i32) -> Result<()> {
        let row = year_index(&self.years, baseyear).ok_or_else(|| {
            Dp21Error::MissingReferenceYear {
                year: baseyear,
                context: "ensemble year axis".to_string(),
            }
        })?;
        let reference = self.values.row(row).to_owned();
        self.values -= &reference;
        Ok(())
    }
}

fn read_rebased(path: &Path, baseyear: i32) -> Result<EnsembleTable> {
    let mut table = EnsembleTable::read(path)?;
    table.rebase(baseyear)?;
    Ok(table)
}

fn check_same_axes(expected: &EnsembleTable, other: &EnsembleTable, what: &str) -> Result<()> {
    if expected.years != other.years {
        return Err(Dp21Error::DimensionMismatch(format!(
            "{} year axis differs from the first table",
            what
        )));
    }
    if expected.values.dim() != other.values.dim() {
        return Err(Dp21Error::DimensionMismatch(format!(
            "{} has shape {:?}, expected {:?}",
            what,
            other.values.dim(),
            expected.values.dim()
        )));
    }
    Ok(())
}

/// Build a single-branch pool for one user-chosen scenario.
pub fn preprocess_fixed(inputs: &PoolInputs, scenario: &str, baseyear: i32) -> Result<EnsemblePool> {
    let chosen: Scenario = scenario.parse()?;
    let paths = inputs.scenario(chosen);
    let eais = read_rebased(&paths.eais, baseyear)?;
    let wais = read_rebased(&paths.wais, baseyear)?;
    check_same_axes(&eais, &wais, &format!("{} WAIS table", chosen))?;
    info!(
        "Built {} pool: {} years x {} members",
        chosen,
        eais.years.len(),
        eais.values.ncols()
    );
    EnsemblePool::from_single(eais.years, eais.values, wais.values, scenario, baseyear)
}

/// Build a three-branch pool stacking every scenario, for temperature-driven
/// projections. `scenario` is the temperature-source key carried as the
/// pool's provenance label.
pub fn preprocess_stacked(
    inputs: &PoolInputs,
    scenario: &str,
    baseyear: i32,
) -> Result<EnsemblePool> {
    let mut eais_tables = Vec::with_capacity(Scenario::ALL.len());
    let mut wais_tables = Vec::with_capacity(Scenario::ALL.len());
    for branch in Scenario::ALL {
        let paths = inputs.scenario(branch);
        eais_tables.push(read_rebased(&paths.eais, baseyear)?);
        wais_tables.push(read_rebased(&paths.wais, baseyear)?);
    }
    let first = &eais_tables[0];
    for (branch, (eais, wais)) in Scenario::ALL.iter().zip(eais_tables.iter().zip(&wais_tables)) {
        check_same_axes(first, eais, &format!("{} EAIS table", branch))?;
        check_same_axes(first, wais, &format!("{} WAIS table", branch))?;
    }

    let eais_views: Vec<_> = eais_tables.iter().map(|t| t.values.view()).collect();
    let wais_views: Vec<_> = wais_tables.iter().map(|t| t.values.view()).collect();
    let eais = stack(Axis(2), &eais_views)
        .map_err(|e| Dp21Error::DimensionMismatch(e.to_string()))?;
    let wais = stack(Axis(2), &wais_views)
        .map_err(|e| Dp21Error::DimensionMismatch(e.to_string()))?;
    info!(
        "Built stacked pool: {} years x {} members x {} scenarios",
        first.years.len(),
        first.values.ncols(),
        Scenario::ALL.len()
    );
    EnsemblePool::new(first.years.clone(), eais, wais, scenario, baseyear)
}

/// Pool for either projection variant: stacked over every scenario when the
/// run is temperature-driven, otherwise the single scenario named.
pub fn preprocess_pools(
    inputs: &PoolInputs,
    scenario: &str,
    baseyear: i32,
    temperature_driven: bool,
) -> Result<EnsemblePool> {
    if temperature_driven {
        preprocess_stacked(inputs, scenario, baseyear)
    } else {
        preprocess_fixed(inputs, scenario, baseyear)
    }
}
