use crate::component::IceSheet;
use crate::error::{Dp21Error, Result};
use ndarray::{Array2, Axis};

/// Resampled global sea-level contributions, `(sample, year)` in mm.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionResult {
    pub eais: Array2<f64>,
    pub wais: Array2<f64>,
    /// Always `eais + wais`
    pub ais: Array2<f64>,
    pub scenario: String,
    pub baseyear: i32,
    /// Projection years retained after aligning with the pool
    pub targyears: Vec<i32>,
}

impl ProjectionResult {
    /// Assemble a result from the two component arrays; the total is derived
    /// here so it can never drift from its parts.
    pub fn new(
        eais: Array2<f64>,
        wais: Array2<f64>,
        scenario: impl Into<String>,
        baseyear: i32,
        targyears: Vec<i32>,
    ) -> Result<Self> {
        if eais.dim() != wais.dim() {
            return Err(Dp21Error::DimensionMismatch(format!(
                "EAIS samples {:?} and WAIS samples {:?} differ",
                eais.dim(),
                wais.dim()
            )));
        }
        if eais.len_of(Axis(1)) != targyears.len() {
            return Err(Dp21Error::DimensionMismatch(format!(
                "{} year columns for {} target years",
                eais.len_of(Axis(1)),
                targyears.len()
            )));
        }
        let ais = &eais + &wais;
        Ok(Self {
            eais,
            wais,
            ais,
            scenario: scenario.into(),
            baseyear,
            targyears,
        })
    }

    pub fn nsamps(&self) -> usize {
        self.eais.len_of(Axis(0))
    }

    pub fn component(&self, sheet: IceSheet) -> &Array2<f64> {
        match sheet {
            IceSheet::Eais => &self.eais,
            IceSheet::Wais => &self.wais,
            IceSheet::Ais => &self.ais,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ProjectionResult;
    use crate::component::IceSheet;
    use ndarray::array;

    #[test]
    fn test_total_is_sum_of_components() {
        let eais = array![[1.0, 2.0], [3.0, 4.0]];
        let wais = array![[0.5, 0.25], [-1.0, 2.0]];
        let result =
            ProjectionResult::new(eais, wais, "rcp45", 2000, vec![2020, 2030]).unwrap();
        assert_eq!(result.ais, array![[1.5, 2.25], [2.0, 6.0]]);
        assert_eq!(result.nsamps(), 2);
        assert_eq!(result.component(IceSheet::Wais)[[1, 0]], -1.0);
    }

    #[test]
    fn test_year_count_checked() {
        let eais = array![[1.0, 2.0]];
        let wais = array![[1.0, 2.0]];
        assert!(ProjectionResult::new(eais, wais, "rcp45", 2000, vec![2020]).is_err());
    }
}
