//! Outer-product localization of global samples, partitioned along the
//! location axis.

use crate::fingerprint::FingerprintLookup;
use dp21_core::error::{Dp21Error, Result};
use dp21_core::{IceSheet, ProjectionResult, SiteSet};
use log::debug;
use ndarray::{Array3, ArrayView2, ArrayViewMut3, Axis, Zip};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// How the location axis is partitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalizeOptions {
    /// Locations per work item
    pub chunk_size: usize,
    /// Fan chunks out over the rayon pool instead of looping
    pub parallel: bool,
}

impl Default for LocalizeOptions {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            parallel: true,
        }
    }
}

/// Localized fields for every component, `(sample, year, location)` in mm.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalizedProjection {
    pub eais: Array3<f64>,
    pub wais: Array3<f64>,
    /// Always `wais + eais`
    pub ais: Array3<f64>,
    pub sites: SiteSet,
    pub targyears: Vec<i32>,
    pub scenario: String,
    pub baseyear: i32,
}

impl LocalizedProjection {
    pub fn component(&self, sheet: IceSheet) -> &Array3<f64> {
        match sheet {
            IceSheet::Eais => &self.eais,
            IceSheet::Wais => &self.wais,
            IceSheet::Ais => &self.ais,
        }
    }
}

fn fill_block(global: &ArrayView2<f64>, fingerprint: &[f64], block: &mut ArrayViewMut3<f64>) {
    Zip::from(block.lanes_mut(Axis(2)))
        .and(global)
        .for_each(|mut lane, &value| {
            for (cell, factor) in lane.iter_mut().zip(fingerprint) {
                *cell = value * factor;
            }
        });
}

/// Outer product of a `(sample, year)` array with a per-location
/// fingerprint, computed one location chunk at a time.
///
/// Every output cell is a single product, so the result does not depend on
/// the chunk size or on whether chunks run in parallel.
pub fn scale_by_fingerprint(
    global: ArrayView2<f64>,
    fingerprint: &[f64],
    options: &LocalizeOptions,
) -> Result<Array3<f64>> {
    if options.chunk_size == 0 {
        return Err(Dp21Error::Configuration(
            "chunk size must be at least 1".to_string(),
        ));
    }
    let (nsamps, nyears) = global.dim();
    let mut out = Array3::<f64>::zeros((nsamps, nyears, fingerprint.len()));
    if fingerprint.is_empty() {
        return Ok(out);
    }
    let chunk = options.chunk_size.min(fingerprint.len());
    if options.parallel {
        out.axis_chunks_iter_mut(Axis(2), chunk)
            .into_par_iter()
            .zip(fingerprint.par_chunks(chunk))
            .for_each(|(mut block, factors)| fill_block(&global, factors, &mut block));
    } else {
        for (mut block, factors) in out
            .axis_chunks_iter_mut(Axis(2), chunk)
            .zip(fingerprint.chunks(chunk))
        {
            fill_block(&global, factors, &mut block);
        }
    }
    Ok(out)
}

/// Localize a projection with fingerprints already resolved per site.
pub fn localize_with_fingerprints(
    projection: &ProjectionResult,
    sites: &SiteSet,
    eais_fp: &[f64],
    wais_fp: &[f64],
    options: &LocalizeOptions,
) -> Result<LocalizedProjection> {
    for (sheet, fp) in [(IceSheet::Eais, eais_fp), (IceSheet::Wais, wais_fp)] {
        if fp.len() != sites.len() {
            return Err(Dp21Error::DimensionMismatch(format!(
                "{} fingerprint has {} values for {} sites",
                sheet,
                fp.len(),
                sites.len()
            )));
        }
    }
    let wais = scale_by_fingerprint(projection.wais.view(), wais_fp, options)?;
    let eais = scale_by_fingerprint(projection.eais.view(), eais_fp, options)?;
    let ais = &wais + &eais;
    Ok(LocalizedProjection {
        eais,
        wais,
        ais,
        sites: sites.clone(),
        targyears: projection.targyears.clone(),
        scenario: projection.scenario.clone(),
        baseyear: projection.baseyear,
    })
}

/// Both component fingerprints for a site list, resolved once per run.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteFingerprints {
    pub eais: Vec<f64>,
    pub wais: Vec<f64>,
}

impl SiteFingerprints {
    /// Look up both component fingerprints for the sites.
    pub fn resolve(sites: &SiteSet, fpdir: &Path, lookup: &dyn FingerprintLookup) -> Result<Self> {
        let wais = lookup.assign(&fingerprint_path(fpdir, IceSheet::Wais)?, &sites.lats, &sites.lons)?;
        let eais = lookup.assign(&fingerprint_path(fpdir, IceSheet::Eais)?, &sites.lats, &sites.lons)?;
        debug!("Resolved fingerprints for {} sites", sites.len());
        Ok(Self { eais, wais })
    }
}

fn fill_cells(sheet: IceSheet, eais: f64, wais: f64, e_fp: &[f64], w_fp: &[f64], cells: &mut [f64]) {
    for ((cell, &fe), &fw) in cells.iter_mut().zip(e_fp).zip(w_fp) {
        *cell = match sheet {
            IceSheet::Eais => eais * fe,
            IceSheet::Wais => wais * fw,
            IceSheet::Ais => wais * fw + eais * fe,
        };
    }
}

/// Localized values produced one `(sample, year)` row at a time, for
/// writers that stream their output instead of holding `(sample, year,
/// location)` fields.
///
/// Each row is filled one location chunk at a time, so a row is
/// bit-identical to the matching lane of [`localize_with_fingerprints`].
pub struct LocalRows<'a> {
    projection: &'a ProjectionResult,
    fingerprints: &'a SiteFingerprints,
    options: LocalizeOptions,
}

impl<'a> LocalRows<'a> {
    pub fn new(
        projection: &'a ProjectionResult,
        fingerprints: &'a SiteFingerprints,
        options: &LocalizeOptions,
    ) -> Result<Self> {
        if options.chunk_size == 0 {
            return Err(Dp21Error::Configuration(
                "chunk size must be at least 1".to_string(),
            ));
        }
        if fingerprints.wais.len() != fingerprints.eais.len() {
            return Err(Dp21Error::DimensionMismatch(format!(
                "{} WAIS and {} EAIS fingerprint values",
                fingerprints.wais.len(),
                fingerprints.eais.len()
            )));
        }
        Ok(Self {
            projection,
            fingerprints,
            options: *options,
        })
    }

    pub fn nlocations(&self) -> usize {
        self.fingerprints.eais.len()
    }

    /// Fill `row` (one value per location) for `sheet` at `(sample, year)`.
    pub fn fill_row(&self, sheet: IceSheet, sample: usize, year: usize, row: &mut [f64]) {
        let eais = self.projection.eais[[sample, year]];
        let wais = self.projection.wais[[sample, year]];
        let chunk = self.options.chunk_size.min(row.len()).max(1);
        let (e_fp, w_fp) = (&self.fingerprints.eais, &self.fingerprints.wais);
        if self.options.parallel {
            row.par_chunks_mut(chunk)
                .zip(e_fp.par_chunks(chunk))
                .zip(w_fp.par_chunks(chunk))
                .for_each(|((cells, fe), fw)| fill_cells(sheet, eais, wais, fe, fw, cells));
        } else {
            for ((cells, fe), fw) in row.chunks_mut(chunk).zip(e_fp.chunks(chunk)).zip(w_fp.chunks(chunk)) {
                fill_cells(sheet, eais, wais, fe, fw, cells);
            }
        }
    }
}

/// Fingerprint file for a component: `fprint_<sheet>.json`, or the gzipped
/// `fprint_<sheet>.json.gz` when only that exists.
pub fn fingerprint_path(fpdir: &Path, sheet: IceSheet) -> Result<PathBuf> {
    let stem = sheet.fingerprint_stem().ok_or_else(|| {
        Dp21Error::Configuration(format!("{} has no fingerprint of its own", sheet))
    })?;
    let plain = fpdir.join(format!("{}.json", stem));
    let compressed = fpdir.join(format!("{}.json.gz", stem));
    if !plain.exists() && compressed.exists() {
        Ok(compressed)
    } else {
        Ok(plain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::GridFileLookup;
    use ndarray::{array, Array2};

    fn projection(eais: Array2<f64>, wais: Array2<f64>) -> ProjectionResult {
        let years = (0..eais.ncols() as i32).map(|i| 2020 + 10 * i).collect();
        ProjectionResult::new(eais, wais, "rcp85", 2000, years).unwrap()
    }

    fn sites(n: usize) -> SiteSet {
        SiteSet {
            names: (0..n).map(|i| format!("SITE_{}", i)).collect(),
            ids: (0..n as i64).collect(),
            lats: (0..n).map(|i| -60.0 + i as f64).collect(),
            lons: (0..n).map(|i| 3.0 * i as f64).collect(),
        }
    }

    #[test]
    fn test_three_site_scaling() {
        let proj = projection(array![[1.0]], array![[10.0]]);
        let localized = localize_with_fingerprints(
            &proj,
            &sites(3),
            &[1.0, 1.0, 1.0],
            &[0.5, 1.0, 2.0],
            &LocalizeOptions::default(),
        )
        .unwrap();
        assert_eq!(localized.wais.dim(), (1, 1, 3));
        let wais: Vec<f64> = localized.wais.iter().copied().collect();
        assert_eq!(wais, vec![5.0, 10.0, 20.0]);
        let ais: Vec<f64> = localized.ais.iter().copied().collect();
        assert_eq!(ais, vec![6.0, 11.0, 21.0]);
    }

    #[test]
    fn test_chunk_invariance() {
        let global = Array2::from_shape_fn((7, 5), |(s, y)| (s as f64 + 1.3) * (y as f64 - 2.7));
        let fp: Vec<f64> = (0..23).map(|i| 0.37 * i as f64 - 1.1).collect();
        let whole = scale_by_fingerprint(
            global.view(),
            &fp,
            &LocalizeOptions {
                chunk_size: fp.len(),
                parallel: false,
            },
        )
        .unwrap();
        for chunk_size in [1, 10, 23, 100] {
            for parallel in [false, true] {
                let chunked = scale_by_fingerprint(
                    global.view(),
                    &fp,
                    &LocalizeOptions {
                        chunk_size,
                        parallel,
                    },
                )
                .unwrap();
                assert_eq!(chunked, whole, "chunk {} parallel {}", chunk_size, parallel);
            }
        }
        assert_eq!(whole[[3, 4, 17]], global[[3, 4]] * fp[17]);
    }

    #[test]
    fn test_transposed_input_layout() {
        let base = Array2::from_shape_fn((4, 3), |(a, b)| (a * 10 + b) as f64);
        let transposed = base.t();
        let out = scale_by_fingerprint(transposed, &[2.0, 3.0], &LocalizeOptions::default()).unwrap();
        assert_eq!(out.dim(), (3, 4, 2));
        assert_eq!(out[[2, 1, 1]], base[[1, 2]] * 3.0);
    }

    #[test]
    fn test_total_matches_components() {
        let proj = projection(
            Array2::from_shape_fn((6, 4), |(s, y)| s as f64 * 0.1 + y as f64),
            Array2::from_shape_fn((6, 4), |(s, y)| s as f64 - 0.25 * y as f64),
        );
        let n = 9;
        let eais_fp: Vec<f64> = (0..n).map(|i| 0.8 + 0.01 * i as f64).collect();
        let wais_fp: Vec<f64> = (0..n).map(|i| 1.2 - 0.03 * i as f64).collect();
        let localized = localize_with_fingerprints(
            &proj,
            &sites(n),
            &eais_fp,
            &wais_fp,
            &LocalizeOptions {
                chunk_size: 4,
                parallel: true,
            },
        )
        .unwrap();
        assert_eq!(localized.ais, &localized.wais + &localized.eais);
        assert_eq!(localized.targyears, proj.targyears);
    }

    #[test]
    fn test_fingerprint_length_checked() {
        let proj = projection(array![[1.0]], array![[1.0]]);
        let err = localize_with_fingerprints(
            &proj,
            &sites(3),
            &[1.0, 1.0],
            &[1.0, 1.0, 1.0],
            &LocalizeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Dp21Error::DimensionMismatch(_)));
    }

    #[test]
    fn test_zero_chunk_rejected() {
        let global = array![[1.0]];
        let options = LocalizeOptions {
            chunk_size: 0,
            parallel: false,
        };
        assert!(scale_by_fingerprint(global.view(), &[1.0], &options).is_err());
    }

    #[test]
    fn test_localize_from_fingerprint_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("fprint_wais.json"),
            r#"{"lat": [-90.0, 90.0], "lon": [0.0, 180.0], "fp": [[2.0, 2.0], [2.0, 2.0]]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("fprint_eais.json"),
            r#"{"lat": [-90.0, 90.0], "lon": [0.0, 180.0], "fp": [[0.5, 0.5], [0.5, 0.5]]}"#,
        )
        .unwrap();
        let proj = projection(array![[4.0, 8.0]], array![[1.0, 3.0]]);
        let fingerprints = SiteFingerprints::resolve(&sites(2), dir.path(), &GridFileLookup).unwrap();
        assert_eq!(fingerprints.wais, vec![2.0, 2.0]);
        let localized = localize_with_fingerprints(
            &proj,
            &sites(2),
            &fingerprints.eais,
            &fingerprints.wais,
            &LocalizeOptions::default(),
        )
        .unwrap();
        assert!((localized.wais[[0, 1, 0]] - 6.0).abs() < 1e-12);
        assert!((localized.eais[[0, 0, 1]] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_rows_match_eager_fields() {
        let proj = projection(
            Array2::from_shape_fn((5, 3), |(s, y)| 0.7 * s as f64 - 1.9 * y as f64),
            Array2::from_shape_fn((5, 3), |(s, y)| (s as f64 + 0.1) * (y as f64 + 0.3)),
        );
        let n = 11;
        let fingerprints = SiteFingerprints {
            eais: (0..n).map(|i| 0.9 - 0.07 * i as f64).collect(),
            wais: (0..n).map(|i| 1.1 + 0.13 * i as f64).collect(),
        };
        let eager = localize_with_fingerprints(
            &proj,
            &sites(n),
            &fingerprints.eais,
            &fingerprints.wais,
            &LocalizeOptions::default(),
        )
        .unwrap();
        for chunk_size in [1, 4, n, 50] {
            for parallel in [false, true] {
                let options = LocalizeOptions { chunk_size, parallel };
                let rows = LocalRows::new(&proj, &fingerprints, &options).unwrap();
                assert_eq!(rows.nlocations(), n);
                let mut row = vec![0.0; n];
                for sheet in IceSheet::ALL {
                    for s in 0..5 {
                        for y in 0..3 {
                            rows.fill_row(sheet, s, y, &mut row);
                            let lane: Vec<f64> = eager.component(sheet).slice(ndarray::s![s, y, ..]).to_vec();
                            assert_eq!(row, lane, "{} chunk {} parallel {}", sheet, chunk_size, parallel);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_rows_reject_zero_chunk() {
        let proj = projection(array![[1.0]], array![[1.0]]);
        let fingerprints = SiteFingerprints {
            eais: vec![1.0],
            wais: vec![1.0],
        };
        let options = LocalizeOptions {
            chunk_size: 0,
            parallel: true,
        };
        assert!(LocalRows::new(&proj, &fingerprints, &options).is_err());
    }

    #[test]
    fn test_missing_fingerprint_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SiteFingerprints::resolve(&sites(1), dir.path(), &GridFileLookup).unwrap_err();
        assert!(matches!(err, Dp21Error::Io(_)));
    }
}
