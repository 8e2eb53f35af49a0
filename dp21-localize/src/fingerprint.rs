//! Sea-level fingerprints: gridded per-source scale factors and the lookup
//! that samples them at site coordinates.

use dp21_core::error::{Dp21Error, Result};
use dp21_utils::io::open_input;
use log::debug;
use ndarray::{Array2, Axis};
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct GridDocument {
    lat: Vec<f64>,
    lon: Vec<f64>,
    fp: Vec<Vec<f64>>,
}

/// Regular latitude/longitude grid of fingerprint values.
///
/// `values` is indexed `(lat, lon)`. Once built, latitudes are strictly
/// increasing and longitudes are wrapped into `[0, 360)` and strictly
/// increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintGrid {
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub values: Array2<f64>,
}

fn strictly_increasing(axis: &[f64]) -> bool {
    axis.windows(2).all(|w| w[0] < w[1])
}

impl FingerprintGrid {
    /// Build a grid from axes in any common layout: latitude running north
    /// to south is flipped, and longitudes in `[-180, 180)` (or any other
    /// offset) are wrapped into `[0, 360)` with the value columns permuted
    /// to match. A duplicated seam column is dropped if it repeats the
    /// values of its twin and rejected otherwise.
    pub fn new(mut lat: Vec<f64>, lon: Vec<f64>, mut values: Array2<f64>) -> Result<Self> {
        if lat.is_empty() || lon.is_empty() {
            return Err(Dp21Error::DimensionMismatch(
                "fingerprint grid has an empty axis".to_string(),
            ));
        }
        if values.dim() != (lat.len(), lon.len()) {
            return Err(Dp21Error::DimensionMismatch(format!(
                "fingerprint values {:?} do not match grid ({}, {})",
                values.dim(),
                lat.len(),
                lon.len()
            )));
        }
        if lat.len() > 1 && lat[0] > lat[lat.len() - 1] {
            lat.reverse();
            values.invert_axis(Axis(0));
        }

        let wrapped: Vec<f64> = lon.into_iter().map(|l| l.rem_euclid(360.0)).collect();
        let mut order: Vec<usize> = (0..wrapped.len()).collect();
        order.sort_by(|&a, &b| wrapped[a].total_cmp(&wrapped[b]));
        let sorted: Vec<f64> = order.iter().map(|&j| wrapped[j]).collect();
        let values = values.select(Axis(1), &order);
        // A closing column (360 after 0, or 180 after -180) lands on the
        // meridian of the opening one; one copy is kept when they agree.
        let keep: Vec<usize> = (0..sorted.len())
            .filter(|&j| {
                j == 0 || sorted[j] != sorted[j - 1] || values.column(j) != values.column(j - 1)
            })
            .collect();
        let lon: Vec<f64> = keep.iter().map(|&j| sorted[j]).collect();
        let values = values.select(Axis(1), &keep);

        if !strictly_increasing(&lat) || !strictly_increasing(&lon) {
            return Err(Dp21Error::Parse(
                "fingerprint grid axes must be monotonic without repeated points".to_string(),
            ));
        }
        Ok(Self { lat, lon, values })
    }

    /// Read a grid stored as `{"lat": [...], "lon": [...], "fp": [[...]]}`,
    /// with `fp` rows running along latitude.
    pub fn open(path: &Path) -> Result<Self> {
        let document: GridDocument = serde_json::from_reader(open_input(path)?)?;
        let grid = Self::from_document(document)?;
        debug!(
            "Loaded fingerprint grid {} ({} x {})",
            path.display(),
            grid.lat.len(),
            grid.lon.len()
        );
        Ok(grid)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_document(serde_json::from_str(json)?)
    }

    fn from_document(document: GridDocument) -> Result<Self> {
        let rows = document.fp.len();
        let cols = document.fp.first().map_or(0, Vec::len);
        if document.fp.iter().any(|row| row.len() != cols) {
            return Err(Dp21Error::DimensionMismatch(
                "fingerprint rows have differing lengths".to_string(),
            ));
        }
        let flat: Vec<f64> = document.fp.into_iter().flatten().collect();
        let values = Array2::from_shape_vec((rows, cols), flat)
            .map_err(|e| Dp21Error::DimensionMismatch(e.to_string()))?;
        Self::new(document.lat, document.lon, values)
    }

    /// Bilinear interpolation at a point. Latitudes outside the grid clamp to
    /// the nearest row; longitudes wrap across the dateline.
    pub fn value_at(&self, lat: f64, lon: f64) -> f64 {
        let (i0, i1, ty) = lat_bracket(&self.lat, lat);
        let (j0, j1, tx) = lon_bracket(&self.lon, lon.rem_euclid(360.0));
        let v = &self.values;
        let south = (1.0 - tx) * v[[i0, j0]] + tx * v[[i0, j1]];
        let north = (1.0 - tx) * v[[i1, j0]] + tx * v[[i1, j1]];
        (1.0 - ty) * south + ty * north
    }

    pub fn sample(&self, lats: &[f64], lons: &[f64]) -> Result<Vec<f64>> {
        if lats.len() != lons.len() {
            return Err(Dp21Error::DimensionMismatch(format!(
                "{} latitudes for {} longitudes",
                lats.len(),
                lons.len()
            )));
        }
        Ok(lats
            .iter()
            .zip(lons)
            .map(|(&lat, &lon)| self.value_at(lat, lon))
            .collect())
    }
}

fn lat_bracket(axis: &[f64], q: f64) -> (usize, usize, f64) {
    let last = axis.len() - 1;
    if last == 0 || q <= axis[0] {
        return (0, 0, 0.0);
    }
    if q >= axis[last] {
        return (last, last, 0.0);
    }
    let hi = axis.partition_point(|&a| a < q).clamp(1, last);
    let lo = hi - 1;
    (lo, hi, (q - axis[lo]) / (axis[hi] - axis[lo]))
}

fn lon_bracket(axis: &[f64], q: f64) -> (usize, usize, f64) {
    let last = axis.len() - 1;
    if last == 0 {
        return (0, 0, 0.0);
    }
    if q < axis[0] || q > axis[last] {
        let span = axis[0] + 360.0 - axis[last];
        let offset = if q > axis[last] {
            q - axis[last]
        } else {
            q + 360.0 - axis[last]
        };
        return (last, 0, offset / span);
    }
    let hi = axis.partition_point(|&a| a < q).clamp(1, last);
    let lo = hi - 1;
    (lo, hi, (q - axis[lo]) / (axis[hi] - axis[lo]))
}

/// Fingerprint lookup: one scale factor per site for a given source.
pub trait FingerprintLookup {
    fn assign(&self, source: &Path, lats: &[f64], lons: &[f64]) -> Result<Vec<f64>>;
}

/// Lookup reading grid files with [`FingerprintGrid::open`].
#[derive(Debug, Default, Clone, Copy)]
pub struct GridFileLookup;

impl FingerprintLookup for GridFileLookup {
    fn assign(&self, source: &Path, lats: &[f64], lons: &[f64]) -> Result<Vec<f64>> {
        FingerprintGrid::open(source)?.sample(lats, lons)
    }
}

type CacheKey = (PathBuf, Vec<(u64, u64)>);

/// Memoizing wrapper: fingerprints are a pure function of the source and
/// the coordinates, so repeated lookups within a run are served from memory.
pub struct FingerprintCache<L: FingerprintLookup> {
    inner: L,
    cache: RefCell<HashMap<CacheKey, Vec<f64>>>,
}

impl<L: FingerprintLookup> FingerprintCache<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl<L: FingerprintLookup> FingerprintLookup for FingerprintCache<L> {
    fn assign(&self, source: &Path, lats: &[f64], lons: &[f64]) -> Result<Vec<f64>> {
        let coords: Vec<(u64, u64)> = lats
            .iter()
            .zip(lons)
            .map(|(lat, lon)| (lat.to_bits(), lon.to_bits()))
            .collect();
        let key = (source.to_path_buf(), coords);
        if let Some(hit) = self.cache.borrow().get(&key) {
            return Ok(hit.clone());
        }
        let values = self.inner.assign(source, lats, lons)?;
        self.cache.borrow_mut().insert(key, values.clone());
        Ok(values)
    }
}
