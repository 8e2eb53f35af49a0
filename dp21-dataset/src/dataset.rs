use crate::float_repr::{self, FloatRepr};
use dp21_core::error::{Dp21Error, Result};
use dp21_core::{IceSheet, SiteSet};
use dp21_utils::io::{create_compressed, finish_compressed, open_compressed};
use dp21_utils::time::history_stamp;
use log::info;
use ndarray::{Array2, Array3, ArrayView3, Axis};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use std::cell::RefCell;
use std::path::Path;

/// Location id used for the single "location" of a global dataset.
pub const GLOBAL_LOCATION_ID: i64 = -1;

/// Attribution recorded on localized datasets.
pub const LOCAL_SOURCE: &str = "SLR Framework: DP21 workflow";

/// Dimension order of `sea_level_change`.
pub const DIMENSIONS: [&str; 3] = ["samples", "years", "locations"];

const LOCAL_DESCRIPTION: &str = "Local SLR contributions from icesheets according to DP21 workflow";

/// Dataset-level provenance attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetAttributes {
    pub description: String,
    pub history: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub scenario: String,
    pub baseyear: i32,
}

/// The `sea_level_change` variable, flattened in `samples, years, locations`
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeaLevelVariable {
    pub dims: Vec<String>,
    pub units: String,
    #[serde(rename = "_FillValue", with = "float_repr::single")]
    pub fill_value: f32,
    #[serde(with = "float_repr::vec")]
    pub values: Vec<f32>,
}

/// A projection dataset with coordinates, data and attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeaLevelDataset {
    pub samples: Vec<usize>,
    pub years: Vec<i32>,
    pub locations: Vec<i64>,
    #[serde(with = "float_repr::vec")]
    pub lat: Vec<f32>,
    #[serde(with = "float_repr::vec")]
    pub lon: Vec<f32>,
    pub sea_level_change: SeaLevelVariable,
    pub attributes: DatasetAttributes,
}

fn dimension_names() -> Vec<String> {
    DIMENSIONS.iter().map(|d| d.to_string()).collect()
}

fn local_attributes(scenario: &str, baseyear: i32) -> DatasetAttributes {
    DatasetAttributes {
        description: LOCAL_DESCRIPTION.to_string(),
        history: history_stamp(),
        source: Some(LOCAL_SOURCE.to_string()),
        scenario: scenario.to_string(),
        baseyear,
    }
}

fn sea_level_variable(field: ArrayView3<f64>) -> SeaLevelVariable {
    SeaLevelVariable {
        dims: dimension_names(),
        units: "mm".to_string(),
        fill_value: f32::NAN,
        values: field.iter().map(|&v| v as f32).collect(),
    }
}

impl SeaLevelDataset {
    /// Dataset for a global `(sample, year)` projection: one location with
    /// id -1 and infinite lat/lon.
    pub fn global(
        sheet: IceSheet,
        samples: &Array2<f64>,
        years: &[i32],
        scenario: &str,
        baseyear: i32,
    ) -> Result<Self> {
        if samples.ncols() != years.len() {
            return Err(Dp21Error::DimensionMismatch(format!(
                "{} year columns for {} years",
                samples.ncols(),
                years.len()
            )));
        }
        let field = samples.view().insert_axis(Axis(2));
        Ok(Self {
            samples: (0..samples.nrows()).collect(),
            years: years.to_vec(),
            locations: vec![GLOBAL_LOCATION_ID],
            lat: vec![f32::INFINITY],
            lon: vec![f32::INFINITY],
            sea_level_change: sea_level_variable(field),
            attributes: DatasetAttributes {
                description: format!(
                    "Global SLR contribution from {} from the DeConto et al. 2021 workflow",
                    sheet.label()
                ),
                history: history_stamp(),
                source: None,
                scenario: scenario.to_string(),
                baseyear,
            },
        })
    }

    /// Dataset for a localized `(sample, year, location)` field.
    pub fn local(
        field: &Array3<f64>,
        sites: &SiteSet,
        years: &[i32],
        scenario: &str,
        baseyear: i32,
    ) -> Result<Self> {
        let (nsamps, nyears, nlocs) = field.dim();
        if nyears != years.len() || nlocs != sites.len() {
            return Err(Dp21Error::DimensionMismatch(format!(
                "field {:?} does not match {} years and {} sites",
                field.dim(),
                years.len(),
                sites.len()
            )));
        }
        Ok(Self {
            samples: (0..nsamps).collect(),
            years: years.to_vec(),
            locations: sites.ids.clone(),
            lat: sites.lats.iter().map(|&v| v as f32).collect(),
            lon: sites.lons.iter().map(|&v| v as f32).collect(),
            sea_level_change: sea_level_variable(field.view()),
            attributes: local_attributes(scenario, baseyear),
        })
    }

    /// Write a localized dataset without holding the field in memory.
    ///
    /// `fill_row(sample, year, row)` fills the `locations`-long row for one
    /// `(sample, year)` pair; rows are requested in storage order and encoded
    /// as soon as they are filled, so only one row is alive at a time. The
    /// file is identical to writing [`SeaLevelDataset::local`] for the same
    /// values.
    pub fn write_local_rows<F>(
        path: &Path,
        sites: &SiteSet,
        years: &[i32],
        nsamps: usize,
        scenario: &str,
        baseyear: i32,
        fill_row: F,
    ) -> Result<()>
    where
        F: FnMut(usize, usize, &mut [f64]),
    {
        let stream = LocalStream {
            samples: (0..nsamps).collect(),
            years,
            locations: &sites.ids,
            lat: sites.lats.iter().map(|&v| v as f32).collect(),
            lon: sites.lons.iter().map(|&v| v as f32).collect(),
            sea_level_change: StreamedVariable {
                dims: dimension_names(),
                units: "mm",
                fill_value: f32::NAN,
                values: RowStream {
                    nsamps,
                    nyears: years.len(),
                    nlocs: sites.len(),
                    fill_row: RefCell::new(fill_row),
                },
            },
            attributes: local_attributes(scenario, baseyear),
        };
        let mut encoder = create_compressed(path)?;
        serde_json::to_writer(&mut encoder, &stream)?;
        finish_compressed(encoder)?;
        info!(
            "Streamed {:?} dataset to {}",
            (nsamps, years.len(), sites.len()),
            path.display()
        );
        Ok(())
    }

    /// `(samples, years, locations)` sizes.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.samples.len(), self.years.len(), self.locations.len())
    }

    /// The data variable as a 3-D array.
    pub fn values(&self) -> Result<Array3<f32>> {
        Array3::from_shape_vec(self.shape(), self.sea_level_change.values.clone())
            .map_err(|e| Dp21Error::DimensionMismatch(e.to_string()))
    }

    /// Write as gzip-compressed JSON, replacing any existing file.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut encoder = create_compressed(path)?;
        serde_json::to_writer(&mut encoder, self)?;
        finish_compressed(encoder)?;
        info!(
            "Wrote {:?} dataset to {}",
            self.shape(),
            path.display()
        );
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let dataset: SeaLevelDataset = serde_json::from_reader(open_compressed(path)?)?;
        let expected = dataset.samples.len() * dataset.years.len() * dataset.locations.len();
        if dataset.sea_level_change.values.len() != expected {
            return Err(Dp21Error::DimensionMismatch(format!(
                "{} holds {} values, expected {}",
                path.display(),
                dataset.sea_level_change.values.len(),
                expected
            )));
        }
        Ok(dataset)
    }
}

/// Serialized in place of `Vec<f32>`: pulls one row at a time from the
/// caller and encodes it element by element.
struct RowStream<F> {
    nsamps: usize,
    nyears: usize,
    nlocs: usize,
    fill_row: RefCell<F>,
}

impl<F: FnMut(usize, usize, &mut [f64])> Serialize for RowStream<F> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut fill_row = self.fill_row.borrow_mut();
        let mut row = vec![0.0; self.nlocs];
        let mut seq = serializer.serialize_seq(Some(self.nsamps * self.nyears * self.nlocs))?;
        for sample in 0..self.nsamps {
            for year in 0..self.nyears {
                (*fill_row)(sample, year, &mut row);
                for &value in &row {
                    seq.serialize_element(&FloatRepr::from(value as f32))?;
                }
            }
        }
        seq.end()
    }
}

/// Same field layout as [`SeaLevelVariable`].
#[derive(Serialize)]
#[serde(bound(serialize = "F: FnMut(usize, usize, &mut [f64])"))]
struct StreamedVariable<F> {
    dims: Vec<String>,
    units: &'static str,
    #[serde(rename = "_FillValue", with = "float_repr::single")]
    fill_value: f32,
    values: RowStream<F>,
}

/// Same field layout as [`SeaLevelDataset`].
#[derive(Serialize)]
#[serde(bound(serialize = "F: FnMut(usize, usize, &mut [f64])"))]
struct LocalStream<'a, F> {
    samples: Vec<usize>,
    years: &'a [i32],
    locations: &'a [i64],
    #[serde(with = "float_repr::vec")]
    lat: Vec<f32>,
    #[serde(with = "float_repr::vec")]
    lon: Vec<f32>,
    sea_level_change: StreamedVariable<F>,
    attributes: DatasetAttributes,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sites() -> SiteSet {
        SiteSet {
            names: vec!["A".to_string(), "B".to_string()],
            ids: vec![101, 202],
            lats: vec![-33.9, 40.7],
            lons: vec![151.2, -74.0],
        }
    }

    #[test]
    fn test_global_dataset_layout() {
        let samples = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let ds = SeaLevelDataset::global(IceSheet::Wais, &samples, &[2020, 2030, 2040], "rcp45", 2005)
            .unwrap();
        assert_eq!(ds.shape(), (2, 3, 1));
        assert_eq!(ds.locations, vec![GLOBAL_LOCATION_ID]);
        assert!(ds.lat[0].is_infinite() && ds.lon[0].is_infinite());
        assert_eq!(ds.sea_level_change.values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(ds.attributes.description.contains("WAIS"));
        assert!(ds.attributes.history.starts_with("Created "));
        assert_eq!(ds.attributes.baseyear, 2005);
    }

    #[test]
    fn test_local_dataset_layout() {
        let field = Array3::from_shape_fn((2, 1, 2), |(s, _, l)| (s * 10 + l) as f64);
        let ds = SeaLevelDataset::local(&field, &sites(), &[2100], "rcp85", 2000).unwrap();
        assert_eq!(ds.shape(), (2, 1, 2));
        assert_eq!(ds.locations, vec![101, 202]);
        assert_eq!(ds.values().unwrap()[[1, 0, 1]], 11.0);
        assert_eq!(ds.attributes.source.as_deref(), Some(LOCAL_SOURCE));
    }

    #[test]
    fn test_local_dataset_shape_checked() {
        let field = Array3::<f64>::zeros((2, 1, 3));
        assert!(SeaLevelDataset::local(&field, &sites(), &[2100], "rcp85", 2000).is_err());
    }

    #[test]
    fn test_streamed_rows_match_in_memory_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.json.gz");
        let field = Array3::from_shape_fn((3, 2, 2), |(s, y, l)| {
            if (s, y, l) == (1, 0, 1) {
                f64::NAN
            } else {
                s as f64 * 1.5 - y as f64 + l as f64 * 0.25
            }
        });
        let mut requested = Vec::new();
        SeaLevelDataset::write_local_rows(&path, &sites(), &[2050, 2100], 3, "rcp26", 2000, |s, y, row| {
            requested.push((s, y));
            for (l, cell) in row.iter_mut().enumerate() {
                *cell = field[[s, y, l]];
            }
        })
        .unwrap();
        assert_eq!(requested, vec![(0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (2, 1)]);

        let streamed = SeaLevelDataset::read(&path).unwrap();
        let in_memory = SeaLevelDataset::local(&field, &sites(), &[2050, 2100], "rcp26", 2000).unwrap();
        assert_eq!(streamed.shape(), in_memory.shape());
        assert_eq!(streamed.locations, in_memory.locations);
        assert_eq!(streamed.lat, in_memory.lat);
        assert_eq!(streamed.attributes.description, in_memory.attributes.description);
        assert_eq!(streamed.attributes.source, in_memory.attributes.source);
        let a = &streamed.sea_level_change.values;
        let b = &in_memory.sea_level_change.values;
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!(x == y || (x.is_nan() && y.is_nan()));
        }
        assert!(a[5].is_nan());
    }

    #[test]
    fn test_write_then_read_keeps_sentinels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("global.json.gz");
        let samples = array![[1.5, f64::NAN]];
        let ds = SeaLevelDataset::global(IceSheet::Ais, &samples, &[2020, 2030], "rcp26", 2000)
            .unwrap();
        ds.write(&path).unwrap();

        let back = SeaLevelDataset::read(&path).unwrap();
        assert_eq!(back.years, vec![2020, 2030]);
        assert_eq!(back.lat, vec![f32::INFINITY]);
        assert!(back.sea_level_change.fill_value.is_nan());
        assert_eq!(back.sea_level_change.values[0], 1.5);
        assert!(back.sea_level_change.values[1].is_nan());
        assert_eq!(back.attributes, ds.attributes);
    }

    #[test]
    fn test_rewrite_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json.gz");
        let first = SeaLevelDataset::global(IceSheet::Eais, &array![[1.0]], &[2020], "rcp26", 2000)
            .unwrap();
        first.write(&path).unwrap();
        let second = SeaLevelDataset::global(IceSheet::Eais, &array![[7.0]], &[2020], "rcp26", 2000)
            .unwrap();
        second.write(&path).unwrap();
        assert_eq!(
            SeaLevelDataset::read(&path).unwrap().sea_level_change.values,
            vec![7.0]
        );
    }
}
