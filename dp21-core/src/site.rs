use crate::error::{Dp21Error, Result};
use csv::ReaderBuilder;
use log::debug;
use std::path::Path;

/// Sites a projection is localized to.
///
/// Stored as parallel arrays; their order defines the location axis of every
/// localized output.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct SiteSet {
    pub names: Vec<String>,
    pub ids: Vec<i64>,
    /// Latitude in decimal degrees
    pub lats: Vec<f64>,
    /// Longitude in decimal degrees
    pub lons: Vec<f64>,
}

impl SiteSet {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Read a location list file.
    ///
    /// See [`SiteSet::parse_location_list`] for the format.
    pub fn read_location_file(path: impl AsRef<Path>) -> Result<SiteSet> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let sites = SiteSet::parse_location_list(&contents)?;
        debug!("Loaded {} sites from {}", sites.len(), path.display());
        Ok(sites)
    }

    /// Parse a tab separated location list into a SiteSet.
    ///
    /// Expected columns (no header): name, id, latitude, longitude
    pub fn parse_location_list(contents: &str) -> Result<SiteSet> {
        let mut sites = SiteSet::default();
        let mut rdr = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'#'))
            .from_reader(contents.as_bytes());
        for (line, row) in rdr.records().enumerate() {
            let record = row?;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            if record.len() < 4 {
                return Err(Dp21Error::Parse(format!(
                    "location row {} has {} columns, expected 4",
                    line + 1,
                    record.len()
                )));
            }
            let name = record[0].trim().to_string();
            let id = parse_field::<i64>(&record[1], "id", line)?;
            let lat = parse_field::<f64>(&record[2], "latitude", line)?;
            let lon = parse_field::<f64>(&record[3], "longitude", line)?;
            sites.names.push(name);
            sites.ids.push(id);
            sites.lats.push(lat);
            sites.lons.push(lon);
        }
        Ok(sites)
    }
}

fn parse_field<T: std::str::FromStr>(raw: &str, what: &str, line: usize) -> Result<T> {
    raw.trim().parse::<T>().map_err(|_| {
        Dp21Error::Parse(format!(
            "location row {}: invalid {} {:?}",
            line + 1,
            what,
            raw
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::SiteSet;
    use crate::error::Dp21Error;

    #[test]
    fn test_parse_location_list() {
        let data = "\
NEW_YORK\t12\t40.70\t-74.01
SAN_FRANCISCO\t10\t37.81\t-122.47
";
        let sites = SiteSet::parse_location_list(data).unwrap();
        assert_eq!(sites.len(), 2);
        assert_eq!(sites.names[0], "NEW_YORK");
        assert_eq!(sites.ids, vec![12, 10]);
        assert!((sites.lats[1] - 37.81).abs() < f64::EPSILON);
        assert!((sites.lons[1] - (-122.47)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_skips_blank_and_comment_lines() {
        let data = "# name\tid\tlat\tlon\nA\t1\t0.0\t0.0\n\nB\t2\t1.0\t1.0\n";
        let sites = SiteSet::parse_location_list(data).unwrap();
        assert_eq!(sites.ids, vec![1, 2]);
    }

    #[test]
    fn test_parse_bad_latitude() {
        let data = "A\t1\tnorth\t0.0\n";
        let err = SiteSet::parse_location_list(data).unwrap_err();
        assert!(matches!(err, Dp21Error::Parse(_)));
    }

    #[test]
    fn test_parse_short_row() {
        let data = "A\t1\t0.0\n";
        assert!(SiteSet::parse_location_list(data).is_err());
    }

    #[test]
    fn test_parse_empty() {
        let sites = SiteSet::parse_location_list("").unwrap();
        assert!(sites.is_empty());
    }
}
