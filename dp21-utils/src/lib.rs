//! Shared utility functions for DP21 crates.

/// Year axis helpers
pub mod years {
    use dp21_core::error::{Dp21Error, Result};

    /// Inclusive projection year range `start..=end` advancing by `step`.
    pub fn target_years(start: i32, end: i32, step: i32) -> Result<Vec<i32>> {
        if step <= 0 || end < start {
            return Err(Dp21Error::InvalidYearRange { start, end, step });
        }
        Ok((start..=end).step_by(step as usize).collect())
    }

    /// Exact-match alignment of a data year axis against target years.
    #[derive(Debug, Clone, PartialEq, Eq, Default)]
    pub struct YearAlignment {
        /// Years present on both axes, ascending
        pub retained: Vec<i32>,
        /// Index of each retained year on the data axis
        pub data_idx: Vec<usize>,
        /// Target years with no matching data year, ascending
        pub dropped: Vec<i32>,
    }

    impl YearAlignment {
        pub fn is_empty(&self) -> bool {
            self.retained.is_empty()
        }
    }

    /// Intersect two strictly increasing year axes.
    ///
    /// Target years missing from the data are reported in `dropped` rather
    /// than treated as an error; callers decide how strict to be.
    pub fn intersect_years(data_years: &[i32], targets: &[i32]) -> YearAlignment {
        let mut alignment = YearAlignment::default();
        let (mut i, mut j) = (0, 0);
        while j < targets.len() {
            if i >= data_years.len() || targets[j] < data_years[i] {
                alignment.dropped.push(targets[j]);
                j += 1;
            } else if data_years[i] < targets[j] {
                i += 1;
            } else {
                alignment.retained.push(targets[j]);
                alignment.data_idx.push(i);
                i += 1;
                j += 1;
            }
        }
        alignment
    }

    /// Position of `year` on an axis, if present.
    pub fn year_index(years: &[i32], year: i32) -> Option<usize> {
        years.iter().position(|&y| y == year)
    }

}

/// Timestamp helpers
pub mod time {
    use chrono::Local;

    /// Dataset history attribute, e.g. "Created Tue Mar  4 09:15:02 2025".
    pub fn history_stamp() -> String {
        format!("Created {}", Local::now().format("%a %b %e %H:%M:%S %Y"))
    }

}

/// File helpers for optionally gzip-compressed inputs and outputs
pub mod io {
    use flate2::read::GzDecoder;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs::File;
    use std::io::{BufReader, BufWriter, Read, Write};
    use std::path::Path;

    /// Deflate level used for every compressed output.
    pub const COMPRESSION_LEVEL: u32 = 4;

    fn is_gzip(path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "gz")
    }

    /// Open a file for reading, transparently decompressing `*.gz` files.
    pub fn open_input(path: &Path) -> std::io::Result<Box<dyn Read>> {
        let file = BufReader::new(File::open(path)?);
        if is_gzip(path) {
            Ok(Box::new(GzDecoder::new(file)))
        } else {
            Ok(Box::new(file))
        }
    }

    /// Create a gzip-compressed output file, creating parent directories.
    pub fn create_compressed(path: &Path) -> std::io::Result<GzEncoder<BufWriter<File>>> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = BufWriter::new(File::create(path)?);
        Ok(GzEncoder::new(file, Compression::new(COMPRESSION_LEVEL)))
    }

    /// Finish a compressed stream and flush it to disk.
    pub fn finish_compressed(encoder: GzEncoder<BufWriter<File>>) -> std::io::Result<()> {
        let mut inner = encoder.finish()?;
        inner.flush()
    }

    /// Open a file written by [`create_compressed`].
    pub fn open_compressed(path: &Path) -> std::io::Result<GzDecoder<BufReader<File>>> {
        Ok(GzDecoder::new(BufReader::new(File::open(path)?)))
    }

}
