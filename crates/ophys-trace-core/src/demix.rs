//! Demix source contract and the JSON demix-output reader.
//!
//! The upstream signal-separation step emits one corrected-fluorescence
//! trace per ROI, already entity-major. Downstream code consumes exactly one
//! thing from it (the trace table), so the contract is a single-method
//! trait, [`DemixSource`].
//!
//! [`DemixFile`] is the shipped implementation: a JSON payload with a
//! `roi_names` array and a `data` matrix (one row of samples per ROI, in
//! `roi_names` order). Shape problems are rejected at load time; a
//! `DemixFile` that exists holds a valid table.

use std::io;
use std::path::Path;

use log::debug;
use serde::Deserialize;
use snafu::prelude::*;

use crate::roi::RoiId;
use crate::table::{TableError, TraceTable};

/// Errors raised while loading a demix output file.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DemixError {
    /// The demix output file does not exist.
    #[snafu(display("demix output not found: {path}"))]
    NotFound {
        /// Path that was probed.
        path: String,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Reading the demix output failed for a reason other than absence.
    #[snafu(display("I/O error reading demix output {path}: {source}"))]
    Io {
        /// Path being read.
        path: String,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The file is not a valid demix JSON payload.
    #[snafu(display("malformed demix output {path}: {source}"))]
    Malformed {
        /// Path being decoded.
        path: String,
        /// Underlying decode error.
        source: serde_json::Error,
    },

    /// `roi_names` and `data` disagree about the number of ROIs.
    #[snafu(display(
        "demix output {path} names {roi_count} ROIs but data has {row_count} rows"
    ))]
    RowCountMismatch {
        /// Path being decoded.
        path: String,
        /// Number of entries in `roi_names`.
        roi_count: usize,
        /// Number of rows in `data`.
        row_count: usize,
    },

    /// The decoded rows violate a trace-table invariant (ragged rows,
    /// duplicate ids).
    #[snafu(display("invalid demix traces in {path}: {source}"))]
    Invalid {
        /// Path being decoded.
        path: String,
        /// Underlying table construction error.
        source: TableError,
    },
}

/// Narrow contract of an upstream demix output: its trace table.
pub trait DemixSource {
    /// Entity-major corrected-fluorescence traces, one row per ROI.
    fn data(&self) -> &TraceTable;
}

/// On-disk demix payload shape.
#[derive(Debug, Deserialize)]
struct RawDemixOutput {
    roi_names: Vec<RoiId>,
    data: Vec<Vec<f64>>,
}

/// A loaded demix output file.
#[derive(Debug, Clone)]
pub struct DemixFile {
    data: TraceTable,
}

impl DemixFile {
    /// Loads and validates a demix output file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DemixError> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(e).context(NotFoundSnafu { path: path_str });
            }
            Err(e) => return Err(e).context(IoSnafu { path: path_str }),
        };

        let raw: RawDemixOutput =
            serde_json::from_str(&text).context(MalformedSnafu { path: &path_str })?;

        ensure!(
            raw.roi_names.len() == raw.data.len(),
            RowCountMismatchSnafu {
                path: &path_str,
                roi_count: raw.roi_names.len(),
                row_count: raw.data.len(),
            }
        );

        let rows = raw.roi_names.into_iter().zip(raw.data).collect();
        let data = TraceTable::new(rows).context(InvalidSnafu { path: &path_str })?;

        debug!(
            "loaded demix output {}: {} ROIs x {} timepoints",
            path_str,
            data.len(),
            data.num_timepoints()
        );

        Ok(DemixFile { data })
    }
}

impl DemixSource for DemixFile {
    fn data(&self) -> &TraceTable {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::TempDir;

    fn write_demix(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).expect("write demix payload");
        path
    }

    #[test]
    fn load_valid_payload() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = write_demix(
            &tmp,
            "demix.json",
            r#"{ "roi_names": [7, 9], "data": [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]] }"#,
        );

        let file = DemixFile::load(&path).expect("valid payload");
        let table = file.data();

        assert_eq!(table.roi_ids(), vec![RoiId(7), RoiId(9)]);
        assert_eq!(table.num_timepoints(), 3);
        assert_eq!(table.samples(RoiId(9)), Some([4.0, 5.0, 6.0].as_slice()));
    }

    #[test]
    fn missing_file_is_classified_not_found() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("does_not_exist.json");

        let err = DemixFile::load(&path).expect_err("missing file");
        assert!(matches!(err, DemixError::NotFound { .. }));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = write_demix(&tmp, "demix.json", "{ not json");

        let err = DemixFile::load(&path).expect_err("malformed payload");
        assert!(matches!(err, DemixError::Malformed { .. }));
    }

    #[test]
    fn roi_count_mismatch_is_rejected() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = write_demix(
            &tmp,
            "demix.json",
            r#"{ "roi_names": [7, 9, 11], "data": [[1.0], [2.0]] }"#,
        );

        let err = DemixFile::load(&path).expect_err("row count mismatch");
        assert!(matches!(
            err,
            DemixError::RowCountMismatch {
                roi_count: 3,
                row_count: 2,
                ..
            }
        ));
    }

    #[test]
    fn ragged_data_is_rejected() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = write_demix(
            &tmp,
            "demix.json",
            r#"{ "roi_names": [7, 9], "data": [[1.0, 2.0], [3.0]] }"#,
        );

        let err = DemixFile::load(&path).expect_err("ragged data");
        assert!(matches!(
            err,
            DemixError::Invalid {
                source: TableError::RaggedTraces { .. },
                ..
            }
        ));
    }
}
