//! Entity-major trace tables keyed by ROI id.
//!
//! A [`TraceTable`] is the in-memory representation of per-cell fluorescence
//! traces: one row per ROI, one sample sequence per row, all sequences the
//! same length. Construction is the single validation point: a table that
//! exists is a table whose invariants hold:
//!
//! - every `cell_roi_id` is unique,
//! - every row has the same number of samples,
//! - when a filter is supplied, every requested id exists in the source and
//!   the resulting row order is exactly the filter's order.
//!
//! After construction the table is immutable; readers and writers only ever
//! borrow it.

use std::collections::{HashMap, HashSet};

use snafu::prelude::*;

use crate::roi::{CELL_ROI_ID, RoiId};

/// Errors raised while constructing or filtering a [`TraceTable`].
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
pub enum TableError {
    /// One or more requested filter ids are absent from the source table.
    ///
    /// This indicates an upstream inconsistency between ROI validity lists
    /// and trace data; it is fatal, never a silent drop.
    #[snafu(display("requested ROI ids not present in source traces: {missing:?}"))]
    RoiFilterMismatch {
        /// The requested ids that do not exist in the source index, in the
        /// order they appeared in the filter.
        missing: Vec<RoiId>,
    },

    /// The same ROI id appears more than once in the table rows (or more
    /// than once in a filter).
    #[snafu(display("duplicate ROI id in trace table: {roi_id}"))]
    DuplicateRoiId {
        /// The id that occurred more than once.
        roi_id: RoiId,
    },

    /// A row's sample sequence length disagrees with the rest of the table.
    #[snafu(display(
        "ragged trace table: ROI {roi_id} has {actual} samples, expected {expected}"
    ))]
    RaggedTraces {
        /// The id of the offending row.
        roi_id: RoiId,
        /// Sample count established by the first row.
        expected: usize,
        /// Sample count found on the offending row.
        actual: usize,
    },
}

/// Verifies that every id in `filter` exists in `index`.
///
/// Pure function so filter validity can be tested without building a table.
/// On failure the error carries the offending ids in filter order.
pub fn validate_roi_filter(filter: &[RoiId], index: &[RoiId]) -> Result<(), TableError> {
    let present: HashSet<RoiId> = index.iter().copied().collect();
    let missing: Vec<RoiId> = filter
        .iter()
        .copied()
        .filter(|id| !present.contains(id))
        .collect();

    ensure!(missing.is_empty(), RoiFilterMismatchSnafu { missing });
    Ok(())
}

/// Entity-major table of per-ROI sample sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceTable {
    index_name: String,
    rows: Vec<(RoiId, Vec<f64>)>,
}

impl TraceTable {
    /// Construction contract: validates `rows`, optionally restricting them
    /// to `filter` (preserving the filter's order).
    ///
    /// `index_name` records what the row keys mean; the write path to a
    /// session container requires it to be [`CELL_ROI_ID`].
    pub fn from_parts(
        index_name: impl Into<String>,
        rows: Vec<(RoiId, Vec<f64>)>,
        filter: Option<&[RoiId]>,
    ) -> Result<Self, TableError> {
        let mut seen = HashSet::with_capacity(rows.len());
        let mut expected = None;
        for (roi_id, samples) in &rows {
            ensure!(seen.insert(*roi_id), DuplicateRoiIdSnafu { roi_id: *roi_id });
            match expected {
                None => expected = Some(samples.len()),
                Some(expected) => ensure!(
                    samples.len() == expected,
                    RaggedTracesSnafu {
                        roi_id: *roi_id,
                        expected,
                        actual: samples.len(),
                    }
                ),
            }
        }

        let rows = match filter {
            None => rows,
            Some(filter) => {
                let index: Vec<RoiId> = rows.iter().map(|(id, _)| *id).collect();
                validate_roi_filter(filter, &index)?;

                let mut by_id: HashMap<RoiId, Vec<f64>> = rows.into_iter().collect();
                let mut filtered = Vec::with_capacity(filter.len());
                for roi_id in filter {
                    // A second removal of the same id means the filter itself
                    // repeated it.
                    let samples = by_id
                        .remove(roi_id)
                        .context(DuplicateRoiIdSnafu { roi_id: *roi_id })?;
                    filtered.push((*roi_id, samples));
                }
                filtered
            }
        };

        Ok(TraceTable {
            index_name: index_name.into(),
            rows,
        })
    }

    /// Builds a table keyed by [`CELL_ROI_ID`] from already-ordered rows.
    pub fn new(rows: Vec<(RoiId, Vec<f64>)>) -> Result<Self, TableError> {
        TraceTable::from_parts(CELL_ROI_ID, rows, None)
    }

    /// Builds a table keyed by [`CELL_ROI_ID`], restricted to `filter` in
    /// the filter's order.
    pub fn with_filter(rows: Vec<(RoiId, Vec<f64>)>, filter: &[RoiId]) -> Result<Self, TableError> {
        TraceTable::from_parts(CELL_ROI_ID, rows, Some(filter))
    }

    /// Returns a copy restricted to `filter`, in the filter's order.
    pub fn filtered(&self, filter: &[RoiId]) -> Result<Self, TableError> {
        TraceTable::from_parts(self.index_name.clone(), self.rows.clone(), Some(filter))
    }

    /// Name of the index the rows are keyed under.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Row keys in table order.
    pub fn roi_ids(&self) -> Vec<RoiId> {
        self.rows.iter().map(|(id, _)| *id).collect()
    }

    /// Iterates rows in table order.
    pub fn rows(&self) -> impl Iterator<Item = (RoiId, &[f64])> {
        self.rows.iter().map(|(id, samples)| (*id, samples.as_slice()))
    }

    /// Sample sequence for a single ROI, if present.
    pub fn samples(&self, roi_id: RoiId) -> Option<&[f64]> {
        self.rows
            .iter()
            .find(|(id, _)| *id == roi_id)
            .map(|(_, samples)| samples.as_slice())
    }

    /// Number of ROIs (rows).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of samples per row (0 for an empty table).
    pub fn num_timepoints(&self) -> usize {
        self.rows.first().map_or(0, |(_, samples)| samples.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rows() -> Vec<(RoiId, Vec<f64>)> {
        vec![
            (RoiId(7), vec![1.0, 2.0, 3.0]),
            (RoiId(9), vec![4.0, 5.0, 6.0]),
            (RoiId(12), vec![7.0, 8.0, 9.0]),
        ]
    }

    #[test]
    fn construction_preserves_row_order() {
        let table = TraceTable::new(sample_rows()).expect("valid table");

        assert_eq!(table.index_name(), CELL_ROI_ID);
        assert_eq!(table.roi_ids(), vec![RoiId(7), RoiId(9), RoiId(12)]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.num_timepoints(), 3);
        assert_eq!(table.samples(RoiId(9)), Some([4.0, 5.0, 6.0].as_slice()));
    }

    #[test]
    fn duplicate_roi_id_is_rejected() {
        let rows = vec![
            (RoiId(7), vec![1.0, 2.0]),
            (RoiId(7), vec![3.0, 4.0]),
        ];

        let err = TraceTable::new(rows).expect_err("duplicate id");
        assert_eq!(err, TableError::DuplicateRoiId { roi_id: RoiId(7) });
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let rows = vec![
            (RoiId(7), vec![1.0, 2.0, 3.0]),
            (RoiId(9), vec![4.0, 5.0]),
        ];

        let err = TraceTable::new(rows).expect_err("ragged rows");
        assert_eq!(
            err,
            TableError::RaggedTraces {
                roi_id: RoiId(9),
                expected: 3,
                actual: 2,
            }
        );
    }

    #[test]
    fn filter_restricts_and_reorders() {
        let table =
            TraceTable::with_filter(sample_rows(), &[RoiId(12), RoiId(7)]).expect("valid filter");

        // Exactly the filter set, in the filter's given order.
        assert_eq!(table.roi_ids(), vec![RoiId(12), RoiId(7)]);
        assert_eq!(table.samples(RoiId(12)), Some([7.0, 8.0, 9.0].as_slice()));
        assert_eq!(table.samples(RoiId(9)), None);
    }

    #[test]
    fn filter_with_unknown_ids_fails() {
        let err = TraceTable::with_filter(sample_rows(), &[RoiId(7), RoiId(99), RoiId(100)])
            .expect_err("unknown filter ids");

        assert_eq!(
            err,
            TableError::RoiFilterMismatch {
                missing: vec![RoiId(99), RoiId(100)],
            }
        );
    }

    #[test]
    fn filter_with_repeated_id_fails() {
        let err = TraceTable::with_filter(sample_rows(), &[RoiId(7), RoiId(7)])
            .expect_err("repeated filter id");

        assert_eq!(err, TableError::DuplicateRoiId { roi_id: RoiId(7) });
    }

    #[test]
    fn validate_roi_filter_is_pure() {
        let index = [RoiId(1), RoiId(2), RoiId(3)];

        assert!(validate_roi_filter(&[RoiId(3), RoiId(1)], &index).is_ok());

        let err = validate_roi_filter(&[RoiId(4), RoiId(2), RoiId(5)], &index)
            .expect_err("missing ids");
        assert_eq!(
            err,
            TableError::RoiFilterMismatch {
                missing: vec![RoiId(4), RoiId(5)],
            }
        );
    }

    #[test]
    fn empty_table_is_valid() {
        let table = TraceTable::new(Vec::new()).expect("empty table");
        assert!(table.is_empty());
        assert_eq!(table.num_timepoints(), 0);
    }
}
