//! Orientation transforms between entity-major rows and time-major storage.
//!
//! Session containers store trace data time-major (rows are timepoints,
//! columns are ROIs) while this crate works entity-major (one sample
//! sequence per ROI). The conversion is easy to get silently wrong, so it
//! lives here as a pair of named transforms applied exactly once per
//! direction:
//!
//! - [`to_time_major`] on the write path,
//! - [`to_entity_major`] on the read path.
//!
//! [`TimeMajorMatrix`] is the only 2-D array type in the crate; anything
//! holding one is in container orientation by construction.

use snafu::prelude::*;

/// Errors raised while building a [`TimeMajorMatrix`].
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
pub enum OrientationError {
    /// Input rows do not all have the same length.
    #[snafu(display("ragged input: row {row} has length {actual}, expected {expected}"))]
    RaggedRows {
        /// Index of the offending row.
        row: usize,
        /// Length established by the first row.
        expected: usize,
        /// Length found on the offending row.
        actual: usize,
    },

    /// A flat value buffer does not match the declared shape.
    #[snafu(display(
        "value buffer of length {len} does not match shape {num_timepoints}x{num_rois}"
    ))]
    ShapeMismatch {
        /// Length of the flat buffer.
        len: usize,
        /// Declared number of timepoints.
        num_timepoints: usize,
        /// Declared number of ROIs.
        num_rois: usize,
    },
}

/// Dense 2-D sample array in container orientation (timepoints × ROIs),
/// stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeMajorMatrix {
    values: Vec<f64>,
    num_timepoints: usize,
    num_rois: usize,
}

impl TimeMajorMatrix {
    /// Wraps a flat row-major buffer, checking it against the declared shape.
    pub fn new(
        values: Vec<f64>,
        num_timepoints: usize,
        num_rois: usize,
    ) -> Result<Self, OrientationError> {
        ensure!(
            values.len() == num_timepoints * num_rois,
            ShapeMismatchSnafu {
                len: values.len(),
                num_timepoints,
                num_rois,
            }
        );
        Ok(TimeMajorMatrix {
            values,
            num_timepoints,
            num_rois,
        })
    }

    /// Builds a matrix from time-major rows (one inner vector per timepoint).
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, OrientationError> {
        let num_timepoints = rows.len();
        let num_rois = rows.first().map_or(0, Vec::len);

        let mut values = Vec::with_capacity(num_timepoints * num_rois);
        for (row, samples) in rows.iter().enumerate() {
            ensure!(
                samples.len() == num_rois,
                RaggedRowsSnafu {
                    row,
                    expected: num_rois,
                    actual: samples.len(),
                }
            );
            values.extend_from_slice(samples);
        }

        Ok(TimeMajorMatrix {
            values,
            num_timepoints,
            num_rois,
        })
    }

    /// Number of timepoints (storage rows).
    pub fn num_timepoints(&self) -> usize {
        self.num_timepoints
    }

    /// Number of ROIs (storage columns).
    pub fn num_rois(&self) -> usize {
        self.num_rois
    }

    /// Sample at `(timepoint, roi)`.
    pub fn value(&self, timepoint: usize, roi: usize) -> f64 {
        self.values[timepoint * self.num_rois + roi]
    }

    /// Iterates storage rows (one slice per timepoint).
    pub fn time_rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.num_timepoints)
            .map(move |t| &self.values[t * self.num_rois..(t + 1) * self.num_rois])
    }

    /// Flat row-major buffer.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

/// Converts entity-major rows (one sample sequence per ROI) into a
/// time-major matrix. Inverse of [`to_entity_major`].
pub fn to_time_major(entity_rows: &[Vec<f64>]) -> Result<TimeMajorMatrix, OrientationError> {
    let num_rois = entity_rows.len();
    let num_timepoints = entity_rows.first().map_or(0, Vec::len);

    let mut values = vec![0.0; num_timepoints * num_rois];
    for (roi, samples) in entity_rows.iter().enumerate() {
        ensure!(
            samples.len() == num_timepoints,
            RaggedRowsSnafu {
                row: roi,
                expected: num_timepoints,
                actual: samples.len(),
            }
        );
        for (timepoint, &sample) in samples.iter().enumerate() {
            values[timepoint * num_rois + roi] = sample;
        }
    }

    TimeMajorMatrix::new(values, num_timepoints, num_rois)
}

/// Converts a time-major matrix back to entity-major rows. Inverse of
/// [`to_time_major`].
pub fn to_entity_major(matrix: &TimeMajorMatrix) -> Vec<Vec<f64>> {
    (0..matrix.num_rois())
        .map(|roi| {
            (0..matrix.num_timepoints())
                .map(|timepoint| matrix.value(timepoint, roi))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_to_time_major_transposes() {
        // 2 ROIs x 3 timepoints.
        let rows = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];

        let matrix = to_time_major(&rows).expect("uniform rows");

        assert_eq!(matrix.num_timepoints(), 3);
        assert_eq!(matrix.num_rois(), 2);
        assert_eq!(matrix.as_slice(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(matrix.value(1, 0), 2.0);
        assert_eq!(matrix.value(1, 1), 5.0);
    }

    #[test]
    fn round_trip_is_exact() {
        let rows = vec![
            vec![0.25, -1.5, f64::MIN_POSITIVE, 3.75],
            vec![1e300, 2.5e-12, -0.0, 42.0],
            vec![7.0, 8.0, 9.0, 10.0],
        ];

        let matrix = to_time_major(&rows).expect("uniform rows");
        let back = to_entity_major(&matrix);

        assert_eq!(back, rows);
    }

    #[test]
    fn time_major_rows_round_trip_through_shape() {
        let matrix = TimeMajorMatrix::from_rows(vec![
            vec![1.0, 4.0],
            vec![2.0, 5.0],
            vec![3.0, 6.0],
        ])
        .expect("uniform rows");

        let collected: Vec<&[f64]> = matrix.time_rows().collect();
        assert_eq!(collected.len(), 3);
        assert_eq!(collected[0], &[1.0, 4.0]);
        assert_eq!(collected[2], &[3.0, 6.0]);

        let entity = to_entity_major(&matrix);
        assert_eq!(entity, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
    }

    #[test]
    fn ragged_entity_rows_are_rejected() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];

        let err = to_time_major(&rows).expect_err("ragged rows");
        assert_eq!(
            err,
            OrientationError::RaggedRows {
                row: 1,
                expected: 2,
                actual: 1,
            }
        );
    }

    #[test]
    fn flat_buffer_shape_is_checked() {
        let err = TimeMajorMatrix::new(vec![1.0, 2.0, 3.0], 2, 2).expect_err("bad shape");
        assert_eq!(
            err,
            OrientationError::ShapeMismatch {
                len: 3,
                num_timepoints: 2,
                num_rois: 2,
            }
        );
    }

    #[test]
    fn empty_input_produces_empty_matrix() {
        let matrix = to_time_major(&[]).expect("empty input");
        assert_eq!(matrix.num_timepoints(), 0);
        assert_eq!(matrix.num_rois(), 0);
        assert!(to_entity_major(&matrix).is_empty());
    }
}
