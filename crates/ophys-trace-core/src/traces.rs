//! Corrected-fluorescence trace adapter.
//!
//! [`CorrectedFluorescenceTraces`] moves one trace table between its three
//! representations:
//!
//! - a demix output (entity-major, no transpose needed) via [`from_demix`],
//! - the `corrected_fluorescence` series of a session container (time-major
//!   on the container side) via [`from_container`],
//! - back into a container via [`write_to_container`], borrowing the ROI
//!   table and timestamp axis of an already-written companion modality so
//!   the new block is aligned to its siblings by construction.
//!
//! The write path is guard-then-act: every precondition is checked before
//! the namespace is touched, so a failed write leaves the container exactly
//! as it was.
//!
//! [`from_demix`]: CorrectedFluorescenceTraces::from_demix
//! [`from_container`]: CorrectedFluorescenceTraces::from_container
//! [`write_to_container`]: CorrectedFluorescenceTraces::write_to_container

use std::sync::Arc;

use log::debug;
use snafu::prelude::*;

use crate::container::{ContainerError, RoiResponseSeries, SessionContainer};
use crate::demix::DemixSource;
use crate::orientation::{OrientationError, to_entity_major, to_time_major};
use crate::roi::{CELL_ROI_ID, RoiId};
use crate::table::{TableError, TraceTable};

/// Series name under which corrected-fluorescence traces are stored.
pub const CORRECTED_FLUORESCENCE: &str = "corrected_fluorescence";

/// Unit label for corrected-fluorescence samples (unitless ratios).
pub const TRACE_UNIT: &str = "NA";

/// Errors raised while moving traces into or out of a session container.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TraceIoError {
    /// The table's index is not keyed by the required name.
    ///
    /// Writing under the wrong key would corrupt cross-modality alignment
    /// silently, so this is checked before the container is touched.
    #[snafu(display("trace table index is named {actual}, expected {expected}"))]
    IndexNameMismatch {
        /// The required index name.
        expected: String,
        /// The index name the table actually carries.
        actual: String,
    },

    /// The companion modality to borrow axis metadata from is not in the
    /// container. The companion must be written first; this is a caller
    /// sequencing bug, not a retryable condition.
    #[snafu(display("companion series {name} missing from container: {source}"))]
    MissingCompanion {
        /// Name of the companion series that was requested.
        name: String,
        /// Underlying lookup failure.
        source: ContainerError,
    },

    /// The table's ROI ids do not match the companion's ROI table.
    ///
    /// The new block's columns are written in the table's row order but
    /// labeled by the borrowed region, so the two must agree exactly.
    #[snafu(display("trace table ROI ids do not match companion {companion} ROI table"))]
    CompanionRoiMismatch {
        /// Name of the companion series whose ROI table was borrowed.
        companion: String,
    },

    /// The borrowed timestamp axis disagrees with the table's sample count.
    #[snafu(display(
        "companion timestamp axis has {timestamp_count} entries but traces have {sample_count} samples per ROI"
    ))]
    TimestampLengthMismatch {
        /// Entries in the borrowed timestamp axis.
        timestamp_count: usize,
        /// Samples per ROI in the table being written.
        sample_count: usize,
    },

    /// Trace-table construction or filtering failed.
    #[snafu(display("trace table error: {source}"))]
    Table {
        /// Underlying table error.
        source: TableError,
    },

    /// A container lookup or registration failed.
    #[snafu(display("container error: {source}"))]
    Container {
        /// Underlying container error.
        source: ContainerError,
    },

    /// An orientation transform rejected its input.
    #[snafu(display("orientation error: {source}"))]
    Orientation {
        /// Underlying orientation error.
        source: OrientationError,
    },
}

/// Per-cell corrected-fluorescence traces for one imaging session.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectedFluorescenceTraces {
    value: TraceTable,
}

impl CorrectedFluorescenceTraces {
    /// Wraps an already-validated trace table.
    pub fn new(value: TraceTable) -> Self {
        CorrectedFluorescenceTraces { value }
    }

    /// Wraps `table`, optionally restricted to `filter` (for example to drop
    /// ROIs an upstream validity list rejected).
    ///
    /// Ids in `filter` that are absent from `table` are a fatal
    /// [`TableError::RoiFilterMismatch`].
    pub fn from_table(
        table: TraceTable,
        filter: Option<&[RoiId]>,
    ) -> Result<Self, TraceIoError> {
        let value = match filter {
            None => table,
            Some(filter) => table.filtered(filter).context(TableSnafu)?,
        };
        Ok(CorrectedFluorescenceTraces::new(value))
    }

    /// The underlying entity-major table.
    pub fn table(&self) -> &TraceTable {
        &self.value
    }

    /// Consumes the adapter, returning the table.
    pub fn into_table(self) -> TraceTable {
        self.value
    }

    /// Reads traces from an upstream demix output.
    ///
    /// The demix table is already entity-major, so no transpose happens
    /// here, and no filter applies; validity filtering needs ROI-table
    /// knowledge that only exists container-side.
    pub fn from_demix<S: DemixSource>(source: &S) -> Self {
        CorrectedFluorescenceTraces::new(source.data().clone())
    }

    /// Reads the `corrected_fluorescence` series out of a session container.
    ///
    /// Container data is time-major; it is transposed to entity-major
    /// exactly once, and the row index is taken from the block's own ROI
    /// table in container order. An optional `filter` restricts the result
    /// to the given ids (in the filter's order); ids absent from the block
    /// are a fatal [`TableError::RoiFilterMismatch`].
    pub fn from_container(
        container: &SessionContainer,
        filter: Option<&[RoiId]>,
    ) -> Result<Self, TraceIoError> {
        let series = container
            .ophys()
            .series(CORRECTED_FLUORESCENCE)
            .context(ContainerSnafu)?;

        let entity_rows = to_entity_major(series.data());
        let rows = series
            .rois()
            .ids()
            .iter()
            .copied()
            .zip(entity_rows)
            .collect();

        let value = TraceTable::from_parts(series.rois().index_name(), rows, filter)
            .context(TableSnafu)?;

        debug!(
            "read {} from container {}: {} ROIs x {} timepoints",
            CORRECTED_FLUORESCENCE,
            container.identifier(),
            value.len(),
            value.num_timepoints()
        );

        Ok(CorrectedFluorescenceTraces::new(value))
    }

    /// Writes the traces into a container as a new `corrected_fluorescence`
    /// series, borrowing axis metadata from `companion_name`.
    ///
    /// The companion is a previously-written modality of the same session
    /// (typically a baseline-normalized trace set); its ROI table and
    /// timestamp axis are attached to the new block by shared handle, never
    /// copied. All guards run before registration, so on any error the
    /// container is left unmodified.
    pub fn write_to_container(
        &self,
        container: &mut SessionContainer,
        companion_name: &str,
    ) -> Result<(), TraceIoError> {
        ensure!(
            self.value.index_name() == CELL_ROI_ID,
            IndexNameMismatchSnafu {
                expected: CELL_ROI_ID,
                actual: self.value.index_name(),
            }
        );

        let companion = container
            .ophys()
            .series(companion_name)
            .context(MissingCompanionSnafu {
                name: companion_name,
            })?;

        let rois = Arc::clone(companion.rois());
        let timestamps = Arc::clone(companion.timestamps());

        ensure!(
            rois.ids() == self.value.roi_ids().as_slice(),
            CompanionRoiMismatchSnafu {
                companion: companion_name,
            }
        );
        ensure!(
            timestamps.len() == self.value.num_timepoints(),
            TimestampLengthMismatchSnafu {
                timestamp_count: timestamps.len(),
                sample_count: self.value.num_timepoints(),
            }
        );

        // Project rows in the table's own order, then transpose once.
        let entity_rows: Vec<Vec<f64>> = self
            .value
            .rows()
            .map(|(_, samples)| samples.to_vec())
            .collect();
        let data = to_time_major(&entity_rows).context(OrientationSnafu)?;

        let series = RoiResponseSeries::new(CORRECTED_FLUORESCENCE, data, TRACE_UNIT, rois, timestamps)
            .context(ContainerSnafu)?;
        container.ophys_mut().add_series(series).context(ContainerSnafu)?;

        debug!(
            "wrote {} to container {}: {} ROIs x {} timepoints (axes borrowed from {})",
            CORRECTED_FLUORESCENCE,
            container.identifier(),
            self.value.len(),
            self.value.num_timepoints(),
            companion_name
        );

        Ok(())
    }
}
