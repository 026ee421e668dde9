//! In-memory model of a session container's optical-physiology namespace.
//!
//! A [`SessionContainer`] stands in for the structured neurophysiology file
//! this crate reads from and writes into. Only the narrow surface the trace
//! adapter consumes is modeled here:
//!
//! - [`OphysModule`]: the processing namespace holding named
//!   [`RoiResponseSeries`] blocks, with lookup by name and a registration
//!   call that rejects duplicates.
//! - [`RoiResponseSeries`]: one time-series modality: a time-major data
//!   array, a unit label, and shared handles to the ROI table and timestamp
//!   axis it is aligned to.
//!
//! Axis metadata is never copied into a series; blocks of the same session
//! share it through [`RoiTableRef`] / [`TimestampRef`] handles, which is what
//! keeps modalities aligned without duplicating metadata. How the container
//! persists itself is its own concern and not modeled here.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use snafu::prelude::*;

use crate::orientation::TimeMajorMatrix;
use crate::roi::{RoiTableRef, TimestampRef};

/// Errors raised by container lookups and registrations.
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum ContainerError {
    /// No series block with the requested name exists in the namespace.
    #[snafu(display("no series named {name} in ophys namespace"))]
    SeriesNotFound {
        /// The requested series name.
        name: String,
    },

    /// A series block with the same name is already registered.
    #[snafu(display("series {name} already exists in ophys namespace"))]
    SeriesAlreadyExists {
        /// The conflicting series name.
        name: String,
    },

    /// The data array's column count disagrees with the ROI table reference.
    #[snafu(display(
        "series {name}: data has {data_columns} columns but ROI table names {roi_count} ROIs"
    ))]
    RoiAxisMismatch {
        /// Name of the series being created.
        name: String,
        /// Number of columns in the data array.
        data_columns: usize,
        /// Number of ROIs in the referenced table region.
        roi_count: usize,
    },

    /// The data array's row count disagrees with the timestamp reference.
    #[snafu(display(
        "series {name}: data has {data_rows} rows but timestamp axis has {timestamp_count} entries"
    ))]
    TimestampAxisMismatch {
        /// Name of the series being created.
        name: String,
        /// Number of rows in the data array.
        data_rows: usize,
        /// Number of entries in the referenced timestamp axis.
        timestamp_count: usize,
    },
}

/// One named time-series modality inside the ophys namespace.
///
/// Data is stored time-major (rows are timepoints, columns are ROIs in the
/// order given by the ROI table reference). The ROI table and timestamp axis
/// are borrowed handles, shared with whichever sibling series they were
/// first attached to.
#[derive(Debug, Clone)]
pub struct RoiResponseSeries {
    name: String,
    data: TimeMajorMatrix,
    unit: String,
    rois: RoiTableRef,
    timestamps: TimestampRef,
}

impl RoiResponseSeries {
    /// Factory for a new series block.
    ///
    /// Both axes are checked against the data shape up front so that a
    /// registered block can never disagree with its own axis metadata.
    pub fn new(
        name: impl Into<String>,
        data: TimeMajorMatrix,
        unit: impl Into<String>,
        rois: RoiTableRef,
        timestamps: TimestampRef,
    ) -> Result<Self, ContainerError> {
        let name = name.into();
        ensure!(
            data.num_rois() == rois.len(),
            RoiAxisMismatchSnafu {
                name: name.clone(),
                data_columns: data.num_rois(),
                roi_count: rois.len(),
            }
        );
        ensure!(
            data.num_timepoints() == timestamps.len(),
            TimestampAxisMismatchSnafu {
                name: name.clone(),
                data_rows: data.num_timepoints(),
                timestamp_count: timestamps.len(),
            }
        );
        Ok(RoiResponseSeries {
            name,
            data,
            unit: unit.into(),
            rois,
            timestamps,
        })
    }

    /// Name the block is registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Time-major sample array.
    pub fn data(&self) -> &TimeMajorMatrix {
        &self.data
    }

    /// Unit label of the samples.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Borrowed handle to the entity-identifier table.
    pub fn rois(&self) -> &RoiTableRef {
        &self.rois
    }

    /// Borrowed handle to the timestamp axis.
    pub fn timestamps(&self) -> &TimestampRef {
        &self.timestamps
    }
}

/// The optical-physiology processing namespace: named series blocks.
#[derive(Debug, Clone, Default)]
pub struct OphysModule {
    series: BTreeMap<String, RoiResponseSeries>,
}

impl OphysModule {
    /// Creates an empty namespace.
    pub fn new() -> Self {
        OphysModule::default()
    }

    /// Looks up a series block by name.
    pub fn series(&self, name: &str) -> Result<&RoiResponseSeries, ContainerError> {
        self.series.get(name).context(SeriesNotFoundSnafu { name })
    }

    /// True when a series with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.series.contains_key(name)
    }

    /// Registers a series block under its own name.
    ///
    /// A block is attached at most once; re-registering a name fails without
    /// touching the existing block.
    pub fn add_series(&mut self, series: RoiResponseSeries) -> Result<(), ContainerError> {
        ensure!(
            !self.series.contains_key(series.name()),
            SeriesAlreadyExistsSnafu {
                name: series.name(),
            }
        );
        self.series.insert(series.name().to_string(), series);
        Ok(())
    }

    /// Names of all registered series.
    pub fn series_names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    /// Number of registered series.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// True when no series is registered.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// One imaging session's container: identity plus the ophys namespace.
#[derive(Debug, Clone)]
pub struct SessionContainer {
    identifier: String,
    session_start: DateTime<Utc>,
    ophys: OphysModule,
}

impl SessionContainer {
    /// Creates an empty container for a session.
    pub fn new(identifier: impl Into<String>, session_start: DateTime<Utc>) -> Self {
        SessionContainer {
            identifier: identifier.into(),
            session_start,
            ophys: OphysModule::new(),
        }
    }

    /// Session identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// UTC timestamp the session started at.
    pub fn session_start(&self) -> DateTime<Utc> {
        self.session_start
    }

    /// Read access to the ophys namespace.
    pub fn ophys(&self) -> &OphysModule {
        &self.ophys
    }

    /// Write access to the ophys namespace.
    pub fn ophys_mut(&mut self) -> &mut OphysModule {
        &mut self.ophys
    }
}
