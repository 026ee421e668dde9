//! Core adapter between demix trace output and ophys session containers.
//!
//! This crate moves per-cell corrected-fluorescence time series between an
//! in-memory entity-major table and two external representations:
//!
//! - The raw output of an upstream demix (signal-separation) step, exposed
//!   through the narrow [`demix::DemixSource`] contract.
//! - The optical-physiology namespace of a structured session container,
//!   where multiple trace modalities live side by side, time-major on the
//!   storage side and aligned through shared ROI-table and timestamp axis
//!   handles (`container` module).
//!
//! The precision-critical pieces are isolated into small modules:
//!
//! - `table`: the entity-major [`table::TraceTable`] with construction-time
//!   validation and order-preserving ROI filtering.
//! - `orientation`: the named entity-major ⇄ time-major transforms, applied
//!   exactly once per direction so a silent transpose cannot slip in.
//! - `traces`: the [`traces::CorrectedFluorescenceTraces`] adapter tying it
//!   together: read from either source, write back into a container while
//!   borrowing a companion modality's axis metadata.
//!
//! Persistence of the container itself is out of scope; this crate only
//! models the surface it reads and writes.
#![deny(missing_docs)]
pub mod container;
pub mod demix;
pub mod orientation;
pub mod roi;
pub mod table;
pub mod traces;

pub use container::{OphysModule, RoiResponseSeries, SessionContainer};
pub use demix::{DemixFile, DemixSource};
pub use orientation::TimeMajorMatrix;
pub use roi::{CELL_ROI_ID, RoiId, RoiTableRef, RoiTableRegion, TimestampRef, TimestampVector};
pub use table::TraceTable;
pub use traces::{CORRECTED_FLUORESCENCE, CorrectedFluorescenceTraces};
