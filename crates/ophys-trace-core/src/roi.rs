//! ROI identifiers and shared axis metadata.
//!
//! Every trace row in this crate is keyed by a [`RoiId`], an opaque,
//! externally-assigned identifier for an imaged cell. Series blocks inside a
//! session container do not own private copies of their axis metadata;
//! instead they hold shared handles to:
//!
//! - A [`RoiTableRegion`]: the ordered entity-identifier table naming which
//!   ROI each data column belongs to.
//! - A [`TimestampVector`]: the acquisition timestamps shared by every
//!   modality of the same imaging session.
//!
//! Sharing is expressed with [`Arc`] handles ([`RoiTableRef`],
//! [`TimestampRef`]) so that a newly written modality references the same
//! axis objects as the companion modality it aligns to, rather than
//! duplicating them.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Canonical index name for ROI-keyed trace tables.
pub const CELL_ROI_ID: &str = "cell_roi_id";

/// Opaque, externally-assigned identifier of an imaged ROI.
///
/// Ids are unique within a session but carry no ordering semantics; row order
/// in a [`crate::table::TraceTable`] is positional, not id-sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoiId(pub i64);

impl fmt::Display for RoiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered entity-identifier table attached to a series block.
///
/// The region records which ROI each data column belongs to, in column order,
/// together with the index name under which those ids are keyed (normally
/// [`CELL_ROI_ID`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoiTableRegion {
    index_name: String,
    ids: Vec<RoiId>,
}

impl RoiTableRegion {
    /// Creates a region with an explicit index name.
    pub fn new(index_name: impl Into<String>, ids: Vec<RoiId>) -> Self {
        RoiTableRegion {
            index_name: index_name.into(),
            ids,
        }
    }

    /// Creates a region keyed by the canonical [`CELL_ROI_ID`] index name.
    pub fn cell_roi_ids(ids: Vec<RoiId>) -> Self {
        RoiTableRegion::new(CELL_ROI_ID, ids)
    }

    /// Name of the index the ids are keyed under.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Ids in column order.
    pub fn ids(&self) -> &[RoiId] {
        &self.ids
    }

    /// Number of ROIs in the region.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when the region names no ROIs.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Ordered acquisition timestamps of an imaging session, in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampVector(Vec<f64>);

impl TimestampVector {
    /// Creates a timestamp vector from per-frame times in seconds.
    pub fn new(seconds: Vec<f64>) -> Self {
        TimestampVector(seconds)
    }

    /// Timestamps in acquisition order.
    pub fn seconds(&self) -> &[f64] {
        &self.0
    }

    /// Number of timepoints.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the session has no timepoints.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Shared handle to a series block's entity-identifier table.
pub type RoiTableRef = Arc<RoiTableRegion>;

/// Shared handle to a session's timestamp axis.
pub type TimestampRef = Arc<TimestampVector>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roi_id_transparent_serialization() {
        let id = RoiId(42);
        let json = serde_json::to_string(&id).expect("serialize");

        // Should be a plain integer, not {"0": 42}.
        assert_eq!(json, "42");

        let decoded: RoiId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, decoded);
    }

    #[test]
    fn cell_roi_ids_uses_canonical_index_name() {
        let region = RoiTableRegion::cell_roi_ids(vec![RoiId(7), RoiId(9)]);
        assert_eq!(region.index_name(), CELL_ROI_ID);
        assert_eq!(region.ids(), &[RoiId(7), RoiId(9)]);
        assert_eq!(region.len(), 2);
    }

    #[test]
    fn shared_region_handles_point_at_same_allocation() {
        let region: RoiTableRef = Arc::new(RoiTableRegion::cell_roi_ids(vec![RoiId(1)]));
        let borrowed = Arc::clone(&region);
        assert!(Arc::ptr_eq(&region, &borrowed));
    }
}
