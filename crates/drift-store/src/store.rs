// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use drift_core::{ChangePoint, DriftError, TestIdentifier, TimeSeries};

/// One bucket of the resume-point aggregation: how many raw series points
/// fall between this persisted change-point boundary and the next newer one.
/// Buckets are returned newest to oldest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResumeBucket {
    pub boundary_order: i64,
    pub count: usize,
}

/// What the atomic replace actually changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub deleted: usize,
    pub inserted: usize,
    pub relinked_previous: bool,
}

/// Opaque document store owning the per-identifier change-point sets.
///
/// Implementations must make `replace_change_points` all-or-nothing: the
/// delete of the stale tail, the insert of the recomputed points, and the
/// relink of the preceding record's trailing statistics land in one
/// transaction or not at all. Transient failures surface as
/// [`DriftError::TransientStorage`] and are safe to retry wholesale.
pub trait ChangePointStore: Send + Sync {
    /// The identifier's series, optionally restricted to `order > order_gt`.
    fn fetch_series(
        &self,
        identifier: &TestIdentifier,
        order_gt: Option<i64>,
    ) -> Result<TimeSeries, DriftError>;

    /// Persisted change points for the identifier, ascending by `order`.
    fn fetch_change_points(
        &self,
        identifier: &TestIdentifier,
    ) -> Result<Vec<ChangePoint>, DriftError>;

    /// Bucketed counts of raw points per persisted boundary, newest first.
    fn resume_buckets(&self, identifier: &TestIdentifier) -> Result<Vec<ResumeBucket>, DriftError>;

    /// Atomically replaces the tail `order > resume_point` (the whole set
    /// when `resume_point` is `None`) with `points`, relinking the record
    /// immediately below the boundary when new points were inserted.
    fn replace_change_points(
        &self,
        identifier: &TestIdentifier,
        resume_point: Option<i64>,
        points: &[ChangePoint],
    ) -> Result<ReplaceOutcome, DriftError>;
}
