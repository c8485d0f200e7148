// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

mod change_point;
mod context;
mod errors;
mod rng;
mod stats;
mod time_series;

pub use change_point::{
    AlgorithmMetadata, ChangeCategory, ChangePoint, Location, RangeMetadata, SegmentStatistics,
};
pub use context::{CancelToken, RunContext, TelemetrySink};
pub use errors::DriftError;
pub use rng::StableRng;
pub use stats::{describe, DescriptiveStats};
pub use time_series::{TestIdentifier, TimeSeries};

/// Core shared types for drift.
pub fn crate_name() -> &'static str {
    "drift-core"
}
