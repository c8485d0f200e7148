// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use drift_compute::{AssembledSet, ChangePointAssembler, StaticResolver};
use drift_core::{DriftError, RunContext, TimeSeries};
use drift_detect::{EDivisive, EDivisiveConfig, MaskedSeries, RangeFinder, RangeFinderConfig};

/// Runs the full detection pipeline over one series snapshot.
///
/// The series' own revision column doubles as the git history, which is all
/// a standalone JSON input can offer.
pub fn run_detection(
    series: &TimeSeries,
    detector_config: EDivisiveConfig,
    range_config: RangeFinderConfig,
) -> Result<AssembledSet, DriftError> {
    let ctx = RunContext::new();
    let masked = MaskedSeries::from_series(series)?;
    let detector = EDivisive::new(detector_config)?;
    let accepted = detector.find_change_points(&masked.values, &ctx)?;
    let finder = RangeFinder::new(range_config)?;
    let ranges = finder.find_ranges(&masked.values, &accepted)?;
    let resolver = StaticResolver::from_revisions(&series.revisions);
    ChangePointAssembler::new(&resolver).assemble(series, &masked, &accepted, &ranges)
}

/// CLI namespace placeholder.
pub fn crate_name() -> &'static str {
    let _ = (
        drift_core::crate_name(),
        drift_detect::crate_name(),
        drift_compute::crate_name(),
    );
    "drift-cli"
}
