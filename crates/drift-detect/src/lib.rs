// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

mod edivisive;
mod mask;
mod qhat;
mod range;

pub use edivisive::{CandidatePoint, EDivisive, EDivisiveConfig, DEFAULT_PERMUTATIONS,
    DEFAULT_PVALUE, DEFAULT_SEED};
pub use mask::{exclusion_mask, MaskedSeries};
pub use qhat::{extract_q, qhat_values, QExtract, QHatStrategy, QHatValues};
pub use range::{
    exponential_weights, ChangePointRange, RangeFinder, RangeFinderConfig, DEFAULT_BOUNDS,
    DEFAULT_WEIGHTING,
};

/// Detection algorithms for drift.
pub fn crate_name() -> &'static str {
    "drift-detect"
}
