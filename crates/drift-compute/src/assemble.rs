// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::git::GitHistoryResolver;
use drift_core::{
    AlgorithmMetadata, ChangeCategory, ChangePoint, DriftError, RangeMetadata, TimeSeries,
};
use drift_detect::{CandidatePoint, ChangePointRange, MaskedSeries};
use std::borrow::Cow;

pub const ALGORITHM_NAME: &str = "e_divisive_means";

/// Log-ratio of post/pre boundary means, sign-adjusted for metric direction.
/// Negative means indicate a lower-is-better metric stored negated, so the
/// ratio flips to keep the regression sign convention.
pub fn calculate_magnitude(previous_mean: f64, next_mean: f64) -> f64 {
    if previous_mean == 0.0 && next_mean == 0.0 {
        0.0
    } else if previous_mean == 0.0 {
        f64::INFINITY
    } else if next_mean == 0.0 {
        f64::NEG_INFINITY
    } else if next_mean >= 0.0 && previous_mean >= 0.0 {
        (next_mean / previous_mean).ln()
    } else {
        (previous_mean / next_mean).ln()
    }
}

/// Severity band of a magnitude. A magnitude exactly on a band threshold
/// classifies into the less severe band.
pub fn classify_magnitude(magnitude: Option<f64>) -> ChangeCategory {
    let Some(magnitude) = magnitude else {
        return ChangeCategory::Uncategorized;
    };
    if magnitude.is_nan() {
        ChangeCategory::Uncategorized
    } else if magnitude < -0.5 {
        ChangeCategory::MajorRegression
    } else if magnitude < -0.2 {
        ChangeCategory::ModerateRegression
    } else if magnitude < 0.0 {
        ChangeCategory::MinorRegression
    } else if magnitude > 0.5 {
        ChangeCategory::MajorImprovement
    } else if magnitude > 0.2 {
        ChangeCategory::ModerateImprovement
    } else {
        ChangeCategory::MinorImprovement
    }
}

/// Assembled persisted records plus non-fatal notes gathered along the way.
#[derive(Clone, Debug, Default)]
pub struct AssembledSet {
    pub points: Vec<ChangePoint>,
    pub warnings: Vec<String>,
}

/// Turns accepted candidates and their localized ranges into persisted
/// [`ChangePoint`] records.
///
/// Indices are mapped from compacted space back to the original series, the
/// suspect revision range is expanded through the git-history seam, and each
/// record is classified by magnitude. Resolver failure degrades to an empty
/// revision list with a warning; it never aborts the computation.
pub struct ChangePointAssembler<'a> {
    resolver: &'a dyn GitHistoryResolver,
}

impl<'a> ChangePointAssembler<'a> {
    pub fn new(resolver: &'a dyn GitHistoryResolver) -> Self {
        Self { resolver }
    }

    pub fn assemble(
        &self,
        series: &TimeSeries,
        masked: &MaskedSeries,
        candidates: &[CandidatePoint],
        ranges: &[ChangePointRange],
    ) -> Result<AssembledSet, DriftError> {
        if candidates.len() != ranges.len() {
            return Err(DriftError::invalid_input(format!(
                "candidates and ranges must pair up; got {} candidates, {} ranges",
                candidates.len(),
                ranges.len()
            )));
        }

        let mut assembled = AssembledSet::default();
        for (position, (candidate, range)) in candidates.iter().zip(ranges).enumerate() {
            if candidate.index != range.index {
                return Err(DriftError::invalid_input(format!(
                    "candidate/range index mismatch at position {position}: {} vs {}",
                    candidate.index, range.index
                )));
            }

            let start = self.original_index(masked, range.start)?;
            let end = self.original_index(masked, range.end)?;
            let stable_revision = &series.revisions[start];
            let suspect_revision = series.revisions[end].clone();

            let all_suspect_revisions =
                match self.resolver.resolve(stable_revision, &suspect_revision) {
                    Ok(revisions) => revisions,
                    Err(err) => {
                        assembled.warnings.push(format!(
                            "revision history unresolved for '{}'..'{suspect_revision}': {err}",
                            stable_revision
                        ));
                        vec![]
                    }
                };

            let statistics = range.statistics.clone();
            let magnitude = statistics.as_ref().and_then(|stats| {
                match (stats.previous.as_ref(), stats.next.as_ref()) {
                    (Some(previous), Some(next)) => {
                        Some(calculate_magnitude(previous.mean, next.mean))
                    }
                    _ => None,
                }
            });

            assembled.points.push(ChangePoint {
                identifier: series.identifier.clone(),
                suspect_revision,
                all_suspect_revisions,
                probability: candidate.probability,
                order: series.orders[end],
                create_time: series.create_times[end],
                value: series.values[end],
                order_of_change_point: candidates.len() - 1 - position,
                algorithm: Some(AlgorithmMetadata {
                    name: Cow::Borrowed(ALGORITHM_NAME),
                    index: candidate.index,
                    window_size: candidate.window_size,
                    value: candidate.value,
                    value_to_average: candidate.value_to_average,
                    value_to_average_diff: candidate.value_to_average_diff,
                    average: candidate.average,
                    average_diff: candidate.average_diff,
                }),
                range: Some(RangeMetadata {
                    start,
                    end,
                    location: range.location,
                }),
                statistics,
                magnitude,
                category: classify_magnitude(magnitude),
            });
        }
        Ok(assembled)
    }

    fn original_index(&self, masked: &MaskedSeries, compacted: usize) -> Result<usize, DriftError> {
        masked.index_map.get(compacted).copied().ok_or_else(|| {
            DriftError::invalid_input(format!(
                "compacted index {compacted} is out of bounds for index map of length {}",
                masked.index_map.len()
            ))
        })
    }
}
