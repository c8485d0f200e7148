// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::edivisive::CandidatePoint;
use drift_core::{describe, DriftError, Location, SegmentStatistics};
use std::collections::HashMap;

pub const DEFAULT_WEIGHTING: f64 = 0.001;
pub const DEFAULT_BOUNDS: usize = 1;
const MAX_WEIGHT_SAMPLES: usize = 100;

/// Configuration for [`RangeFinder`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RangeFinderConfig {
    /// Exponential decay control: the weight curve is sampled out to the
    /// `(1 - weighting)` quantile of the standard exponential distribution,
    /// so smaller values decay faster and near-candidate points dominate.
    pub weighting: f64,
    /// How many positions on the chosen side are examined for the refined
    /// boundary.
    pub bounds: usize,
}

impl Default for RangeFinderConfig {
    fn default() -> Self {
        Self {
            weighting: DEFAULT_WEIGHTING,
            bounds: DEFAULT_BOUNDS,
        }
    }
}

impl RangeFinderConfig {
    fn validate(&self) -> Result<(), DriftError> {
        if !(self.weighting > 0.0 && self.weighting < 1.0) {
            return Err(DriftError::invalid_input(format!(
                "RangeFinderConfig.weighting must be in (0, 1); got {}",
                self.weighting
            )));
        }
        if self.bounds == 0 {
            return Err(DriftError::invalid_input(
                "RangeFinderConfig.bounds must be >= 1; got 0",
            ));
        }
        Ok(())
    }
}

/// A localized boundary for one accepted candidate, in compacted-series
/// index space. `[start, end)` with `end - start == 1`: `start` is the last
/// stable position, `end` the first shifted one. `previous`/`next` link to
/// the neighboring boundaries so the chain partitions `[0, len)`.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangePointRange {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub previous: usize,
    pub next: usize,
    pub location: Location,
    pub statistics: Option<SegmentStatistics>,
}

/// Exponentially decaying weights with `weights[0] = 1`.
///
/// Up to 100 points sampled linearly from 1 to the standard-exponential
/// `(1 - weighting)` quantile, evaluated under the exponential PDF and
/// normalized by the first sample.
pub fn exponential_weights(size: usize, weighting: f64) -> Result<Vec<f64>, DriftError> {
    if !(weighting > 0.0 && weighting < 1.0) {
        return Err(DriftError::invalid_input(format!(
            "weighting must be in (0, 1); got {weighting}"
        )));
    }
    if size == 0 {
        return Ok(vec![]);
    }

    let num = size.min(MAX_WEIGHT_SAMPLES);
    if num == 1 {
        return Ok(vec![1.0]);
    }

    // expon.ppf(1 - weighting) = -ln(weighting)
    let stop = -weighting.ln();
    let step = (stop - 1.0) / (num - 1) as f64;
    let weights = (0..num)
        .map(|i| {
            let x = 1.0 + step * i as f64;
            // pdf(x) / pdf(1)
            (-(x - 1.0)).exp()
        })
        .collect();
    Ok(weights)
}

fn mean(segment: &[f64]) -> f64 {
    if segment.is_empty() {
        f64::NAN
    } else {
        segment.iter().sum::<f64>() / segment.len() as f64
    }
}

/// Refines one candidate into its `(start, end, location)` boundary.
///
/// `prev_index`/`next_index` are the neighboring accepted indices (or the
/// series borders). The side whose average deviates more from the candidate
/// value hosts the jump; a side without enough data for an average cannot
/// host it, so a NaN average forces the opposite location.
fn select_start_end(
    series: &[f64],
    prev_index: usize,
    index: usize,
    next_index: usize,
    weighting: f64,
    bounds: usize,
) -> Result<(usize, usize, Location), DriftError> {
    if next_index == prev_index {
        return Ok((prev_index, prev_index + 1, Location::Ahead));
    }

    let value = series[index];
    let behind_lo = prev_index;
    let behind_hi = index.saturating_sub(1).max(behind_lo);
    let behind_average = mean(&series[behind_lo..behind_hi]);
    let ahead_lo = (index + 1).min(next_index);
    let ahead_average = mean(&series[ahead_lo..next_index]);

    if behind_average.is_nan() && ahead_average.is_nan() {
        return Ok(boundary_at(index, prev_index, next_index, series.len(), Location::Ahead));
    }
    if behind_average.to_bits() == ahead_average.to_bits() {
        return Ok(boundary_at(index, prev_index, next_index, series.len(), Location::Ahead));
    }

    let location = if behind_average.is_nan() {
        Location::Ahead
    } else if ahead_average.is_nan() {
        Location::Behind
    } else if (ahead_average - value).abs() > (behind_average - value).abs() {
        Location::Ahead
    } else {
        Location::Behind
    };

    let weights = exponential_weights(bounds, weighting)?;
    let opposite_average = match location {
        Location::Behind => ahead_average,
        Location::Ahead => behind_average,
    };

    // weights[0] sits on the candidate; walk outward on the chosen side
    let mut best_position = index;
    let mut best_score = f64::NEG_INFINITY;
    for (step, &weight) in weights.iter().enumerate() {
        let position = match location {
            Location::Behind => {
                let Some(position) = index.checked_sub(step) else {
                    break;
                };
                if position < prev_index {
                    break;
                }
                position
            }
            Location::Ahead => {
                let position = index + step;
                if position >= next_index.min(series.len()) {
                    break;
                }
                position
            }
        };

        let deviation = series[position] - opposite_average;
        let score = weight * deviation * deviation;
        if score > best_score {
            best_score = score;
            best_position = position;
        }
    }

    Ok(boundary_at(
        best_position,
        prev_index,
        next_index,
        series.len(),
        location,
    ))
}

/// Clamps a refined position and expresses it as a `[start, end)` pair.
fn boundary_at(
    position: usize,
    prev_index: usize,
    next_index: usize,
    len: usize,
    location: Location,
) -> (usize, usize, Location) {
    let clamped = position
        .clamp(prev_index, next_index)
        .clamp(1, len.saturating_sub(1).max(1));
    (clamped - 1, clamped, location)
}

/// Localizes every accepted candidate, links the resulting ranges, and
/// attaches segment statistics.
#[derive(Clone, Debug, Default)]
pub struct RangeFinder {
    config: RangeFinderConfig,
}

impl RangeFinder {
    pub fn new(config: RangeFinderConfig) -> Result<Self, DriftError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RangeFinderConfig {
        &self.config
    }

    /// Builds the linked, statistics-bearing ranges for sorted accepted
    /// candidates. Candidates must be sorted by index ascending.
    pub fn find_ranges(
        &self,
        series: &[f64],
        accepted: &[CandidatePoint],
    ) -> Result<Vec<ChangePointRange>, DriftError> {
        self.config.validate()?;
        if accepted.is_empty() {
            return Ok(vec![]);
        }
        if let Some(pair) = accepted.windows(2).find(|pair| pair[1].index <= pair[0].index) {
            return Err(DriftError::invalid_input(format!(
                "accepted candidates must be sorted and unique; got {} before {}",
                pair[0].index, pair[1].index
            )));
        }
        if accepted[accepted.len() - 1].index >= series.len() {
            return Err(DriftError::invalid_input(format!(
                "candidate index {} is out of bounds for series of length {}",
                accepted[accepted.len() - 1].index,
                series.len()
            )));
        }

        let mut ranges = Vec::with_capacity(accepted.len());
        for (position, candidate) in accepted.iter().enumerate() {
            let prev_index = if position == 0 {
                0
            } else {
                accepted[position - 1].index
            };
            let next_index = if position + 1 == accepted.len() {
                series.len()
            } else {
                accepted[position + 1].index
            };

            let (start, end, location) = select_start_end(
                series,
                prev_index,
                candidate.index,
                next_index,
                self.config.weighting,
                self.config.bounds,
            )?;
            ranges.push(ChangePointRange {
                index: candidate.index,
                start,
                end,
                previous: 0,
                next: 0,
                location,
                statistics: None,
            });
        }

        link_ordered_change_points(&mut ranges, series);
        Ok(ranges)
    }
}

/// Links consecutive ranges and attaches descriptive statistics for the
/// stable segments on either side, memoized by segment bounds.
pub(crate) fn link_ordered_change_points(ranges: &mut [ChangePointRange], series: &[f64]) {
    if ranges.is_empty() {
        return;
    }

    ranges[0].previous = 0;
    let last = ranges.len() - 1;
    ranges[last].next = series.len();
    for i in 0..last {
        ranges[i].next = ranges[i + 1].start;
        ranges[i + 1].previous = ranges[i].end;
    }

    let mut memo: HashMap<(usize, usize), Option<drift_core::DescriptiveStats>> = HashMap::new();
    let mut described = |lo: usize, hi: usize, series: &[f64]| {
        memo.entry((lo, hi))
            .or_insert_with(|| describe(&series[lo..hi]))
            .clone()
    };

    for range in ranges.iter_mut() {
        let previous = described(range.previous, range.start, series);
        let next = described(range.end, range.next, series);
        range.statistics = Some(SegmentStatistics { previous, next });
    }
}
