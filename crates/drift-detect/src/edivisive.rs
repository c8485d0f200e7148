// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::qhat::{extract_q, qhat_values, QExtract, QHatStrategy};
use drift_core::{DriftError, RunContext, StableRng};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PVALUE: f64 = 0.05;
pub const DEFAULT_PERMUTATIONS: usize = 100;
pub const DEFAULT_SEED: u64 = 1234;
const DEFAULT_CANCEL_CHECK_EVERY: usize = 10;

/// Configuration for [`EDivisive`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EDivisiveConfig {
    pub pvalue: f64,
    pub permutations: usize,
    pub seed: u64,
    pub strategy: QHatStrategy,
    pub cancel_check_every: usize,
}

impl Default for EDivisiveConfig {
    fn default() -> Self {
        Self {
            pvalue: DEFAULT_PVALUE,
            permutations: DEFAULT_PERMUTATIONS,
            seed: DEFAULT_SEED,
            strategy: QHatStrategy::Incremental,
            cancel_check_every: DEFAULT_CANCEL_CHECK_EVERY,
        }
    }
}

impl EDivisiveConfig {
    fn validate(&self) -> Result<(), DriftError> {
        if !(self.pvalue > 0.0 && self.pvalue < 1.0) {
            return Err(DriftError::invalid_input(format!(
                "EDivisiveConfig.pvalue must be in (0, 1); got {}",
                self.pvalue
            )));
        }
        if self.permutations == 0 {
            return Err(DriftError::invalid_input(
                "EDivisiveConfig.permutations must be >= 1; got 0",
            ));
        }
        Ok(())
    }

    fn normalized_cancel_check_every(&self) -> usize {
        self.cancel_check_every.max(1)
    }
}

/// An accepted split with its significance and raw statistic fields, in
/// compacted-series index space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CandidatePoint {
    pub index: usize,
    pub value: f64,
    pub value_to_average: f64,
    pub value_to_average_diff: f64,
    pub average: f64,
    pub average_diff: f64,
    pub window_size: usize,
    pub probability: f64,
}

impl CandidatePoint {
    fn from_extract(extract: QExtract, offset: usize, probability: f64) -> Self {
        Self {
            index: offset + extract.index,
            value: extract.value,
            value_to_average: extract.value_to_average,
            value_to_average_diff: extract.value_to_average_diff,
            average: extract.average,
            average_diff: extract.average_diff,
            window_size: extract.window_size,
            probability,
        }
    }
}

/// Hierarchical E-Divisive change-point search with a pooled permutation
/// significance test.
///
/// Each round scans the sub-series between already-accepted splits, takes
/// the globally best candidate, and tests it against the permutation
/// distribution pooled across all current windows. The shuffle RNG is an
/// explicit [`StableRng`] seeded once per call, so identical input and seed
/// reproduce bit-identical accepted indices and statistics.
#[derive(Clone, Debug)]
pub struct EDivisive {
    config: EDivisiveConfig,
}

impl EDivisive {
    pub fn new(config: EDivisiveConfig) -> Result<Self, DriftError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EDivisiveConfig {
        &self.config
    }

    /// Finds all significant splits, sorted by index ascending.
    pub fn find_change_points(
        &self,
        series: &[f64],
        ctx: &RunContext<'_>,
    ) -> Result<Vec<CandidatePoint>, DriftError> {
        self.config.validate()?;

        let mut rng = StableRng::new(self.config.seed);
        let mut permuted = series.to_vec();
        let mut accepted: Vec<CandidatePoint> = vec![];
        let mut rounds = 0usize;
        let mut permutations_run = 0usize;
        let cancel_check_every = self.config.normalized_cancel_check_every();

        loop {
            ctx.check_cancelled()?;
            rounds += 1;

            let windows = self.window_bounds(&accepted, series.len());
            let Some((best, offset)) = self.best_candidate(series, &windows, ctx)? else {
                break;
            };
            let candidate_q = best.value;

            // each round draws its null from the current windows' own
            // sub-series; shuffles from earlier rounds must not leak in
            permuted.copy_from_slice(series);

            let mut at_least_as_extreme = 0usize;
            for permutation in 0..self.config.permutations {
                ctx.check_cancelled_every(permutation, cancel_check_every)?;
                permutations_run += 1;

                let mut permuted_best = f64::NEG_INFINITY;
                for pair in windows.windows(2) {
                    let (lo, hi) = (pair[0], pair[1]);
                    rng.shuffle(&mut permuted[lo..hi])?;
                    let q = qhat_values(&permuted[lo..hi], self.config.strategy)?;
                    permuted_best = permuted_best.max(extract_q(&q).value);
                }
                if permuted_best >= candidate_q {
                    at_least_as_extreme += 1;
                }
            }

            let probability_not_significant =
                at_least_as_extreme as f64 / (self.config.permutations + 1) as f64;
            if probability_not_significant > self.config.pvalue {
                break;
            }

            accepted.push(CandidatePoint::from_extract(
                best,
                offset,
                1.0 - probability_not_significant,
            ));
        }

        accepted.sort_by_key(|candidate| candidate.index);
        ctx.record_scalar("edivisive.rounds", rounds as f64);
        ctx.record_scalar("edivisive.permutations_run", permutations_run as f64);
        ctx.record_scalar("edivisive.accepted", accepted.len() as f64);
        Ok(accepted)
    }

    /// `[0, accepted..., len]`, the scan boundaries of the current round.
    fn window_bounds(&self, accepted: &[CandidatePoint], len: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = accepted.iter().map(|candidate| candidate.index).collect();
        indices.sort_unstable();
        let mut windows = Vec::with_capacity(indices.len() + 2);
        windows.push(0);
        windows.extend(indices);
        windows.push(len);
        windows
    }

    /// Best extract across every window, with its window offset. `None`
    /// when no window produced a positive-length extract (empty series).
    fn best_candidate(
        &self,
        series: &[f64],
        windows: &[usize],
        ctx: &RunContext<'_>,
    ) -> Result<Option<(QExtract, usize)>, DriftError> {
        let mut best: Option<(QExtract, usize)> = None;
        for pair in windows.windows(2) {
            ctx.check_cancelled()?;
            let (lo, hi) = (pair[0], pair[1]);
            if lo == hi {
                continue;
            }
            let q = qhat_values(&series[lo..hi], self.config.strategy)?;
            let extract = extract_q(&q);
            let replace = match &best {
                Some((current, _)) => extract.value > current.value,
                None => true,
            };
            if replace {
                best = Some((extract, lo));
            }
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::{CandidatePoint, EDivisive, EDivisiveConfig};
    use drift_core::{CancelToken, RunContext};

    fn detector() -> EDivisive {
        EDivisive::new(EDivisiveConfig::default()).expect("default config should be valid")
    }

    fn step_series() -> Vec<f64> {
        let mut series = vec![50.0; 15];
        series.extend(std::iter::repeat(100.0).take(15));
        series
    }

    #[test]
    fn config_validation_rejects_bad_pvalue_and_zero_permutations() {
        let err = EDivisive::new(EDivisiveConfig {
            pvalue: 1.0,
            ..EDivisiveConfig::default()
        })
        .expect_err("pvalue of 1.0 must fail");
        assert!(err.to_string().contains("pvalue"));

        let err = EDivisive::new(EDivisiveConfig {
            permutations: 0,
            ..EDivisiveConfig::default()
        })
        .expect_err("zero permutations must fail");
        assert!(err.to_string().contains("permutations"));
    }

    #[test]
    fn constant_series_yields_no_change_points() {
        let accepted = detector()
            .find_change_points(&[50.0; 30], &RunContext::new())
            .expect("constant series should detect cleanly");
        assert!(accepted.is_empty());
    }

    #[test]
    fn empty_and_short_series_yield_no_change_points() {
        for len in 0..5 {
            let series: Vec<f64> = (0..len).map(|i| i as f64 * 10.0).collect();
            let accepted = detector()
                .find_change_points(&series, &RunContext::new())
                .expect("short series should detect cleanly");
            assert!(accepted.is_empty(), "len={len} should accept nothing");
        }
    }

    #[test]
    fn step_series_yields_one_fully_significant_point_at_the_boundary() {
        let accepted = detector()
            .find_change_points(&step_series(), &RunContext::new())
            .expect("step series should detect cleanly");
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].index, 15);
        assert_eq!(accepted[0].probability, 1.0);
        assert_eq!(accepted[0].window_size, 30);
    }

    #[test]
    fn second_round_detects_a_much_smaller_step_than_the_first() {
        // the 0 -> 100 jump dominates round one; round two must judge the
        // 100 -> 101 jump against its own window's sub-series, not against
        // values shuffled in from the rest of the series
        let mut series = vec![0.0; 15];
        series.extend(std::iter::repeat(100.0).take(15));
        series.extend(std::iter::repeat(101.0).take(15));

        let accepted = detector()
            .find_change_points(&series, &RunContext::new())
            .expect("unequal double step should detect cleanly");
        let indices: Vec<usize> = accepted.iter().map(|point| point.index).collect();
        assert_eq!(indices, vec![15, 30]);
        assert!(accepted.iter().all(|point| point.probability >= 0.95));
    }

    #[test]
    fn two_steps_yield_two_points_sorted_by_index() {
        let mut series = vec![10.0; 20];
        series.extend(std::iter::repeat(60.0).take(20));
        series.extend(std::iter::repeat(10.0).take(20));

        let accepted = detector()
            .find_change_points(&series, &RunContext::new())
            .expect("double step should detect cleanly");
        assert_eq!(accepted.len(), 2);
        assert_eq!(accepted[0].index, 20);
        assert_eq!(accepted[1].index, 40);
        assert!(accepted.iter().all(|point| point.probability >= 0.95));
    }

    #[test]
    fn identical_seed_and_input_are_bit_identical() {
        let first = detector()
            .find_change_points(&step_series(), &RunContext::new())
            .expect("first run should succeed");
        let second = detector()
            .find_change_points(&step_series(), &RunContext::new())
            .expect("second run should succeed");
        assert_eq!(first, second);

        let bits = |points: &[CandidatePoint]| -> Vec<(usize, u64, u64)> {
            points
                .iter()
                .map(|point| {
                    (
                        point.index,
                        point.value.to_bits(),
                        point.probability.to_bits(),
                    )
                })
                .collect()
        };
        assert_eq!(bits(&first), bits(&second));
    }

    #[test]
    fn cancellation_aborts_the_search() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let ctx = RunContext::new().with_cancel(&cancel);
        let err = detector()
            .find_change_points(&step_series(), &ctx)
            .expect_err("cancelled context must abort");
        assert_eq!(err.to_string(), "cancelled");
    }
}
