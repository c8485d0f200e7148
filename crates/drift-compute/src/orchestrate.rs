// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::assemble::{ChangePointAssembler, ALGORITHM_NAME};
use crate::git::GitHistoryResolver;
use drift_core::{ChangePoint, DriftError, RunContext, TestIdentifier};
use drift_detect::{
    EDivisive, EDivisiveConfig, MaskedSeries, RangeFinder, RangeFinderConfig,
};
use drift_store::{ChangePointStore, ReplaceOutcome, RetryPolicy};
use rayon::prelude::*;
use std::borrow::Cow;
use std::time::{Duration, Instant};

/// Knobs for one orchestrator instance.
#[derive(Clone, Debug, Default)]
pub struct OrchestratorConfig {
    /// Minimum number of raw points a resumed tail must cover before prior
    /// change points are trusted. `None` (or 0) always recomputes the full
    /// series.
    pub min_points: Option<usize>,
    pub detector: EDivisiveConfig,
    pub range_finder: RangeFinderConfig,
    pub retry: RetryPolicy,
}

/// Run report emitted alongside the outcome.
#[derive(Clone, Debug)]
pub struct Diagnostics {
    pub algorithm: Cow<'static, str>,
    pub seed: u64,
    pub elapsed: Duration,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
}

/// What one identifier's computation did.
#[derive(Clone, Debug)]
pub struct ComputeOutcome {
    pub identifier: TestIdentifier,
    pub resume_point: Option<i64>,
    pub computed: usize,
    /// `None` when the recomputed set matched the persisted tail and the
    /// write was skipped.
    pub replace: Option<ReplaceOutcome>,
    pub diagnostics: Diagnostics,
}

/// Per-identifier results of a batch run. One identifier's failure never
/// aborts the others.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<ComputeOutcome>,
    pub failed: Vec<(TestIdentifier, DriftError)>,
}

impl BatchSummary {
    pub fn is_fully_successful(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Idempotent compute-and-persist driver for one store.
///
/// Per identifier: pick the resume point from the store's bucketed
/// aggregation, fetch the untrusted tail, run mask, detection, range
/// localization and assembly, then atomically replace the persisted tail.
/// The write is skipped entirely when the recomputed set equals what is
/// already persisted, so re-runs without new data leave the store untouched.
/// The whole fetch-compute-commit sequence replays under the retry policy on
/// transient storage failures.
pub struct ComputeOrchestrator<'a> {
    min_points: Option<usize>,
    detector: EDivisive,
    finder: RangeFinder,
    retry: RetryPolicy,
    store: &'a dyn ChangePointStore,
    resolver: &'a dyn GitHistoryResolver,
}

impl<'a> ComputeOrchestrator<'a> {
    pub fn new(
        config: OrchestratorConfig,
        store: &'a dyn ChangePointStore,
        resolver: &'a dyn GitHistoryResolver,
    ) -> Result<Self, DriftError> {
        Ok(Self {
            min_points: config.min_points,
            detector: EDivisive::new(config.detector)?,
            finder: RangeFinder::new(config.range_finder)?,
            retry: config.retry,
            store,
            resolver,
        })
    }

    /// Runs the full sequence for one identifier, replayed on transient
    /// storage failures.
    pub fn compute(
        &self,
        identifier: &TestIdentifier,
        ctx: &RunContext<'_>,
    ) -> Result<ComputeOutcome, DriftError> {
        self.retry.run(|| self.compute_once(identifier, ctx))
    }

    /// Runs every identifier in parallel. Failures are collected, never
    /// propagated across identifiers.
    pub fn compute_batch(
        &self,
        identifiers: &[TestIdentifier],
        ctx: &RunContext<'_>,
    ) -> BatchSummary {
        let results: Vec<(TestIdentifier, Result<ComputeOutcome, DriftError>)> = identifiers
            .par_iter()
            .map(|identifier| (identifier.clone(), self.compute(identifier, ctx)))
            .collect();

        let mut summary = BatchSummary::default();
        for (identifier, result) in results {
            match result {
                Ok(outcome) => summary.succeeded.push(outcome),
                Err(err) => summary.failed.push((identifier, err)),
            }
        }
        summary
    }

    fn compute_once(
        &self,
        identifier: &TestIdentifier,
        ctx: &RunContext<'_>,
    ) -> Result<ComputeOutcome, DriftError> {
        let started = Instant::now();
        let mut notes = vec![];

        let resume_point = self.resume_point(identifier)?;
        if let Some(resume) = resume_point {
            notes.push(format!("resuming after trusted order {resume}"));
        }

        let series = self.store.fetch_series(identifier, resume_point)?;
        let masked = MaskedSeries::from_series(&series)?;
        let accepted = self.detector.find_change_points(&masked.values, ctx)?;
        let ranges = self.finder.find_ranges(&masked.values, &accepted)?;
        let assembled =
            ChangePointAssembler::new(self.resolver).assemble(&series, &masked, &accepted, &ranges)?;

        let persisted = self.store.fetch_change_points(identifier)?;
        let tail: Vec<&ChangePoint> = persisted
            .iter()
            .filter(|point| resume_point.map_or(true, |resume| point.order > resume))
            .collect();
        let unchanged = tail.len() == assembled.points.len()
            && tail
                .iter()
                .zip(&assembled.points)
                .all(|(existing, recomputed)| *existing == recomputed);

        let replace = if unchanged {
            notes.push("persisted tail already current; write skipped".to_string());
            None
        } else {
            Some(
                self.store
                    .replace_change_points(identifier, resume_point, &assembled.points)?,
            )
        };

        ctx.record_scalar("orchestrate.computed", assembled.points.len() as f64);
        ctx.record_scalar("orchestrate.written", u8::from(replace.is_some()) as f64);

        Ok(ComputeOutcome {
            identifier: identifier.clone(),
            resume_point,
            computed: assembled.points.len(),
            replace,
            diagnostics: Diagnostics {
                algorithm: Cow::Borrowed(ALGORITHM_NAME),
                seed: self.detector.config().seed,
                elapsed: started.elapsed(),
                notes,
                warnings: assembled.warnings,
            },
        })
    }

    /// Most recent persisted boundary whose cumulative newer-point count
    /// reaches `min_points`; everything at or below it is trusted.
    fn resume_point(&self, identifier: &TestIdentifier) -> Result<Option<i64>, DriftError> {
        let min_points = match self.min_points {
            Some(min_points) if min_points > 0 => min_points,
            _ => return Ok(None),
        };

        let mut cumulative = 0usize;
        for bucket in self.store.resume_buckets(identifier)? {
            cumulative += bucket.count;
            if cumulative >= min_points {
                return Ok(Some(bucket.boundary_order));
            }
        }
        Ok(None)
    }
}
