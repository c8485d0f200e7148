// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::store::{ChangePointStore, ReplaceOutcome, ResumeBucket};
use drift_core::{ChangePoint, DriftError, TestIdentifier, TimeSeries};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    series: HashMap<TestIdentifier, TimeSeries>,
    change_points: HashMap<TestIdentifier, Vec<ChangePoint>>,
    pending_transient_failures: usize,
    writes: usize,
}

/// In-memory reference implementation of [`ChangePointStore`].
///
/// A single mutex is the transaction scope: every storage operation is
/// all-or-nothing under the lock. Transient failures can be injected to
/// exercise retry paths.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds or replaces one identifier's series snapshot.
    pub fn insert_series(&self, series: TimeSeries) -> Result<(), DriftError> {
        series.validate()?;
        let mut inner = self.lock()?;
        inner.series.insert(series.identifier.clone(), series);
        Ok(())
    }

    /// The next `count` storage operations fail with a transient error.
    pub fn inject_transient_failures(&self, count: usize) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.pending_transient_failures = count;
        }
    }

    /// How many replace calls actually mutated state.
    pub fn write_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.writes).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, DriftError> {
        self.inner
            .lock()
            .map_err(|_| DriftError::transient_storage("store mutex poisoned"))
    }

    fn check_injected_failure(inner: &mut Inner, operation: &str) -> Result<(), DriftError> {
        if inner.pending_transient_failures > 0 {
            inner.pending_transient_failures -= 1;
            return Err(DriftError::transient_storage(format!(
                "injected failure during {operation}"
            )));
        }
        Ok(())
    }
}

impl ChangePointStore for MemoryStore {
    fn fetch_series(
        &self,
        identifier: &TestIdentifier,
        order_gt: Option<i64>,
    ) -> Result<TimeSeries, DriftError> {
        let mut inner = self.lock()?;
        Self::check_injected_failure(&mut inner, "fetch_series")?;
        let series = inner.series.get(identifier).ok_or_else(|| {
            DriftError::invalid_input(format!("no series stored for '{identifier}'"))
        })?;
        Ok(match order_gt {
            Some(order) => series.tail_after_order(order),
            None => series.clone(),
        })
    }

    fn fetch_change_points(
        &self,
        identifier: &TestIdentifier,
    ) -> Result<Vec<ChangePoint>, DriftError> {
        let mut inner = self.lock()?;
        Self::check_injected_failure(&mut inner, "fetch_change_points")?;
        Ok(inner
            .change_points
            .get(identifier)
            .cloned()
            .unwrap_or_default())
    }

    fn resume_buckets(&self, identifier: &TestIdentifier) -> Result<Vec<ResumeBucket>, DriftError> {
        let mut inner = self.lock()?;
        Self::check_injected_failure(&mut inner, "resume_buckets")?;

        let Some(points) = inner.change_points.get(identifier) else {
            return Ok(vec![]);
        };
        let Some(series) = inner.series.get(identifier) else {
            return Ok(vec![]);
        };

        let mut boundaries: Vec<i64> = points.iter().map(|point| point.order).collect();
        boundaries.sort_unstable();
        boundaries.dedup();

        let mut buckets = Vec::with_capacity(boundaries.len());
        let mut upper: Option<i64> = None;
        for &boundary in boundaries.iter().rev() {
            let count = series
                .orders
                .iter()
                .filter(|&&order| order > boundary && upper.map_or(true, |u| order <= u))
                .count();
            buckets.push(ResumeBucket {
                boundary_order: boundary,
                count,
            });
            upper = Some(boundary);
        }
        Ok(buckets)
    }

    fn replace_change_points(
        &self,
        identifier: &TestIdentifier,
        resume_point: Option<i64>,
        points: &[ChangePoint],
    ) -> Result<ReplaceOutcome, DriftError> {
        if let Some(resume) = resume_point {
            if let Some(stale) = points.iter().find(|point| point.order <= resume) {
                return Err(DriftError::invalid_input(format!(
                    "replacement point order {} is not newer than resume point {resume}",
                    stale.order
                )));
            }
        }
        let mut sorted: Vec<ChangePoint> = points.to_vec();
        sorted.sort_by_key(|point| point.order);
        if let Some(pair) = sorted.windows(2).find(|pair| pair[0].order == pair[1].order) {
            return Err(DriftError::invalid_input(format!(
                "change points must be unique by order; got {} twice",
                pair[0].order
            )));
        }

        let mut inner = self.lock()?;
        Self::check_injected_failure(&mut inner, "replace_change_points")?;

        let existing = inner.change_points.entry(identifier.clone()).or_default();
        let mut retained: Vec<ChangePoint> = match resume_point {
            Some(resume) => existing
                .iter()
                .filter(|point| point.order <= resume)
                .cloned()
                .collect(),
            None => vec![],
        };
        let deleted = existing.len() - retained.len();

        let mut relinked_previous = false;
        if let (Some(previous), Some(first_new)) = (retained.last_mut(), sorted.first()) {
            if let Some(statistics) = first_new.statistics.as_ref() {
                let trailing = previous
                    .statistics
                    .get_or_insert_with(|| drift_core::SegmentStatistics {
                        previous: None,
                        next: None,
                    });
                if trailing.next != statistics.previous {
                    trailing.next = statistics.previous.clone();
                    relinked_previous = true;
                }
            }
        }

        let inserted = sorted.len();
        retained.extend(sorted);
        let mutated = deleted > 0 || inserted > 0 || relinked_previous;
        *existing = retained;
        if mutated {
            inner.writes += 1;
        }

        Ok(ReplaceOutcome {
            deleted,
            inserted,
            relinked_previous,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::store::{ChangePointStore, ResumeBucket};
    use drift_core::{
        describe, ChangeCategory, ChangePoint, SegmentStatistics, TestIdentifier, TimeSeries,
    };

    fn identifier() -> TestIdentifier {
        TestIdentifier {
            project: "perf".to_string(),
            variant: "linux".to_string(),
            task: "insert".to_string(),
            test: "insert_vector".to_string(),
            thread_level: "16".to_string(),
        }
    }

    fn point(order: i64) -> ChangePoint {
        ChangePoint {
            identifier: identifier(),
            suspect_revision: format!("{order:040x}"),
            all_suspect_revisions: vec![],
            probability: 1.0,
            order,
            create_time: order,
            value: order as f64,
            order_of_change_point: 0,
            algorithm: None,
            range: None,
            statistics: Some(SegmentStatistics {
                previous: describe(&[order as f64 - 1.0, order as f64 - 2.0]),
                next: describe(&[order as f64 + 1.0, order as f64 + 2.0]),
            }),
            magnitude: None,
            category: ChangeCategory::Uncategorized,
        }
    }

    #[test]
    fn fetch_series_respects_the_order_filter() {
        let store = MemoryStore::new();
        store
            .insert_series(TimeSeries::from_values(identifier(), vec![1.0, 2.0, 3.0]))
            .expect("series should insert");

        let all = store
            .fetch_series(&identifier(), None)
            .expect("fetch should succeed");
        assert_eq!(all.len(), 3);

        let tail = store
            .fetch_series(&identifier(), Some(2))
            .expect("tail fetch should succeed");
        assert_eq!(tail.values, vec![3.0]);

        let err = store
            .fetch_series(
                &TestIdentifier {
                    test: "other".to_string(),
                    ..identifier()
                },
                None,
            )
            .expect_err("unknown identifier must fail");
        assert!(err.to_string().contains("no series stored"));
    }

    #[test]
    fn replace_on_an_empty_store_inserts_sorted() {
        let store = MemoryStore::new();
        let outcome = store
            .replace_change_points(&identifier(), None, &[point(20), point(10)])
            .expect("replace should succeed");
        assert_eq!(outcome.deleted, 0);
        assert_eq!(outcome.inserted, 2);
        assert!(!outcome.relinked_previous);

        let stored = store
            .fetch_change_points(&identifier())
            .expect("fetch should succeed");
        assert_eq!(
            stored.iter().map(|p| p.order).collect::<Vec<_>>(),
            vec![10, 20]
        );
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn replace_deletes_only_the_tail_and_relinks_the_boundary() {
        let store = MemoryStore::new();
        store
            .replace_change_points(&identifier(), None, &[point(10), point(20), point(30)])
            .expect("seed should succeed");

        let replacement = point(25);
        let outcome = store
            .replace_change_points(&identifier(), Some(20), &[replacement.clone()])
            .expect("tail replace should succeed");
        assert_eq!(outcome.deleted, 1);
        assert_eq!(outcome.inserted, 1);
        assert!(outcome.relinked_previous);

        let stored = store
            .fetch_change_points(&identifier())
            .expect("fetch should succeed");
        assert_eq!(
            stored.iter().map(|p| p.order).collect::<Vec<_>>(),
            vec![10, 20, 25]
        );
        // the record just below the boundary now carries the new leading stats
        let relinked = stored
            .iter()
            .find(|p| p.order == 20)
            .expect("order 20 should remain");
        let trailing = relinked
            .statistics
            .as_ref()
            .expect("statistics should exist");
        let leading = replacement
            .statistics
            .as_ref()
            .expect("statistics should exist");
        assert_eq!(trailing.next, leading.previous);
    }

    #[test]
    fn replaying_an_identical_tail_does_not_relink_twice() {
        let store = MemoryStore::new();
        store
            .replace_change_points(&identifier(), None, &[point(10), point(20)])
            .expect("seed should succeed");
        store
            .replace_change_points(&identifier(), Some(10), &[point(20)])
            .expect("first tail replace should succeed");
        let second = store
            .replace_change_points(&identifier(), Some(10), &[point(20)])
            .expect("second tail replace should succeed");
        assert!(!second.relinked_previous);
    }

    #[test]
    fn stale_or_duplicate_replacement_orders_are_rejected() {
        let store = MemoryStore::new();
        let err = store
            .replace_change_points(&identifier(), Some(20), &[point(20)])
            .expect_err("order at the boundary must be rejected");
        assert!(err.to_string().contains("not newer than resume point"));

        let err = store
            .replace_change_points(&identifier(), None, &[point(10), point(10)])
            .expect_err("duplicate orders must be rejected");
        assert!(err.to_string().contains("unique by order"));
    }

    #[test]
    fn resume_buckets_count_newer_points_per_boundary_newest_first() {
        let store = MemoryStore::new();
        store
            .insert_series(TimeSeries::from_values(
                identifier(),
                (1..=10).map(f64::from).collect(),
            ))
            .expect("series should insert");
        store
            .replace_change_points(&identifier(), None, &[point(3), point(7)])
            .expect("seed should succeed");

        let buckets = store
            .resume_buckets(&identifier())
            .expect("buckets should aggregate");
        assert_eq!(
            buckets,
            vec![
                ResumeBucket {
                    boundary_order: 7,
                    count: 3
                },
                ResumeBucket {
                    boundary_order: 3,
                    count: 4
                },
            ]
        );
    }

    #[test]
    fn injected_transient_failures_surface_then_clear() {
        let store = MemoryStore::new();
        store
            .insert_series(TimeSeries::from_values(identifier(), vec![1.0]))
            .expect("series should insert");
        store.inject_transient_failures(1);

        let err = store
            .fetch_series(&identifier(), None)
            .expect_err("first call must fail transiently");
        assert!(err.is_transient());

        store
            .fetch_series(&identifier(), None)
            .expect("second call should succeed");
    }
}
