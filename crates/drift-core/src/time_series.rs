// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::DriftError;
use serde::{Deserialize, Serialize};

/// Fully qualified benchmark test identifier.
///
/// Computations for distinct identifiers are independent; the identifier is
/// the unit of work partitioning and of storage transactions.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestIdentifier {
    pub project: String,
    pub variant: String,
    pub task: String,
    pub test: String,
    pub thread_level: String,
}

impl std::fmt::Display for TestIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.project, self.variant, self.task, self.test, self.thread_level
        )
    }
}

/// Read-only snapshot of one identifier's measurement history.
///
/// All vectors are parallel and index-aligned; `orders` is the CI system's
/// monotonically increasing revision counter (newer = larger).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub identifier: TestIdentifier,
    pub values: Vec<f64>,
    pub revisions: Vec<String>,
    pub orders: Vec<i64>,
    pub create_times: Vec<i64>,
    pub task_ids: Vec<String>,
    pub version_ids: Vec<String>,
    pub outliers: Vec<bool>,
    pub rejected_tasks: Vec<bool>,
    pub user_marked_confirmed: Vec<bool>,
    pub user_marked_rejected: Vec<bool>,
    pub whitelisted: Vec<bool>,
}

impl TimeSeries {
    /// Validates the parallel-array invariant and order monotonicity.
    pub fn validate(&self) -> Result<(), DriftError> {
        let n = self.values.len();
        let lengths = [
            ("revisions", self.revisions.len()),
            ("orders", self.orders.len()),
            ("create_times", self.create_times.len()),
            ("task_ids", self.task_ids.len()),
            ("version_ids", self.version_ids.len()),
            ("outliers", self.outliers.len()),
            ("rejected_tasks", self.rejected_tasks.len()),
            ("user_marked_confirmed", self.user_marked_confirmed.len()),
            ("user_marked_rejected", self.user_marked_rejected.len()),
            ("whitelisted", self.whitelisted.len()),
        ];
        for (name, len) in lengths {
            if len != n {
                return Err(DriftError::invalid_input(format!(
                    "TimeSeries field length mismatch for '{}': {name}={len}, values={n}",
                    self.identifier
                )));
            }
        }

        for window in self.orders.windows(2) {
            if window[1] <= window[0] {
                return Err(DriftError::invalid_input(format!(
                    "TimeSeries orders must be strictly increasing for '{}': got {} then {}",
                    self.identifier, window[0], window[1]
                )));
            }
        }

        Ok(())
    }

    /// Synthetic series with default metadata, for tests, benches, and
    /// ad hoc CLI input where only values matter.
    pub fn from_values(identifier: TestIdentifier, values: Vec<f64>) -> Self {
        let n = values.len();
        Self {
            identifier,
            values,
            revisions: (0..n).map(|i| format!("{i:040x}")).collect(),
            orders: (1..=n as i64).collect(),
            create_times: (1..=n as i64).collect(),
            task_ids: (0..n).map(|i| format!("task_{i}")).collect(),
            version_ids: (0..n).map(|i| format!("version_{i}")).collect(),
            outliers: vec![false; n],
            rejected_tasks: vec![false; n],
            user_marked_confirmed: vec![false; n],
            user_marked_rejected: vec![false; n],
            whitelisted: vec![false; n],
        }
    }

    /// The sub-series strictly newer than `order`, preserving all parallel
    /// metadata.
    pub fn tail_after_order(&self, order: i64) -> Self {
        let keep: Vec<usize> = self
            .orders
            .iter()
            .enumerate()
            .filter(|(_, &o)| o > order)
            .map(|(i, _)| i)
            .collect();
        let pick_f64 = |source: &[f64]| keep.iter().map(|&i| source[i]).collect();
        let pick_i64 = |source: &[i64]| keep.iter().map(|&i| source[i]).collect::<Vec<i64>>();
        let pick_string =
            |source: &[String]| keep.iter().map(|&i| source[i].clone()).collect::<Vec<_>>();
        let pick_bool = |source: &[bool]| keep.iter().map(|&i| source[i]).collect::<Vec<bool>>();

        Self {
            identifier: self.identifier.clone(),
            values: pick_f64(&self.values),
            revisions: pick_string(&self.revisions),
            orders: pick_i64(&self.orders),
            create_times: pick_i64(&self.create_times),
            task_ids: pick_string(&self.task_ids),
            version_ids: pick_string(&self.version_ids),
            outliers: pick_bool(&self.outliers),
            rejected_tasks: pick_bool(&self.rejected_tasks),
            user_marked_confirmed: pick_bool(&self.user_marked_confirmed),
            user_marked_rejected: pick_bool(&self.user_marked_rejected),
            whitelisted: pick_bool(&self.whitelisted),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
