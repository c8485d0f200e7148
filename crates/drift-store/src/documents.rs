// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use drift_core::{
    AlgorithmMetadata, ChangeCategory, ChangePoint, RangeMetadata, SegmentStatistics,
    TestIdentifier,
};
use serde::{Deserialize, Serialize};

/// Wire shape of one persisted change-point document.
///
/// The identifier dimensions are flattened to top-level keys so the document
/// store can index each dimension independently, matching how the series
/// documents are keyed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangePointDocument {
    pub project: String,
    pub variant: String,
    pub task: String,
    pub test: String,
    pub thread_level: String,
    pub suspect_revision: String,
    pub all_suspect_revisions: Vec<String>,
    pub probability: f64,
    pub order: i64,
    pub create_time: i64,
    pub value: f64,
    pub order_of_change_point: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<AlgorithmMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<SegmentStatistics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<f64>,
    pub category: ChangeCategory,
}

impl ChangePointDocument {
    pub fn from_change_point(point: &ChangePoint) -> Self {
        Self {
            project: point.identifier.project.clone(),
            variant: point.identifier.variant.clone(),
            task: point.identifier.task.clone(),
            test: point.identifier.test.clone(),
            thread_level: point.identifier.thread_level.clone(),
            suspect_revision: point.suspect_revision.clone(),
            all_suspect_revisions: point.all_suspect_revisions.clone(),
            probability: point.probability,
            order: point.order,
            create_time: point.create_time,
            value: point.value,
            order_of_change_point: point.order_of_change_point,
            algorithm: point.algorithm.clone(),
            range: point.range.clone(),
            statistics: point.statistics.clone(),
            magnitude: point.magnitude,
            category: point.category,
        }
    }

    pub fn into_change_point(self) -> ChangePoint {
        ChangePoint {
            identifier: TestIdentifier {
                project: self.project,
                variant: self.variant,
                task: self.task,
                test: self.test,
                thread_level: self.thread_level,
            },
            suspect_revision: self.suspect_revision,
            all_suspect_revisions: self.all_suspect_revisions,
            probability: self.probability,
            order: self.order,
            create_time: self.create_time,
            value: self.value,
            order_of_change_point: self.order_of_change_point,
            algorithm: self.algorithm,
            range: self.range,
            statistics: self.statistics,
            magnitude: self.magnitude,
            category: self.category,
        }
    }
}
