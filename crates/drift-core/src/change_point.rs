// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::stats::{bits_eq, DescriptiveStats};
use crate::time_series::TestIdentifier;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Raw detector fields persisted with each change point.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlgorithmMetadata {
    pub name: Cow<'static, str>,
    pub index: usize,
    pub window_size: usize,
    pub value: f64,
    pub value_to_average: f64,
    pub value_to_average_diff: f64,
    pub average: f64,
    pub average_diff: f64,
}

impl PartialEq for AlgorithmMetadata {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.index == other.index
            && self.window_size == other.window_size
            && bits_eq(self.value, other.value)
            && bits_eq(self.value_to_average, other.value_to_average)
            && bits_eq(self.value_to_average_diff, other.value_to_average_diff)
            && bits_eq(self.average, other.average)
            && bits_eq(self.average_diff, other.average_diff)
    }
}

/// Which side of the candidate the abrupt jump happened on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Ahead,
    Behind,
}

/// Localized boundary persisted with each change point, in original-series
/// index space: `start` is the last stable position, `end` the first shifted
/// one. The two are adjacent in the compacted series; excluded points may
/// sit between them in the original.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeMetadata {
    pub start: usize,
    pub end: usize,
    pub location: Location,
}

/// Descriptive statistics of the stable segments on either side of the
/// boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentStatistics {
    pub previous: Option<DescriptiveStats>,
    pub next: Option<DescriptiveStats>,
}

/// Direction-adjusted severity band of a detected shift.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeCategory {
    #[serde(rename = "Major Regression")]
    MajorRegression,
    #[serde(rename = "Moderate Regression")]
    ModerateRegression,
    #[serde(rename = "Minor Regression")]
    MinorRegression,
    #[serde(rename = "Major Improvement")]
    MajorImprovement,
    #[serde(rename = "Moderate Improvement")]
    ModerateImprovement,
    #[serde(rename = "Minor Improvement")]
    MinorImprovement,
    #[serde(rename = "Uncategorized")]
    Uncategorized,
}

/// Persisted change-point record.
///
/// Records for one identifier are unique by `order`; they are replaced as a
/// set per run, never mutated in place except the immediately preceding
/// record's trailing statistics during a resumed recomputation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChangePoint {
    pub identifier: TestIdentifier,
    pub suspect_revision: String,
    pub all_suspect_revisions: Vec<String>,
    pub probability: f64,
    pub order: i64,
    pub create_time: i64,
    pub value: f64,
    pub order_of_change_point: usize,
    pub algorithm: Option<AlgorithmMetadata>,
    pub range: Option<RangeMetadata>,
    pub statistics: Option<SegmentStatistics>,
    pub magnitude: Option<f64>,
    pub category: ChangeCategory,
}

impl PartialEq for ChangePoint {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
            && self.suspect_revision == other.suspect_revision
            && self.all_suspect_revisions == other.all_suspect_revisions
            && bits_eq(self.probability, other.probability)
            && self.order == other.order
            && self.create_time == other.create_time
            && bits_eq(self.value, other.value)
            && self.order_of_change_point == other.order_of_change_point
            && self.algorithm == other.algorithm
            && self.range == other.range
            && self.statistics == other.statistics
            && match (self.magnitude, other.magnitude) {
                (Some(left), Some(right)) => bits_eq(left, right),
                (None, None) => true,
                _ => false,
            }
            && self.category == other.category
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AlgorithmMetadata, ChangeCategory, ChangePoint, Location, RangeMetadata,
        SegmentStatistics,
    };
    use crate::stats::describe;
    use crate::time_series::TestIdentifier;
    use std::borrow::Cow;

    fn sample_point() -> ChangePoint {
        ChangePoint {
            identifier: TestIdentifier {
                project: "perf".to_string(),
                variant: "linux".to_string(),
                task: "insert".to_string(),
                test: "insert_vector".to_string(),
                thread_level: "1".to_string(),
            },
            suspect_revision: "abc123".to_string(),
            all_suspect_revisions: vec!["abc123".to_string()],
            probability: 1.0,
            order: 15,
            create_time: 15,
            value: 100.0,
            order_of_change_point: 0,
            algorithm: Some(AlgorithmMetadata {
                name: Cow::Borrowed("e_divisive_means"),
                index: 15,
                window_size: 30,
                value: 650.0,
                value_to_average: f64::NAN,
                value_to_average_diff: 2.5,
                average: 0.0,
                average_diff: 260.0,
            }),
            range: Some(RangeMetadata {
                start: 14,
                end: 15,
                location: Location::Behind,
            }),
            statistics: Some(SegmentStatistics {
                previous: describe(&[50.0; 15]),
                next: describe(&[100.0]),
            }),
            magnitude: Some(0.693),
            category: ChangeCategory::MajorImprovement,
        }
    }

    #[test]
    fn nan_fields_do_not_break_record_equality() {
        assert_eq!(sample_point(), sample_point());
    }

    #[test]
    fn equality_is_sensitive_to_float_payloads() {
        let mut other = sample_point();
        other.probability = 0.99;
        assert_ne!(sample_point(), other);
    }

    #[test]
    fn category_serializes_to_the_reporting_contract_strings() {
        let encoded = serde_json::to_string(&ChangeCategory::ModerateRegression)
            .expect("category should serialize");
        assert_eq!(encoded, "\"Moderate Regression\"");
        let decoded: ChangeCategory =
            serde_json::from_str(&encoded).expect("category should deserialize");
        assert_eq!(decoded, ChangeCategory::ModerateRegression);
    }

    #[test]
    fn location_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Location::Ahead).expect("location should serialize"),
            "\"ahead\""
        );
    }

    #[test]
    fn record_serde_roundtrip_preserves_equality() {
        // JSON cannot represent NaN, so roundtrip a fully finite record;
        // NaN-carrying records only cross the in-process store boundary.
        let mut point = sample_point();
        if let Some(algorithm) = point.algorithm.as_mut() {
            algorithm.value_to_average = 2.5;
        }
        if let Some(statistics) = point.statistics.as_mut() {
            statistics.next = describe(&[100.0, 100.0]);
        }
        let encoded = serde_json::to_string(&point).expect("record should serialize");
        let decoded: ChangePoint =
            serde_json::from_str(&encoded).expect("record should deserialize");
        assert_eq!(decoded, point);
    }
}
