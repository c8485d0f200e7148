// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use drift_core::{DriftError, TimeSeries};

/// Builds the boolean exclusion mask from the per-point flags.
///
/// A point is excluded when it is a detected outlier or belongs to a
/// rejected task (unless whitelisted), or when a user confirmed it as an
/// outlier. A user rejection of the outlier designation is a manual
/// override and forces the point back in.
pub fn exclusion_mask(series: &TimeSeries) -> Vec<bool> {
    let n = series.len();
    let mut mask = Vec::with_capacity(n);
    for i in 0..n {
        let excluded = (series.outliers[i] && !series.whitelisted[i])
            || (series.rejected_tasks[i] && !series.whitelisted[i])
            || series.user_marked_confirmed[i];
        mask.push(excluded && !series.user_marked_rejected[i]);
    }
    mask
}

/// Compacted view of a series after applying the exclusion mask.
///
/// `index_map[j]` is the original position of the j-th kept value. An
/// all-masked input compacts to an empty, valid view.
#[derive(Clone, Debug, PartialEq)]
pub struct MaskedSeries {
    pub values: Vec<f64>,
    pub index_map: Vec<usize>,
}

impl MaskedSeries {
    /// Validates the snapshot, derives the mask, and compacts.
    pub fn from_series(series: &TimeSeries) -> Result<Self, DriftError> {
        series.validate()?;
        let mask = exclusion_mask(series);
        Ok(Self::compact(&series.values, &mask))
    }

    fn compact(values: &[f64], mask: &[bool]) -> Self {
        debug_assert_eq!(values.len(), mask.len());
        let mut kept = Vec::with_capacity(values.len());
        let mut index_map = Vec::with_capacity(values.len());
        for (i, (&value, &masked)) in values.iter().zip(mask).enumerate() {
            if !masked {
                kept.push(value);
                index_map.push(i);
            }
        }
        Self {
            values: kept,
            index_map,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{exclusion_mask, MaskedSeries};
    use drift_core::{TestIdentifier, TimeSeries};

    fn series(values: Vec<f64>) -> TimeSeries {
        TimeSeries::from_values(
            TestIdentifier {
                project: "perf".to_string(),
                variant: "linux".to_string(),
                task: "insert".to_string(),
                test: "insert_vector".to_string(),
                thread_level: "1".to_string(),
            },
            values,
        )
    }

    #[test]
    fn clean_series_keeps_every_point() {
        let input = series(vec![1.0, 2.0, 3.0]);
        let mask = exclusion_mask(&input);
        assert_eq!(mask, vec![false, false, false]);

        let masked = MaskedSeries::from_series(&input).expect("clean series should compact");
        assert_eq!(masked.values, vec![1.0, 2.0, 3.0]);
        assert_eq!(masked.index_map, vec![0, 1, 2]);
    }

    #[test]
    fn outliers_and_rejected_tasks_are_excluded_unless_whitelisted() {
        let mut input = series(vec![1.0, 2.0, 3.0, 4.0]);
        input.outliers[0] = true;
        input.rejected_tasks[1] = true;
        input.outliers[2] = true;
        input.whitelisted[2] = true;

        assert_eq!(exclusion_mask(&input), vec![true, true, false, false]);
        let masked = MaskedSeries::from_series(&input).expect("series should compact");
        assert_eq!(masked.values, vec![3.0, 4.0]);
        assert_eq!(masked.index_map, vec![2, 3]);
    }

    #[test]
    fn user_confirmation_excludes_and_user_rejection_overrides() {
        let mut input = series(vec![1.0, 2.0, 3.0]);
        input.user_marked_confirmed[0] = true;
        input.outliers[1] = true;
        input.user_marked_rejected[1] = true;

        assert_eq!(exclusion_mask(&input), vec![true, false, false]);
    }

    #[test]
    fn all_masked_input_compacts_to_an_empty_view() {
        let mut input = series(vec![1.0, 2.0]);
        input.outliers = vec![true, true];
        let masked = MaskedSeries::from_series(&input).expect("all-masked input is valid");
        assert!(masked.is_empty());
        assert!(masked.index_map.is_empty());
    }

    #[test]
    fn invalid_snapshot_fails_before_masking() {
        let mut input = series(vec![1.0, 2.0]);
        input.whitelisted.pop();
        let err = MaskedSeries::from_series(&input)
            .expect_err("length mismatch must surface as validation error");
        assert!(err.to_string().contains("length mismatch"));
    }
}
