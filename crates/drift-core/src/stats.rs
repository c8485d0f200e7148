// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Descriptive statistics of one stable segment.
///
/// A single-observation segment keeps the degenerate convention:
/// `variance = NaN`, `skewness = 0`, `kurtosis = -3`. Equality is
/// bit-for-bit on the float fields so NaN-carrying records still compare
/// equal across identical recomputations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub variance: f64,
    pub skewness: f64,
    pub kurtosis: f64,
}

impl PartialEq for DescriptiveStats {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count
            && bits_eq(self.min, other.min)
            && bits_eq(self.max, other.max)
            && bits_eq(self.mean, other.mean)
            && bits_eq(self.variance, other.variance)
            && bits_eq(self.skewness, other.skewness)
            && bits_eq(self.kurtosis, other.kurtosis)
    }
}

pub(crate) fn bits_eq(left: f64, right: f64) -> bool {
    left.to_bits() == right.to_bits()
}

/// Describes a segment; `None` on an empty slice.
pub fn describe(segment: &[f64]) -> Option<DescriptiveStats> {
    if segment.is_empty() {
        return None;
    }

    let count = segment.len();
    let n = count as f64;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for &value in segment {
        min = min.min(value);
        max = max.max(value);
        sum += value;
    }
    let mean = sum / n;

    let mut m2 = 0.0;
    let mut m3 = 0.0;
    let mut m4 = 0.0;
    let mut sum_squared_deviation = 0.0;
    for &value in segment {
        let deviation = value - mean;
        let squared = deviation * deviation;
        sum_squared_deviation += squared;
        m2 += squared;
        m3 += squared * deviation;
        m4 += squared * squared;
    }
    m2 /= n;
    m3 /= n;
    m4 /= n;

    let variance = if count > 1 {
        sum_squared_deviation / (n - 1.0)
    } else {
        f64::NAN
    };
    let (skewness, kurtosis) = if m2 > 0.0 {
        (m3 / m2.powf(1.5), m4 / (m2 * m2) - 3.0)
    } else {
        (0.0, -3.0)
    };

    Some(DescriptiveStats {
        count,
        min,
        max,
        mean,
        variance,
        skewness,
        kurtosis,
    })
}

#[cfg(test)]
mod tests {
    use super::describe;

    #[test]
    fn empty_segment_has_no_statistics() {
        assert!(describe(&[]).is_none());
    }

    #[test]
    fn single_observation_uses_degenerate_conventions() {
        let stats = describe(&[42.0]).expect("one element should describe");
        assert_eq!(stats.count, 1);
        assert_eq!(stats.min, 42.0);
        assert_eq!(stats.max, 42.0);
        assert_eq!(stats.mean, 42.0);
        assert!(stats.variance.is_nan());
        assert_eq!(stats.skewness, 0.0);
        assert_eq!(stats.kurtosis, -3.0);
    }

    #[test]
    fn constant_segment_keeps_zero_spread_conventions() {
        let stats = describe(&[50.0; 15]).expect("constant segment should describe");
        assert_eq!(stats.count, 15);
        assert_eq!(stats.mean, 50.0);
        assert_eq!(stats.variance, 0.0);
        assert_eq!(stats.skewness, 0.0);
        assert_eq!(stats.kurtosis, -3.0);
    }

    #[test]
    fn moments_match_hand_computed_values() {
        let stats = describe(&[1.0, 2.0, 3.0, 4.0]).expect("segment should describe");
        assert_eq!(stats.mean, 2.5);
        assert!((stats.variance - 5.0 / 3.0).abs() < 1.0e-12);
        assert_eq!(stats.skewness, 0.0);
        // platykurtic uniform-ish sample: m4/m2^2 - 3 = (41/16)/(25/16) - 3
        assert!((stats.kurtosis - (41.0 / 25.0 - 3.0)).abs() < 1.0e-12);
    }

    #[test]
    fn nan_carrying_stats_compare_equal_bitwise() {
        let left = describe(&[7.0]).expect("describe");
        let right = describe(&[7.0]).expect("describe");
        assert_eq!(left, right);
    }
}
