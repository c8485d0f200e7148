// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use drift_core::DriftError;
use serde::{Deserialize, Serialize};

/// Shortest series with a defined statistic; anything shorter yields an
/// all-zero vector and unit normalization constants.
const MIN_SERIES_LEN: usize = 5;

/// QHat scan implementation, selected at construction from a closed set.
///
/// `Incremental` updates the three pairwise-difference terms with the
/// row/column deltas of the point moving between blocks (O(n) per split,
/// O(n^2) per scan). `Naive` reassembles every split from scratch (O(n^3))
/// and exists as the reference the incremental path is checked against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QHatStrategy {
    #[default]
    Incremental,
    Naive,
}

/// Divergence statistic over a series plus its normalization constants.
#[derive(Clone, Debug, PartialEq)]
pub struct QHatValues {
    pub values: Vec<f64>,
    pub average: f64,
    pub average_diff: f64,
}

/// Argmax summary of one statistic vector; persisted as per-point
/// algorithm metadata.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QExtract {
    pub index: usize,
    pub value: f64,
    pub value_to_average: f64,
    pub value_to_average_diff: f64,
    pub average: f64,
    pub average_diff: f64,
    pub window_size: usize,
}

/// Computes the QHat statistic vector for every candidate split.
///
/// `values[n]` is the divergence between `series[..n]` and `series[n..]`
/// for `2 <= n <= len - 2`; the borders stay zero. Non-finite input or a
/// non-finite statistic is an error, never a silent NaN.
pub fn qhat_values(series: &[f64], strategy: QHatStrategy) -> Result<QHatValues, DriftError> {
    if let Some((at, bad)) = series
        .iter()
        .enumerate()
        .find(|(_, value)| !value.is_finite())
    {
        return Err(DriftError::invalid_input(format!(
            "series must be finite; got {bad} at index {at}"
        )));
    }

    let len = series.len();
    if len < MIN_SERIES_LEN {
        return Ok(QHatValues {
            values: vec![0.0; len],
            average: 1.0,
            average_diff: 1.0,
        });
    }

    let average = series.iter().sum::<f64>() / len as f64;
    let mut pair_sum = 0.0;
    for i in 0..len {
        for j in (i + 1)..len {
            pair_sum += (series[i] - series[j]).abs();
        }
    }
    // full-matrix average, diagonal zeros included
    let average_diff = 2.0 * pair_sum / (len as f64 * len as f64);
    if !average.is_finite() || !average_diff.is_finite() {
        return Err(DriftError::numerical_issue(format!(
            "non-finite normalization constants: average={average}, average_diff={average_diff}"
        )));
    }

    let values = match strategy {
        QHatStrategy::Incremental => qhat_values_incremental(series)?,
        QHatStrategy::Naive => qhat_values_naive(series)?,
    };

    Ok(QHatValues {
        values,
        average,
        average_diff,
    })
}

fn calculate_q(term1: f64, term2: f64, term3: f64, m: f64, n: f64) -> Result<f64, DriftError> {
    let term1_reg = term1 * (2.0 / (m * n));
    let term2_reg = if n > 1.0 {
        term2 * (2.0 / (n * (n - 1.0)))
    } else {
        0.0
    };
    let term3_reg = if m > 1.0 {
        term3 * (2.0 / (m * (m - 1.0)))
    } else {
        0.0
    };
    let q = (m * n / (m + n)) * (term1_reg - term2_reg - term3_reg);
    if !q.is_finite() {
        return Err(DriftError::numerical_issue(format!(
            "non-finite qhat at n={n}: term1={term1}, term2={term2}, term3={term3}, q={q}"
        )));
    }
    Ok(q)
}

fn qhat_values_incremental(series: &[f64]) -> Result<Vec<f64>, DriftError> {
    let len = series.len();
    let mut values = vec![0.0; len];

    // seed the three terms at the first valid split, n = 2
    let mut term1 = 0.0;
    for i in 0..2 {
        for j in 2..len {
            term1 += (series[i] - series[j]).abs();
        }
    }
    let mut term2 = (series[0] - series[1]).abs();
    let mut term3 = 0.0;
    for j in 2..len {
        for k in (j + 1)..len {
            term3 += (series[j] - series[k]).abs();
        }
    }
    values[2] = calculate_q(term1, term2, term3, (len - 2) as f64, 2.0)?;

    for n in 3..=(len - 2) {
        // series[n - 1] moves from the right block to the left block
        let moved = series[n - 1];
        let mut column_delta = 0.0;
        for i in 0..(n - 1) {
            column_delta += (moved - series[i]).abs();
        }
        let mut row_delta = 0.0;
        for j in n..len {
            row_delta += (moved - series[j]).abs();
        }

        term1 = term1 - column_delta + row_delta;
        term2 += column_delta;
        term3 -= row_delta;
        values[n] = calculate_q(term1, term2, term3, (len - n) as f64, n as f64)?;
    }

    Ok(values)
}

fn qhat_values_naive(series: &[f64]) -> Result<Vec<f64>, DriftError> {
    let len = series.len();
    let mut values = vec![0.0; len];

    for n in 2..=(len - 2) {
        let mut term1 = 0.0;
        for i in 0..n {
            for j in n..len {
                term1 += (series[i] - series[j]).abs();
            }
        }
        let mut term2 = 0.0;
        for i in 0..n {
            for k in (i + 1)..n {
                term2 += (series[i] - series[k]).abs();
            }
        }
        let mut term3 = 0.0;
        for j in n..len {
            for k in (j + 1)..len {
                term3 += (series[j] - series[k]).abs();
            }
        }
        values[n] = calculate_q(term1, term2, term3, (len - n) as f64, n as f64)?;
    }

    Ok(values)
}

/// Summarizes a statistic vector: argmax (first winner on ties) and the
/// normalized ratios. A zero average yields a NaN ratio by contract.
pub fn extract_q(q: &QHatValues) -> QExtract {
    let mut index = 0;
    let mut value = 0.0;
    if !q.values.is_empty() {
        value = q.values[0];
        for (i, &candidate) in q.values.iter().enumerate().skip(1) {
            if candidate > value {
                index = i;
                value = candidate;
            }
        }
    }

    let value_to_average = if q.average == 0.0 {
        f64::NAN
    } else {
        value / q.average
    };
    let value_to_average_diff = if q.average_diff == 0.0 {
        f64::NAN
    } else {
        value / q.average_diff
    };

    QExtract {
        index,
        value,
        value_to_average,
        value_to_average_diff,
        average: q.average,
        average_diff: q.average_diff,
        window_size: q.values.len(),
    }
}
