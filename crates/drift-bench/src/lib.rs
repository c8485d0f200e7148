// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Benchmark-only crate; the interesting code lives in `benches/`.

/// Deterministic noise source for benchmark inputs.
pub fn lcg_next(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state
}

/// Builds a series of `segments` flat levels with `segment_len` points each,
/// plus small deterministic jitter so the scan has real work to do.
pub fn stepped_series(segments: usize, segment_len: usize) -> Vec<f64> {
    let mut values = Vec::with_capacity(segments * segment_len);
    let mut state = 0x5eed_f00d_dead_beef_u64;

    for segment in 0..segments {
        let level = (segment as f64) * 25.0;
        for _ in 0..segment_len {
            let jitter = (lcg_next(&mut state) % 1000) as f64 / 1000.0;
            values.push(level + jitter);
        }
    }

    values
}
