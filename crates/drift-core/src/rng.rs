// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::DriftError;

/// Deterministic splitmix64 generator.
///
/// Seeded explicitly per detection call and threaded through the permutation
/// shuffles, so identical input and seed reproduce bit-identical results.
/// Not cryptographic; stability across platforms and releases is the point.
#[derive(Clone, Copy, Debug)]
pub struct StableRng {
    state: u64,
}

impl StableRng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9e3779b97f4a7c15),
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e3779b97f4a7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    }

    pub fn gen_range(&mut self, upper_exclusive: usize) -> Result<usize, DriftError> {
        if upper_exclusive == 0 {
            return Err(DriftError::invalid_input(
                "StableRng.gen_range requires upper_exclusive >= 1; got 0",
            ));
        }

        let value = self.next_u64();
        let modulus = u64::try_from(upper_exclusive)
            .map_err(|_| DriftError::invalid_input("rng upper_exclusive conversion overflow"))?;
        let sampled = value % modulus;
        usize::try_from(sampled)
            .map_err(|_| DriftError::invalid_input("rng sampled index conversion overflow"))
    }

    /// In-place Fisher-Yates shuffle.
    pub fn shuffle(&mut self, values: &mut [f64]) -> Result<(), DriftError> {
        for i in (1..values.len()).rev() {
            let j = self.gen_range(i + 1)?;
            values.swap(i, j);
        }
        Ok(())
    }
}
