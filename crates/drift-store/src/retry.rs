// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use drift_core::DriftError;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Retry loop for transient storage failures.
///
/// Only errors reporting [`DriftError::is_transient`] are retried; anything
/// else aborts immediately. The wrapped operation must be safe to replay
/// wholesale, which the atomic replace contract guarantees.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    max_attempts: usize,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, delay: Duration) -> Result<Self, DriftError> {
        if max_attempts == 0 {
            return Err(DriftError::invalid_input(
                "max_attempts must be at least 1; got 0",
            ));
        }
        Ok(Self {
            max_attempts,
            delay,
        })
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Runs `operation` up to `max_attempts` times, sleeping `delay` between
    /// transient failures.
    pub fn run<T>(
        &self,
        mut operation: impl FnMut() -> Result<T, DriftError>,
    ) -> Result<T, DriftError> {
        let mut attempt = 1;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    attempt += 1;
                    if !self.delay.is_zero() {
                        std::thread::sleep(self.delay);
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}
