// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::DriftError;
use std::sync::atomic::{AtomicBool, Ordering};

/// Coarse cooperative cancellation flag.
///
/// Abandoning a worker mid-computation leaves the identifier's persisted
/// state untouched; the whole identifier is retried on the next run.
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Scalar telemetry sink for detector counters.
pub trait TelemetrySink: Sync {
    fn record_scalar(&self, key: &'static str, value: f64);
}

/// Per-run context threaded through detection and orchestration calls.
pub struct RunContext<'a> {
    pub cancel: Option<&'a CancelToken>,
    pub telemetry: Option<&'a dyn TelemetrySink>,
}

impl<'a> RunContext<'a> {
    pub fn new() -> Self {
        Self {
            cancel: None,
            telemetry: None,
        }
    }

    pub fn with_cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_telemetry_sink(mut self, telemetry: &'a dyn TelemetrySink) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }

    pub fn check_cancelled(&self) -> Result<(), DriftError> {
        if self.is_cancelled() {
            return Err(DriftError::cancelled());
        }
        Ok(())
    }

    /// Checks cancellation every `every` iterations; zero polls every time.
    pub fn check_cancelled_every(&self, iteration: usize, every: usize) -> Result<(), DriftError> {
        let every = every.max(1);
        if iteration % every != 0 {
            return Ok(());
        }
        self.check_cancelled()
    }

    pub fn record_scalar(&self, key: &'static str, value: f64) {
        if let Some(sink) = self.telemetry {
            sink.record_scalar(key, value);
        }
    }
}

impl Default for RunContext<'_> {
    fn default() -> Self {
        Self::new()
    }
}
