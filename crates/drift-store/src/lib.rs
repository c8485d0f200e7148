// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

mod documents;
mod memory;
mod retry;
mod store;

pub use documents::ChangePointDocument;
pub use memory::MemoryStore;
pub use retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
pub use store::{ChangePointStore, ReplaceOutcome, ResumeBucket};

/// Storage seam for drift.
pub fn crate_name() -> &'static str {
    "drift-store"
}
