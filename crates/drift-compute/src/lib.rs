// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

mod assemble;
mod git;
mod orchestrate;

pub use assemble::{
    calculate_magnitude, classify_magnitude, AssembledSet, ChangePointAssembler, ALGORITHM_NAME,
};
pub use git::{FallbackResolver, GitHistoryResolver, StaticResolver};
pub use orchestrate::{
    BatchSummary, ComputeOrchestrator, ComputeOutcome, Diagnostics, OrchestratorConfig,
};

/// Assembly and orchestration layer for drift.
pub fn crate_name() -> &'static str {
    "drift-compute"
}
