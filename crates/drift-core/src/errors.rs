// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Workspace-wide error taxonomy.
///
/// Validation and numerical failures are fatal for the affected test
/// identifier; transient storage failures are retryable; git-history
/// resolution failures are non-fatal and degrade to an empty revision list
/// at the call site.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DriftError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("numerical issue: {0}")]
    NumericalIssue(String),
    #[error("transient storage failure: {0}")]
    TransientStorage(String),
    #[error("git history resolution failed: {0}")]
    GitResolution(String),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("cancelled")]
    Cancelled,
}

impl DriftError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn numerical_issue(message: impl Into<String>) -> Self {
        Self::NumericalIssue(message.into())
    }

    pub fn transient_storage(message: impl Into<String>) -> Self {
        Self::TransientStorage(message.into())
    }

    pub fn git_resolution(message: impl Into<String>) -> Self {
        Self::GitResolution(message.into())
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported(message.into())
    }

    pub fn cancelled() -> Self {
        Self::Cancelled
    }

    /// Returns true for failures that a bounded retry may resolve.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientStorage(_))
    }
}
