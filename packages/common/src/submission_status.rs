use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// State of a submission during its evaluation lifecycle.
///
/// `Queued -> Running -> {Completed, CompileError, Cancelled, InternalError}`.
/// A queued submission may also move straight to `Cancelled`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "PascalCase")]
pub enum SubmissionState {
    /// Waiting in the admission queue for a free worker.
    Queued,
    /// Owned by a worker; test cases are being executed.
    Running,
    /// Every test case was evaluated (individual cases may still have failed).
    Completed,
    /// The source failed to compile; no test case was evaluated.
    CompileError,
    /// Withdrawn by the caller before finishing.
    Cancelled,
    /// Engine fault. Detail is logged, never returned.
    InternalError,
}

impl SubmissionState {
    /// Returns true if no further transition can happen.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Queued | Self::Running)
    }

    /// Returns true for terminal states that carry a finalized report.
    pub fn is_graded(&self) -> bool {
        matches!(self, Self::Completed | Self::CompileError)
    }

    /// All possible state values.
    pub const ALL: &'static [SubmissionState] = &[
        Self::Queued,
        Self::Running,
        Self::Completed,
        Self::CompileError,
        Self::Cancelled,
        Self::InternalError,
    ];

    /// All terminal states.
    pub const TERMINAL: &'static [SubmissionState] = &[
        Self::Completed,
        Self::CompileError,
        Self::Cancelled,
        Self::InternalError,
    ];

    /// Returns the string representation (PascalCase).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "Queued",
            Self::Running => "Running",
            Self::Completed => "Completed",
            Self::CompileError => "CompileError",
            Self::Cancelled => "Cancelled",
            Self::InternalError => "InternalError",
        }
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for SubmissionState {
    fn default() -> Self {
        Self::Queued
    }
}

/// Error when parsing an invalid state string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStateError {
    invalid: String,
}

impl fmt::Display for ParseStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid state '{}'. Valid values: {}",
            self.invalid,
            SubmissionState::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStateError {}

impl FromStr for SubmissionState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubmissionState::ALL
            .iter()
            .copied()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ParseStateError {
                invalid: s.to_string(),
            })
    }
}
