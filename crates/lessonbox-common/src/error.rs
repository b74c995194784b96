//! Error types for the lessonbox sandbox.
//!
//! This module defines [`SandboxError`] using `thiserror`. The taxonomy is
//! deliberately small: acquiring the embedded interpreter can fail, a caller
//! can ask for execution before the interpreter is ready, and source text can
//! be unexecutable before it ever reaches the interpreter. Everything that
//! happens *inside* a run (exceptions, failed checks) is reported as
//! transcript data, not as a Rust error.

use thiserror::Error;

/// Errors surfaced by the runtime provider and session layer.
#[derive(Error, Debug)]
pub enum SandboxError {
    /// The embedded interpreter could not be acquired.
    ///
    /// This is fatal for the whole process: every session refuses to run
    /// until the page (process) is reloaded.
    #[error("Interpreter acquisition failed: {reason}")]
    AcquisitionFailed {
        /// Description of the acquisition failure.
        reason: String,
    },

    /// Execution was requested while the interpreter is not ready.
    #[error("Interpreter is not ready: {state}")]
    NotReady {
        /// The readiness state observed by the caller.
        state: String,
    },

    /// The source text cannot be handed to the interpreter at all.
    #[error("Source text cannot be executed: {reason}")]
    InvalidSource {
        /// Description of why the source is unexecutable.
        reason: String,
    },
}

impl SandboxError {
    /// Create a new `AcquisitionFailed` error.
    pub fn acquisition_failed(reason: impl Into<String>) -> Self {
        Self::AcquisitionFailed {
            reason: reason.into(),
        }
    }

    /// Create a new `NotReady` error.
    pub fn not_ready(state: impl Into<String>) -> Self {
        Self::NotReady {
            state: state.into(),
        }
    }

    /// Create a new `InvalidSource` error.
    pub fn invalid_source(reason: impl Into<String>) -> Self {
        Self::InvalidSource {
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error indicates the interpreter was not ready.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }

    /// Returns `true` if this error indicates interpreter acquisition failed.
    pub fn is_acquisition_failure(&self) -> bool {
        matches!(self, Self::AcquisitionFailed { .. })
    }
}
