//! Error types for the provisioning engine.
//!
//! These cover construction-time validation and session protocol
//! violations. Runtime step failures are not errors in this sense; they
//! travel as [`Status`](crate::Status) values and trigger rollback.

use std::fmt;
use thiserror::Error;

/// Result type for engine construction and session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of engine errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A value handed to a constructor or recording call is invalid
    InvalidArgument,
    /// A call arrived in the wrong order for the session protocol
    InvalidState,
    /// A touchpoint instruction could not be parsed
    Syntax,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "Invalid argument",
            Self::InvalidState => "Invalid state",
            Self::Syntax => "Invalid instruction syntax",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors raised by the provisioning engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Phase id missing or empty
    #[error("phase id must not be empty")]
    InvalidPhaseId,

    /// Phase weight not strictly positive
    #[error("phase '{id}' has invalid weight {weight}: weight must be positive")]
    InvalidPhaseWeight {
        /// Id of the rejected phase
        id: String,
        /// The rejected weight
        weight: i64,
    },

    /// A phase set needs at least one phase
    #[error("phase set must contain at least one phase")]
    EmptyPhaseSet,

    /// Operand with neither a `from` nor a `to` unit
    #[error("operand must have at least one installable unit")]
    InvalidOperand,

    /// `record_phase_start` while another phase is open
    #[error("phase '{open}' is already started")]
    PhaseAlreadyStarted {
        /// The phase currently open
        open: String,
    },

    /// `record_phase_end` or `record_action` with no open phase
    #[error("there is no phase to {operation}")]
    NoPhaseStarted {
        /// What the caller attempted
        operation: &'static str,
    },

    /// `record_phase_end` for a phase other than the open one
    #[error("current phase '{open}' does not match phase '{given}'")]
    PhaseMismatch {
        /// The phase currently open
        open: String,
        /// The phase passed by the caller
        given: String,
    },

    /// Malformed touchpoint instruction
    #[error("invalid instruction '{statement}': {message}")]
    InstructionSyntax {
        /// The offending statement
        statement: String,
        /// What is wrong with it
        message: String,
    },
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidPhaseId
            | Error::InvalidPhaseWeight { .. }
            | Error::EmptyPhaseSet
            | Error::InvalidOperand
            | Error::PhaseMismatch { .. } => ErrorCategory::InvalidArgument,
            Error::PhaseAlreadyStarted { .. } | Error::NoPhaseStarted { .. } => {
                ErrorCategory::InvalidState
            }
            Error::InstructionSyntax { .. } => ErrorCategory::Syntax,
        }
    }

    /// Whether this error can only come from a caller bug.
    ///
    /// Session protocol violations are never runtime conditions and
    /// must not be retried.
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            Error::PhaseAlreadyStarted { .. }
                | Error::NoPhaseStarted { .. }
                | Error::PhaseMismatch { .. }
        )
    }

    pub(crate) fn syntax(statement: &str, message: impl Into<String>) -> Self {
        Self::InstructionSyntax {
            statement: statement.to_string(),
            message: message.into(),
        }
    }
}
