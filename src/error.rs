//! Error classification shared by the flow, state machine and runtime

use serde::Serialize;
use std::fmt;

/// Coarse classification of every engine failure
///
/// None of these are retried; the caller decides how to surface them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A step id that does not exist in the graph (misconfiguration)
    InvalidReference,
    /// Operation not valid for the current step kind or session phase
    InvalidState,
    /// Malformed user-entered value
    Validation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidReference => write!(f, "invalid-reference"),
            ErrorKind::InvalidState => write!(f, "invalid-state"),
            ErrorKind::Validation => write!(f, "validation"),
        }
    }
}
