//! Error types for the printer library
//!
//! Two layers:
//! - [`DriverError`]: faults raised by the vendor driver collaborator
//! - [`PrinterError`]: the typed failure every dispatcher operation resolves with

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Driver fault types
#[derive(Debug, Error)]
pub enum DriverError {
    /// Fault reported by the vendor driver, message kept verbatim
    #[error("{0}")]
    Fault(String),

    /// IO error talking to the print head
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Value the driver cannot accept
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Printer is offline or unreachable
    #[error("Printer offline: {0}")]
    Offline(String),

    /// Timeout waiting for printer
    #[error("Timeout: {0}")]
    Timeout(String),
}

/// Result type for driver calls
pub type DriverResult<T> = Result<T, DriverError>;

/// Operation family that produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "INIT_ERROR")]
    Init,
    #[serde(rename = "PRINT_ERROR")]
    Print,
    #[serde(rename = "STATUS_ERROR")]
    Status,
}

impl ErrorKind {
    /// Wire code of this kind
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Init => "INIT_ERROR",
            ErrorKind::Print => "PRINT_ERROR",
            ErrorKind::Status => "STATUS_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Typed failure of a printer operation
///
/// Serializes as `{ "kind": "PRINT_ERROR", "message": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct PrinterError {
    pub kind: ErrorKind,
    pub message: String,
}

impl PrinterError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Translate a driver fault into the failure of the given operation family
    pub fn from_driver(kind: ErrorKind, err: &DriverError) -> Self {
        Self::new(kind, err.to_string())
    }

    pub fn not_initialized(kind: ErrorKind) -> Self {
        Self::new(kind, "printer not initialized")
    }

    pub fn faulted(kind: ErrorKind) -> Self {
        Self::new(kind, "printer faulted; re-initialize required")
    }

    pub fn stopped(kind: ErrorKind) -> Self {
        Self::new(kind, "printer dispatcher stopped")
    }
}

/// Result of a single dispatcher operation
pub type Outcome<T> = Result<T, PrinterError>;
