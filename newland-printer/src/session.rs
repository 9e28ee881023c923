//! Printer session state machine
//!
//! ```text
//!  Uninitialized ──init ok──▶ Ready ──op──▶ Busy ──ok──▶ Ready
//!        ▲                      ▲                 └─fault─▶ Faulted
//!        └──init (unsupported)  └──────────init ok─────────────┘
//! ```

use crate::error::{ErrorKind, PrinterError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Session state of the print head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Uninitialized,
    Ready,
    Busy,
    Faulted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Ready => "ready",
            SessionState::Busy => "busy",
            SessionState::Faulted => "faulted",
        };
        f.write_str(s)
    }
}

/// Whether print operations are checked against the session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPolicy {
    /// Print operations need a Ready session
    #[default]
    Strict,
    /// No admission checks
    Permissive,
}

impl std::str::FromStr for SessionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(SessionPolicy::Strict),
            "permissive" => Ok(SessionPolicy::Permissive),
            other => Err(format!("unknown session policy: {}", other)),
        }
    }
}

/// Session bookkeeping owned by the dispatcher worker
#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
    policy: SessionPolicy,
}

impl Session {
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            state: SessionState::Uninitialized,
            policy,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check that a print operation may run now
    pub fn admit_print(&self, kind: ErrorKind) -> Result<(), PrinterError> {
        if self.policy == SessionPolicy::Permissive {
            return Ok(());
        }
        match self.state {
            SessionState::Ready => Ok(()),
            SessionState::Faulted => Err(PrinterError::faulted(kind)),
            SessionState::Uninitialized | SessionState::Busy => {
                Err(PrinterError::not_initialized(kind))
            }
        }
    }

    /// A driver call is about to run; returns the state to restore on success
    pub fn begin(&mut self) -> SessionState {
        let previous = self.state;
        self.state = SessionState::Busy;
        previous
    }

    /// Print operation finished
    pub fn finish(&mut self, previous: SessionState, ok: bool) {
        self.state = if ok { previous } else { SessionState::Faulted };
    }

    /// Initialize finished; `supported` is false when the device has no printer
    pub fn initialized(&mut self, supported: bool, ok: bool) {
        self.state = match (supported, ok) {
            (_, false) => SessionState::Faulted,
            (true, true) => SessionState::Ready,
            (false, true) => SessionState::Uninitialized,
        };
    }
}
