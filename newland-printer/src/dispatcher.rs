//! Command dispatcher
//!
//! Callers enqueue [`PrintOperation`]s on a bounded queue; a single worker
//! drains it in issuance order and forwards each one to the driver. Every call
//! resolves exactly once with an [`Outcome`].

use crate::config::PrinterConfig;
use crate::device::Capability;
use crate::driver::PrinterDriver;
use crate::error::{ErrorKind, Outcome, PrinterError};
use crate::session::SessionState;
use crate::worker::PrintWorker;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A single printer request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintOperation {
    Initialize,
    PrintText {
        text: String,
        alignment: i32,
        font_size: i32,
    },
    FeedLine,
    CutPaper,
    QueryReady,
}

impl PrintOperation {
    /// Failure kind reported by this operation family
    pub fn error_kind(&self) -> ErrorKind {
        match self {
            PrintOperation::Initialize => ErrorKind::Init,
            PrintOperation::PrintText { .. }
            | PrintOperation::FeedLine
            | PrintOperation::CutPaper => ErrorKind::Print,
            PrintOperation::QueryReady => ErrorKind::Status,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PrintOperation::Initialize => "initialize",
            PrintOperation::PrintText { .. } => "print_text",
            PrintOperation::FeedLine => "feed_line",
            PrintOperation::CutPaper => "cut_paper",
            PrintOperation::QueryReady => "query_ready",
        }
    }
}

/// Queued request with its reply slot
pub(crate) struct Command {
    pub op: PrintOperation,
    pub reply: oneshot::Sender<Outcome<bool>>,
}

/// Handle to the printer dispatcher
///
/// Cheap to clone; all clones feed the same worker.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<Command>,
    state: watch::Receiver<SessionState>,
    shutdown: CancellationToken,
}

impl Dispatcher {
    /// Spawn the worker on the current tokio runtime
    ///
    /// Panics when called outside a runtime.
    pub fn spawn<D: PrinterDriver>(
        driver: D,
        capability: Capability,
        config: &PrinterConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (state_tx, state) = watch::channel(SessionState::Uninitialized);
        let shutdown = CancellationToken::new();

        let worker = PrintWorker::new(driver, capability, config, state_tx);
        tokio::spawn(worker.run(rx, shutdown.clone()));

        Self {
            tx,
            state,
            shutdown,
        }
    }

    /// Enqueue an operation and wait for its outcome
    pub async fn submit(&self, op: PrintOperation) -> Outcome<bool> {
        let kind = op.error_kind();
        debug!(op = op.name(), "enqueue");

        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command { op, reply }).await.is_err() {
            return Err(PrinterError::stopped(kind));
        }
        rx.await.unwrap_or_else(|_| Err(PrinterError::stopped(kind)))
    }

    /// Initialize the printer
    ///
    /// `Ok(false)` on hardware without the printer; that is not an error.
    pub async fn init_printer(&self) -> Outcome<bool> {
        self.submit(PrintOperation::Initialize).await
    }

    /// Print one line of text with the given alignment and font size
    ///
    /// Both values reach the driver unchanged.
    pub async fn print_text(
        &self,
        text: impl Into<String>,
        alignment: impl Into<i32>,
        font_size: i32,
    ) -> Outcome<bool> {
        self.submit(PrintOperation::PrintText {
            text: text.into(),
            alignment: alignment.into(),
            font_size,
        })
        .await
    }

    /// Advance paper by one line
    pub async fn print_line(&self) -> Outcome<bool> {
        self.submit(PrintOperation::FeedLine).await
    }

    pub async fn cut_paper(&self) -> Outcome<bool> {
        self.submit(PrintOperation::CutPaper).await
    }

    /// Readiness, from the driver probe when it has one, else device capability
    pub async fn is_printer_ready(&self) -> Outcome<bool> {
        self.submit(PrintOperation::QueryReady).await
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Stop accepting commands, drain the queue, and wait for the worker to exit
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let mut state = self.state.clone();
        while state.changed().await.is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_by_family() {
        assert_eq!(PrintOperation::Initialize.error_kind(), ErrorKind::Init);
        assert_eq!(PrintOperation::FeedLine.error_kind(), ErrorKind::Print);
        assert_eq!(PrintOperation::CutPaper.error_kind(), ErrorKind::Print);
        assert_eq!(
            PrintOperation::PrintText {
                text: String::new(),
                alignment: 0,
                font_size: 16,
            }
            .error_kind(),
            ErrorKind::Print
        );
        assert_eq!(PrintOperation::QueryReady.error_kind(), ErrorKind::Status);
    }
}
