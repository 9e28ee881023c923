//! Print worker
//!
//! Sole consumer of the dispatcher queue. Owns the driver and the session
//! state; driver calls run on the blocking pool one at a time.

use crate::config::PrinterConfig;
use crate::device::Capability;
use crate::dispatcher::{Command, PrintOperation};
use crate::driver::PrinterDriver;
use crate::error::{DriverError, DriverResult, ErrorKind, Outcome, PrinterError};
use crate::session::{Session, SessionState};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Driver call result; `Some` only for the readiness probe
type CallResult = DriverResult<Option<bool>>;

type DriverJob<D> = JoinHandle<(D, CallResult)>;

/// Where the driver currently is
enum DriverSlot<D> {
    Idle(D),
    /// A call outlived `op_timeout` and still holds the driver
    Stalled(DriverJob<D>),
    Lost,
}

pub(crate) struct PrintWorker<D: PrinterDriver> {
    slot: DriverSlot<D>,
    capability: Capability,
    session: Session,
    op_timeout: Option<Duration>,
    state_tx: watch::Sender<SessionState>,
}

impl<D: PrinterDriver> PrintWorker<D> {
    pub fn new(
        driver: D,
        capability: Capability,
        config: &PrinterConfig,
        state_tx: watch::Sender<SessionState>,
    ) -> Self {
        Self {
            slot: DriverSlot::Idle(driver),
            capability,
            session: Session::new(config.session_policy),
            op_timeout: config.op_timeout,
            state_tx,
        }
    }

    /// Run until the queue closes or shutdown is requested
    ///
    /// On shutdown, commands already queued are still executed.
    pub async fn run(mut self, mut rx: mpsc::Receiver<Command>, shutdown: CancellationToken) {
        info!(
            supported = self.capability.is_supported(),
            "Print worker started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Print worker received shutdown signal");
                    rx.close();
                    break;
                }
                cmd = rx.recv() => {
                    let Some(cmd) = cmd else {
                        info!("Print queue closed, worker stopping");
                        break;
                    };
                    self.handle(cmd).await;
                }
            }
        }

        while let Some(cmd) = rx.recv().await {
            self.handle(cmd).await;
        }

        info!("Print worker stopped");
    }

    async fn handle(&mut self, cmd: Command) {
        let outcome = self.execute(cmd.op).await;
        // Caller may have stopped waiting
        let _ = cmd.reply.send(outcome);
    }

    #[instrument(skip_all, fields(op = op.name()))]
    async fn execute(&mut self, op: PrintOperation) -> Outcome<bool> {
        let kind = op.error_kind();
        match op {
            PrintOperation::Initialize => self.initialize().await,
            PrintOperation::QueryReady => self.query_ready().await,
            PrintOperation::PrintText {
                text,
                alignment,
                font_size,
            } => {
                debug!(alignment, font_size, len = text.len(), "print text");
                self.print(kind, move |d: &mut D| {
                    d.set_alignment(alignment)?;
                    d.set_font_size(font_size)?;
                    d.print_text(&text)?;
                    Ok(None)
                })
                .await
            }
            PrintOperation::FeedLine => {
                self.print(kind, |d: &mut D| d.feed().map(|_| None)).await
            }
            PrintOperation::CutPaper => {
                self.print(kind, |d: &mut D| d.cut().map(|_| None)).await
            }
        }
    }

    async fn initialize(&mut self) -> Outcome<bool> {
        if !self.capability.is_supported() {
            info!("Device has no supported printer, skipping driver init");
            self.session.initialized(false, true);
            self.publish();
            return Ok(false);
        }

        self.session.begin();
        self.publish();

        let result = self.call(|d: &mut D| d.init().map(|_| None)).await;
        self.session.initialized(true, result.is_ok());
        self.publish();

        match result {
            Ok(_) => {
                info!("Printer initialized");
                Ok(true)
            }
            Err(e) => {
                error!(error = %e, "Failed to initialize printer");
                Err(PrinterError::from_driver(ErrorKind::Init, &e))
            }
        }
    }

    async fn query_ready(&mut self) -> Outcome<bool> {
        match self.call(|d: &mut D| d.is_ready()).await {
            Ok(Some(ready)) => Ok(ready),
            Ok(None) => Ok(self.capability.is_supported()),
            Err(e) => {
                error!(error = %e, "Failed to check printer status");
                Err(PrinterError::from_driver(ErrorKind::Status, &e))
            }
        }
    }

    async fn print<F>(&mut self, kind: ErrorKind, f: F) -> Outcome<bool>
    where
        F: FnOnce(&mut D) -> CallResult + Send + 'static,
    {
        if let Err(e) = self.session.admit_print(kind) {
            warn!(state = %self.session.state(), "Rejected print operation");
            return Err(e);
        }

        let previous = self.session.begin();
        self.publish();

        let result = self.call(f).await;
        self.session.finish(previous, result.is_ok());
        self.publish();

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                error!(error = %e, "Print operation failed");
                Err(PrinterError::from_driver(kind, &e))
            }
        }
    }

    /// Run one driver call on the blocking pool
    ///
    /// Panics inside the call become faults and the driver is kept.
    async fn call<F>(&mut self, f: F) -> CallResult
    where
        F: FnOnce(&mut D) -> CallResult + Send + 'static,
    {
        let mut driver = self.take_driver().await?;

        let mut job: DriverJob<D> = tokio::task::spawn_blocking(move || {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| f(&mut driver)))
                .unwrap_or_else(|payload| Err(DriverError::Fault(panic_message(payload))));
            (driver, result)
        });

        let joined = match self.op_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut job).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(timeout_ms = limit.as_millis() as u64, "Driver call timed out");
                    self.slot = DriverSlot::Stalled(job);
                    return Err(DriverError::Timeout(format!(
                        "driver call exceeded {} ms",
                        limit.as_millis()
                    )));
                }
            },
            None => job.await,
        };

        match joined {
            Ok((driver, result)) => {
                self.slot = DriverSlot::Idle(driver);
                result
            }
            Err(e) => {
                error!(error = %e, "Driver task failed");
                self.slot = DriverSlot::Lost;
                Err(DriverError::Fault(format!("driver task failed: {}", e)))
            }
        }
    }

    async fn take_driver(&mut self) -> DriverResult<D> {
        match std::mem::replace(&mut self.slot, DriverSlot::Lost) {
            DriverSlot::Idle(driver) => Ok(driver),
            DriverSlot::Stalled(job) if !job.is_finished() => {
                self.slot = DriverSlot::Stalled(job);
                Err(DriverError::Timeout(
                    "previous driver call still running".to_string(),
                ))
            }
            DriverSlot::Stalled(job) => match job.await {
                Ok((driver, result)) => {
                    if let Err(e) = result {
                        debug!(error = %e, "Stalled driver call finished with error");
                    }
                    Ok(driver)
                }
                Err(e) => Err(DriverError::Fault(format!("driver task failed: {}", e))),
            },
            DriverSlot::Lost => Err(DriverError::Offline(
                "printer driver unavailable".to_string(),
            )),
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.session.state());
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "driver panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Dispatcher;
    use crate::session::SessionPolicy;
    use std::sync::{Arc, Mutex};

    /// Driver whose every call is recorded; `fail_on` names a call that faults
    #[derive(Clone, Default)]
    struct ScriptedDriver {
        calls: Arc<Mutex<Vec<String>>>,
        fail_on: Option<&'static str>,
        panic_on: Option<&'static str>,
        ready: Option<bool>,
        delay: Option<Duration>,
    }

    impl ScriptedDriver {
        fn record(&self, call: String, name: &str) -> DriverResult<()> {
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            self.calls.lock().unwrap().push(call);
            if self.panic_on == Some(name) {
                panic!("cutter jammed");
            }
            if self.fail_on == Some(name) {
                return Err(DriverError::Fault(format!("{} failed", name)));
            }
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PrinterDriver for ScriptedDriver {
        fn init(&mut self) -> DriverResult<()> {
            self.record("init".into(), "init")
        }
        fn set_alignment(&mut self, alignment: i32) -> DriverResult<()> {
            self.record(format!("align:{}", alignment), "align")
        }
        fn set_font_size(&mut self, size: i32) -> DriverResult<()> {
            self.record(format!("size:{}", size), "size")
        }
        fn print_text(&mut self, text: &str) -> DriverResult<()> {
            self.record(format!("text:{}", text), "text")
        }
        fn feed(&mut self) -> DriverResult<()> {
            self.record("feed".into(), "feed")
        }
        fn cut(&mut self) -> DriverResult<()> {
            self.record("cut".into(), "cut")
        }
        fn is_ready(&mut self) -> DriverResult<Option<bool>> {
            self.record("ready".into(), "ready")?;
            Ok(self.ready)
        }
    }

    fn spawn(driver: &ScriptedDriver, capability: Capability) -> Dispatcher {
        Dispatcher::spawn(driver.clone(), capability, &PrinterConfig::default())
    }

    #[tokio::test]
    async fn test_unsupported_init_resolves_false() {
        let driver = ScriptedDriver::default();
        let dispatcher = spawn(&driver, Capability::unsupported());

        assert_eq!(dispatcher.init_printer().await, Ok(false));
        assert_eq!(dispatcher.state(), SessionState::Uninitialized);
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn test_print_before_init_rejected() {
        let driver = ScriptedDriver::default();
        let dispatcher = spawn(&driver, Capability::supported());

        let err = dispatcher.print_text("x", 0, 16).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Print);
        assert_eq!(err.message, "printer not initialized");
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn test_init_fault_is_init_error() {
        let driver = ScriptedDriver {
            fail_on: Some("init"),
            ..Default::default()
        };
        let dispatcher = spawn(&driver, Capability::supported());

        let err = dispatcher.init_printer().await.unwrap_err();
        assert_eq!(err, PrinterError::new(ErrorKind::Init, "init failed"));
        assert_eq!(dispatcher.state(), SessionState::Faulted);
    }

    #[tokio::test]
    async fn test_fault_then_reinit() {
        let driver = ScriptedDriver {
            fail_on: Some("feed"),
            ..Default::default()
        };
        let dispatcher = spawn(&driver, Capability::supported());

        assert_eq!(dispatcher.init_printer().await, Ok(true));
        let err = dispatcher.print_line().await.unwrap_err();
        assert_eq!(err, PrinterError::new(ErrorKind::Print, "feed failed"));
        assert_eq!(dispatcher.state(), SessionState::Faulted);

        let err = dispatcher.cut_paper().await.unwrap_err();
        assert_eq!(err, PrinterError::faulted(ErrorKind::Print));

        assert_eq!(dispatcher.init_printer().await, Ok(true));
        assert_eq!(dispatcher.cut_paper().await, Ok(true));
        assert_eq!(dispatcher.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_driver_panic_is_caught() {
        let driver = ScriptedDriver {
            panic_on: Some("cut"),
            ..Default::default()
        };
        let dispatcher = spawn(&driver, Capability::supported());

        dispatcher.init_printer().await.unwrap();
        let err = dispatcher.cut_paper().await.unwrap_err();
        assert_eq!(err, PrinterError::new(ErrorKind::Print, "cutter jammed"));

        // Driver survives the panic
        assert_eq!(dispatcher.init_printer().await, Ok(true));
        assert_eq!(driver.calls(), vec!["init", "cut", "init"]);
    }

    #[tokio::test]
    async fn test_ready_falls_back_to_capability() {
        let driver = ScriptedDriver::default();
        let supported = spawn(&driver, Capability::supported());
        let unsupported = spawn(&driver, Capability::unsupported());

        assert_eq!(supported.is_printer_ready().await, Ok(true));
        assert_eq!(unsupported.is_printer_ready().await, Ok(false));
    }

    #[tokio::test]
    async fn test_ready_uses_probe() {
        let driver = ScriptedDriver {
            ready: Some(false),
            ..Default::default()
        };
        let dispatcher = spawn(&driver, Capability::supported());

        assert_eq!(dispatcher.is_printer_ready().await, Ok(false));
        assert_eq!(dispatcher.is_printer_ready().await, Ok(false));
        assert_eq!(dispatcher.state(), SessionState::Uninitialized);
    }

    #[tokio::test]
    async fn test_ready_fault_is_status_error() {
        let driver = ScriptedDriver {
            fail_on: Some("ready"),
            ..Default::default()
        };
        let dispatcher = spawn(&driver, Capability::supported());

        let err = dispatcher.is_printer_ready().await.unwrap_err();
        assert_eq!(err, PrinterError::new(ErrorKind::Status, "ready failed"));
    }

    #[tokio::test]
    async fn test_permissive_allows_print_without_init() {
        let driver = ScriptedDriver::default();
        let config = PrinterConfig {
            session_policy: SessionPolicy::Permissive,
            ..Default::default()
        };
        let dispatcher = Dispatcher::spawn(driver.clone(), Capability::supported(), &config);

        assert_eq!(dispatcher.print_line().await, Ok(true));
        assert_eq!(driver.calls(), vec!["feed"]);
    }

    #[tokio::test]
    async fn test_timeout_faults_session() {
        let driver = ScriptedDriver {
            delay: Some(Duration::from_millis(300)),
            ..Default::default()
        };
        let config = PrinterConfig {
            op_timeout: Some(Duration::from_millis(20)),
            ..Default::default()
        };
        let dispatcher = Dispatcher::spawn(driver.clone(), Capability::supported(), &config);

        let err = dispatcher.init_printer().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Init);
        assert_eq!(err.message, "Timeout: driver call exceeded 20 ms");
        assert_eq!(dispatcher.state(), SessionState::Faulted);

        let err = dispatcher.init_printer().await.unwrap_err();
        assert_eq!(err.message, "Timeout: previous driver call still running");
    }

    #[tokio::test]
    async fn test_shutdown_drains_then_stops() {
        let driver = ScriptedDriver::default();
        let dispatcher = spawn(&driver, Capability::supported());

        dispatcher.init_printer().await.unwrap();
        dispatcher.shutdown().await;

        let err = dispatcher.print_line().await.unwrap_err();
        assert_eq!(err, PrinterError::stopped(ErrorKind::Print));
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(42)), "driver panicked");
    }
}
