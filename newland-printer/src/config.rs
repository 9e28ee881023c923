use crate::session::SessionPolicy;
use std::time::Duration;

/// Printer configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | PRINTER_QUEUE_CAPACITY | 64 | Pending command queue size |
/// | PRINTER_OP_TIMEOUT_MS | unset | Per-operation driver timeout, none when unset |
/// | PRINTER_SESSION_POLICY | strict | `strict` or `permissive` |
/// | PRINTER_CUT_FEED_LINES | 3 | Lines fed before the cutter fires |
/// | PRINTER_ADDR | unset | Raw TCP printer address (`host:9100`) |
/// | PRINTER_DEVICE | /dev/usb/lp0 | Printer character device |
/// | PRINTER_CONNECT_TIMEOUT_MS | 5000 | TCP connect timeout |
///
/// # Example
///
/// ```ignore
/// PRINTER_ADDR=192.168.1.100:9100 PRINTER_OP_TIMEOUT_MS=3000 ticket-printer status
/// ```
#[derive(Debug, Clone)]
pub struct PrinterConfig {
    /// Bounded capacity of the command queue
    pub queue_capacity: usize,
    /// Driver call timeout; `None` waits indefinitely
    pub op_timeout: Option<Duration>,
    /// Session admission policy
    pub session_policy: SessionPolicy,
    /// Lines fed before cutting
    pub cut_feed_lines: u8,
    /// TCP transport address, takes precedence over `device_path`
    pub printer_addr: Option<String>,
    /// Character device transport
    pub device_path: String,
    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl PrinterConfig {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable values fall back to defaults.
    pub fn from_env() -> Self {
        Self {
            queue_capacity: std::env::var("PRINTER_QUEUE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(64),
            op_timeout: std::env::var("PRINTER_OP_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis),
            session_policy: std::env::var("PRINTER_SESSION_POLICY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            cut_feed_lines: std::env::var("PRINTER_CUT_FEED_LINES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            printer_addr: std::env::var("PRINTER_ADDR")
                .ok()
                .filter(|v| !v.is_empty()),
            device_path: std::env::var("PRINTER_DEVICE")
                .unwrap_or_else(|_| "/dev/usb/lp0".into()),
            connect_timeout: std::env::var("PRINTER_CONNECT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_secs(5)),
        }
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            op_timeout: None,
            session_policy: SessionPolicy::Strict,
            cut_feed_lines: 3,
            printer_addr: None,
            device_path: "/dev/usb/lp0".into(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}
