//! # newland-printer
//!
//! Device-control layer for the thermal printer built into Newland handheld
//! terminals.
//!
//! ## Scope
//!
//! This crate handles HOW to drive the printer:
//! - Device classification from platform identity strings
//! - A single-consumer command queue serializing printer operations
//! - A session state machine (Uninitialized / Ready / Busy / Faulted)
//! - Typed outcomes (`INIT_ERROR`, `PRINT_ERROR`, `STATUS_ERROR`)
//! - An ESC/POS reference driver over TCP or a character device
//!
//! The vendor SDK plugs in behind [`PrinterDriver`].
//!
//! ## Example
//!
//! ```ignore
//! use newland_printer::{Alignment, Capability, Dispatcher, EscPosDriver, PrinterConfig};
//!
//! let config = PrinterConfig::from_env();
//! let driver = EscPosDriver::open_device(&config.device_path)?;
//! let printer = Dispatcher::spawn(driver, Capability::platform(), &config);
//!
//! if printer.init_printer().await? {
//!     printer.print_text("Receipt", Alignment::Center, 24).await?;
//!     printer.print_line().await?;
//!     printer.cut_paper().await?;
//! }
//! ```

mod config;
mod device;
mod dispatcher;
mod driver;
mod error;
mod escpos;
mod receipt;
mod session;
mod worker;

// Re-exports
pub use config::PrinterConfig;
pub use device::{Capability, DeviceIdentity, platform_identity};
pub use dispatcher::{Dispatcher, PrintOperation};
pub use driver::PrinterDriver;
pub use error::{DriverError, DriverResult, ErrorKind, Outcome, PrinterError};
pub use escpos::{Alignment, EscPosBuilder, EscPosDriver, font_magnification};
pub use receipt::{ReceiptLine, ReceiptStatus, TicketReceipt, print_receipt, receipt_number};
pub use session::{SessionPolicy, SessionState};
