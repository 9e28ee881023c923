//! Driver seam
//!
//! The vendor SDK sits behind [`PrinterDriver`]. Calls are synchronous; the
//! dispatcher moves them onto the blocking pool.

use crate::error::DriverResult;

/// Synchronous print-head driver
///
/// Every call either completes or returns a [`DriverError`](crate::DriverError).
/// A panic inside a call is caught by the dispatcher and treated as a fault.
pub trait PrinterDriver: Send + 'static {
    /// Open or reset the printer session
    fn init(&mut self) -> DriverResult<()>;

    /// Select text alignment (raw vendor value)
    fn set_alignment(&mut self, alignment: i32) -> DriverResult<()>;

    /// Select font size (raw vendor value)
    fn set_font_size(&mut self, size: i32) -> DriverResult<()>;

    /// Print a line of text
    fn print_text(&mut self, text: &str) -> DriverResult<()>;

    /// Advance paper by one line
    fn feed(&mut self) -> DriverResult<()>;

    /// Fire the cutter
    fn cut(&mut self) -> DriverResult<()>;

    /// Hardware readiness probe
    ///
    /// `Ok(None)` means the driver has no probe; the dispatcher then reports
    /// device capability instead.
    fn is_ready(&mut self) -> DriverResult<Option<bool>> {
        Ok(None)
    }
}

impl<D: PrinterDriver + ?Sized> PrinterDriver for Box<D> {
    fn init(&mut self) -> DriverResult<()> {
        (**self).init()
    }

    fn set_alignment(&mut self, alignment: i32) -> DriverResult<()> {
        (**self).set_alignment(alignment)
    }

    fn set_font_size(&mut self, size: i32) -> DriverResult<()> {
        (**self).set_font_size(size)
    }

    fn print_text(&mut self, text: &str) -> DriverResult<()> {
        (**self).print_text(text)
    }

    fn feed(&mut self) -> DriverResult<()> {
        (**self).feed()
    }

    fn cut(&mut self) -> DriverResult<()> {
        (**self).cut()
    }

    fn is_ready(&mut self) -> DriverResult<Option<bool>> {
        (**self).is_ready()
    }
}
