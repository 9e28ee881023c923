//! ESC/POS command encoding
//!
//! [`EscPosBuilder`] builds byte sequences; [`EscPosDriver`] is a
//! [`PrinterDriver`] that writes them to any `Write` transport (raw TCP port
//! 9100, a printer character device, a file).

use crate::driver::PrinterDriver;
use crate::error::{DriverError, DriverResult};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// Text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum Alignment {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

impl From<Alignment> for i32 {
    fn from(alignment: Alignment) -> Self {
        alignment as i32
    }
}

impl TryFrom<i32> for Alignment {
    type Error = DriverError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Alignment::Left),
            1 => Ok(Alignment::Center),
            2 => Ok(Alignment::Right),
            other => Err(DriverError::Unsupported(format!("alignment {}", other))),
        }
    }
}

/// Map a point size to a `GS !` character magnification (1-8)
///
/// 8-19pt print at normal size, every further 12pt adds one step.
/// Returns `None` for non-positive sizes.
pub fn font_magnification(points: i32) -> Option<u8> {
    if points <= 0 {
        return None;
    }
    let steps = (points - 8).max(0) / 12;
    Some((steps.min(7) + 1) as u8)
}

/// ESC/POS command builder
pub struct EscPosBuilder {
    buf: Vec<u8>,
}

impl EscPosBuilder {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(64),
        }
    }

    /// Initialize printer (ESC @)
    pub fn init(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x40]);
        self
    }

    // === Text Output ===

    /// Write raw text
    pub fn text(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(s.as_bytes());
        self
    }

    /// Write text followed by newline
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.buf.push(b'\n');
        self
    }

    /// Print and feed n lines
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        // ESC d n
        self.buf.extend_from_slice(&[0x1B, 0x64, lines]);
        self
    }

    // === Alignment ===

    pub fn align(&mut self, alignment: Alignment) -> &mut Self {
        // ESC a n
        self.buf.extend_from_slice(&[0x1B, 0x61, alignment as u8]);
        self
    }

    // === Text Size ===

    /// Uniform character magnification, 1-8
    pub fn size(&mut self, magnification: u8) -> &mut Self {
        let m = magnification.clamp(1, 8) - 1;
        // GS ! n - width in high nibble, height in low nibble
        self.buf.extend_from_slice(&[0x1D, 0x21, (m << 4) | m]);
        self
    }

    // === Paper Control ===

    /// Cut paper (full cut)
    pub fn cut(&mut self) -> &mut Self {
        // GS V 0
        self.buf.extend_from_slice(&[0x1D, 0x56, 0x00]);
        self
    }

    /// Full cut after feeding n lines
    ///
    /// GS V 66 n lets the printer account for the cutter-to-head distance.
    pub fn cut_feed(&mut self, lines: u8) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x56, 0x42, lines]);
        self
    }

    /// Write raw bytes directly
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// ESC/POS driver over a byte transport
///
/// Each call encodes one command and flushes it. There is no back channel,
/// so [`PrinterDriver::is_ready`] reports no probe.
pub struct EscPosDriver<W: Write + Send> {
    writer: W,
    cut_feed_lines: u8,
}

impl<W: Write + Send> EscPosDriver<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            cut_feed_lines: 3,
        }
    }

    /// Lines fed before the cutter fires
    pub fn with_cut_feed(mut self, lines: u8) -> Self {
        self.cut_feed_lines = lines;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn send(&mut self, builder: EscPosBuilder) -> DriverResult<()> {
        let data = builder.build();
        self.writer.write_all(&data)?;
        self.writer.flush()?;
        Ok(())
    }
}

impl EscPosDriver<TcpStream> {
    /// Connect to a raw TCP printer (e.g. "192.168.1.100:9100")
    #[instrument(skip(timeout))]
    pub fn connect_tcp(addr: &str, timeout: Duration) -> DriverResult<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|_| DriverError::Unsupported(format!("Invalid address: {}", addr)))?;

        let stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| match e.kind() {
            std::io::ErrorKind::TimedOut => {
                DriverError::Timeout(format!("Connection timeout: {}", addr))
            }
            _ => DriverError::Offline(format!("{}: {}", addr, e)),
        })?;
        stream.set_write_timeout(Some(timeout))?;

        info!(%addr, "Connected to printer");
        Ok(Self::new(stream))
    }
}

impl EscPosDriver<File> {
    /// Open a printer character device (e.g. "/dev/usb/lp0")
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open_device(path: impl AsRef<Path>) -> DriverResult<Self> {
        let file = OpenOptions::new()
            .write(true)
            .open(path.as_ref())
            .map_err(|e| DriverError::Offline(format!("{}: {}", path.as_ref().display(), e)))?;

        info!("Printer device opened");
        Ok(Self::new(file))
    }
}

impl<W: Write + Send + 'static> PrinterDriver for EscPosDriver<W> {
    fn init(&mut self) -> DriverResult<()> {
        let mut b = EscPosBuilder::new();
        b.init();
        self.send(b)
    }

    fn set_alignment(&mut self, alignment: i32) -> DriverResult<()> {
        let alignment = Alignment::try_from(alignment)?;
        let mut b = EscPosBuilder::new();
        b.align(alignment);
        self.send(b)
    }

    fn set_font_size(&mut self, size: i32) -> DriverResult<()> {
        let magnification = font_magnification(size)
            .ok_or_else(|| DriverError::Unsupported(format!("font size {}", size)))?;
        let mut b = EscPosBuilder::new();
        b.size(magnification);
        self.send(b)
    }

    fn print_text(&mut self, text: &str) -> DriverResult<()> {
        let mut b = EscPosBuilder::new();
        b.line(text);
        self.send(b)
    }

    fn feed(&mut self) -> DriverResult<()> {
        let mut b = EscPosBuilder::new();
        b.feed(1);
        self.send(b)
    }

    fn cut(&mut self) -> DriverResult<()> {
        let mut b = EscPosBuilder::new();
        b.cut_feed(self.cut_feed_lines);
        self.send(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_conversion() {
        assert_eq!(i32::from(Alignment::Center), 1);
        assert_eq!(Alignment::try_from(2).unwrap(), Alignment::Right);
        assert!(Alignment::try_from(3).is_err());
        assert!(Alignment::try_from(-1).is_err());
    }

    #[test]
    fn test_font_magnification() {
        assert_eq!(font_magnification(16), Some(1));
        assert_eq!(font_magnification(18), Some(1));
        assert_eq!(font_magnification(24), Some(2));
        assert_eq!(font_magnification(32), Some(3));
        assert_eq!(font_magnification(4), Some(1));
        assert_eq!(font_magnification(500), Some(8));
        assert_eq!(font_magnification(0), None);
        assert_eq!(font_magnification(-12), None);
    }

    #[test]
    fn test_builder_bytes() {
        let mut b = EscPosBuilder::new();
        b.init().align(Alignment::Center).size(2).line("Hi").cut_feed(3);
        assert_eq!(
            b.build(),
            vec![
                0x1B, 0x40, 0x1B, 0x61, 0x01, 0x1D, 0x21, 0x11, b'H', b'i', b'\n', 0x1D, 0x56,
                0x42, 0x03
            ]
        );
    }

    #[test]
    fn test_driver_sequence() {
        let mut driver = EscPosDriver::new(Vec::new()).with_cut_feed(2);
        driver.init().unwrap();
        driver.set_alignment(0).unwrap();
        driver.set_font_size(16).unwrap();
        driver.print_text("₱15.00").unwrap();
        driver.feed().unwrap();
        driver.cut().unwrap();

        let mut expected = vec![0x1B, 0x40, 0x1B, 0x61, 0x00, 0x1D, 0x21, 0x00];
        expected.extend_from_slice("₱15.00\n".as_bytes());
        expected.extend_from_slice(&[0x1B, 0x64, 0x01, 0x1D, 0x56, 0x42, 0x02]);
        assert_eq!(driver.into_inner(), expected);
    }

    #[test]
    fn test_driver_rejects_out_of_range() {
        let mut driver = EscPosDriver::new(Vec::new());
        assert!(matches!(
            driver.set_alignment(7),
            Err(DriverError::Unsupported(_))
        ));
        assert!(matches!(
            driver.set_font_size(0),
            Err(DriverError::Unsupported(_))
        ));
        assert!(driver.into_inner().is_empty());
    }

    #[test]
    fn test_driver_has_no_probe() {
        let mut driver = EscPosDriver::new(Vec::new());
        assert_eq!(driver.is_ready().unwrap(), None);
    }

    #[test]
    fn test_invalid_addr() {
        let result = EscPosDriver::connect_tcp("invalid", Duration::from_millis(100));
        assert!(matches!(result, Err(DriverError::Unsupported(_))));
    }

    #[test]
    fn test_open_device_writes_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut driver = EscPosDriver::open_device(file.path()).unwrap();
        driver.init().unwrap();
        drop(driver);
        assert_eq!(std::fs::read(file.path()).unwrap(), vec![0x1B, 0x40]);
    }
}
