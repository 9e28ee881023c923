//! Driver selection

use anyhow::Context;
use newland_printer::{Capability, EscPosDriver, PrinterConfig, PrinterDriver};
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Open the driver for this run
///
/// Precedence: `--output` file, then `PRINTER_ADDR`, then `PRINTER_DEVICE`.
/// Hardware without the printer gets a sink; the dispatcher never reaches
/// it there except for readiness probes, which the sink does not answer.
pub fn open_driver(
    config: &PrinterConfig,
    capability: Capability,
    output: Option<&Path>,
) -> anyhow::Result<Box<dyn PrinterDriver>> {
    if let Some(path) = output {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file {}", path.display()))?;
        info!(path = %path.display(), "Writing ESC/POS output to file");
        return Ok(Box::new(
            EscPosDriver::new(file).with_cut_feed(config.cut_feed_lines),
        ));
    }

    if !capability.is_supported() {
        info!("No supported printer on this device");
        return Ok(Box::new(EscPosDriver::new(std::io::sink())));
    }

    if let Some(addr) = &config.printer_addr {
        let driver = EscPosDriver::connect_tcp(addr, config.connect_timeout)
            .with_context(|| format!("Failed to connect to printer at {}", addr))?;
        return Ok(Box::new(driver.with_cut_feed(config.cut_feed_lines)));
    }

    let driver = EscPosDriver::open_device(&config.device_path)
        .with_context(|| format!("Failed to open printer device {}", config.device_path))?;
    Ok(Box::new(driver.with_cut_feed(config.cut_feed_lines)))
}
