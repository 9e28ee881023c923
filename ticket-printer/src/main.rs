//! ticket-printer
//!
//! Prints bus ticket receipts on the terminal's built-in thermal printer.

mod logger;
mod transport;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use newland_printer::{
    Capability, Dispatcher, PrinterConfig, TicketReceipt, platform_identity, print_receipt,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "ticket-printer", version, about = "Bus ticket receipt printer")]
struct Cli {
    /// Write the ESC/POS byte stream to this file instead of the printer
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show device identity, capability and printer readiness
    Status,
    /// Print a receipt from a JSON ticket file
    Print { receipt: PathBuf },
    /// Render a receipt preview to stdout
    Preview { receipt: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logger::init_logger();

    let cli = Cli::parse();
    let config = PrinterConfig::from_env();

    let identity = platform_identity();
    let capability = Capability::of(identity);
    info!(
        model = identity.model(),
        manufacturer = identity.manufacturer(),
        supported = capability.is_supported(),
        "Device identity"
    );

    match cli.command {
        Command::Status => {
            let driver = transport::open_driver(&config, capability, cli.output.as_deref())?;
            let printer = Dispatcher::spawn(driver, capability, &config);
            let ready = printer.is_printer_ready().await?;

            println!("model:        {}", identity.model());
            println!("manufacturer: {}", identity.manufacturer());
            println!("supported:    {}", capability.is_supported());
            println!("ready:        {}", ready);
            printer.shutdown().await;
        }
        Command::Print { receipt } => {
            let receipt = load_receipt(&receipt)?;
            let driver = transport::open_driver(&config, capability, cli.output.as_deref())?;
            let printer = Dispatcher::spawn(driver, capability, &config);

            let status = print_receipt(&printer, &receipt, &chrono::Local::now()).await?;
            printer.shutdown().await;

            info!(%status, "Receipt done");
            if !capability.is_supported() {
                warn!("Receipt was not printed: no supported printer on this device");
            }
            println!("{}", status);
        }
        Command::Preview { receipt } => {
            let receipt = load_receipt(&receipt)?;
            print!("{}", receipt.render_preview(&chrono::Local::now()));
        }
    }

    Ok(())
}

fn load_receipt(path: &Path) -> anyhow::Result<TicketReceipt> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read ticket file {}", path.display()))?;
    let receipt: TicketReceipt = serde_json::from_str(&data)
        .with_context(|| format!("Invalid ticket file {}", path.display()))?;
    if !receipt.is_complete() {
        bail!("Ticket needs a bus number and a non-zero fare");
    }
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_receipt() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"busNumber":2020,"driver":"MRaquid","conductor":"NBocio","route":"Naga-Labo",
               "fromStop":"Naga","toStop":"Labo","passengerCategory":"PWD","fare":192}}"#
        )
        .unwrap();

        let receipt = load_receipt(file.path()).unwrap();
        assert_eq!(receipt.bus_number, 2020);
    }

    #[test]
    fn test_load_receipt_rejects_zero_fare() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"busNumber":2020,"driver":"","conductor":"","route":"",
               "fromStop":"","toStop":"","passengerCategory":"","fare":0}}"#
        )
        .unwrap();

        assert!(load_receipt(file.path()).is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["ticket-printer", "--output", "out.bin", "print", "t.json"])
            .unwrap();
        assert_eq!(cli.output, Some(PathBuf::from("out.bin")));
        assert!(matches!(cli.command, Command::Print { .. }));
    }
}
