//! Bus ticket receipt
//!
//! Turns ticket data into an ordered sequence of printer operations and
//! issues them through a [`Dispatcher`].

use crate::dispatcher::Dispatcher;
use crate::error::Outcome;
use crate::escpos::Alignment;
use chrono::{DateTime, TimeZone};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, instrument};

/// Width of the receipt separators in characters
const RECEIPT_WIDTH: usize = 37;

const TITLE_SIZE: i32 = 24;
const RULE_SIZE: i32 = 18;
const BODY_SIZE: i32 = 16;

/// Ticket data entered by the conductor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketReceipt {
    pub bus_number: u32,
    pub driver: String,
    pub conductor: String,
    pub route: String,
    pub from_stop: String,
    pub to_stop: String,
    pub passenger_category: String,
    pub fare: Decimal,
}

/// One printer step of a receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptLine {
    Text {
        text: String,
        alignment: Alignment,
        font_size: i32,
    },
    Feed,
    Cut,
}

impl ReceiptLine {
    fn text(text: impl Into<String>, alignment: Alignment, font_size: i32) -> Self {
        ReceiptLine::Text {
            text: text.into(),
            alignment,
            font_size,
        }
    }
}

/// How a receipt request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    /// Every line reached the printer
    Printed { operations: usize },
    /// No supported printer on this device; nothing was printed
    Simulated,
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiptStatus::Printed { operations } => {
                write!(f, "printed ({} operations)", operations)
            }
            ReceiptStatus::Simulated => f.write_str("simulated (no supported printer)"),
        }
    }
}

/// Receipt number: "R" followed by the last six digits of the epoch millis
pub fn receipt_number<Tz: TimeZone>(now: &DateTime<Tz>) -> String {
    format!("R{:06}", now.timestamp_millis().rem_euclid(1_000_000))
}

impl TicketReceipt {
    /// A receipt needs a bus and a non-zero fare
    pub fn is_complete(&self) -> bool {
        self.bus_number != 0 && self.fare > Decimal::ZERO
    }

    /// Printer steps for this receipt, issued at `now`
    pub fn layout<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<ReceiptLine>
    where
        Tz::Offset: fmt::Display,
    {
        use Alignment::{Center, Left};

        let eq_rule = "=".repeat(RECEIPT_WIDTH);
        let dash_rule = "-".repeat(RECEIPT_WIDTH);
        let dash = || ReceiptLine::text(dash_rule.clone(), Center, BODY_SIZE);
        let body = |s: String| ReceiptLine::text(s, Left, BODY_SIZE);

        vec![
            ReceiptLine::text("BUS TICKETING SYSTEM", Center, TITLE_SIZE),
            ReceiptLine::text(eq_rule.clone(), Center, RULE_SIZE),
            ReceiptLine::Feed,
            body(format!("Receipt #: {}", receipt_number(now))),
            body(format!("Date: {}", now.format("%Y-%m-%d"))),
            body(format!("Time: {}", now.format("%H:%M:%S"))),
            dash(),
            body(format!("Bus Number: {}", self.bus_number)),
            body(format!("Driver: {}", self.driver)),
            body(format!("Conductor: {}", self.conductor)),
            body(format!("Route: {}", self.route)),
            dash(),
            body(format!("From: {}", self.from_stop)),
            body(format!("To: {}", self.to_stop)),
            body(format!("Passenger: {}", self.passenger_category)),
            dash(),
            ReceiptLine::text(format!("FARE: ₱{:.2}", self.fare), Center, TITLE_SIZE),
            dash(),
            ReceiptLine::text("Thank you for riding!", Center, BODY_SIZE),
            ReceiptLine::text("Have a safe journey ahead", Center, BODY_SIZE),
            ReceiptLine::text(eq_rule, Center, RULE_SIZE),
            ReceiptLine::Feed,
            ReceiptLine::Feed,
            ReceiptLine::Feed,
            ReceiptLine::Cut,
        ]
    }

    /// Plain-text preview of the printed receipt
    pub fn render_preview<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> String
    where
        Tz::Offset: fmt::Display,
    {
        let mut out = String::new();
        for line in self.layout(now) {
            match line {
                ReceiptLine::Text {
                    text, alignment, ..
                } => {
                    let width = text.chars().count();
                    let pad = RECEIPT_WIDTH.saturating_sub(width);
                    let lead = match alignment {
                        Alignment::Left => 0,
                        Alignment::Center => pad / 2,
                        Alignment::Right => pad,
                    };
                    out.push_str(&" ".repeat(lead));
                    out.push_str(&text);
                    out.push('\n');
                }
                ReceiptLine::Feed => out.push('\n'),
                ReceiptLine::Cut => {}
            }
        }
        out
    }
}

/// Print a receipt through the dispatcher
///
/// Initializes first. On a device without the printer nothing is sent and
/// the receipt counts as simulated. The first failing step aborts the receipt.
#[instrument(skip_all, fields(bus = receipt.bus_number))]
pub async fn print_receipt<Tz: TimeZone>(
    dispatcher: &Dispatcher,
    receipt: &TicketReceipt,
    now: &DateTime<Tz>,
) -> Outcome<ReceiptStatus>
where
    Tz::Offset: fmt::Display,
{
    if !dispatcher.init_printer().await? {
        info!("No supported printer, simulating receipt");
        return Ok(ReceiptStatus::Simulated);
    }

    let lines = receipt.layout(now);
    let operations = lines.len();
    for line in lines {
        match line {
            ReceiptLine::Text {
                text,
                alignment,
                font_size,
            } => dispatcher.print_text(text, alignment, font_size).await?,
            ReceiptLine::Feed => dispatcher.print_line().await?,
            ReceiptLine::Cut => dispatcher.cut_paper().await?,
        };
    }

    info!(operations, "Receipt printed");
    Ok(ReceiptStatus::Printed { operations })
}
