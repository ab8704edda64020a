//! Decode MCP355x output registers without hardware attached.

use anyhow::Result;
use clap::{Parser, Subcommand};
use mcp355x::{decode, to_voltage, Ic, Overflow};
use tracing::debug;

mod logging;

#[derive(Parser)]
#[command(about = "Offline tools for the MCP3550/1/3 ADCs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode raw 24-bit register values into codes and volts.
    Decode {
        /// Register values, hex with a 0x prefix or decimal.
        #[arg(required = true, value_parser = parse_raw)]
        raw: Vec<u32>,
    },
    /// List the supported chips and their conversion times.
    Ics,
}

fn parse_raw(s: &str) -> Result<u32, String> {
    let s = s.trim();
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    }
    .map_err(|e| format!("invalid register value `{s}`: {e}"))?;

    if value > 0xFF_FFFF {
        return Err(format!("`{s}` does not fit in 24 bits"));
    }
    Ok(value)
}

fn describe(raw: u32) -> String {
    let code = decode(raw);
    let overflow = match Overflow::of(raw) {
        Overflow::None => "",
        Overflow::Positive => " (positive overflow)",
        Overflow::Negative => " (negative overflow)",
    };
    format!("{raw:#08x}  code {code:>8}  {:+.7} V{overflow}", to_voltage(code))
}

fn main() -> Result<()> {
    logging::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Decode { raw } => {
            debug!(count = raw.len(), "decoding");
            for raw in raw {
                println!("{}", describe(raw));
            }
        }
        Command::Ics => {
            for ic in Ic::all() {
                println!("{ic:<12} {:>6} us", ic.conversion_time_us());
            }
        }
    }

    Ok(())
}
