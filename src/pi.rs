//! Take readings from an MCP3550/1/3 wired to a Raspberry Pi's SPI0.

use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mcp355x::{decode, raw_to_voltage, Ic, Mcp355x, LSB, VREF};
use rppal::hal::Delay;
use rppal::spi::SlaveSelect;
use tracing::{info, warn};

mod logging;
mod raspberry_pi;

use raspberry_pi::{RaspberryPi, CE1_PIN};

#[derive(Parser)]
#[command(about = "Read an MCP3550/1/3 ADC on a Raspberry Pi")]
struct Cli {
    /// GPIO wired to the chip's CS pin.
    #[arg(long, env = "MCP355X_CE_PIN", default_value_t = CE1_PIN)]
    ce: u8,

    /// Which chip is attached.
    #[arg(long, env = "MCP355X_IC", default_value_t = Ic::Mcp3553)]
    ic: Ic,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Take single-shot readings.
    Read {
        #[arg(short, long, default_value_t = 1)]
        count: u32,

        /// Pause between readings.
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,
    },
    /// Walk an operator through applying known voltages.
    Check,
}

type Adc = Mcp355x<RaspberryPi, Delay>;

/// A known input voltage and how far the reading may stray from it.
struct Check {
    setup: &'static str,
    expected: f64,
    tolerance: f64,
}

impl Check {
    fn passes(&self, value: f64) -> bool {
        (value - self.expected).abs() < self.tolerance
    }
}

fn checks() -> [Check; 4] {
    [
        Check {
            setup: "Connect both the VIN+ and VIN- pins to VREF",
            expected: 0.0,
            tolerance: 0.0003,
        },
        Check {
            setup: "Connect VIN+ to GND and VIN- to VREF",
            expected: -VREF,
            tolerance: 0.001,
        },
        Check {
            // The 5V rail measured 5.22V on the test bench.
            setup: "Connect VIN+ to 5V and VIN- to VREF",
            expected: 5.22 - VREF,
            tolerance: 0.007,
        },
        Check {
            setup: "Connect VIN+ to 3.3V and VIN- to VREF",
            expected: 3.30 - VREF,
            tolerance: 0.008,
        },
    ]
}

/// Register values with known decodings, checked before touching the chip.
const DECODE_TABLE: [(u32, i32, f64); 11] = [
    (0x600001, 2097153, VREF + LSB),
    (0x600000, 2097152, VREF),
    (0x1FFFFF, 2097151, VREF - LSB),
    (0x000002, 2, 2.0 * LSB),
    (0x000001, 1, LSB),
    (0x000000, 0, 0.0),
    (0x3FFFFF, -1, -LSB),
    (0x3FFFFE, -2, -2.0 * LSB),
    (0x200000, -2097152, -VREF),
    (0x9FFFFF, -2097153, -VREF - LSB),
    (0x9FFFFE, -2097154, -VREF - 2.0 * LSB),
];

fn check_decoding() -> Result<()> {
    for (raw, code, voltage) in DECODE_TABLE {
        if decode(raw) != code || raw_to_voltage(raw) != voltage {
            bail!("{raw:#08x} decoded to {} ({} V)", decode(raw), raw_to_voltage(raw));
        }
    }
    info!("decoding table ok");
    Ok(())
}

fn read(adc: &mut Adc, count: u32, interval: Duration) -> Result<()> {
    for n in 0..count {
        if n > 0 {
            thread::sleep(interval);
        }
        let code = adc.read_code().context("conversion failed")?;
        println!("{:+.7} V  (code {code})", mcp355x::to_voltage(code));
    }
    Ok(())
}

fn check(adc: &mut Adc) -> Result<()> {
    check_decoding()?;

    let stdin = io::stdin();
    let mut failures = 0;

    for check in checks() {
        print!("{} and press Enter.", check.setup);
        io::stdout().flush()?;
        stdin.lock().read_line(&mut String::new())?;

        let value = adc.read_value().context("conversion failed")?;
        if check.passes(value) {
            info!(value, expected = check.expected, "pass");
        } else {
            warn!(value, expected = check.expected, tolerance = check.tolerance, "fail");
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{failures} of {} checks failed", checks().len());
    }
    Ok(())
}

fn main() -> Result<()> {
    logging::init();

    let cli = Cli::parse();

    let pi = RaspberryPi::new(SlaveSelect::Ss0).context("could not open GPIO, are you running as root?")?;
    let mut adc = Adc::new(pi, Delay::new(), cli.ce, cli.ic)
        .with_context(|| format!("could not configure SPI for the {}", cli.ic))?;

    info!(ce = cli.ce, ic = %cli.ic, "ADC ready");

    match cli.command {
        Command::Read { count, interval_ms } => {
            read(&mut adc, count, Duration::from_millis(interval_ms))
        }
        Command::Check => check(&mut adc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoding_table_holds() {
        check_decoding().unwrap();
    }

    #[test]
    fn tolerances() {
        let [zero, negative, five, three] = checks();
        assert!(zero.passes(0.0002));
        assert!(!zero.passes(-0.0004));
        assert!(negative.passes(-2.4995));
        assert!(five.passes(2.715));
        assert!(!three.passes(0.9));
    }
}
