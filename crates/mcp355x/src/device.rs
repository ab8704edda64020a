use embedded_hal::delay::DelayNs;
use tracing::{debug, warn};

use crate::code::{decode, to_voltage};
use crate::error::Error;
use crate::ic::Ic;
use crate::peripheral::{ChipSelect, Peripheral, SpiConfig};
use crate::sequencer::Sequencer;

/// Power-up time before the chip accepts CE, in microseconds.
pub const T_POWER_UP_US: u32 = 300;

/// Power-up to CE low, in microseconds (10 us typical).
pub const T_PUCSL_US: u32 = 20;

/// Waits out the chip's power-up time.
pub fn startup<D: DelayNs>(delay: &mut D) {
    delay.delay_us(T_POWER_UP_US);
    delay.delay_us(T_PUCSL_US);
}

/// MCP3550/1/3 driver
///
/// Holds the SPI bus open for as long as it lives and closes it on drop.
pub struct Mcp355x<P: Peripheral, D: DelayNs> {
    peripheral: P,
    delay: D,
    config: SpiConfig,
    ce: P::Pin,
    ic: Ic,
}

impl<P: Peripheral, D: DelayNs> Mcp355x<P, D> {
    /// Opens the bus and waits for the chip to power up. `ce` is the GPIO wired
    /// to the chip's CS pin; it is driven by hand, not by the SPI controller.
    pub fn new(peripheral: P, delay: D, ce: P::Pin, ic: Ic) -> Result<Self, Error<P::Error>> {
        Self::with_config(peripheral, delay, ce, ic, SpiConfig::MCP355X)
    }

    /// Like [`Mcp355x::new`] with custom bus settings, e.g. a different clock.
    /// `config.chip_select` must be [`ChipSelect::Manual`].
    pub fn with_config(
        mut peripheral: P,
        mut delay: D,
        ce: P::Pin,
        ic: Ic,
        config: SpiConfig,
    ) -> Result<Self, Error<P::Error>> {
        if config.chip_select != ChipSelect::Manual {
            return Err(Error::ChipSelect);
        }
        peripheral.spi_begin(&config).map_err(Error::Bus)?;
        startup(&mut delay);

        debug!(?ce, %ic, conversion_time_us = ic.conversion_time_us(), "MCP355x ready");

        Ok(Self {
            peripheral,
            delay,
            config,
            ce,
            ic,
        })
    }

    pub fn ic(&self) -> Ic {
        self.ic
    }

    pub fn ce(&self) -> P::Pin {
        self.ce
    }

    /// Triggers a conversion and returns the raw 24-bit output register.
    /// Blocks for the chip's full conversion time.
    pub fn read_register(&mut self) -> Result<u32, Error<P::Error>> {
        Sequencer::new(
            &mut self.peripheral,
            &mut self.delay,
            &self.config,
            self.ce,
            self.ic.conversion_time_us(),
        )
        .run()
    }

    /// Triggers a conversion and returns the signed code, see [`decode`].
    pub fn read_code(&mut self) -> Result<i32, Error<P::Error>> {
        self.read_register().map(decode)
    }

    /// Triggers a conversion and returns the input voltage, between -Vref and
    /// Vref with roughly 12% overrange either side.
    ///
    /// A corrupted transfer still produces a plausible number; the chip gives
    /// no way to tell.
    pub fn read_value(&mut self) -> Result<f64, Error<P::Error>> {
        let raw = self.read_register()?;
        let code = decode(raw);
        let voltage = to_voltage(code);

        debug!(raw, code, voltage, "conversion");

        Ok(voltage)
    }
}

impl<P: Peripheral, D: DelayNs> Drop for Mcp355x<P, D> {
    fn drop(&mut self) {
        if let Err(error) = self.peripheral.spi_end() {
            warn!(?error, "failed to release SPI bus");
        }
    }
}
