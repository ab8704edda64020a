use std::collections::hash_map::Entry;
use std::collections::HashMap;

use embedded_hal::digital::PinState;
use embedded_hal::spi::{Phase, Polarity, SpiBus};
use mcp355x::{BitOrder, CsPolarity, Peripheral, PinFunction, SpiConfig};
use rppal::gpio::{Gpio, IoPin, Level, Mode};
use rppal::spi::{self, Bus, SlaveSelect, Spi};
use tracing::trace;

/// GPIO 10 (MOSI)
pub const MOSI_PIN: u8 = 10;
/// GPIO 09 (MISO)
pub const MISO_PIN: u8 = 9;
/// GPIO 11 (SCLK)
pub const CLK_PIN: u8 = 11;
/// GPIO 07 (CE1). Any free GPIO, e.g. 22, works as well.
pub const CE1_PIN: u8 = 7;

#[derive(Debug, thiserror::Error)]
pub enum PiError {
    #[error(transparent)]
    Gpio(#[from] rppal::gpio::Error),
    #[error(transparent)]
    Spi(#[from] spi::Error),
    #[error("SPI bus is not open")]
    BusClosed,
    #[error("GPIO {0} has not been given a function yet")]
    Unconfigured(u8),
}

/// SPI0 and the GPIO bank of a Raspberry Pi.
///
/// The kernel's spidev driver still toggles its own chip-select line during
/// transfers. Wire the ADC to a CE pin other than `slave_select`'s, such as
/// [`CE1_PIN`] with [`SlaveSelect::Ss0`].
pub struct RaspberryPi {
    gpio: Gpio,
    slave_select: SlaveSelect,
    spi: Option<Spi>,
    pins: HashMap<u8, IoPin>,
}

impl RaspberryPi {
    pub fn new(slave_select: SlaveSelect) -> Result<Self, PiError> {
        Ok(Self {
            gpio: Gpio::new()?,
            slave_select,
            spi: None,
            pins: HashMap::new(),
        })
    }

    fn set_mode(&mut self, pin: u8, mode: Mode) -> Result<(), PiError> {
        let io = match self.pins.entry(pin) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let mut io = self.gpio.get(pin)?.into_io(mode);
                // Keep whatever function we last chose when the pin is dropped.
                io.set_reset_on_drop(false);
                entry.insert(io)
            }
        };
        io.set_mode(mode);
        Ok(())
    }
}

fn spi_mode(mode: embedded_hal::spi::Mode) -> spi::Mode {
    match (mode.polarity, mode.phase) {
        (Polarity::IdleLow, Phase::CaptureOnFirstTransition) => spi::Mode::Mode0,
        (Polarity::IdleLow, Phase::CaptureOnSecondTransition) => spi::Mode::Mode1,
        (Polarity::IdleHigh, Phase::CaptureOnFirstTransition) => spi::Mode::Mode2,
        (Polarity::IdleHigh, Phase::CaptureOnSecondTransition) => spi::Mode::Mode3,
    }
}

impl Peripheral for RaspberryPi {
    type Pin = u8;
    type Error = PiError;

    fn miso(&self) -> u8 {
        MISO_PIN
    }

    fn spi_begin(&mut self, config: &SpiConfig) -> Result<(), PiError> {
        for pin in [MISO_PIN, MOSI_PIN, CLK_PIN] {
            self.set_function(pin, PinFunction::Bus)?;
        }

        let spi = Spi::new(Bus::Spi0, self.slave_select, config.clock_hz, spi_mode(config.mode))?;
        spi.set_bit_order(match config.bit_order {
            BitOrder::MsbFirst => spi::BitOrder::MsbFirst,
            BitOrder::LsbFirst => spi::BitOrder::LsbFirst,
        })?;
        spi.set_ss_polarity(match config.cs_polarity {
            CsPolarity::ActiveLow => spi::Polarity::ActiveLow,
            CsPolarity::ActiveHigh => spi::Polarity::ActiveHigh,
        })?;

        trace!(clock_hz = config.clock_hz, "SPI0 open");
        self.spi = Some(spi);
        Ok(())
    }

    fn spi_end(&mut self) -> Result<(), PiError> {
        if self.spi.take().is_some() {
            trace!("SPI0 closed");
        }
        Ok(())
    }

    fn set_function(&mut self, pin: u8, function: PinFunction) -> Result<(), PiError> {
        let mode = match function {
            PinFunction::Output => Mode::Output,
            PinFunction::Input => Mode::Input,
            // SPI0 lives on ALT0 for GPIO 7 to 11.
            PinFunction::Bus => Mode::Alt0,
        };
        self.set_mode(pin, mode)
    }

    fn write(&mut self, pin: u8, state: PinState) -> Result<(), PiError> {
        let io = self.pins.get_mut(&pin).ok_or(PiError::Unconfigured(pin))?;
        io.write(match state {
            PinState::Low => Level::Low,
            PinState::High => Level::High,
        });
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), PiError> {
        let spi = self.spi.as_mut().ok_or(PiError::BusClosed)?;
        SpiBus::transfer_in_place(spi, words)?;
        Ok(())
    }
}
