//! The hardware the driver needs from its host.
//!
//! A conversion temporarily takes CE and MISO away from the SPI controller, so
//! the host has to be able to close the bus, remux pins as GPIO and open the bus
//! again. Nothing in `embedded-hal` covers pin muxing, hence this trait.

use embedded_hal::digital::PinState;
use embedded_hal::spi::{Mode, MODE_3};

/// Bit order on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOrder {
    MsbFirst,
    LsbFirst,
}

/// Who drives chip select during a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipSelect {
    /// The driver toggles CE itself as a GPIO.
    Manual,
    /// The SPI controller asserts its own chip-select line.
    Hardware,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsPolarity {
    ActiveLow,
    ActiveHigh,
}

/// SPI bus settings applied every time the bus is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiConfig {
    pub bit_order: BitOrder,
    pub mode: Mode,
    pub clock_hz: u32,
    pub chip_select: ChipSelect,
    pub cs_polarity: CsPolarity,
}

impl SpiConfig {
    /// Settings for the MCP355x: MSB first, CPOL = 1, CPHA = 1, a 50 kHz clock
    /// and CE driven by hand.
    pub const MCP355X: Self = Self {
        bit_order: BitOrder::MsbFirst,
        mode: MODE_3,
        clock_hz: 50_000,
        chip_select: ChipSelect::Manual,
        cs_polarity: CsPolarity::ActiveLow,
    };
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self::MCP355X
    }
}

/// What a pin is muxed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinFunction {
    Output,
    Input,
    /// Handed back to the SPI controller.
    Bus,
}

/// Shared GPIO/SPI peripheral.
///
/// Implementations own process-wide hardware. Only one [`crate::Mcp355x`] may
/// use a given peripheral at a time, which the driver enforces by taking it by
/// value (or by `&mut`).
pub trait Peripheral {
    /// Pin identifier, e.g. a BCM GPIO number.
    type Pin: Copy + core::fmt::Debug;

    type Error: core::fmt::Debug;

    /// The bus's MISO pin, which doubles as the chip's ready line.
    fn miso(&self) -> Self::Pin;

    /// Open the SPI bus and apply `config`. This must also mux the bus pins
    /// back to their SPI function.
    fn spi_begin(&mut self, config: &SpiConfig) -> Result<(), Self::Error>;

    /// Close the SPI bus, leaving its pins free for GPIO use.
    fn spi_end(&mut self) -> Result<(), Self::Error>;

    fn set_function(&mut self, pin: Self::Pin, function: PinFunction) -> Result<(), Self::Error>;

    fn write(&mut self, pin: Self::Pin, state: PinState) -> Result<(), Self::Error>;

    /// Clock `words.len()` bytes out and replace them with the bytes read back.
    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error>;
}

impl<T: Peripheral + ?Sized> Peripheral for &mut T {
    type Pin = T::Pin;
    type Error = T::Error;

    fn miso(&self) -> Self::Pin {
        T::miso(self)
    }

    fn spi_begin(&mut self, config: &SpiConfig) -> Result<(), Self::Error> {
        T::spi_begin(self, config)
    }

    fn spi_end(&mut self) -> Result<(), Self::Error> {
        T::spi_end(self)
    }

    fn set_function(&mut self, pin: Self::Pin, function: PinFunction) -> Result<(), Self::Error> {
        T::set_function(self, pin, function)
    }

    fn write(&mut self, pin: Self::Pin, state: PinState) -> Result<(), Self::Error> {
        T::write(self, pin, state)
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        T::transfer_in_place(self, words)
    }
}
