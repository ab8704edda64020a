//! Provides a driver for the Microchip MCP3550/1/3 delta-sigma ADCs via the `embedded-hal` ecosystem.
//!
//! These chips have no conversion-start command. A conversion is triggered by a
//! falling edge on CE, and the 24-bit result is shifted out over SPI once the
//! conversion time has elapsed. Because CE and MISO must be driven as plain GPIO
//! during the trigger phase, the driver talks to the hardware through the
//! [`Peripheral`] trait rather than an [`embedded_hal::spi::SpiDevice`].
//!
//! The wire protocol has no framing or checksum. A glitched transfer decodes to
//! a valid but wrong value, and nothing in this crate can detect that.

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

pub mod code;
pub mod device;
pub mod error;
pub mod ic;
pub mod peripheral;
pub mod sequencer;

pub use code::{decode, raw_to_voltage, to_voltage, Overflow, LSB, VREF};
pub use device::{startup, Mcp355x};
pub use error::Error;
pub use ic::{Ic, ParseIcError};
pub use peripheral::{BitOrder, ChipSelect, CsPolarity, Peripheral, PinFunction, SpiConfig};
pub use sequencer::{Sequencer, State};
