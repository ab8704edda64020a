/// Errors reported by the driver. `E` is the peripheral's own error type.
///
/// There is no variant for corrupted data: the chip's output has no framing or
/// checksum, so a bad transfer is indistinguishable from a real reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error<E> {
    /// The SPI bus could not be opened or configured.
    #[error("could not configure the SPI bus: {0:?}")]
    Bus(E),
    /// A pin could not be remuxed or driven.
    #[error("GPIO pin operation failed: {0:?}")]
    Pin(E),
    /// The bus settings hand chip select to the SPI controller, but CE has to
    /// be driven by hand to trigger conversions.
    #[error("chip select must be driven manually")]
    ChipSelect,
    /// The register read failed.
    #[error("SPI transfer failed: {0:?}")]
    Transfer(E),
}
