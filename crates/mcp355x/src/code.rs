//! Decoding of the 24-bit output register into codes and volts.
//!
//! ```text
//!  23    22    21                                 0
//! [OVL] [OVH] [ 22-bit two's complement conversion ]
//! ```

/// Negative overflow flag.
pub const OVL: u32 = 1 << 23;

/// Positive overflow flag.
pub const OVH: u32 = 1 << 22;

/// Sign bit of the 22-bit conversion field.
pub const SIGN: u32 = 1 << 21;

/// Conversion field, including the sign bit.
pub const DATA_MASK: u32 = 0x3F_FFFF;

/// Everything the chip shifts out in one read.
pub const REGISTER_MASK: u32 = 0xFF_FFFF;

/// Number of codes between zero and full scale.
pub const FULL_SCALE: i32 = 1 << 21;

/// Modulus of the 22-bit conversion field.
pub const MODULUS: i32 = 1 << 22;

/// Reference voltage in volts.
pub const VREF: f64 = 2.500;

/// Voltage of one code step.
pub const LSB: f64 = VREF / FULL_SCALE as f64;

/// Overflow state reported by the two flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    /// Input within -Vref to +Vref.
    None,
    /// Input above +Vref (OVH).
    Positive,
    /// Input below -Vref (OVL).
    Negative,
}

impl Overflow {
    /// Classifies a raw register value. OVH wins if the chip reports both flags.
    pub fn of(raw: u32) -> Self {
        if raw & OVH != 0 {
            Overflow::Positive
        } else if raw & OVL != 0 {
            Overflow::Negative
        } else {
            Overflow::None
        }
    }
}

/// Returns the signed code for a raw register value, taking the overflow flags
/// into account. The result lies in `[-2^22, 2^22]`.
///
/// Bits above 23 are ignored.
pub fn decode(raw: u32) -> i32 {
    let raw = raw & REGISTER_MASK;

    match Overflow::of(raw) {
        // Masking also clears OVH, leaving a positive value at or past full scale.
        Overflow::Positive => (raw & DATA_MASK) as i32,
        Overflow::Negative => -(MODULUS - (raw & DATA_MASK) as i32),
        Overflow::None if raw & SIGN != 0 => -(MODULUS - raw as i32),
        Overflow::None => raw as i32,
    }
}

/// Converts a signed code into volts relative to [`VREF`].
pub fn to_voltage(code: i32) -> f64 {
    code as f64 * LSB
}

/// Converts a raw register value straight into volts.
pub fn raw_to_voltage(raw: u32) -> f64 {
    to_voltage(decode(raw))
}
