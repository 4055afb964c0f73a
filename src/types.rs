//! Shared types used across the firmware
//!
//! This module defines domain-specific types that enforce invariants
//! at compile time and provide type safety throughout the codebase.

use core::fmt;

use crate::config::{HIGHEST_FREQ, LOWEST_FREQ};

/// Dial frequency in Hertz with validation
///
/// Represents a valid frequency within the tuning range
/// `[LOWEST_FREQ, HIGHEST_FREQ]`, both ends inclusive.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frequency(u32);

impl Frequency {
    /// Minimum supported frequency
    pub const MIN_HZ: u32 = LOWEST_FREQ;

    /// Maximum supported frequency
    pub const MAX_HZ: u32 = HIGHEST_FREQ;

    /// Lowest tunable frequency
    pub const MIN: Self = Self(Self::MIN_HZ);

    /// Highest tunable frequency
    pub const MAX: Self = Self(Self::MAX_HZ);

    /// Create a new Frequency from Hz, returns None if out of range
    #[must_use]
    pub const fn from_hz(hz: u32) -> Option<Self> {
        if hz >= Self::MIN_HZ && hz <= Self::MAX_HZ {
            Some(Self(hz))
        } else {
            None
        }
    }

    /// Create a frequency, saturating out-of-range values to the nearest bound
    #[must_use]
    pub const fn saturating_from_hz(hz: u32) -> Self {
        if hz < Self::MIN_HZ {
            Self(Self::MIN_HZ)
        } else if hz > Self::MAX_HZ {
            Self(Self::MAX_HZ)
        } else {
            Self(hz)
        }
    }

    /// Get the frequency in Hz
    #[must_use]
    pub const fn as_hz(self) -> u32 {
        self.0
    }

    /// Move by a signed offset, saturating at the tuning limits
    #[must_use]
    pub fn offset(self, delta_hz: i32) -> Self {
        let hz = i64::from(self.0) + i64::from(delta_hz);
        let hz = hz.clamp(i64::from(Self::MIN_HZ), i64::from(Self::MAX_HZ));
        // Clamped into the u32 tuning range above
        Self(u32::try_from(hz).unwrap_or(Self::MAX_HZ))
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({} Hz)", self.0)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Frequency {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{} Hz", self.0);
    }
}

/// Tuning step size
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TuningStep {
    /// 1 Hz step
    Hz1,
    /// 10 Hz step
    Hz10,
    /// 100 Hz step
    Hz100,
    /// 1 kHz step
    KHz1,
    /// 10 kHz step
    KHz10,
    /// 100 kHz step
    KHz100,
    /// 1 MHz step
    MHz1,
}

impl TuningStep {
    /// Get the step size in Hz
    #[must_use]
    pub const fn as_hz(self) -> u32 {
        match self {
            Self::Hz1 => 1,
            Self::Hz10 => 10,
            Self::Hz100 => 100,
            Self::KHz1 => 1_000,
            Self::KHz10 => 10_000,
            Self::KHz100 => 100_000,
            Self::MHz1 => 1_000_000,
        }
    }

    /// Signed frequency delta for a number of encoder detents
    #[must_use]
    pub fn delta_for(self, steps: i32) -> i32 {
        let step_hz = i32::try_from(self.as_hz()).unwrap_or(i32::MAX);
        steps.saturating_mul(step_hz)
    }

    /// Cycle to next larger step
    #[must_use]
    pub const fn next_larger(self) -> Self {
        match self {
            Self::Hz1 => Self::Hz10,
            Self::Hz10 => Self::Hz100,
            Self::Hz100 => Self::KHz1,
            Self::KHz1 => Self::KHz10,
            Self::KHz10 => Self::KHz100,
            Self::KHz100 => Self::MHz1,
            Self::MHz1 => Self::Hz1, // Wrap around
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for TuningStep {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Hz1 => defmt::write!(f, "1 Hz"),
            Self::Hz10 => defmt::write!(f, "10 Hz"),
            Self::Hz100 => defmt::write!(f, "100 Hz"),
            Self::KHz1 => defmt::write!(f, "1 kHz"),
            Self::KHz10 => defmt::write!(f, "10 kHz"),
            Self::KHz100 => defmt::write!(f, "100 kHz"),
            Self::MHz1 => defmt::write!(f, "1 MHz"),
        }
    }
}

/// Operator-facing sideband
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Sideband {
    /// Lower sideband
    Lsb,
    /// Upper sideband
    #[default]
    Usb,
}

impl Sideband {
    /// Persisted mode byte for LSB
    pub const PERSISTED_LSB: u8 = 2;

    /// Persisted mode byte for USB
    pub const PERSISTED_USB: u8 = 3;

    /// The opposite sideband
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Lsb => Self::Usb,
            Self::Usb => Self::Lsb,
        }
    }

    /// Decode a persisted mode byte
    ///
    /// Anything other than the two known values is treated as USB. An
    /// undefined sideband would put the transmitter on the wrong side of
    /// the filter.
    #[must_use]
    pub const fn from_persisted(byte: u8) -> Self {
        match byte {
            Self::PERSISTED_LSB => Self::Lsb,
            _ => Self::Usb,
        }
    }

    /// Check a persisted mode byte without coercing it
    #[must_use]
    pub const fn is_valid_persisted(byte: u8) -> bool {
        matches!(byte, Self::PERSISTED_LSB | Self::PERSISTED_USB)
    }

    /// Encode for storage
    #[must_use]
    pub const fn as_persisted(self) -> u8 {
        match self {
            Self::Lsb => Self::PERSISTED_LSB,
            Self::Usb => Self::PERSISTED_USB,
        }
    }

    /// Display label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Lsb => "LSB",
            Self::Usb => "USB",
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Sideband {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.label());
    }
}

/// CW key type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum KeyType {
    /// Straight key (hand key)
    #[default]
    Straight,
    /// Iambic paddle, mode A
    IambicA,
    /// Iambic paddle, mode B
    IambicB,
}

impl KeyType {
    /// Decode a persisted key type byte, `None` for unknown values
    #[must_use]
    pub const fn from_persisted(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Straight),
            1 => Some(Self::IambicA),
            2 => Some(Self::IambicB),
            _ => None,
        }
    }

    /// Encode for storage
    #[must_use]
    pub const fn as_persisted(self) -> u8 {
        match self {
            Self::Straight => 0,
            Self::IambicA => 1,
            Self::IambicB => 2,
        }
    }

    /// Short display label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Straight => "HAND",
            Self::IambicA => "IAMBA",
            Self::IambicB => "IAMBB",
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for KeyType {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.label());
    }
}

/// Transmit/Receive state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TxRxState {
    /// Receiving
    #[default]
    Rx,
    /// Transmitting
    Tx,
    /// Transitioning (oscillator and relay settling)
    Switching,
}

impl TxRxState {
    /// Display label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rx => "RX",
            Self::Tx => "TX",
            Self::Switching => "--",
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for TxRxState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Rx => defmt::write!(f, "RX"),
            Self::Tx => defmt::write!(f, "TX"),
            Self::Switching => defmt::write!(f, "SWITCHING"),
        }
    }
}
