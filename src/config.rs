//! System configuration and hardware constants
//!
//! This module defines compile-time constants for the transceiver hardware.
//! The IF plan, tuning limits, calibration defaults and timing parameters
//! are centralized here.

use crate::types::{KeyType, Sideband, TuningStep};

/// Lowest dial frequency the radio will tune to
pub const LOWEST_FREQ: u32 = 100_000;

/// Highest dial frequency the radio will tune to
pub const HIGHEST_FREQ: u32 = 30_000_000;

/// Nominal first IF (45 MHz crystal filter)
///
/// The real passband sits a few kHz lower because of loading from the
/// matching networks; a unit that has measured it stores the absolute value
/// in `first_if_hz`, which then replaces this figure.
pub const DEFAULT_FIRST_IF_HZ: u32 = 45_000_000;

/// Second oscillator for USB: the signal is subtracted from it (re-inverts)
pub const SECOND_OSC_USB: u32 = 56_995_000;

/// Second oscillator for LSB: it is subtracted from the signal (no re-inversion)
pub const SECOND_OSC_LSB: u32 = 32_995_000;

/// Seed frequency for a VFO slot that has never been saved
pub const INIT_USB_FREQ: u32 = 11_996_500;

/// Sideband for a VFO slot that has never been saved
pub const DEFAULT_SIDEBAND: Sideband = Sideband::Usb;

/// Default tuning step
pub const DEFAULT_TUNING_STEP: TuningStep = TuningStep::Hz100;

/// Wait after turning the synthesizer off before keying the TX line
pub const TX_DELAY_OSC_OFF_MS: u32 = 15;

/// Wait after switching the TX line before RF is unblanked
pub const TX_DELAY_ENABLE_MS: u32 = 30;

/// Default sidetone in Hz
pub const DEFAULT_SIDETONE_HZ: u32 = 800;

/// Default CW sidetone in Hz
pub const DEFAULT_CW_SIDETONE_HZ: u32 = 800;

/// Default CW speed in words per minute
pub const DEFAULT_CW_SPEED_WPM: u8 = 16;

/// Default CW key type
pub const DEFAULT_CW_KEY_TYPE: KeyType = KeyType::Straight;

/// Largest master calibration magnitude accepted from storage (ppm)
pub const MASTER_CAL_LIMIT_PPM: i32 = 1_000;

/// Accepted calibrated first IF range (Hz)
pub const FIRST_IF_RANGE: (u32, u32) = (44_900_000, 45_100_000);

/// Accepted LSB carrier trim range (Hz)
pub const LSB_CARRIER_RANGE: (u32, u32) = (30_000_000, 36_000_000);

/// Accepted USB carrier trim range (Hz)
pub const USB_CARRIER_RANGE: (u32, u32) = (54_000_000, 60_000_000);

/// Accepted sidetone range (Hz)
pub const SIDETONE_RANGE: (u32, u32) = (100, 2_000);

/// Accepted CW speed range (wpm)
pub const CW_SPEED_RANGE: (u8, u8) = (5, 60);

/// Capacity of the non-volatile store in bytes (24C08-class EEPROM)
pub const EEPROM_SIZE: usize = 1024;

/// Page size of the I2C EEPROM
pub const EEPROM_PAGE_SIZE: usize = 16;

/// I2C bus frequency for `Si5351A` and EEPROM
pub const I2C_FREQUENCY_HZ: u32 = 400_000;

/// `Si5351A` I2C address
pub const SI5351_I2C_ADDR: u8 = 0x60;

/// 24Cxx EEPROM I2C address
pub const EEPROM_I2C_ADDR: u8 = 0x50;

/// `Si5351A` crystal frequency (25 MHz standard)
pub const SI5351_XTAL_FREQ: u32 = 25_000_000;

/// Integer PLL A multiplier; 25 MHz × 35 = 875 MHz VCO
pub const SI5351_PLL_MULT: u32 = 35;

/// Status display line width (16x2 character LCD)
pub const DISPLAY_COLUMNS: usize = 16;

/// Control loop tick in milliseconds
pub const CONTROL_TICK_MS: u64 = 1;

/// Pin assignments for GPIO
pub mod pins {
    //! GPIO pin assignments matching the front panel harness

    /// Encoder A input
    pub const ENC_A: &str = "PA0";

    /// Encoder B input
    pub const ENC_B: &str = "PA1";

    /// Function button (active low)
    pub const FBUTTON: &str = "PA2";

    /// PTT input from the microphone (active low)
    pub const PTT: &str = "PA3";

    /// TX/RX relay line
    pub const TX_RX: &str = "PB0";

    /// CW carrier key line
    pub const CW_KEY: &str = "PB1";

    /// I2C1 SCL (Si5351)
    pub const I2C1_SCL: &str = "PB8";

    /// I2C1 SDA (Si5351)
    pub const I2C1_SDA: &str = "PB9";

    /// I2C2 SCL (EEPROM)
    pub const I2C2_SCL: &str = "PA9";

    /// I2C2 SDA (EEPROM)
    pub const I2C2_SDA: &str = "PA8";
}
