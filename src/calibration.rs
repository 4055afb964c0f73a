//! Calibration and Persisted State
//!
//! Per-unit calibration constants and the stored VFO records, together with
//! the fixed EEPROM layout they live in and the store that reads and writes
//! them.

pub mod schema;
pub mod store;

pub use schema::Field;
pub use store::{CalibrationStore, MemoryStore, MemoryStoreError, NvStore, StoreError};

use crate::config::{
    DEFAULT_CW_KEY_TYPE, DEFAULT_CW_SIDETONE_HZ, DEFAULT_CW_SPEED_WPM, DEFAULT_SIDETONE_HZ,
    SECOND_OSC_LSB, SECOND_OSC_USB,
};
use crate::radio::vfo::{VfoSlot, VfoState};
use crate::types::{KeyType, Sideband};

/// Calibration constants consumed by the frequency plan
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalibrationSet {
    /// Global correction applied to every output, in ppm
    pub master_cal_ppm: i32,
    /// Second oscillator for LSB
    pub lsb_carrier_hz: u32,
    /// Second oscillator for USB
    pub usb_carrier_hz: u32,
    /// Voice sidetone
    pub sidetone_hz: u32,
    /// CW sidetone
    pub cw_sidetone_hz: u32,
    /// CW speed in words per minute
    pub cw_speed_wpm: u8,
    /// CW key type
    pub cw_key_type: KeyType,
    /// Measured first IF, replacing the nominal one when present
    pub first_if_hz: Option<u32>,
}

impl CalibrationSet {
    /// Hardware defaults for an uncalibrated unit
    pub const DEFAULT: Self = Self {
        master_cal_ppm: 0,
        lsb_carrier_hz: SECOND_OSC_LSB,
        usb_carrier_hz: SECOND_OSC_USB,
        sidetone_hz: DEFAULT_SIDETONE_HZ,
        cw_sidetone_hz: DEFAULT_CW_SIDETONE_HZ,
        cw_speed_wpm: DEFAULT_CW_SPEED_WPM,
        cw_key_type: DEFAULT_CW_KEY_TYPE,
        first_if_hz: None,
    };

    /// Second oscillator carrier for a requested sideband
    #[must_use]
    pub const fn carrier_for(&self, sideband: Sideband) -> u32 {
        match sideband {
            Sideband::Usb => self.usb_carrier_hz,
            Sideband::Lsb => self.lsb_carrier_hz,
        }
    }

    /// Check every field against its accepted range
    ///
    /// # Errors
    ///
    /// Returns the first field whose value would not survive a reload.
    pub fn validate(&self) -> Result<(), Field> {
        for field in Field::CALIBRATION {
            if !field.accepts(self.raw(field)) {
                return Err(field);
            }
        }
        Ok(())
    }
}

impl Default for CalibrationSet {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for CalibrationSet {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Cal(master={}ppm, lsb={}, usb={}, if={}, cw={}wpm {})",
            self.master_cal_ppm,
            self.lsb_carrier_hz,
            self.usb_carrier_hz,
            self.first_if_hz,
            self.cw_speed_wpm,
            self.cw_key_type
        );
    }
}

/// Everything kept in the non-volatile store
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PersistedState {
    /// Calibration constants
    pub calibration: CalibrationSet,
    /// VFO A record
    pub vfo_a: VfoState,
    /// VFO B record
    pub vfo_b: VfoState,
}

impl PersistedState {
    /// Stored record for a VFO slot
    #[must_use]
    pub const fn vfo(&self, slot: VfoSlot) -> &VfoState {
        match slot {
            VfoSlot::A => &self.vfo_a,
            VfoSlot::B => &self.vfo_b,
        }
    }
}
