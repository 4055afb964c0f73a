//! Frequency Plan
//!
//! Maps a dial frequency and sideband onto the three synthesizer outputs of
//! the dual-conversion chain:
//!
//! ```text
//!   RF ──► mix with OSC1 ──► 45 MHz IF ──► mix with OSC2 ──► 12 MHz filter ──► BFO
//!          (OSC1 - RF)                     57 MHz: OSC2 - IF  (inverts)
//!          inverts once                    33 MHz: IF - OSC2  (does not)
//! ```
//!
//! OSC1 runs above the signal so the first mix always flips the sidebands.
//! The second oscillator is picked from the requested output sideband alone:
//! the 57 MHz-class carrier flips them back (USB stays USB), the 33 MHz-class
//! carrier leaves them flipped (which is how LSB is produced). Both land on
//! the same side of the 12 MHz ladder filter.
//!
//! Every output is finally scaled by the master calibration so the three
//! clocks stay coherent with each other.

use crate::calibration::CalibrationSet;
use crate::types::{Frequency, Sideband};

/// Master calibration is expressed in parts per million
pub const CAL_SCALE: i128 = 1_000_000;

/// Synthesizer targets for one dial setting
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrequencyPlan {
    /// First local oscillator (48-75 MHz)
    pub osc1_hz: u32,
    /// Second local oscillator (sideband carrier)
    pub osc2_hz: u32,
    /// Beat frequency oscillator at the second IF
    pub bfo_hz: u32,
    /// Sideband as seen by the crystal filter; diagnostics only
    pub bfo_sideband: Sideband,
}

#[cfg(feature = "embedded")]
impl defmt::Format for FrequencyPlan {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Plan(osc1={}, osc2={}, bfo={}, filter={})",
            self.osc1_hz,
            self.osc2_hz,
            self.bfo_hz,
            self.bfo_sideband
        );
    }
}

/// Compute the oscillator plan for a dial frequency
///
/// A measured first IF in the calibration set takes the place of
/// `first_if_nominal_hz`. Total over every in-range dial frequency and every
/// calibration value; intermediate arithmetic is 128-bit and results
/// saturate into `u32`.
#[must_use]
pub fn compute_plan(
    dial: Frequency,
    sideband: Sideband,
    calibration: &CalibrationSet,
    first_if_nominal_hz: u32,
) -> FrequencyPlan {
    let first_if = i64::from(calibration.first_if_hz.unwrap_or(first_if_nominal_hz));
    let carrier = i64::from(calibration.carrier_for(sideband));
    let osc1 = i64::from(dial.as_hz()) + first_if;
    let bfo = (carrier - first_if).abs();
    let ppm = calibration.master_cal_ppm;

    FrequencyPlan {
        osc1_hz: apply_master_cal(osc1, ppm),
        osc2_hz: apply_master_cal(carrier, ppm),
        bfo_hz: apply_master_cal(bfo, ppm),
        bfo_sideband: filter_sideband(sideband, carrier, first_if),
    }
}

/// Scale a frequency by the master calibration, rounding to the nearest Hz
///
/// Halves round up. Truncating here would drift a little further on every
/// retune.
#[must_use]
pub fn apply_master_cal(hz: i64, ppm: i32) -> u32 {
    let scaled = i128::from(hz) * (CAL_SCALE + i128::from(ppm));
    let rounded = (scaled + CAL_SCALE / 2).div_euclid(CAL_SCALE);
    u32::try_from(rounded.clamp(0, i128::from(u32::MAX))).unwrap_or(u32::MAX)
}

/// Sideband sense at the crystal filter
///
/// The first mix always inverts; the second inverts only when the carrier
/// sits above the first IF.
fn filter_sideband(requested: Sideband, carrier_hz: i64, first_if_hz: i64) -> Sideband {
    let inversions = 1 + u8::from(carrier_hz > first_if_hz);
    if inversions % 2 == 0 {
        requested
    } else {
        requested.flipped()
    }
}
