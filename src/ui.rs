//! User Interface
//!
//! Status text for the 16x2 character display and the mapping from knob
//! gestures to radio events.

use core::fmt::Write;

use heapless::String;

use crate::calibration::CalibrationSet;
use crate::config::DISPLAY_COLUMNS;
use crate::drivers::encoder::EncoderEvent;
use crate::radio::state::RadioEvent;
use crate::radio::vfo::{VfoSlot, VfoState};
use crate::types::TxRxState;

/// One display line
pub type Line = String<DISPLAY_COLUMNS>;

/// The two display lines
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusLines {
    /// VFO, frequency in Hz and sideband, e.g. `A:14200000 USB`
    pub line1: Line,
    /// TX/RX state and CW settings, e.g. `RX HAND 16WPM`
    pub line2: Line,
}

impl StatusLines {
    /// Format the status for the active VFO
    #[must_use]
    pub fn render(
        slot: VfoSlot,
        vfo: &VfoState,
        calibration: &CalibrationSet,
        txrx: TxRxState,
    ) -> Self {
        let mut line1 = Line::new();
        let mut line2 = Line::new();
        // Both lines are at most 14 characters, so these cannot overflow
        write!(
            line1,
            "{}:{} {}",
            slot.label(),
            vfo.frequency.as_hz(),
            vfo.sideband.label()
        )
        .ok();
        write!(
            line2,
            "{} {} {}WPM",
            txrx.label(),
            calibration.cw_key_type.label(),
            calibration.cw_speed_wpm
        )
        .ok();
        Self { line1, line2 }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for StatusLines {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "[{=str}|{=str}]", self.line1.as_str(), self.line2.as_str());
    }
}

/// Translate a knob gesture into a radio event
///
/// Rotation tunes, a short press cycles the tuning step and a long press
/// switches VFO.
#[must_use]
pub fn map_encoder_event(event: EncoderEvent) -> Option<RadioEvent> {
    match event {
        EncoderEvent::Rotate { .. } => event.tune_steps().map(RadioEvent::Tune),
        EncoderEvent::ButtonRelease => Some(RadioEvent::NextStep),
        EncoderEvent::LongPress => Some(RadioEvent::SwitchVfo),
        EncoderEvent::ButtonPress => None,
    }
}
