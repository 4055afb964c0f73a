//! VFO (Variable Frequency Oscillator) Management
//!
//! Manages dual VFOs (A/B). Every change to the active VFO is pushed through
//! the frequency plan and out to the synthesizer before the call returns.

use super::plan::{compute_plan, FrequencyPlan};
use crate::calibration::CalibrationSet;
use crate::config::{DEFAULT_FIRST_IF_HZ, DEFAULT_SIDEBAND, INIT_USB_FREQ};
use crate::drivers::synth::{apply_plan, ClockSynth};
use crate::types::{Frequency, Sideband};

/// VFO A/B selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum VfoSlot {
    /// VFO A
    #[default]
    A,
    /// VFO B
    B,
}

impl VfoSlot {
    /// Toggle VFO selection
    #[must_use]
    pub const fn toggle(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    /// Single-letter label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for VfoSlot {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::A => defmt::write!(f, "VFO-A"),
            Self::B => defmt::write!(f, "VFO-B"),
        }
    }
}

/// Stored state of one VFO
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VfoState {
    /// Dial frequency
    pub frequency: Frequency,
    /// Operator sideband
    pub sideband: Sideband,
}

impl VfoState {
    /// Create new VFO state
    #[must_use]
    pub const fn new(frequency: Frequency, sideband: Sideband) -> Self {
        Self {
            frequency,
            sideband,
        }
    }
}

impl Default for VfoState {
    fn default() -> Self {
        Self::new(Frequency::saturating_from_hz(INIT_USB_FREQ), DEFAULT_SIDEBAND)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for VfoState {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "VFO({}, {})", self.frequency, self.sideband);
    }
}

/// Dual VFO manager
#[derive(Clone, Debug)]
pub struct VfoManager {
    /// VFO A state
    vfo_a: VfoState,
    /// VFO B state
    vfo_b: VfoState,
    /// Currently active VFO
    selected: VfoSlot,
    /// Nominal first IF, used unless the calibration carries a measured one
    first_if_hz: u32,
}

impl VfoManager {
    /// Create a VFO manager from two stored slots, VFO A active
    #[must_use]
    pub const fn new(vfo_a: VfoState, vfo_b: VfoState) -> Self {
        Self {
            vfo_a,
            vfo_b,
            selected: VfoSlot::A,
            first_if_hz: DEFAULT_FIRST_IF_HZ,
        }
    }

    /// Use a different nominal first IF
    #[must_use]
    pub const fn with_first_if(self, first_if_hz: u32) -> Self {
        Self {
            first_if_hz,
            ..self
        }
    }

    /// Get currently selected VFO
    #[must_use]
    pub const fn selected(&self) -> VfoSlot {
        self.selected
    }

    /// Get the active VFO state
    #[must_use]
    pub const fn current(&self) -> &VfoState {
        self.slot(self.selected)
    }

    /// Get the active VFO state mutably
    fn current_mut(&mut self) -> &mut VfoState {
        match self.selected {
            VfoSlot::A => &mut self.vfo_a,
            VfoSlot::B => &mut self.vfo_b,
        }
    }

    /// Get a VFO state by slot
    #[must_use]
    pub const fn slot(&self, slot: VfoSlot) -> &VfoState {
        match slot {
            VfoSlot::A => &self.vfo_a,
            VfoSlot::B => &self.vfo_b,
        }
    }

    /// Get VFO A state
    #[must_use]
    pub const fn vfo_a(&self) -> &VfoState {
        &self.vfo_a
    }

    /// Get VFO B state
    #[must_use]
    pub const fn vfo_b(&self) -> &VfoState {
        &self.vfo_b
    }

    /// Nominal first IF in Hz
    #[must_use]
    pub const fn first_if_hz(&self) -> u32 {
        self.first_if_hz
    }

    /// Plan for the active VFO, without touching the synthesizer
    #[must_use]
    pub fn active_plan(&self, calibration: &CalibrationSet) -> FrequencyPlan {
        let vfo = self.current();
        compute_plan(vfo.frequency, vfo.sideband, calibration, self.first_if_hz)
    }

    /// Recompute the active plan and program the synthesizer
    pub fn retune<S: ClockSynth + ?Sized>(
        &self,
        calibration: &CalibrationSet,
        synth: &mut S,
    ) -> FrequencyPlan {
        let plan = self.active_plan(calibration);
        apply_plan(synth, &plan);
        plan
    }

    /// Tune the active VFO by a signed offset, saturating at the band edges
    pub fn tune<S: ClockSynth + ?Sized>(
        &mut self,
        delta_hz: i32,
        calibration: &CalibrationSet,
        synth: &mut S,
    ) -> FrequencyPlan {
        let vfo = self.current_mut();
        vfo.frequency = vfo.frequency.offset(delta_hz);
        self.retune(calibration, synth)
    }

    /// Set the active VFO frequency directly, saturating at the band edges
    pub fn set_frequency<S: ClockSynth + ?Sized>(
        &mut self,
        hz: u32,
        calibration: &CalibrationSet,
        synth: &mut S,
    ) -> FrequencyPlan {
        self.current_mut().frequency = Frequency::saturating_from_hz(hz);
        self.retune(calibration, synth)
    }

    /// Set the active VFO sideband
    pub fn set_sideband<S: ClockSynth + ?Sized>(
        &mut self,
        sideband: Sideband,
        calibration: &CalibrationSet,
        synth: &mut S,
    ) -> FrequencyPlan {
        self.current_mut().sideband = sideband;
        self.retune(calibration, synth)
    }

    /// Flip the active VFO between LSB and USB
    pub fn toggle_sideband<S: ClockSynth + ?Sized>(
        &mut self,
        calibration: &CalibrationSet,
        synth: &mut S,
    ) -> FrequencyPlan {
        let sideband = self.current().sideband.flipped();
        self.set_sideband(sideband, calibration, synth)
    }

    /// Make the other VFO active; neither slot is modified
    pub fn switch_active_vfo<S: ClockSynth + ?Sized>(
        &mut self,
        calibration: &CalibrationSet,
        synth: &mut S,
    ) -> FrequencyPlan {
        self.selected = self.selected.toggle();
        self.retune(calibration, synth)
    }

    /// Exchange the contents of VFO A and B
    pub fn swap<S: ClockSynth + ?Sized>(
        &mut self,
        calibration: &CalibrationSet,
        synth: &mut S,
    ) -> FrequencyPlan {
        core::mem::swap(&mut self.vfo_a, &mut self.vfo_b);
        self.retune(calibration, synth)
    }

    /// Copy the active VFO into the other one
    ///
    /// The active VFO is unchanged, so nothing is reprogrammed.
    pub fn copy_to_other(&mut self) {
        match self.selected {
            VfoSlot::A => self.vfo_b = self.vfo_a,
            VfoSlot::B => self.vfo_a = self.vfo_b,
        }
    }
}

impl Default for VfoManager {
    fn default() -> Self {
        Self::new(VfoState::default(), VfoState::default())
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for VfoManager {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "VFOMgr(sel={}, A={}, B={})",
            self.selected,
            self.vfo_a,
            self.vfo_b
        );
    }
}
