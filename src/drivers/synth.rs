//! Synthesizer Adapter
//!
//! The radio core only needs to set three clock frequencies and gate the
//! outputs. [`ClockSynth`] captures that capability; the `Si5351A` driver
//! implements it for hardware and [`FakeSynth`] records calls for tests.

use crate::radio::plan::FrequencyPlan;

/// Clock output index
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockIndex {
    /// CLK0: BFO into the product detector / balanced modulator
    Clk0,
    /// CLK1: first local oscillator
    Clk1,
    /// CLK2: second local oscillator
    Clk2,
}

impl ClockIndex {
    /// All outputs in programming order
    pub const ALL: [Self; 3] = [Self::Clk0, Self::Clk1, Self::Clk2];

    /// Numeric output index
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Clk0 => 0,
            Self::Clk1 => 1,
            Self::Clk2 => 2,
        }
    }

    /// Look up by numeric index
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Clk0),
            1 => Some(Self::Clk1),
            2 => Some(Self::Clk2),
            _ => None,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ClockIndex {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Clk0 => defmt::write!(f, "CLK0"),
            Self::Clk1 => defmt::write!(f, "CLK1"),
            Self::Clk2 => defmt::write!(f, "CLK2"),
        }
    }
}

/// Write-only clock generator
///
/// Nothing is returned to the caller: a synthesizer that cannot be
/// programmed is a device fault for the implementation to report.
pub trait ClockSynth {
    /// Program one output to a frequency in Hz
    fn set_clock_frequency(&mut self, clock: ClockIndex, hz: u32);

    /// Gate all outputs on or off without changing their frequencies
    fn set_outputs_enabled(&mut self, enabled: bool);
}

impl<S: ClockSynth + ?Sized> ClockSynth for &mut S {
    fn set_clock_frequency(&mut self, clock: ClockIndex, hz: u32) {
        (**self).set_clock_frequency(clock, hz);
    }

    fn set_outputs_enabled(&mut self, enabled: bool) {
        (**self).set_outputs_enabled(enabled);
    }
}

impl FrequencyPlan {
    /// Target frequency for one clock output
    #[must_use]
    pub const fn clock_hz(&self, clock: ClockIndex) -> u32 {
        match clock {
            ClockIndex::Clk0 => self.bfo_hz,
            ClockIndex::Clk1 => self.osc1_hz,
            ClockIndex::Clk2 => self.osc2_hz,
        }
    }
}

/// Program every output from a plan
pub fn apply_plan<S: ClockSynth + ?Sized>(synth: &mut S, plan: &FrequencyPlan) {
    for clock in ClockIndex::ALL {
        synth.set_clock_frequency(clock, plan.clock_hz(clock));
    }
}

/// In-memory synthesizer for host testing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FakeSynth {
    clocks: [Option<u32>; 3],
    writes: usize,
    enabled: bool,
}

impl FakeSynth {
    /// Create a fake with all outputs unprogrammed and disabled
    #[must_use]
    pub const fn new() -> Self {
        Self {
            clocks: [None; 3],
            writes: 0,
            enabled: false,
        }
    }

    /// Last frequency written to an output
    #[must_use]
    pub const fn frequency(&self, clock: ClockIndex) -> Option<u32> {
        self.clocks[clock.index()]
    }

    /// Total number of frequency writes
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.writes
    }

    /// Output gate state
    #[must_use]
    pub const fn outputs_enabled(&self) -> bool {
        self.enabled
    }
}

impl ClockSynth for FakeSynth {
    fn set_clock_frequency(&mut self, clock: ClockIndex, hz: u32) {
        self.clocks[clock.index()] = Some(hz);
        self.writes += 1;
    }

    fn set_outputs_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}
