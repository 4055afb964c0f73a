//! Radio Controller
//!
//! Owns everything the frequency plan depends on: the calibration snapshot,
//! both VFOs, the TX/RX sequencer, the synthesizer and the persistent store.
//! Events from the UI are applied here; while an RX/TX changeover is in
//! flight they are held back and replayed once it completes.

use heapless::Deque;

use super::plan::FrequencyPlan;
use super::transmit::{TxAction, TxRequest, TxSequencer};
use super::vfo::{VfoManager, VfoSlot};
use crate::calibration::{CalibrationSet, CalibrationStore, NvStore, StoreError};
use crate::config::{DEFAULT_FIRST_IF_HZ, DEFAULT_TUNING_STEP};
use crate::drivers::synth::{apply_plan, ClockSynth};
use crate::types::{Sideband, TuningStep, TxRxState};
use crate::ui::StatusLines;

/// Events held back during an RX/TX changeover
pub const DEFERRED_EVENT_DEPTH: usize = 8;

/// Radio event (command) applied by [`Radio::handle`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RadioEvent {
    /// Tune by a number of steps of the current tuning step
    Tune(i32),
    /// Set frequency directly (Hz, saturated to the tuning range)
    SetFrequency(u32),
    /// Select a sideband on the active VFO
    SetSideband(Sideband),
    /// Flip the active VFO between LSB and USB
    ToggleSideband,
    /// Switch VFO
    SwitchVfo,
    /// Swap VFOs
    SwapVfo,
    /// Copy the active VFO into the other
    CopyVfo,
    /// Cycle step size
    NextStep,
    /// Persist both VFOs
    SaveVfos,
    /// Push-to-talk pressed or released
    Ptt(bool),
}

#[cfg(feature = "embedded")]
impl defmt::Format for RadioEvent {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Tune(steps) => defmt::write!(f, "Tune({})", steps),
            Self::SetFrequency(hz) => defmt::write!(f, "SetFreq({})", hz),
            Self::SetSideband(sb) => defmt::write!(f, "SetSideband({})", sb),
            Self::ToggleSideband => defmt::write!(f, "ToggleSideband"),
            Self::SwitchVfo => defmt::write!(f, "SwitchVFO"),
            Self::SwapVfo => defmt::write!(f, "SwapVFO"),
            Self::CopyVfo => defmt::write!(f, "CopyVFO"),
            Self::NextStep => defmt::write!(f, "NextStep"),
            Self::SaveVfos => defmt::write!(f, "SaveVFOs"),
            Self::Ptt(on) => defmt::write!(f, "PTT({})", on),
        }
    }
}

/// The transceiver
pub struct Radio<S: ClockSynth, N: NvStore> {
    vfo: VfoManager,
    calibration: CalibrationSet,
    step: TuningStep,
    tx: TxSequencer,
    synth: S,
    store: CalibrationStore<N>,
    deferred: Deque<RadioEvent, DEFERRED_EVENT_DEPTH>,
    plan: FrequencyPlan,
}

impl<S: ClockSynth, N: NvStore> Radio<S, N> {
    /// Bring the radio up from the persisted state
    ///
    /// Loads calibration and both VFOs (defaulting whatever is missing),
    /// programs the synthesizer for VFO A and enables its outputs.
    pub fn start(synth: S, nv: N) -> Self {
        Self::start_with_first_if(synth, nv, DEFAULT_FIRST_IF_HZ)
    }

    /// Bring the radio up with a different nominal first IF
    pub fn start_with_first_if(mut synth: S, nv: N, first_if_hz: u32) -> Self {
        let mut store = CalibrationStore::new(nv);
        let persisted = store.load_all();
        let vfo = VfoManager::new(persisted.vfo_a, persisted.vfo_b).with_first_if(first_if_hz);
        let plan = vfo.retune(&persisted.calibration, &mut synth);
        synth.set_outputs_enabled(true);

        #[cfg(feature = "embedded")]
        defmt::info!("radio up: {} {}", vfo, persisted.calibration);

        Self {
            vfo,
            calibration: persisted.calibration,
            step: DEFAULT_TUNING_STEP,
            tx: TxSequencer::new(),
            synth,
            store,
            deferred: Deque::new(),
            plan,
        }
    }

    /// Apply an event
    ///
    /// PTT goes straight to the sequencer. Anything else arriving during a
    /// changeover is deferred; once the queue is full further events are
    /// dropped.
    ///
    /// # Errors
    ///
    /// Reports store failures from events that persist VFO state.
    pub fn handle(&mut self, event: RadioEvent) -> Result<TxAction, StoreError<N::Error>> {
        if let RadioEvent::Ptt(pressed) = event {
            let request = if pressed {
                TxRequest::Transmit
            } else {
                TxRequest::Receive
            };
            let action = self.tx.request(request);
            self.perform(action);
            return Ok(action);
        }

        if self.tx.is_switching() {
            if self.deferred.push_back(event).is_err() {
                #[cfg(feature = "embedded")]
                defmt::warn!("event queue full, dropping {}", event);
            }
            return Ok(TxAction::None);
        }

        self.dispatch(event)?;
        Ok(TxAction::None)
    }

    /// Advance the RX/TX sequencer (call periodically)
    ///
    /// Synthesizer gating is handled here; the returned action tells the
    /// caller when to drive the TX/RX line.
    ///
    /// # Errors
    ///
    /// Reports store failures from replayed events.
    pub fn tick(&mut self, elapsed_ms: u32) -> Result<TxAction, StoreError<N::Error>> {
        let action = self.tx.update(elapsed_ms);
        self.perform(action);

        if !self.tx.is_switching() {
            while let Some(event) = self.deferred.pop_front() {
                self.dispatch(event)?;
            }
        }
        Ok(action)
    }

    /// Replace the calibration snapshot
    ///
    /// The set is persisted first; the engine only sees it once the write
    /// succeeded. The synthesizer is then reprogrammed.
    ///
    /// # Errors
    ///
    /// Rejects an invalid set and reports store failures; the previous
    /// calibration stays in effect.
    pub fn apply_calibration(
        &mut self,
        calibration: CalibrationSet,
    ) -> Result<FrequencyPlan, StoreError<N::Error>> {
        self.store.save(&calibration)?;
        self.calibration = calibration;
        Ok(self.retune())
    }

    /// Persist both VFO records
    ///
    /// # Errors
    ///
    /// Reports store failures.
    pub fn save_vfos(&mut self) -> Result<(), StoreError<N::Error>> {
        self.store.save_vfo(VfoSlot::A, self.vfo.vfo_a())?;
        self.store.save_vfo(VfoSlot::B, self.vfo.vfo_b())
    }

    /// VFO manager
    #[must_use]
    pub const fn vfo(&self) -> &VfoManager {
        &self.vfo
    }

    /// Calibration snapshot used by the engine
    #[must_use]
    pub const fn calibration(&self) -> &CalibrationSet {
        &self.calibration
    }

    /// Last plan sent to the synthesizer
    #[must_use]
    pub const fn plan(&self) -> &FrequencyPlan {
        &self.plan
    }

    /// Tuning step
    #[must_use]
    pub const fn step(&self) -> TuningStep {
        self.step
    }

    /// TX/RX state
    #[must_use]
    pub const fn txrx(&self) -> TxRxState {
        self.tx.txrx()
    }

    /// TX/RX sequencer
    #[must_use]
    pub const fn sequencer(&self) -> &TxSequencer {
        &self.tx
    }

    /// Number of events waiting for the changeover to finish
    #[must_use]
    pub fn deferred(&self) -> usize {
        self.deferred.len()
    }

    /// Synthesizer
    #[must_use]
    pub const fn synth(&self) -> &S {
        &self.synth
    }

    /// Calibration store
    #[must_use]
    pub const fn store(&self) -> &CalibrationStore<N> {
        &self.store
    }

    /// Render the two display lines
    #[must_use]
    pub fn display_lines(&self) -> StatusLines {
        StatusLines::render(self.vfo.selected(), self.vfo.current(), &self.calibration, self.txrx())
    }

    /// Give back the synthesizer and store
    pub fn release(self) -> (S, N) {
        (self.synth, self.store.into_inner())
    }

    fn dispatch(&mut self, event: RadioEvent) -> Result<(), StoreError<N::Error>> {
        let cal = &self.calibration;
        let synth = &mut self.synth;
        match event {
            RadioEvent::Tune(steps) => {
                self.plan = self.vfo.tune(self.step.delta_for(steps), cal, synth);
            }
            RadioEvent::SetFrequency(hz) => {
                self.plan = self.vfo.set_frequency(hz, cal, synth);
            }
            RadioEvent::SetSideband(sideband) => {
                self.plan = self.vfo.set_sideband(sideband, cal, synth);
                self.save_active()?;
            }
            RadioEvent::ToggleSideband => {
                self.plan = self.vfo.toggle_sideband(cal, synth);
                self.save_active()?;
            }
            RadioEvent::SwitchVfo => {
                self.plan = self.vfo.switch_active_vfo(cal, synth);
            }
            RadioEvent::SwapVfo => {
                self.plan = self.vfo.swap(cal, synth);
            }
            RadioEvent::CopyVfo => self.vfo.copy_to_other(),
            RadioEvent::NextStep => self.step = self.step.next_larger(),
            RadioEvent::SaveVfos => self.save_vfos()?,
            // Routed to the sequencer before dispatch
            RadioEvent::Ptt(_) => {}
        }
        Ok(())
    }

    fn save_active(&mut self) -> Result<(), StoreError<N::Error>> {
        self.store.save_vfo(self.vfo.selected(), self.vfo.current())
    }

    fn retune(&mut self) -> FrequencyPlan {
        self.plan = self.vfo.retune(&self.calibration, &mut self.synth);
        self.plan
    }

    fn perform(&mut self, action: TxAction) {
        match action {
            TxAction::OscillatorsOff => self.synth.set_outputs_enabled(false),
            TxAction::OscillatorsOn => {
                apply_plan(&mut self.synth, &self.plan);
                self.synth.set_outputs_enabled(true);
            }
            TxAction::None | TxAction::TxLineOn | TxAction::TxLineOff => {}
        }
    }
}
