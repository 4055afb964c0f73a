//! Transmit Control
//!
//! Sequences the RX/TX changeover. The synthesizer is silenced first, the
//! TX/RX line is switched once it has died away, and RF comes back only
//! after the relays have settled:
//!
//! ```text
//!   Rx ─► OscillatorsOff ─15ms─► TxLineOn  ─30ms─► OscillatorsOn ─► Tx
//!   Tx ─► OscillatorsOff ─15ms─► TxLineOff ─30ms─► OscillatorsOn ─► Rx
//! ```
//!
//! A sequence always runs to the end. Requests that arrive meanwhile wait in
//! a small queue and start once the controller is idle again.

use heapless::Deque;

use crate::config::{TX_DELAY_ENABLE_MS, TX_DELAY_OSC_OFF_MS};
use crate::types::TxRxState;

/// Pending requests kept while a changeover is in flight
pub const TX_QUEUE_DEPTH: usize = 4;

/// Changeover state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TxState {
    /// Radio is receiving
    #[default]
    Rx,
    /// Oscillators off, waiting before keying the TX line
    TxOscOff,
    /// TX line on, waiting before RF is unblanked
    TxSettle,
    /// Transmitting
    Tx,
    /// Oscillators off, waiting before releasing the TX line
    RxOscOff,
    /// TX line off, waiting before the receive chain is driven again
    RxSettle,
}

impl TxState {
    /// Convert to `TxRxState`
    #[must_use]
    pub const fn as_txrx(self) -> TxRxState {
        match self {
            Self::Rx => TxRxState::Rx,
            Self::Tx => TxRxState::Tx,
            Self::TxOscOff | Self::TxSettle | Self::RxOscOff | Self::RxSettle => {
                TxRxState::Switching
            }
        }
    }

    /// Where this state is heading
    #[must_use]
    pub const fn target(self) -> TxRequest {
        match self {
            Self::Rx | Self::RxOscOff | Self::RxSettle => TxRequest::Receive,
            Self::Tx | Self::TxOscOff | Self::TxSettle => TxRequest::Transmit,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for TxState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Rx => defmt::write!(f, "RX"),
            Self::TxOscOff => defmt::write!(f, "RX→TX(osc off)"),
            Self::TxSettle => defmt::write!(f, "RX→TX(settle)"),
            Self::Tx => defmt::write!(f, "TX"),
            Self::RxOscOff => defmt::write!(f, "TX→RX(osc off)"),
            Self::RxSettle => defmt::write!(f, "TX→RX(settle)"),
        }
    }
}

/// Requested end state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxRequest {
    /// Go to transmit
    Transmit,
    /// Go to receive
    Receive,
}

#[cfg(feature = "embedded")]
impl defmt::Format for TxRequest {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Transmit => defmt::write!(f, "Transmit"),
            Self::Receive => defmt::write!(f, "Receive"),
        }
    }
}

/// Action to take from a sequencer step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxAction {
    /// No action needed
    None,
    /// Gate all synthesizer outputs off
    OscillatorsOff,
    /// Drive the TX/RX line to transmit
    TxLineOn,
    /// Drive the TX/RX line to receive
    TxLineOff,
    /// Reprogram and gate the synthesizer outputs on
    OscillatorsOn,
}

#[cfg(feature = "embedded")]
impl defmt::Format for TxAction {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::None => defmt::write!(f, "None"),
            Self::OscillatorsOff => defmt::write!(f, "OscOff"),
            Self::TxLineOn => defmt::write!(f, "TxLineOn"),
            Self::TxLineOff => defmt::write!(f, "TxLineOff"),
            Self::OscillatorsOn => defmt::write!(f, "OscOn"),
        }
    }
}

/// RX/TX changeover sequencer
#[derive(Clone, Debug)]
pub struct TxSequencer {
    /// Current state
    state: TxState,
    /// Remaining wait in the current phase (milliseconds)
    delay_ms: u32,
    /// Requests waiting for the in-flight sequence
    queue: Deque<TxRequest, TX_QUEUE_DEPTH>,
}

impl TxSequencer {
    /// Create a sequencer in receive
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: TxState::Rx,
            delay_ms: 0,
            queue: Deque::new(),
        }
    }

    /// Get current state
    #[must_use]
    pub const fn state(&self) -> TxState {
        self.state
    }

    /// Get `TxRx` state
    #[must_use]
    pub const fn txrx(&self) -> TxRxState {
        self.state.as_txrx()
    }

    /// Check if transmitting
    #[must_use]
    pub const fn is_transmitting(&self) -> bool {
        matches!(self.state, TxState::Tx)
    }

    /// Check if a changeover is in flight
    #[must_use]
    pub const fn is_switching(&self) -> bool {
        !matches!(self.state, TxState::Rx | TxState::Tx)
    }

    /// Number of queued requests
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Ask for a change of state
    ///
    /// When idle the sequence starts at once and its first action is
    /// returned. Otherwise the request is queued; a request for the state
    /// that will already be reached is dropped.
    pub fn request(&mut self, request: TxRequest) -> TxAction {
        if !self.is_switching() && self.queue.is_empty() {
            return self.start(request);
        }

        let eventual = self.queue.back().copied().unwrap_or(self.state.target());
        if eventual == request {
            return TxAction::None;
        }
        if self.queue.push_back(request).is_err() {
            #[cfg(feature = "embedded")]
            defmt::warn!("tx queue full, dropping {}", request);
        }
        TxAction::None
    }

    /// Advance the sequence (call periodically)
    /// Returns actions to take
    pub fn update(&mut self, elapsed_ms: u32) -> TxAction {
        match self.state {
            TxState::Rx | TxState::Tx => match self.queue.pop_front() {
                Some(request) => self.start(request),
                None => TxAction::None,
            },

            TxState::TxOscOff => self.wait(
                elapsed_ms,
                TxState::TxSettle,
                TX_DELAY_ENABLE_MS,
                TxAction::TxLineOn,
            ),
            TxState::TxSettle => self.wait(elapsed_ms, TxState::Tx, 0, TxAction::OscillatorsOn),
            TxState::RxOscOff => self.wait(
                elapsed_ms,
                TxState::RxSettle,
                TX_DELAY_ENABLE_MS,
                TxAction::TxLineOff,
            ),
            TxState::RxSettle => self.wait(elapsed_ms, TxState::Rx, 0, TxAction::OscillatorsOn),
        }
    }

    fn start(&mut self, request: TxRequest) -> TxAction {
        if self.state.target() == request {
            return TxAction::None;
        }
        self.state = match request {
            TxRequest::Transmit => TxState::TxOscOff,
            TxRequest::Receive => TxState::RxOscOff,
        };
        self.delay_ms = TX_DELAY_OSC_OFF_MS;
        TxAction::OscillatorsOff
    }

    fn wait(
        &mut self,
        elapsed_ms: u32,
        next: TxState,
        next_delay_ms: u32,
        action: TxAction,
    ) -> TxAction {
        self.delay_ms = self.delay_ms.saturating_sub(elapsed_ms);
        if self.delay_ms > 0 {
            return TxAction::None;
        }
        self.state = next;
        self.delay_ms = next_delay_ms;
        action
    }
}

impl Default for TxSequencer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for TxSequencer {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "TxSeq({}, wait={}ms, queued={})",
            self.state,
            self.delay_ms,
            self.queue.len()
        );
    }
}
