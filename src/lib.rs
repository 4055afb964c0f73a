//! uBITX Transceiver Firmware Library
//!
//! Frequency control for a dual-conversion upconversion HF transceiver
//! built around a three-output `Si5351A` synthesizer. The incoming signal
//! is mixed up to a 45 MHz first IF, then down to a ~12 MHz second IF where
//! the crystal filter and product detector live.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    APPLICATION LAYER                        │
//! │  Radio controller  │  Status lines  │  Encoder/PTT input    │
//! ├─────────────────────────────────────────────────────────────┤
//! │                      RADIO CORE                             │
//! │  VFO A/B  │  Frequency plan  │  RX/TX sequencer             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 CALIBRATION / PERSISTENCE                   │
//! │  Calibration set  │  EEPROM layout  │  Store                │
//! ├─────────────────────────────────────────────────────────────┤
//! │                       DRIVERS                               │
//! │  Si5351A  │  24Cxx EEPROM  │  Rotary encoder                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Pure frequency plan**: oscillator targets are a function of dial
//!   frequency, sideband and calibration only
//! - **Type-driven design**: `Frequency` can only hold tunable values
//! - **Capability traits at the hardware seams**: `ClockSynth` and
//!   `NvStore` have hardware and in-memory implementations
//! - **No unsafe in application code**
//! - **Explicit error handling**: all fallible operations return `Result`

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export dependencies needed by applications (only in embedded mode)
#[cfg(feature = "embedded")]
pub use embassy_executor;
#[cfg(feature = "embedded")]
pub use embassy_stm32;
#[cfg(feature = "embedded")]
pub use embassy_time;

/// Calibration constants, persisted layout and store
pub mod calibration;

/// Peripheral Drivers
///
/// `Si5351A` synthesizer, 24Cxx EEPROM and rotary encoder.
pub mod drivers;

/// Radio Control Logic
///
/// Frequency plan, VFOs, RX/TX sequencing and the radio controller.
pub mod radio;

/// User Interface
///
/// Display status lines and knob gesture mapping.
pub mod ui;

/// Shared types used across modules
pub mod types;

/// System configuration and constants
pub mod config;

/// Prelude module for common imports
#[cfg(feature = "embedded")]
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::calibration::{CalibrationSet, CalibrationStore, NvStore};
    pub use crate::config::*;
    pub use crate::drivers::synth::{ClockIndex, ClockSynth};
    pub use crate::radio::state::{Radio, RadioEvent};
    pub use crate::radio::transmit::TxAction;
    pub use crate::types::*;

    // Common traits
    pub use embedded_hal::digital::{InputPin, OutputPin};
    pub use embedded_hal::i2c::I2c;

    // Embassy
    pub use embassy_time::{Duration, Instant, Timer};

    // Error handling
    pub use core::result::Result;

    // Logging
    pub use defmt::{debug, error, info, trace, warn};
}
