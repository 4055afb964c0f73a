//! Radio Control Logic
//!
//! The frequency plan, VFO handling, RX/TX sequencing and the controller
//! that ties them to the synthesizer and the calibration store.

pub mod plan;
pub mod state;
pub mod transmit;
pub mod vfo;
