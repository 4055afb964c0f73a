//! Peripheral Drivers
//!
//! Drivers for the external ICs on the board. They are written against the
//! blocking `embedded-hal` traits, so everything here also builds and runs
//! on the host.

pub mod eeprom;
pub mod encoder;
pub mod si5351;
pub mod si5351_calc;
pub mod synth;
