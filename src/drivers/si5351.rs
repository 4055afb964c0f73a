//! `Si5351A` Clock Synthesizer Driver
//!
//! Generates the BFO and both local oscillators. PLL A runs at a fixed
//! integer multiple of the 25 MHz crystal; each output has its own
//! fractional multisynth, so retuning one clock never disturbs the others.
//!
//! The driver is blocking and generic over any `embedded-hal` I2C bus.

use embedded_hal::i2c::I2c;

use super::si5351_calc::{calculate_multisynth, fixed_pll, MsParams, PllParams};
use super::synth::{ClockIndex, ClockSynth};
use crate::config::{SI5351_I2C_ADDR, SI5351_PLL_MULT, SI5351_XTAL_FREQ};

/// `Si5351A` register addresses
mod reg {
    pub const DEVICE_STATUS: u8 = 0;
    pub const OUTPUT_ENABLE: u8 = 3;
    pub const CLK0_CONTROL: u8 = 16;
    pub const PLLA_PARAMS: u8 = 26;
    pub const MS0_PARAMS: u8 = 42;
    pub const PLL_RESET: u8 = 177;
    pub const CRYSTAL_LOAD: u8 = 183;
}

/// Output enable register value with CLK0-2 on
const OUTPUTS_ON: u8 = 0xF8;
/// Output enable register value with everything off
const OUTPUTS_OFF: u8 = 0xFF;
/// Clock control: powered down
const CLK_POWER_DOWN: u8 = 0x80;
/// Clock control: integer-mode multisynth
const CLK_MS_INT: u8 = 0x40;
/// Clock control: source is the output's own multisynth
const CLK_SRC_MS: u8 = 0x0C;
/// PLL reset: PLL A
const PLLA_RESET: u8 = 0x20;
/// Device status: system initialising
const SYS_INIT: u8 = 0x80;

#[allow(clippy::cast_possible_truncation)]
impl ClockIndex {
    /// Clock control register for this output
    const fn control_reg(self) -> u8 {
        reg::CLK0_CONTROL + self.index() as u8
    }

    /// Multisynth parameter base register
    const fn ms_reg(self) -> u8 {
        reg::MS0_PARAMS + 8 * self.index() as u8
    }
}

/// Drive strength setting
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriveStrength {
    /// 2mA drive
    Drive2mA,
    /// 4mA drive
    Drive4mA,
    /// 6mA drive
    Drive6mA,
    /// 8mA drive (maximum)
    #[default]
    Drive8mA,
}

impl DriveStrength {
    /// Get register value
    const fn as_reg(self) -> u8 {
        match self {
            Self::Drive2mA => 0,
            Self::Drive4mA => 1,
            Self::Drive6mA => 2,
            Self::Drive8mA => 3,
        }
    }
}

/// Crystal load capacitance
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CrystalLoad {
    /// 6 pF load
    Load6pF,
    /// 8 pF load
    Load8pF,
    /// 10 pF load
    #[default]
    Load10pF,
}

impl CrystalLoad {
    const fn as_reg(self) -> u8 {
        match self {
            Self::Load6pF => 0b0101_0010,
            Self::Load8pF => 0b1001_0010,
            Self::Load10pF => 0b1101_0010,
        }
    }
}

/// Driver error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error<E> {
    /// Bus transaction failed
    I2c(E),
    /// No multisynth setting reaches the requested frequency
    OutOfRange {
        /// Output being programmed
        clock: ClockIndex,
        /// Requested frequency
        hz: u32,
    },
    /// The PLL multiplier puts the VCO outside its range
    InvalidPll,
}

#[cfg(feature = "embedded")]
impl<E> defmt::Format for Error<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::I2c(_) => defmt::write!(f, "Si5351::I2c"),
            Self::OutOfRange { clock, hz } => {
                defmt::write!(f, "Si5351::OutOfRange({}, {}Hz)", clock, hz);
            }
            Self::InvalidPll => defmt::write!(f, "Si5351::InvalidPll"),
        }
    }
}

/// `Si5351A` driver
pub struct Si5351<I2C: I2c> {
    i2c: I2C,
    address: u8,
    pll: PllParams,
    vco_hz: u64,
    drive: DriveStrength,
    fault: Option<Error<I2C::Error>>,
}

impl<I2C: I2c> Si5351<I2C> {
    /// Status polls before giving up on `SYS_INIT`
    const READY_POLLS: usize = 100;

    /// Create a driver for the board's crystal and PLL multiplier
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPll`] if the multiplier cannot work with the
    /// crystal.
    pub fn new(i2c: I2C) -> Result<Self, Error<I2C::Error>> {
        Self::with_reference(i2c, SI5351_XTAL_FREQ, SI5351_PLL_MULT)
    }

    /// Create a driver for a specific crystal and PLL multiplier
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPll`] if the resulting VCO is out of range.
    pub fn with_reference(
        i2c: I2C,
        xtal_hz: u32,
        pll_mult: u32,
    ) -> Result<Self, Error<I2C::Error>> {
        let pll = fixed_pll(u64::from(xtal_hz), pll_mult).ok_or(Error::InvalidPll)?;
        Ok(Self {
            i2c,
            address: SI5351_I2C_ADDR,
            vco_hz: pll.vco_frequency(u64::from(xtal_hz)),
            pll,
            drive: DriveStrength::default(),
            fault: None,
        })
    }

    /// VCO frequency of PLL A
    #[must_use]
    pub const fn vco_hz(&self) -> u64 {
        self.vco_hz
    }

    /// Set output drive strength for subsequently programmed clocks
    pub fn set_drive(&mut self, drive: DriveStrength) {
        self.drive = drive;
    }

    /// Initialize the `Si5351A`
    ///
    /// Outputs are left disabled and powered down; PLL A is programmed and
    /// reset.
    ///
    /// # Errors
    ///
    /// Returns the bus error of the first failing transaction.
    pub fn init(&mut self, load: CrystalLoad) -> Result<(), Error<I2C::Error>> {
        self.wait_ready()?;
        self.write_reg(reg::OUTPUT_ENABLE, OUTPUTS_OFF)?;
        self.write_reg(reg::CRYSTAL_LOAD, load.as_reg())?;
        for clock in ClockIndex::ALL {
            self.write_reg(clock.control_reg(), CLK_POWER_DOWN)?;
        }

        let (p1, p2, p3) = self.pll.to_registers();
        self.write_regs(reg::PLLA_PARAMS, &pack_params(p1, p2, p3, 0))?;
        self.write_reg(reg::PLL_RESET, PLLA_RESET)?;

        #[cfg(feature = "embedded")]
        defmt::debug!("Si5351 up, VCO {=u64} Hz", self.vco_hz);
        Ok(())
    }

    /// Program one output, returning the frequency the divider actually
    /// produces
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] for a frequency the multisynth cannot
    /// produce, or the bus error.
    pub fn set_frequency(&mut self, clock: ClockIndex, hz: u32) -> Result<u32, Error<I2C::Error>> {
        let ms = calculate_multisynth(self.vco_hz, hz).ok_or(Error::OutOfRange { clock, hz })?;
        self.program_multisynth(clock, &ms)?;

        let mut control = CLK_SRC_MS | self.drive.as_reg();
        if ms.is_integer() {
            control |= CLK_MS_INT;
        }
        self.write_reg(clock.control_reg(), control)?;

        let actual = u32::try_from(ms.output_frequency(self.vco_hz)).unwrap_or(u32::MAX);
        #[cfg(feature = "embedded")]
        defmt::trace!("{} -> {=u32} Hz (asked {=u32})", clock, actual, hz);
        Ok(actual)
    }

    /// Gate CLK0-2 on or off
    ///
    /// # Errors
    ///
    /// Returns the bus error.
    pub fn enable_outputs(&mut self, enabled: bool) -> Result<(), Error<I2C::Error>> {
        self.write_reg(
            reg::OUTPUT_ENABLE,
            if enabled { OUTPUTS_ON } else { OUTPUTS_OFF },
        )
    }

    /// Take the last fault raised through [`ClockSynth`]
    pub fn take_fault(&mut self) -> Option<Error<I2C::Error>> {
        self.fault.take()
    }

    /// Release the bus
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Wait for `SYS_INIT` to clear; continue anyway after the poll budget
    fn wait_ready(&mut self) -> Result<(), Error<I2C::Error>> {
        for _ in 0..Self::READY_POLLS {
            if self.read_reg(reg::DEVICE_STATUS)? & SYS_INIT == 0 {
                return Ok(());
            }
        }
        #[cfg(feature = "embedded")]
        defmt::warn!("Si5351 still initialising, continuing");
        Ok(())
    }

    fn program_multisynth(
        &mut self,
        clock: ClockIndex,
        ms: &MsParams,
    ) -> Result<(), Error<I2C::Error>> {
        let (p1, p2, p3) = ms.to_registers();
        self.write_regs(clock.ms_reg(), &pack_params(p1, p2, p3, ms.r_div))
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        self.i2c.write(self.address, &[reg, value]).map_err(Error::I2c)
    }

    fn write_regs(&mut self, base: u8, values: &[u8; 8]) -> Result<(), Error<I2C::Error>> {
        let mut frame = [0u8; 9];
        frame[0] = base;
        frame[1..].copy_from_slice(values);
        self.i2c.write(self.address, &frame).map_err(Error::I2c)
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, Error<I2C::Error>> {
        let mut value = [0u8];
        self.i2c
            .write_read(self.address, &[reg], &mut value)
            .map_err(Error::I2c)?;
        Ok(value[0])
    }

    fn record(&mut self, result: Result<(), Error<I2C::Error>>) {
        if let Err(err) = result {
            #[cfg(feature = "embedded")]
            defmt::warn!("synthesizer fault: {}", err);
            self.fault = Some(err);
        }
    }
}

impl<I2C: I2c> ClockSynth for Si5351<I2C> {
    fn set_clock_frequency(&mut self, clock: ClockIndex, hz: u32) {
        let result = self.set_frequency(clock, hz).map(|_| ());
        self.record(result);
    }

    fn set_outputs_enabled(&mut self, enabled: bool) {
        let result = self.enable_outputs(enabled);
        self.record(result);
    }
}

/// Lay out P1/P2/P3 and the R divider in the 8-byte register block shared
/// by the PLLs and multisynths
#[allow(clippy::cast_possible_truncation)]
const fn pack_params(p1: u32, p2: u32, p3: u32, r_div: u8) -> [u8; 8] {
    [
        (p3 >> 8) as u8,
        p3 as u8,
        (r_div << 4) | ((p1 >> 16) as u8 & 0x03),
        (p1 >> 8) as u8,
        p1 as u8,
        (((p3 >> 12) & 0xF0) | ((p2 >> 16) & 0x0F)) as u8,
        (p2 >> 8) as u8,
        p2 as u8,
    ]
}
