//! 24Cxx I2C EEPROM
//!
//! Calibration and VFO storage. Small 24Cxx parts use an 8-bit word address
//! and carry the upper address bits in the device address, one 256-byte
//! block per address. Writes must not cross a page and the part ignores the
//! bus until its internal write cycle has finished.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::calibration::NvStore;
use crate::config::{EEPROM_I2C_ADDR, EEPROM_PAGE_SIZE, EEPROM_SIZE};

/// Bytes addressed by one device address
const BLOCK_SIZE: usize = 256;

/// Worst-case internal write cycle
const WRITE_CYCLE_MS: u32 = 5;

/// EEPROM error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EepromError<E> {
    /// Bus transaction failed
    I2c(E),
    /// Access past the end of the part
    OutOfBounds,
}

#[cfg(feature = "embedded")]
impl<E> defmt::Format for EepromError<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::I2c(_) => defmt::write!(f, "Eeprom::I2c"),
            Self::OutOfBounds => defmt::write!(f, "Eeprom::OutOfBounds"),
        }
    }
}

/// 24C08-class EEPROM over I2C
pub struct I2cEeprom<I2C, D> {
    i2c: I2C,
    delay: D,
    base_address: u8,
    capacity: usize,
}

impl<I2C: I2c, D: DelayNs> I2cEeprom<I2C, D> {
    /// Create a driver for the board's part
    #[must_use]
    pub const fn new(i2c: I2C, delay: D) -> Self {
        Self {
            i2c,
            delay,
            base_address: EEPROM_I2C_ADDR,
            capacity: EEPROM_SIZE,
        }
    }

    /// Release the bus and delay
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn check(&self, offset: usize, len: usize) -> Result<(), EepromError<I2C::Error>> {
        match offset.checked_add(len) {
            Some(end) if end <= self.capacity => Ok(()),
            _ => Err(EepromError::OutOfBounds),
        }
    }

    /// Device address and word address for a byte offset
    #[allow(clippy::cast_possible_truncation)]
    fn address_of(&self, offset: usize) -> (u8, u8) {
        let block = (offset / BLOCK_SIZE) as u8 & 0x07;
        (self.base_address | block, (offset % BLOCK_SIZE) as u8)
    }
}

impl<I2C: I2c, D: DelayNs> NvStore for I2cEeprom<I2C, D> {
    type Error = EepromError<I2C::Error>;

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.check(offset, buf.len())?;
        let mut pos = 0;
        while pos < buf.len() {
            let at = offset + pos;
            let len = (BLOCK_SIZE - at % BLOCK_SIZE).min(buf.len() - pos);
            let (device, word) = self.address_of(at);
            self.i2c
                .write_read(device, &[word], &mut buf[pos..pos + len])
                .map_err(EepromError::I2c)?;
            pos += len;
        }
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), Self::Error> {
        self.check(offset, data.len())?;
        let mut frame = [0u8; EEPROM_PAGE_SIZE + 1];
        let mut pos = 0;
        while pos < data.len() {
            let at = offset + pos;
            let len = (EEPROM_PAGE_SIZE - at % EEPROM_PAGE_SIZE).min(data.len() - pos);
            let (device, word) = self.address_of(at);
            frame[0] = word;
            frame[1..=len].copy_from_slice(&data[pos..pos + len]);
            self.i2c
                .write(device, &frame[..=len])
                .map_err(EepromError::I2c)?;
            self.delay.delay_ms(WRITE_CYCLE_MS);
            pos += len;
        }
        Ok(())
    }
}
