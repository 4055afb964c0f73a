//! Calibration Store
//!
//! Loads and saves [`PersistedState`] through any byte-addressable
//! non-volatile store. Loads never fail: an unreadable or corrupt store
//! yields defaults, since an uncalibrated radio must still be usable.
//!
//! Saves go through a journal: the complete new image is written and
//! committed before the primary copy is touched, and only fields that
//! actually changed are rewritten. A save cut short at any write leaves
//! either the previous or the new image visible to the next load.

use core::fmt;

use super::schema::{
    commit_record, is_blank, is_commit, read_raw, write_raw, Decoded, Field, COMMIT_LEN,
    COMMIT_OFFSET, ERASED, IMAGE_LEN, JOURNAL_OFFSET, LAYOUT, STORE_LEN,
};
use super::{CalibrationSet, PersistedState};
use crate::config::EEPROM_SIZE;
use crate::radio::vfo::{VfoSlot, VfoState};

/// Byte-addressable non-volatile memory
pub trait NvStore {
    /// Device error type
    type Error: fmt::Debug;

    /// Size of the store in bytes
    fn capacity(&self) -> usize;

    /// Read `buf.len()` bytes starting at `offset`
    ///
    /// # Errors
    ///
    /// Returns the device error if the read could not be completed.
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write `data` starting at `offset`
    ///
    /// # Errors
    ///
    /// Returns the device error if the write could not be completed.
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), Self::Error>;
}

impl<N: NvStore + ?Sized> NvStore for &mut N {
    type Error = N::Error;

    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), Self::Error> {
        (**self).read(offset, buf)
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), Self::Error> {
        (**self).write(offset, data)
    }
}

/// Calibration store error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreError<E> {
    /// The underlying device failed
    Device(E),
    /// A field of the set to save is outside its accepted range
    InvalidCalibration(Field),
    /// The store is too small for the layout
    OutOfBounds,
}

#[cfg(feature = "embedded")]
impl<E> defmt::Format for StoreError<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Device(_) => defmt::write!(f, "StoreError::Device"),
            Self::InvalidCalibration(field) => {
                defmt::write!(f, "StoreError::InvalidCalibration({})", field);
            }
            Self::OutOfBounds => defmt::write!(f, "StoreError::OutOfBounds"),
        }
    }
}

/// Calibration and VFO persistence over an [`NvStore`]
pub struct CalibrationStore<N: NvStore> {
    nv: N,
}

impl<N: NvStore> CalibrationStore<N> {
    /// Wrap a store
    #[must_use]
    pub const fn new(nv: N) -> Self {
        Self { nv }
    }

    /// Access the underlying store
    #[must_use]
    pub const fn inner(&self) -> &N {
        &self.nv
    }

    /// Give back the underlying store
    #[must_use]
    pub fn into_inner(self) -> N {
        self.nv
    }

    /// Read and decode the whole image, reporting which fields were defaulted
    pub fn load_decoded(&mut self) -> Decoded {
        let image = match self.read_image() {
            Ok(image) => image,
            Err(_) => {
                #[cfg(feature = "embedded")]
                defmt::warn!("calibration store unreadable, using defaults");
                [ERASED; IMAGE_LEN]
            }
        };

        let decoded = PersistedState::decode(&image);
        #[cfg(feature = "embedded")]
        if decoded.defaulted != 0 {
            defmt::warn!("defaulted stored fields: {=u16:#x}", decoded.defaulted);
        }
        decoded
    }

    /// Load calibration and both VFO records
    pub fn load_all(&mut self) -> PersistedState {
        self.load_decoded().state
    }

    /// Load the calibration set, defaulting anything not yet persisted
    pub fn load(&mut self) -> CalibrationSet {
        self.load_all().calibration
    }

    /// Load both VFO records
    pub fn load_vfos(&mut self) -> (VfoState, VfoState) {
        let state = self.load_all();
        (state.vfo_a, state.vfo_b)
    }

    /// Persist a complete calibration set
    ///
    /// # Errors
    ///
    /// Rejects a set with an out-of-range field before anything is written,
    /// and reports device failures.
    pub fn save(&mut self, calibration: &CalibrationSet) -> Result<(), StoreError<N::Error>> {
        calibration
            .validate()
            .map_err(StoreError::InvalidCalibration)?;
        let state = PersistedState {
            calibration: *calibration,
            ..PersistedState::default()
        };
        self.write_fields(&Field::CALIBRATION, &state)
    }

    /// Persist one VFO record
    ///
    /// # Errors
    ///
    /// Reports device failures.
    pub fn save_vfo(&mut self, slot: VfoSlot, vfo: &VfoState) -> Result<(), StoreError<N::Error>> {
        let (fields, state) = match slot {
            VfoSlot::A => (
                &Field::VFO_A,
                PersistedState {
                    vfo_a: *vfo,
                    ..PersistedState::default()
                },
            ),
            VfoSlot::B => (
                &Field::VFO_B,
                PersistedState {
                    vfo_b: *vfo,
                    ..PersistedState::default()
                },
            ),
        };
        self.write_fields(fields, &state)
    }

    fn check_capacity(&self) -> Result<(), StoreError<N::Error>> {
        if self.nv.capacity() < STORE_LEN {
            return Err(StoreError::OutOfBounds);
        }
        Ok(())
    }

    /// The image a load should see: a committed journal wins over the
    /// primary copy
    fn read_image(&mut self) -> Result<[u8; IMAGE_LEN], StoreError<N::Error>> {
        self.check_capacity()?;
        match self.committed_journal()? {
            Some(journal) => Ok(journal),
            None => self.read_primary(),
        }
    }

    fn read_primary(&mut self) -> Result<[u8; IMAGE_LEN], StoreError<N::Error>> {
        let mut image = [ERASED; IMAGE_LEN];
        self.nv.read(0, &mut image).map_err(StoreError::Device)?;
        Ok(image)
    }

    /// Journal image, if its commit record is present and matches it
    fn committed_journal(&mut self) -> Result<Option<[u8; IMAGE_LEN]>, StoreError<N::Error>> {
        let mut record = [ERASED; COMMIT_LEN];
        self.nv
            .read(COMMIT_OFFSET, &mut record)
            .map_err(StoreError::Device)?;
        if !is_commit(&record) {
            return Ok(None);
        }

        let mut journal = [ERASED; IMAGE_LEN];
        self.nv
            .read(JOURNAL_OFFSET, &mut journal)
            .map_err(StoreError::Device)?;
        if commit_record(&journal) == record {
            Ok(Some(journal))
        } else {
            #[cfg(feature = "embedded")]
            defmt::warn!("discarding torn calibration journal");
            Ok(None)
        }
    }

    /// Write the given fields of `state`
    ///
    /// The first write to a blank store lays down every field, so a fresh
    /// unit never holds a half-erased image.
    fn write_fields(
        &mut self,
        fields: &[Field],
        state: &PersistedState,
    ) -> Result<(), StoreError<N::Error>> {
        self.check_capacity()?;
        let mut primary = self.read_primary()?;
        if let Some(journal) = self.committed_journal()? {
            #[cfg(feature = "embedded")]
            defmt::info!("finishing interrupted calibration save");
            self.apply(&primary, &journal)?;
            primary = journal;
        }

        let fields: &[Field] = if is_blank(&primary) {
            &Field::ALL
        } else {
            fields
        };
        let mut wanted = primary;
        for &field in fields {
            write_raw(&mut wanted, field.spec(), state.raw(field));
        }
        if wanted == primary {
            return Ok(());
        }

        self.nv
            .write(JOURNAL_OFFSET, &wanted)
            .map_err(StoreError::Device)?;
        self.nv
            .write(COMMIT_OFFSET, &commit_record(&wanted))
            .map_err(StoreError::Device)?;
        self.apply(&primary, &wanted)
    }

    /// Bring the primary copy from `from` to `to`, then clear the commit
    fn apply(
        &mut self,
        from: &[u8; IMAGE_LEN],
        to: &[u8; IMAGE_LEN],
    ) -> Result<(), StoreError<N::Error>> {
        for spec in &LAYOUT {
            if read_raw(from, spec) == read_raw(to, spec) {
                continue;
            }
            self.nv
                .write(spec.offset, &to[spec.offset..spec.offset + spec.width])
                .map_err(StoreError::Device)?;
        }
        self.nv
            .write(COMMIT_OFFSET, &[ERASED; COMMIT_LEN])
            .map_err(StoreError::Device)
    }
}

/// Error from [`MemoryStore`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryStoreError {
    /// Access past the end of the store
    OutOfBounds,
    /// Injected failure
    Faulted,
}

/// RAM-backed store, erased to `0xFF` like a fresh EEPROM
#[derive(Clone, Debug)]
pub struct MemoryStore {
    bytes: [u8; EEPROM_SIZE],
    writes: usize,
    faulted: bool,
}

impl MemoryStore {
    /// Create an erased store
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: [ERASED; EEPROM_SIZE],
            writes: 0,
            faulted: false,
        }
    }

    /// Create a store with every byte set to zero
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            bytes: [0; EEPROM_SIZE],
            writes: 0,
            faulted: false,
        }
    }

    /// Raw contents
    #[must_use]
    pub const fn bytes(&self) -> &[u8; EEPROM_SIZE] {
        &self.bytes
    }

    /// Raw contents, mutably (for corrupting a store in tests)
    pub fn bytes_mut(&mut self) -> &mut [u8; EEPROM_SIZE] {
        &mut self.bytes
    }

    /// Number of write calls that reached the store
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.writes
    }

    /// Make every subsequent access fail
    pub fn set_faulted(&mut self, faulted: bool) {
        self.faulted = faulted;
    }

    fn check(&self, offset: usize, len: usize) -> Result<(), MemoryStoreError> {
        if self.faulted {
            return Err(MemoryStoreError::Faulted);
        }
        match offset.checked_add(len) {
            Some(end) if end <= EEPROM_SIZE => Ok(()),
            _ => Err(MemoryStoreError::OutOfBounds),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NvStore for MemoryStore {
    type Error = MemoryStoreError;

    fn capacity(&self) -> usize {
        EEPROM_SIZE
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.check(offset, buf.len())?;
        buf.copy_from_slice(&self.bytes[offset..offset + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), Self::Error> {
        self.check(offset, data.len())?;
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
        self.writes += 1;
        Ok(())
    }
}
