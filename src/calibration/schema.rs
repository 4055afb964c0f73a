//! Persisted Layout
//!
//! The byte offsets below are shared with units already in the field and
//! must not move. Every field goes through [`LAYOUT`]; nothing else in the
//! crate knows an offset.
//!
//! ```text
//!   0   masterCal  i32   ppm
//!   4   lsbCal     u32   Hz
//!   8   usbCal     u32   Hz
//!  12   sidetone   u32   Hz
//!  16   vfoA       u32   Hz
//!  20   vfoB       u32   Hz
//!  24   cwSidetone u32   Hz
//!  28   cwSpeed    u8    wpm
//! 252   firstIfCal u32   Hz, absolute (erased = not measured)
//! 256   vfoAMode   u8    2 = LSB, 3 = USB
//! 257   vfoBMode   u8
//! 358   cwKeyType  u8    0 = hand, 1 = iambic A, 2 = iambic B
//!
//! 512   journal    [u8; 359]  copy of the image being saved
//! 871   commit     u16 magic, u16 CRC-16/XMODEM of the journal
//! ```
//!
//! Multi-byte values are little-endian. The journal sits in space the
//! layout never uses; a valid commit record means the journal holds a
//! complete image that the primary copy may not have caught up with.

use byteorder::{ByteOrder, LittleEndian};
use crc::{Crc, CRC_16_XMODEM};

use super::{CalibrationSet, PersistedState};
use crate::config::{
    CW_SPEED_RANGE, FIRST_IF_RANGE, HIGHEST_FREQ, LOWEST_FREQ, LSB_CARRIER_RANGE,
    MASTER_CAL_LIMIT_PPM, SIDETONE_RANGE, USB_CARRIER_RANGE,
};
use crate::types::{Frequency, KeyType, Sideband};

/// A persisted field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    /// Master calibration (ppm)
    MasterCal,
    /// LSB carrier
    LsbCarrier,
    /// USB carrier
    UsbCarrier,
    /// Voice sidetone
    Sidetone,
    /// VFO A frequency
    VfoA,
    /// VFO B frequency
    VfoB,
    /// CW sidetone
    CwSidetone,
    /// CW speed
    CwSpeed,
    /// Calibrated first IF
    FirstIfCal,
    /// VFO A sideband
    VfoAMode,
    /// VFO B sideband
    VfoBMode,
    /// CW key type
    CwKeyType,
}

/// Location of one field in the store
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    /// Which field
    pub field: Field,
    /// Byte offset
    pub offset: usize,
    /// Width in bytes (1 or 4)
    pub width: usize,
}

/// The on-disk layout, indexed by `Field as usize`
pub const LAYOUT: [FieldSpec; 12] = [
    FieldSpec {
        field: Field::MasterCal,
        offset: 0,
        width: 4,
    },
    FieldSpec {
        field: Field::LsbCarrier,
        offset: 4,
        width: 4,
    },
    FieldSpec {
        field: Field::UsbCarrier,
        offset: 8,
        width: 4,
    },
    FieldSpec {
        field: Field::Sidetone,
        offset: 12,
        width: 4,
    },
    FieldSpec {
        field: Field::VfoA,
        offset: 16,
        width: 4,
    },
    FieldSpec {
        field: Field::VfoB,
        offset: 20,
        width: 4,
    },
    FieldSpec {
        field: Field::CwSidetone,
        offset: 24,
        width: 4,
    },
    FieldSpec {
        field: Field::CwSpeed,
        offset: 28,
        width: 1,
    },
    FieldSpec {
        field: Field::FirstIfCal,
        offset: 252,
        width: 4,
    },
    FieldSpec {
        field: Field::VfoAMode,
        offset: 256,
        width: 1,
    },
    FieldSpec {
        field: Field::VfoBMode,
        offset: 257,
        width: 1,
    },
    FieldSpec {
        field: Field::CwKeyType,
        offset: 358,
        width: 1,
    },
];

/// Bytes needed to hold every field
pub const IMAGE_LEN: usize = 359;

/// Value of an erased EEPROM cell
pub const ERASED: u8 = 0xFF;

/// Stored first IF of a unit that never measured it
pub const FIRST_IF_UNSET: u32 = u32::MAX;

/// Start of the save journal
pub const JOURNAL_OFFSET: usize = 512;

/// Start of the commit record that follows the journal
pub const COMMIT_OFFSET: usize = JOURNAL_OFFSET + IMAGE_LEN;

/// Commit record width
pub const COMMIT_LEN: usize = 4;

/// Bytes of store needed for the image, journal and commit record
pub const STORE_LEN: usize = COMMIT_OFFSET + COMMIT_LEN;

const COMMIT_MAGIC: u16 = 0x5A17;

const JOURNAL_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

impl Field {
    /// Every field in layout order
    pub const ALL: [Self; 12] = [
        Self::MasterCal,
        Self::LsbCarrier,
        Self::UsbCarrier,
        Self::Sidetone,
        Self::VfoA,
        Self::VfoB,
        Self::CwSidetone,
        Self::CwSpeed,
        Self::FirstIfCal,
        Self::VfoAMode,
        Self::VfoBMode,
        Self::CwKeyType,
    ];

    /// Fields written by a calibration save
    pub const CALIBRATION: [Self; 8] = [
        Self::MasterCal,
        Self::LsbCarrier,
        Self::UsbCarrier,
        Self::Sidetone,
        Self::CwSidetone,
        Self::CwSpeed,
        Self::FirstIfCal,
        Self::CwKeyType,
    ];

    /// Fields holding VFO A
    pub const VFO_A: [Self; 2] = [Self::VfoA, Self::VfoAMode];

    /// Fields holding VFO B
    pub const VFO_B: [Self; 2] = [Self::VfoB, Self::VfoBMode];

    /// Where this field lives
    #[must_use]
    pub const fn spec(self) -> &'static FieldSpec {
        &LAYOUT[self as usize]
    }

    /// Whether a raw stored value is usable
    #[must_use]
    pub fn accepts(self, raw: u32) -> bool {
        let in_range = |(lo, hi): (u32, u32)| (lo..=hi).contains(&raw);
        match self {
            Self::MasterCal => signed(raw).unsigned_abs() <= MASTER_CAL_LIMIT_PPM.unsigned_abs(),
            Self::FirstIfCal => raw == FIRST_IF_UNSET || in_range(FIRST_IF_RANGE),
            Self::LsbCarrier => in_range(LSB_CARRIER_RANGE),
            Self::UsbCarrier => in_range(USB_CARRIER_RANGE),
            Self::Sidetone | Self::CwSidetone => in_range(SIDETONE_RANGE),
            Self::VfoA | Self::VfoB => in_range((LOWEST_FREQ, HIGHEST_FREQ)),
            Self::CwSpeed => in_range((u32::from(CW_SPEED_RANGE.0), u32::from(CW_SPEED_RANGE.1))),
            Self::VfoAMode | Self::VfoBMode => {
                u8::try_from(raw).is_ok_and(Sideband::is_valid_persisted)
            }
            Self::CwKeyType => u8::try_from(raw)
                .ok()
                .and_then(KeyType::from_persisted)
                .is_some(),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Field {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}@{}", *self as u8, self.spec().offset);
    }
}

/// Reinterpret a stored word as two's complement
#[allow(clippy::cast_possible_wrap)]
const fn signed(raw: u32) -> i32 {
    raw as i32
}

/// Store a signed value as its two's complement word
#[allow(clippy::cast_sign_loss)]
const fn unsigned(value: i32) -> u32 {
    value as u32
}

/// Read the raw value of a field from an image
#[must_use]
pub fn read_raw(image: &[u8], spec: &FieldSpec) -> u32 {
    let bytes = &image[spec.offset..spec.offset + spec.width];
    match spec.width {
        4 => LittleEndian::read_u32(bytes),
        _ => u32::from(bytes[0]),
    }
}

/// Write the raw value of a field into an image
pub fn write_raw(image: &mut [u8], spec: &FieldSpec, raw: u32) {
    let bytes = &mut image[spec.offset..spec.offset + spec.width];
    match spec.width {
        4 => LittleEndian::write_u32(bytes, raw),
        // Single-byte fields only ever hold values that fit
        _ => bytes[0] = raw.to_le_bytes()[0],
    }
}

/// Whether an image has never been written (all erased or all zero)
#[must_use]
pub fn is_blank(image: &[u8]) -> bool {
    image.iter().all(|&b| b == ERASED) || image.iter().all(|&b| b == 0)
}

/// Commit record vouching for a journal image
#[must_use]
pub fn commit_record(journal: &[u8; IMAGE_LEN]) -> [u8; COMMIT_LEN] {
    let mut record = [0; COMMIT_LEN];
    LittleEndian::write_u16(&mut record[..2], COMMIT_MAGIC);
    LittleEndian::write_u16(&mut record[2..], JOURNAL_CRC.checksum(journal));
    record
}

/// Whether a commit record has been written and not yet cleared
#[must_use]
pub fn is_commit(record: &[u8; COMMIT_LEN]) -> bool {
    LittleEndian::read_u16(&record[..2]) == COMMIT_MAGIC
}

/// Result of decoding a stored image
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decoded {
    /// The usable state, with defaults substituted where needed
    pub state: PersistedState,
    /// Bit `Field as usize` is set for every field that was defaulted
    pub defaulted: u16,
}

impl Decoded {
    /// Whether a field fell back to its default
    #[must_use]
    pub const fn was_defaulted(&self, field: Field) -> bool {
        self.defaulted & (1 << field as u16) != 0
    }
}

impl PersistedState {
    /// Raw stored value of a field
    #[must_use]
    pub fn raw(&self, field: Field) -> u32 {
        let cal = &self.calibration;
        match field {
            Field::MasterCal => unsigned(cal.master_cal_ppm),
            Field::LsbCarrier => cal.lsb_carrier_hz,
            Field::UsbCarrier => cal.usb_carrier_hz,
            Field::Sidetone => cal.sidetone_hz,
            Field::VfoA => self.vfo_a.frequency.as_hz(),
            Field::VfoB => self.vfo_b.frequency.as_hz(),
            Field::CwSidetone => cal.cw_sidetone_hz,
            Field::CwSpeed => u32::from(cal.cw_speed_wpm),
            Field::FirstIfCal => cal.first_if_hz.unwrap_or(FIRST_IF_UNSET),
            Field::VfoAMode => u32::from(self.vfo_a.sideband.as_persisted()),
            Field::VfoBMode => u32::from(self.vfo_b.sideband.as_persisted()),
            Field::CwKeyType => u32::from(cal.cw_key_type.as_persisted()),
        }
    }

    /// Set a field from a raw value the field accepts
    fn set_raw(&mut self, field: Field, raw: u32) {
        let cal = &mut self.calibration;
        let byte = raw.to_le_bytes()[0];
        match field {
            Field::MasterCal => cal.master_cal_ppm = signed(raw),
            Field::LsbCarrier => cal.lsb_carrier_hz = raw,
            Field::UsbCarrier => cal.usb_carrier_hz = raw,
            Field::Sidetone => cal.sidetone_hz = raw,
            Field::VfoA => self.vfo_a.frequency = Frequency::saturating_from_hz(raw),
            Field::VfoB => self.vfo_b.frequency = Frequency::saturating_from_hz(raw),
            Field::CwSidetone => cal.cw_sidetone_hz = raw,
            Field::CwSpeed => cal.cw_speed_wpm = byte,
            Field::FirstIfCal => cal.first_if_hz = (raw != FIRST_IF_UNSET).then_some(raw),
            Field::VfoAMode => self.vfo_a.sideband = Sideband::from_persisted(byte),
            Field::VfoBMode => self.vfo_b.sideband = Sideband::from_persisted(byte),
            Field::CwKeyType => {
                cal.cw_key_type = KeyType::from_persisted(byte).unwrap_or(cal.cw_key_type);
            }
        }
    }

    /// Encode every field into a full image
    pub fn encode(&self, image: &mut [u8; IMAGE_LEN]) {
        for spec in &LAYOUT {
            write_raw(image, spec, self.raw(spec.field));
        }
    }

    /// Decode a stored image
    ///
    /// A blank image (all erased or all zero) yields the defaults. Otherwise each field is
    /// checked on its own and replaced by its default when unusable, so the
    /// result is always a complete, valid state.
    #[must_use]
    pub fn decode(image: &[u8; IMAGE_LEN]) -> Decoded {
        let defaults = Self::default();
        if is_blank(image) {
            return Decoded {
                state: defaults,
                defaulted: u16::MAX >> (16 - Field::ALL.len()),
            };
        }

        let mut state = defaults;
        let mut defaulted = 0u16;
        for spec in &LAYOUT {
            let raw = read_raw(image, spec);
            if spec.field.accepts(raw) {
                state.set_raw(spec.field, raw);
            } else {
                defaulted |= 1 << spec.field as u16;
            }
        }
        Decoded { state, defaulted }
    }
}

impl CalibrationSet {
    /// Raw stored value of a calibration field
    #[must_use]
    pub fn raw(&self, field: Field) -> u32 {
        PersistedState {
            calibration: *self,
            ..PersistedState::default()
        }
        .raw(field)
    }
}
