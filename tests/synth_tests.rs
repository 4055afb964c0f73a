//! Tests for the I2C peripheral drivers
//!
//! `Si5351A` register traffic, the 24Cxx EEPROM and the synthesizer adapter,
//! all against in-memory buses.
//!
//! Run with: cargo test --test synth_tests

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};
use ubitx_firmware::calibration::schema::{COMMIT_OFFSET, IMAGE_LEN, JOURNAL_OFFSET};
use ubitx_firmware::calibration::{CalibrationSet, CalibrationStore, NvStore};
use ubitx_firmware::drivers::eeprom::{EepromError, I2cEeprom};
use ubitx_firmware::drivers::si5351::{CrystalLoad, DriveStrength, Error, Si5351};
use ubitx_firmware::drivers::synth::{apply_plan, ClockIndex, ClockSynth, FakeSynth};
use ubitx_firmware::radio::plan::compute_plan;
use ubitx_firmware::radio::state::Radio;
use ubitx_firmware::types::{Frequency, KeyType, Sideband};

// ============================================================================
// Mock Buses
// ============================================================================

/// Records every write; reads return zero (device ready)
#[derive(Default)]
struct RegisterBus {
    writes: Vec<(u8, Vec<u8>)>,
    failing: bool,
}

impl RegisterBus {
    /// Last value written to a single register
    fn last(&self, reg: u8) -> Option<u8> {
        self.writes
            .iter()
            .rev()
            .find(|(_, bytes)| bytes.len() == 2 && bytes[0] == reg)
            .map(|(_, bytes)| bytes[1])
    }

    /// Last block written starting at a register
    fn block(&self, reg: u8) -> Option<&[u8]> {
        self.writes
            .iter()
            .rev()
            .find(|(_, bytes)| bytes.len() == 9 && bytes[0] == reg)
            .map(|(_, bytes)| &bytes[1..])
    }
}

impl ErrorType for RegisterBus {
    type Error = ErrorKind;
}

impl I2c for RegisterBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.failing {
            return Err(ErrorKind::Other);
        }
        for op in operations {
            match op {
                Operation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
                Operation::Read(buf) => buf.fill(0),
            }
        }
        Ok(())
    }
}

/// 1 KiB 24C08 with one device address per 256-byte block
struct EepromBus {
    memory: [u8; 1024],
    pointer: usize,
    frames: Vec<(u8, u8, usize)>,
}

impl EepromBus {
    fn new() -> Self {
        Self {
            memory: [0xFF; 1024],
            pointer: 0,
            frames: Vec::new(),
        }
    }
}

impl ErrorType for EepromBus {
    type Error = ErrorKind;
}

impl I2c for EepromBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address & 0xF8 != 0x50 {
            return Err(ErrorKind::Other);
        }
        let block = usize::from(address & 0x07) * 256;
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    self.pointer = block + usize::from(bytes[0]);
                    let data = &bytes[1..];
                    self.frames.push((address, bytes[0], data.len()));
                    self.memory[self.pointer..self.pointer + data.len()].copy_from_slice(data);
                }
                Operation::Read(buf) => {
                    buf.copy_from_slice(&self.memory[self.pointer..self.pointer + buf.len()]);
                    self.pointer += buf.len();
                }
            }
        }
        Ok(())
    }
}

/// Sums requested delays
#[derive(Default)]
struct CountingDelay {
    total_ns: u64,
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

fn synth() -> Si5351<RegisterBus> {
    Si5351::new(RegisterBus::default()).unwrap()
}

// ============================================================================
// Si5351 Tests
// ============================================================================

#[test]
fn pll_runs_at_875_mhz() {
    assert_eq!(synth().vco_hz(), 875_000_000);
}

#[test]
fn out_of_range_pll_is_rejected() {
    let result = Si5351::with_reference(RegisterBus::default(), 25_000_000, 40);
    assert!(matches!(result, Err(Error::InvalidPll)));
}

#[test]
fn init_sequence() {
    let mut si = synth();
    si.init(CrystalLoad::Load8pF).unwrap();
    let bus = si.release();

    assert!(bus.writes.iter().all(|(addr, _)| *addr == 0x60));
    assert_eq!(bus.writes[0].1, vec![0u8]); // status read
    assert_eq!(bus.writes[1].1, vec![3, 0xFF]);
    assert_eq!(bus.writes[2].1, vec![183, 0x92]);
    for (i, reg) in (16u8..=18).enumerate() {
        assert_eq!(bus.writes[3 + i].1, vec![reg, 0x80]);
    }
    assert_eq!(
        bus.block(26).unwrap(),
        &[0x00, 0x01, 0x00, 0x0F, 0x80, 0x00, 0x00, 0x00]
    );
    assert_eq!(bus.last(177), Some(0x20));
}

#[test]
fn integer_divide_sets_int_mode() {
    let mut si = synth();
    assert_eq!(si.set_frequency(ClockIndex::Clk0, 25_000_000), Ok(25_000_000));
    let bus = si.release();

    // 875 / 25 = 35
    assert_eq!(
        bus.block(42).unwrap(),
        &[0x00, 0x01, 0x00, 0x0F, 0x80, 0x00, 0x00, 0x00]
    );
    assert_eq!(bus.last(16), Some(0x40 | 0x0C | 0x03));
}

#[test]
fn fractional_divide_uses_full_denominator() {
    let mut si = synth();
    si.set_frequency(ClockIndex::Clk1, 59_200_000).unwrap();
    let bus = si.release();

    let block = bus.block(50).unwrap();
    // P3 = 1_048_575 = 0xFFFFF
    assert_eq!(block[0], 0xFF);
    assert_eq!(block[1], 0xFF);
    assert_eq!(block[5] & 0xF0, 0xF0);
    assert_eq!(bus.last(17), Some(0x0C | 0x03));
}

#[test]
fn every_plan_output_lands_within_a_few_hz() {
    let cal = CalibrationSet::DEFAULT;
    let mut si = synth();
    for hz in [100_000, 3_573_000, 14_200_000, 30_000_000] {
        let dial = Frequency::from_hz(hz).unwrap();
        let plan = compute_plan(dial, Sideband::Usb, &cal, 45_000_000);
        for clock in ClockIndex::ALL {
            let target = plan.clock_hz(clock);
            let actual = si.set_frequency(clock, target).unwrap();
            assert!(actual.abs_diff(target) <= 4, "{clock:?} {target} -> {actual}");
        }
    }
}

#[test]
fn drive_strength_goes_in_control_register() {
    let mut si = synth();
    si.set_drive(DriveStrength::Drive2mA);
    si.set_frequency(ClockIndex::Clk2, 25_000_000).unwrap();
    assert_eq!(si.release().last(18), Some(0x4C));
}

#[test]
fn output_gate_register() {
    let mut si = synth();
    si.enable_outputs(true).unwrap();
    assert_eq!(si.release().last(3), Some(0xF8));

    let mut si = synth();
    si.enable_outputs(false).unwrap();
    assert_eq!(si.release().last(3), Some(0xFF));
}

#[test]
fn unreachable_frequency_is_an_error() {
    let mut si = synth();
    assert_eq!(
        si.set_frequency(ClockIndex::Clk0, 300_000_000),
        Err(Error::OutOfRange {
            clock: ClockIndex::Clk0,
            hz: 300_000_000,
        })
    );
    assert!(si.release().writes.is_empty());
}

#[test]
fn clock_synth_faults_are_kept() {
    let mut si = synth();
    si.set_clock_frequency(ClockIndex::Clk1, 1);
    assert_eq!(
        si.take_fault(),
        Some(Error::OutOfRange {
            clock: ClockIndex::Clk1,
            hz: 1,
        })
    );
    assert_eq!(si.take_fault(), None);

    let mut si = Si5351::new(RegisterBus {
        failing: true,
        ..RegisterBus::default()
    })
    .unwrap();
    si.set_outputs_enabled(true);
    assert_eq!(si.take_fault(), Some(Error::I2c(ErrorKind::Other)));
}

#[test]
fn radio_drives_the_chip() {
    let radio = Radio::start(synth(), ubitx_firmware::calibration::MemoryStore::new());
    let plan = *radio.plan();
    let (mut si, _) = radio.release();

    assert_eq!(si.take_fault(), None);
    let bus = si.release();
    assert_eq!(bus.last(3), Some(0xF8));
    for clock in ClockIndex::ALL {
        let reg = 42 + 8 * u8::try_from(clock.index()).unwrap();
        assert!(bus.block(reg).is_some(), "{clock:?} not programmed");
    }
    assert_eq!(plan.osc1_hz, 56_996_500);
}

// ============================================================================
// Synthesizer Adapter Tests
// ============================================================================

#[test]
fn plan_maps_onto_clocks() {
    let plan = compute_plan(
        Frequency::from_hz(14_200_000).unwrap(),
        Sideband::Usb,
        &CalibrationSet::DEFAULT,
        45_000_000,
    );
    let mut fake = FakeSynth::new();
    apply_plan(&mut fake, &plan);

    assert_eq!(fake.frequency(ClockIndex::Clk0), Some(11_995_000));
    assert_eq!(fake.frequency(ClockIndex::Clk1), Some(59_200_000));
    assert_eq!(fake.frequency(ClockIndex::Clk2), Some(56_995_000));
    assert_eq!(fake.writes(), 3);
    assert!(!fake.outputs_enabled());
}

#[test]
fn clock_index_round_trip() {
    for clock in ClockIndex::ALL {
        assert_eq!(ClockIndex::from_index(clock.index()), Some(clock));
    }
    assert_eq!(ClockIndex::from_index(3), None);
}

// ============================================================================
// EEPROM Tests
// ============================================================================

#[test]
fn eeprom_writes_are_split_into_pages() {
    let mut eeprom = I2cEeprom::new(EepromBus::new(), CountingDelay::default());
    let data: Vec<u8> = (0..20).collect();
    eeprom.write(250, &data).unwrap();
    let (bus, delay) = eeprom.release();

    assert_eq!(bus.frames, vec![(0x50, 250, 6), (0x51, 0, 14)]);
    assert_eq!(&bus.memory[250..270], data.as_slice());
    assert_eq!(delay.total_ns, 2 * 5_000_000);
}

#[test]
fn eeprom_reads_cross_blocks() {
    let mut bus = EepromBus::new();
    for (i, byte) in bus.memory.iter_mut().enumerate() {
        *byte = (i % 251) as u8;
    }
    let mut eeprom = I2cEeprom::new(bus, CountingDelay::default());
    let mut buf = [0u8; 40];
    eeprom.read(500, &mut buf).unwrap();

    let expected: Vec<u8> = (500..540).map(|i| (i % 251) as u8).collect();
    assert_eq!(buf.as_slice(), expected.as_slice());
    let (bus, delay) = eeprom.release();
    assert_eq!(bus.frames, vec![(0x51, 244, 0), (0x52, 0, 0)]);
    assert_eq!(delay.total_ns, 0);
}

#[test]
fn eeprom_rejects_access_past_the_end() {
    let mut eeprom = I2cEeprom::new(EepromBus::new(), CountingDelay::default());
    assert_eq!(eeprom.write(1_020, &[0; 8]), Err(EepromError::OutOfBounds));
    let mut buf = [0u8; 2];
    assert_eq!(eeprom.read(1_023, &mut buf), Err(EepromError::OutOfBounds));
    assert!(eeprom.release().0.frames.is_empty());
}

#[test]
fn calibration_round_trips_through_eeprom() {
    let cal = CalibrationSet {
        master_cal_ppm: 33,
        lsb_carrier_hz: 32_993_000,
        cw_key_type: KeyType::IambicB,
        first_if_hz: Some(45_002_000),
        ..CalibrationSet::DEFAULT
    };
    let eeprom = I2cEeprom::new(EepromBus::new(), CountingDelay::default());
    let mut store = CalibrationStore::new(eeprom);
    store.save(&cal).unwrap();
    assert_eq!(store.load(), cal);

    let (bus, _) = store.into_inner().release();
    assert_eq!(&bus.memory[0..4], &33i32.to_le_bytes());
    assert_eq!(&bus.memory[252..256], &45_002_000u32.to_le_bytes());
    assert_eq!(bus.memory[358], 2);
    // Between the image and the journal nothing is touched
    assert!(bus.memory[IMAGE_LEN..JOURNAL_OFFSET].iter().all(|&b| b == 0xFF));
    assert_eq!(
        &bus.memory[JOURNAL_OFFSET..JOURNAL_OFFSET + IMAGE_LEN],
        &bus.memory[..IMAGE_LEN]
    );
    // The commit is cleared once the primary copy is written
    assert!(bus.memory[COMMIT_OFFSET..].iter().all(|&b| b == 0xFF));
}
