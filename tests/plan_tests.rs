//! Tests for the frequency plan
//!
//! Oscillator derivation, master calibration scaling and sideband sense.
//!
//! Run with: cargo test --test plan_tests

use ubitx_firmware::calibration::CalibrationSet;
use ubitx_firmware::config::{DEFAULT_FIRST_IF_HZ, SECOND_OSC_LSB, SECOND_OSC_USB};
use ubitx_firmware::radio::plan::{apply_master_cal, compute_plan};
use ubitx_firmware::types::{Frequency, Sideband};

fn expected(hz: u64, ppm: i32) -> f64 {
    (hz as f64 * (1.0 + f64::from(ppm) * 1e-6)).round()
}

fn cal_with_ppm(ppm: i32) -> CalibrationSet {
    CalibrationSet {
        master_cal_ppm: ppm,
        ..CalibrationSet::DEFAULT
    }
}

// ============================================================================
// Reference Points
// ============================================================================

#[test]
fn plan_20m_usb_default_calibration() {
    let f = Frequency::from_hz(14_200_000).unwrap();
    let plan = compute_plan(f, Sideband::Usb, &CalibrationSet::DEFAULT, DEFAULT_FIRST_IF_HZ);

    assert_eq!(plan.osc1_hz, 59_200_000);
    assert_eq!(plan.osc2_hz, 56_995_000);
    assert_eq!(plan.bfo_hz, 11_995_000);
}

#[test]
fn plan_40m_lsb_default_calibration() {
    let f = Frequency::from_hz(7_100_000).unwrap();
    let plan = compute_plan(f, Sideband::Lsb, &CalibrationSet::DEFAULT, DEFAULT_FIRST_IF_HZ);

    assert_eq!(plan.osc1_hz, 52_100_000);
    assert_eq!(plan.osc2_hz, SECOND_OSC_LSB);
    assert_eq!(plan.bfo_hz, 12_005_000);
}

#[test]
fn plan_at_tuning_limits() {
    let cal = CalibrationSet::DEFAULT;
    let low = compute_plan(Frequency::MIN, Sideband::Usb, &cal, DEFAULT_FIRST_IF_HZ);
    let high = compute_plan(Frequency::MAX, Sideband::Usb, &cal, DEFAULT_FIRST_IF_HZ);

    assert_eq!(low.osc1_hz, 45_100_000);
    assert_eq!(high.osc1_hz, 75_000_000);
}

// ============================================================================
// Calibration Scaling
// ============================================================================

#[test]
fn osc1_tracks_master_calibration_across_the_band() {
    for ppm in [-1_000, -37, -1, 0, 1, 250, 1_000] {
        let cal = cal_with_ppm(ppm);
        let mut hz = Frequency::MIN_HZ;
        while hz <= Frequency::MAX_HZ {
            let f = Frequency::from_hz(hz).unwrap();
            let plan = compute_plan(f, Sideband::Usb, &cal, DEFAULT_FIRST_IF_HZ);
            let want = expected(u64::from(hz) + u64::from(DEFAULT_FIRST_IF_HZ), ppm);
            assert!(
                (f64::from(plan.osc1_hz) - want).abs() <= 1.0,
                "{hz} Hz at {ppm} ppm: got {}, want {want}",
                plan.osc1_hz
            );
            hz += 1_234_567;
        }
    }
}

#[test]
fn osc2_is_the_scaled_carrier() {
    for ppm in [-500, 0, 42, 999] {
        let cal = cal_with_ppm(ppm);
        let f = Frequency::from_hz(3_573_000).unwrap();
        let usb = compute_plan(f, Sideband::Usb, &cal, DEFAULT_FIRST_IF_HZ);
        let lsb = compute_plan(f, Sideband::Lsb, &cal, DEFAULT_FIRST_IF_HZ);

        assert!((f64::from(usb.osc2_hz) - expected(u64::from(SECOND_OSC_USB), ppm)).abs() <= 1.0);
        assert!((f64::from(lsb.osc2_hz) - expected(u64::from(SECOND_OSC_LSB), ppm)).abs() <= 1.0);
    }
}

#[test]
fn trimmed_carriers_are_used() {
    let cal = CalibrationSet {
        usb_carrier_hz: 56_996_200,
        lsb_carrier_hz: 32_994_100,
        ..CalibrationSet::DEFAULT
    };
    let f = Frequency::from_hz(10_136_000).unwrap();

    assert_eq!(compute_plan(f, Sideband::Usb, &cal, DEFAULT_FIRST_IF_HZ).osc2_hz, 56_996_200);
    assert_eq!(compute_plan(f, Sideband::Lsb, &cal, DEFAULT_FIRST_IF_HZ).osc2_hz, 32_994_100);
}

#[test]
fn measured_first_if_moves_osc1_and_bfo() {
    let cal = CalibrationSet {
        first_if_hz: Some(44_997_500),
        ..CalibrationSet::DEFAULT
    };
    let f = Frequency::from_hz(14_200_000).unwrap();
    let plan = compute_plan(f, Sideband::Usb, &cal, DEFAULT_FIRST_IF_HZ);

    assert_eq!(plan.osc1_hz, 59_197_500);
    assert_eq!(plan.osc2_hz, 56_995_000);
    // 56_995_000 - 44_997_500
    assert_eq!(plan.bfo_hz, 11_997_500);
}

#[test]
fn master_cal_applies_to_bfo_too() {
    let cal = cal_with_ppm(100);
    let f = Frequency::from_hz(14_200_000).unwrap();
    let plan = compute_plan(f, Sideband::Usb, &cal, DEFAULT_FIRST_IF_HZ);

    // 11_995_000 × 1.0001 = 11_996_199.5
    assert_eq!(plan.bfo_hz, 11_996_200);
}

#[test]
fn apply_master_cal_reference_values() {
    assert_eq!(apply_master_cal(10_000_000, 0), 10_000_000);
    assert_eq!(apply_master_cal(10_000_000, 10), 10_000_100);
    assert_eq!(apply_master_cal(10_000_000, -10), 9_999_900);
}

// ============================================================================
// Sideband Behaviour
// ============================================================================

#[test]
fn sideband_switch_only_moves_second_oscillator() {
    let cal = cal_with_ppm(-12);
    for hz in [100_000, 1_840_000, 14_074_000, 30_000_000] {
        let f = Frequency::from_hz(hz).unwrap();
        let usb = compute_plan(f, Sideband::Usb, &cal, DEFAULT_FIRST_IF_HZ);
        let lsb = compute_plan(f, Sideband::Lsb, &cal, DEFAULT_FIRST_IF_HZ);

        assert_eq!(usb.osc1_hz, lsb.osc1_hz);
        assert_ne!(usb.osc2_hz, lsb.osc2_hz);
    }
}

#[test]
fn default_carriers_present_usb_to_the_filter() {
    let f = Frequency::from_hz(21_300_000).unwrap();
    for sideband in [Sideband::Usb, Sideband::Lsb] {
        let plan = compute_plan(f, sideband, &CalibrationSet::DEFAULT, DEFAULT_FIRST_IF_HZ);
        assert_eq!(plan.bfo_sideband, Sideband::Usb);
    }
}

#[test]
fn carrier_below_first_if_keeps_single_inversion() {
    // With a carrier below the IF only the first mix inverts
    let f = Frequency::from_hz(7_000_000).unwrap();
    let plan = compute_plan(f, Sideband::Lsb, &CalibrationSet::DEFAULT, DEFAULT_FIRST_IF_HZ);
    assert_eq!(plan.bfo_sideband, Sideband::Lsb.flipped());
}

#[test]
fn plan_is_deterministic() {
    let f = Frequency::from_hz(18_100_000).unwrap();
    let cal = cal_with_ppm(7);
    let a = compute_plan(f, Sideband::Usb, &cal, DEFAULT_FIRST_IF_HZ);
    let b = compute_plan(f, Sideband::Usb, &cal, DEFAULT_FIRST_IF_HZ);
    assert_eq!(a, b);
}
