//! Si5351 Frequency Calculation
//!
//! Fractional-N PLL and multisynth divider arithmetic. Pure integer code,
//! testable on the host.
//!
//! # Theory of Operation
//!
//! The Si5351 uses a two-stage frequency synthesis:
//! 1. PLL stage: FVCO = FXTAL × (a + b/c) where 15 ≤ a ≤ 90
//! 2. Multisynth stage: FOUT = FVCO / (d + e/f) / R where 4 ≤ d ≤ 1800
//!
//! Here the PLL runs at a fixed integer multiple of the crystal and every
//! output gets its own fractional multisynth. Targets below VCO/1800 are
//! reached through the output R divider.

/// PLL parameters for frequency calculation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PllParams {
    /// Integer part (15-90)
    pub a: u32,
    /// Numerator (0 to c-1)
    pub b: u32,
    /// Denominator (1-1048575)
    pub c: u32,
}

impl PllParams {
    /// Minimum PLL multiplier
    pub const MIN_A: u32 = 15;
    /// Maximum PLL multiplier
    pub const MAX_A: u32 = 90;
    /// Maximum denominator (20 bits)
    pub const MAX_C: u32 = 1_048_575;

    /// Create integer PLL params (b=0, c=1)
    #[must_use]
    pub const fn integer(a: u32) -> Self {
        Self { a, b: 0, c: 1 }
    }

    /// Calculate the VCO frequency given crystal frequency
    #[must_use]
    pub fn vco_frequency(&self, xtal_hz: u64) -> u64 {
        // FVCO = (FXTAL × a × c + FXTAL × b) / c
        (xtal_hz * u64::from(self.a) * u64::from(self.c) + xtal_hz * u64::from(self.b))
            / u64::from(self.c)
    }

    /// Validate parameters are in range
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.a >= Self::MIN_A
            && self.a <= Self::MAX_A
            && self.c >= 1
            && self.c <= Self::MAX_C
            && self.b < self.c
    }

    /// Calculate P1, P2, P3 register values for Si5351
    #[must_use]
    pub const fn to_registers(&self) -> (u32, u32, u32) {
        pack(self.a, self.b, self.c)
    }
}

/// Multisynth divider parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MsParams {
    /// Integer part (4, 6-1800)
    pub a: u32,
    /// Numerator
    pub b: u32,
    /// Denominator
    pub c: u32,
    /// R divider power of 2 (0-7 for 1, 2, 4, 8, 16, 32, 64, 128)
    pub r_div: u8,
}

impl MsParams {
    /// Minimum integer divisor
    pub const MIN_A: u32 = 4;
    /// Maximum integer divisor
    pub const MAX_A: u32 = 1800;
    /// Maximum denominator (20 bits)
    pub const MAX_C: u32 = 1_048_575;
    /// Largest R divider exponent
    pub const MAX_R_DIV: u8 = 7;

    /// Create integer multisynth params (b=0, c=1)
    #[must_use]
    pub const fn integer(a: u32) -> Self {
        Self {
            a,
            b: 0,
            c: 1,
            r_div: 0,
        }
    }

    /// Calculate output frequency given VCO frequency
    #[must_use]
    pub fn output_frequency(&self, vco_hz: u64) -> u64 {
        // FOUT = FVCO × c / (a × c + b) / R
        let divisor = u64::from(self.a) * u64::from(self.c) + u64::from(self.b);
        let r = 1u64 << self.r_div;
        (vco_hz * u64::from(self.c)) / divisor / r
    }

    /// Validate parameters are in range
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        // a=5 is never allowed and a=4 only as an integer divide
        let a_valid = (self.a == 4 && self.b == 0) || (self.a >= 6 && self.a <= Self::MAX_A);
        let c_valid = self.c >= 1 && self.c <= Self::MAX_C;
        let b_valid = self.b < self.c;
        let r_valid = self.r_div <= Self::MAX_R_DIV;
        a_valid && c_valid && b_valid && r_valid
    }

    /// Whether the divide is a plain integer
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        self.b == 0
    }

    /// Calculate P1, P2, P3 register values
    #[must_use]
    pub const fn to_registers(&self) -> (u32, u32, u32) {
        pack(self.a, self.b, self.c)
    }
}

/// Datasheet encoding of `a + b/c`
#[allow(clippy::cast_possible_truncation)]
const fn pack(a: u32, b: u32, c: u32) -> (u32, u32, u32) {
    // P1 = 128 × a + floor(128 × b/c) - 512
    // P2 = 128 × b - c × floor(128 × b/c)
    // P3 = c
    // b < 2^20, so the 64-bit products cannot overflow and the results fit
    // the 18/20-bit register fields.
    let floor_128b_c = ((128 * b as u64) / c as u64) as u32;
    let p1 = 128 * a + floor_128b_c - 512;
    let p2 = ((128 * b as u64) - (c as u64) * (floor_128b_c as u64)) as u32;
    (p1, p2, c)
}

/// Minimum VCO frequency (600 MHz)
pub const VCO_MIN_HZ: u64 = 600_000_000;
/// Maximum VCO frequency (900 MHz)
pub const VCO_MAX_HZ: u64 = 900_000_000;

/// Default crystal frequency (25 MHz)
pub const DEFAULT_XTAL_HZ: u64 = 25_000_000;

/// Integer PLL for a crystal and multiplier, if the VCO lands in range
#[must_use]
pub fn fixed_pll(xtal_hz: u64, mult: u32) -> Option<PllParams> {
    let pll = PllParams::integer(mult);
    let vco = pll.vco_frequency(xtal_hz);
    (pll.is_valid() && (VCO_MIN_HZ..=VCO_MAX_HZ).contains(&vco)).then_some(pll)
}

/// Multisynth settings producing `target_hz` from a fixed VCO
///
/// The R divider is raised until the divide ratio fits the multisynth. The
/// fraction uses the full 20-bit denominator, rounded to nearest.
#[must_use]
pub fn calculate_multisynth(vco_hz: u64, target_hz: u32) -> Option<MsParams> {
    if target_hz == 0 {
        return None;
    }

    let mut r_div = 0u8;
    let mut divided = u64::from(target_hz);
    while vco_hz > divided * u64::from(MsParams::MAX_A) {
        if r_div == MsParams::MAX_R_DIV {
            return None;
        }
        r_div += 1;
        divided = u64::from(target_hz) << r_div;
    }

    let c = u64::from(MsParams::MAX_C);
    let mut a = vco_hz / divided;
    let remainder = vco_hz % divided;
    let mut b = (remainder * c + divided / 2) / divided;
    if b == c {
        a += 1;
        b = 0;
    }

    let (a, b) = (u32::try_from(a).ok()?, u32::try_from(b).ok()?);
    let ms = if b == 0 {
        MsParams {
            r_div,
            ..MsParams::integer(a)
        }
    } else {
        MsParams {
            a,
            b,
            c: MsParams::MAX_C,
            r_div,
        }
    };
    ms.is_valid().then_some(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VCO: u64 = 875_000_000;

    #[test]
    fn pll_params_integer() {
        let pll = PllParams::integer(36);
        assert_eq!(pll.a, 36);
        assert_eq!(pll.b, 0);
        assert_eq!(pll.c, 1);
        assert!(pll.is_valid());

        // 25 MHz × 36 = 900 MHz
        assert_eq!(pll.vco_frequency(25_000_000), 900_000_000);
    }

    #[test]
    fn pll_params_validation() {
        assert!(!PllParams::integer(14).is_valid());
        assert!(!PllParams::integer(91).is_valid());
        assert!(PllParams::integer(15).is_valid());
        assert!(PllParams::integer(90).is_valid());
    }

    #[test]
    fn fixed_pll_rejects_out_of_range_vco() {
        assert_eq!(fixed_pll(DEFAULT_XTAL_HZ, 35), Some(PllParams::integer(35)));
        // 25 MHz × 20 = 500 MHz, below the VCO range
        assert_eq!(fixed_pll(DEFAULT_XTAL_HZ, 20), None);
    }

    #[test]
    fn pll_params_fractional_vco() {
        let pll = PllParams { a: 35, b: 1, c: 2 };
        assert!(pll.is_valid());

        // 25 MHz × 35.5 = 887.5 MHz
        assert_eq!(pll.vco_frequency(25_000_000), 887_500_000);
    }

    #[test]
    fn ms_params_with_r_divider() {
        let ms = MsParams {
            r_div: 3, // R = 8
            ..MsParams::integer(100)
        };

        // 900 MHz / 100 / 8 = 1.125 MHz
        assert_eq!(ms.output_frequency(900_000_000), 1_125_000);
    }

    #[test]
    fn ms_params_validation() {
        assert!(!MsParams::integer(3).is_valid());
        assert!(MsParams::integer(4).is_valid());
        let fractional_four = MsParams {
            b: 1,
            c: 2,
            ..MsParams::integer(4)
        };
        assert!(!fractional_four.is_valid());
        assert!(!MsParams::integer(5).is_valid());
        assert!(MsParams::integer(6).is_valid());
        assert!(!MsParams::integer(1801).is_valid());
    }

    #[test]
    fn integer_ratio_stays_integer() {
        // 875 MHz / 35 = 25 MHz
        let ms = calculate_multisynth(VCO, 25_000_000).unwrap();
        assert_eq!(ms, MsParams::integer(35));
        assert!(ms.is_integer());
    }

    #[test]
    fn first_lo_is_accurate() {
        for target in [45_100_000u32, 59_200_000, 75_000_000] {
            let ms = calculate_multisynth(VCO, target).unwrap();
            assert!(ms.is_valid());
            let actual = ms.output_frequency(VCO);
            assert!(actual.abs_diff(u64::from(target)) <= 4, "{target} -> {actual}");
        }
    }

    #[test]
    fn low_frequency_uses_r_divider() {
        // 875 MHz / 1800 ≈ 486 kHz, anything lower needs R
        let ms = calculate_multisynth(VCO, 100_000).unwrap();
        assert!(ms.r_div > 0);
        assert!(ms.is_valid());
        assert!(ms.output_frequency(VCO).abs_diff(100_000) <= 1);
    }

    #[test]
    fn unreachable_targets() {
        assert_eq!(calculate_multisynth(VCO, 0), None);
        // Needs a divide below 4
        assert_eq!(calculate_multisynth(VCO, 300_000_000), None);
        // Below VCO / 1800 / 128
        assert_eq!(calculate_multisynth(VCO, 1_000), None);
    }

    #[test]
    fn pll_register_values() {
        // P1 = 128×36 - 512 = 4096
        assert_eq!(PllParams::integer(36).to_registers(), (4096, 0, 1));
    }

    #[test]
    fn ms_register_values() {
        // P1 = 128×100 - 512 = 12288
        assert_eq!(MsParams::integer(100).to_registers(), (12288, 0, 1));

        // 100 + 1/2: P1 = 12800 + 64 - 512, P2 = 128 - 2×64 = 0
        let half = MsParams {
            b: 1,
            c: 2,
            ..MsParams::integer(100)
        };
        assert_eq!(half.to_registers(), (12352, 0, 2));
    }
}
