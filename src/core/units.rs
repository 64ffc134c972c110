use serde::{Deserialize, Serialize};

pub const SPECIFIC_HEAT_AIR_KJ_PER_KG_K: f64 = 1.006;
pub const LATENT_HEAT_OF_VAPORISATION_KJ_PER_KG: f64 = 2501.0;
pub const KELVIN_OFFSET: f64 = 273.15;
pub const STANDARD_PRESSURE_KPA: f64 = 101.325;
/// Divisor converting a volume flow in m³/h to a mass-flow-equivalent in L/s.
pub const M3_PER_HOUR_PER_L_PER_S: f64 = 3.6;

/// The four daily hours at which cooling loads are evaluated, as the string
/// keys used throughout the reference tables.
pub const COOLING_HOUR_KEYS: [&str; 4] = ["9", "12", "14", "16"];

/// Decimal-exact round-half-up with ties away from zero.
///
/// The methodology this engine reproduces was defined in terms of decimal
/// arithmetic, so rounding operates on the shortest decimal representation of
/// the value rather than on its binary expansion - `round_half_up(2.675, 2)`
/// is 2.68, where `f64::round` style arithmetic would see 2.67499…
pub fn round_half_up(value: f64, digits: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let repr = format!("{}", value.abs());
    let (int_part, frac_part) = match repr.split_once('.') {
        Some((int, frac)) => (int, frac),
        None => (repr.as_str(), ""),
    };
    if frac_part.len() <= digits as usize {
        return value;
    }

    let kept_frac = &frac_part[..digits as usize];
    let deciding_digit = frac_part.as_bytes()[digits as usize] - b'0';
    let mut digit_bytes: Vec<u8> = int_part.bytes().chain(kept_frac.bytes()).collect();
    if deciding_digit >= 5 {
        increment_decimal(&mut digit_bytes);
    }

    let int_len = digit_bytes.len() - digits as usize;
    let mut rebuilt = String::from_utf8(digit_bytes).expect("digits are ASCII");
    if digits > 0 {
        rebuilt.insert(int_len, '.');
    }
    let magnitude: f64 = rebuilt.parse().expect("rebuilt decimal is parseable");
    magnitude.copysign(value)
}

// Adds one unit in the last place of a decimal digit string, carrying left.
fn increment_decimal(digit_bytes: &mut Vec<u8>) {
    for i in (0..digit_bytes.len()).rev() {
        if digit_bytes[i] == b'9' {
            digit_bytes[i] = b'0';
        } else {
            digit_bytes[i] += 1;
            return;
        }
    }
    digit_bytes.insert(0, b'1');
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    #[default]
    Round,
    Ceil,
}

/// Round a value to a multiple of `step`, either to the nearest multiple
/// (half-up) or upwards to the next one. A non-positive step is a passthrough.
pub fn round_by_mode(value: f64, mode: RoundingMode, step: f64) -> f64 {
    if step <= 0.0 {
        return value;
    }
    let quotient = value / step;
    let multiples = match mode {
        RoundingMode::Round => round_half_up(quotient, 0),
        // snap the quotient first so binary noise in the division cannot bump
        // an exact multiple up a whole step
        RoundingMode::Ceil => round_half_up(quotient, 9).ceil(),
    };
    multiples * step
}
