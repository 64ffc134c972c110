//! Psychrometric state functions for moist air, used by the ventilation
//! latent load calculation. Correlations and rounding (humidity ratio to 4
//! digits, enthalpy to 1) follow the published calculation sheet exactly.

use crate::core::units::{
    round_half_up, KELVIN_OFFSET, LATENT_HEAT_OF_VAPORISATION_KJ_PER_KG,
    SPECIFIC_HEAT_AIR_KJ_PER_KG_K, STANDARD_PRESSURE_KPA,
};
use serde::Serialize;

const MOLECULAR_WEIGHT_RATIO: f64 = 18.0153 / 28.9645;

/// Saturation vapour pressure of water in kPa, Wexler-style correlation with
/// separate branches over ice and over liquid water.
pub fn saturation_pressure_kpa(temp_c: f64) -> f64 {
    let t = temp_c + KELVIN_OFFSET;
    let pascals = if t <= KELVIN_OFFSET {
        (-0.56745359e4 / t + 0.63925247e1 - 0.9677843e-2 * t + 0.62215701e-6 * t.powi(2)
            + 0.20747825e-8 * t.powi(3)
            - 0.9484024e-12 * t.powi(4)
            + 0.41635019e1 * t.ln())
        .exp()
    } else {
        (-0.58002206e4 / t + 0.13914993e1 - 0.48640239e-1 * t + 0.41764768e-4 * t.powi(2)
            - 0.14452093e-7 * t.powi(3)
            + 0.65459673e1 * t.ln())
        .exp()
    };
    pascals / 1000.0
}

/// Humidity ratio in kg of water vapour per kg of dry air, rounded to 4
/// decimal digits.
pub fn humidity_ratio_kg_per_kgda(temp_c: f64, rh_pct: f64) -> f64 {
    let partial = saturation_pressure_kpa(temp_c) * rh_pct / 100.0;
    round_half_up(
        MOLECULAR_WEIGHT_RATIO * (partial / (STANDARD_PRESSURE_KPA - partial)),
        4,
    )
}

/// Specific enthalpy of moist air in kJ per kg of dry air, rounded to 1
/// decimal digit.
pub fn specific_enthalpy_kj_per_kgda(temp_c: f64, humidity_ratio: f64) -> f64 {
    round_half_up(
        SPECIFIC_HEAT_AIR_KJ_PER_KG_K * temp_c
            + (1.86 * temp_c + LATENT_HEAT_OF_VAPORISATION_KJ_PER_KG) * humidity_ratio,
        1,
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MoistAirState {
    pub temp_c: f64,
    pub rh_pct: f64,
    pub saturation_pressure_kpa: f64,
    pub humidity_ratio: f64,
    pub enthalpy_kj_per_kgda: f64,
}

pub fn moist_air_state(temp_c: f64, rh_pct: f64) -> MoistAirState {
    let saturation_pressure = saturation_pressure_kpa(temp_c);
    let humidity_ratio = humidity_ratio_kg_per_kgda(temp_c, rh_pct);
    MoistAirState {
        temp_c,
        rh_pct,
        saturation_pressure_kpa: saturation_pressure,
        humidity_ratio,
        enthalpy_kj_per_kgda: specific_enthalpy_kj_per_kgda(temp_c, humidity_ratio),
    }
}
