//! Outdoor air and infiltration loads.

use crate::core::load::{preset_override, CalcTrace, LoadGroup, LoadVector, ResolvedLoad, SourceLoad, TraceMode};
use crate::core::psychrometrics::moist_air_state;
use crate::core::reference::{OutdoorDesignRecord, ReferenceRepository};
use crate::core::units::{
    round_by_mode, round_half_up, COOLING_HOUR_KEYS, M3_PER_HOUR_PER_L_PER_S,
    SPECIFIC_HEAT_AIR_KJ_PER_KG_K,
};
use crate::input::{
    InfiltrationMode, Room, StepRounding, VentilationInfiltration, VentilationLatentFormula,
};
use indexmap::IndexMap;
use serde_json::json;

/// Coefficient of the humidity-ratio-driven latent term in the split latent
/// formula variant, in W per (L/s · g/kg).
const HUMIDITY_RATIO_LATENT_COEFF: f64 = 833.0;
const FALLBACK_COOLING_DRYBULB_C: f64 = 34.0;
const FALLBACK_COOLING_RH_PCT: f64 = 50.0;

fn outdoor_temp_series(outdoor: &OutdoorDesignRecord) -> IndexMap<String, f64> {
    let fallback = outdoor
        .cooling_drybulb_c
        .unwrap_or(FALLBACK_COOLING_DRYBULB_C);
    IndexMap::from([
        ("9".to_string(), outdoor.temp_9_c.unwrap_or(fallback)),
        ("12".to_string(), outdoor.temp_12_c.unwrap_or(fallback)),
        ("14".to_string(), outdoor.temp_14_c.unwrap_or(fallback)),
        ("16".to_string(), outdoor.temp_16_c.unwrap_or(fallback)),
    ])
}

fn infiltration_flow(
    vent: &VentilationInfiltration,
    room: &Room,
    references: &ReferenceRepository,
) -> f64 {
    match vent.infiltration_mode {
        InfiltrationMode::None => 0.0,
        InfiltrationMode::Door => {
            let volume = room.volume_m3.or_else(|| {
                room.ceiling_height_m.map(|height| room.area_m2 * height)
            });
            match (vent.air_changes_per_hour, volume) {
                (Some(ach), Some(volume)) => ach * volume,
                _ => 0.0,
            }
        }
        InfiltrationMode::Sash => {
            let (Some(sash_type), Some(airtightness), Some(wind_speed)) = (
                vent.sash_type.as_deref(),
                vent.airtightness.as_deref(),
                vent.wind_speed_ms,
            ) else {
                return 0.0;
            };
            references.lookup_sash_infiltration(sash_type, airtightness, wind_speed)
                * vent.infiltration_area_m2.unwrap_or(0.0)
        }
    }
}

/// Sensible loads follow `1.006 · flow/3.6 · ΔT` per cooling hour and for
/// heating; the latent load follows whichever of the two historical formulas
/// the project policy selects. Total flow is the (optionally step-rounded)
/// outdoor air rate plus door or sash infiltration.
pub fn calc_ventilation_load(
    vent: &VentilationInfiltration,
    room: &Room,
    indoor: &super::IndoorConditions,
    outdoor: &OutdoorDesignRecord,
    references: &ReferenceRepository,
    outdoor_air_rounding: Option<StepRounding>,
    latent_formula: VentilationLatentFormula,
) -> SourceLoad {
    if let Some(preset) = vent.preset_load {
        return preset_override(
            "ventilation",
            "ventilation",
            &vent.id,
            TraceMode::Both,
            preset,
            LoadGroup::External,
        );
    }

    let base_flow = match outdoor_air_rounding {
        Some(rounding) => round_by_mode(vent.outdoor_air_m3h, rounding.mode, rounding.step),
        None => vent.outdoor_air_m3h,
    };
    let infiltration = infiltration_flow(vent, room, references);
    let total_flow = base_flow + infiltration;
    let flow_ls = total_flow / M3_PER_HOUR_PER_L_PER_S;

    let outdoor_temps = outdoor_temp_series(outdoor);
    let mut sensible = IndexMap::new();
    for hour in COOLING_HOUR_KEYS {
        let delta = (outdoor_temps[hour] - indoor.cooling_temp_c).max(0.0);
        sensible.insert(
            hour.to_string(),
            round_half_up(SPECIFIC_HEAT_AIR_KJ_PER_KG_K * flow_ls * delta, 0),
        );
    }

    let indoor_state = moist_air_state(indoor.cooling_temp_c, indoor.cooling_rh_pct);
    let outdoor_state = moist_air_state(
        outdoor.cooling_drybulb_c.unwrap_or(outdoor_temps["14"]),
        outdoor.cooling_rh_pct.unwrap_or(FALLBACK_COOLING_RH_PCT),
    );
    let enthalpy_total = (outdoor_state.enthalpy_kj_per_kgda
        - indoor_state.enthalpy_kj_per_kgda)
        .max(0.0)
        * flow_ls;
    let latent = match latent_formula {
        VentilationLatentFormula::EnthalpyDifference => round_half_up(enthalpy_total, 0),
        VentilationLatentFormula::HumidityRatioSplit => {
            let by_humidity = HUMIDITY_RATIO_LATENT_COEFF
                * flow_ls
                * (outdoor_state.humidity_ratio - indoor_state.humidity_ratio).max(0.0);
            // the enthalpy residual lands in the 14:00 design-hour sensible slot
            let residual = round_half_up((enthalpy_total - by_humidity).max(0.0), 0);
            sensible["14"] += residual;
            round_half_up(by_humidity, 0)
        }
    };

    let heating_delta = (indoor.heating_temp_c - outdoor.heating_drybulb_c.unwrap_or(0.0)).max(0.0);
    let heat_sensible =
        round_half_up(SPECIFIC_HEAT_AIR_KJ_PER_KG_K * flow_ls * heating_delta, 0);

    let load = LoadVector {
        cool_9: sensible["9"],
        cool_12: sensible["12"],
        cool_14: sensible["14"],
        cool_16: sensible["16"],
        cool_latent: latent,
        heat_sensible,
        heat_latent: 0.0,
    };

    let trace = CalcTrace {
        formula_id: "ventilation.outdoor_air".to_string(),
        entity_type: "ventilation".to_string(),
        entity_id: vent.id.clone(),
        mode: TraceMode::Both,
        inputs: IndexMap::from([
            ("base_flow_m3h".to_string(), json!(base_flow)),
            ("infiltration_flow_m3h".to_string(), json!(infiltration)),
            ("total_flow_m3h".to_string(), json!(total_flow)),
            ("indoor_cooling_c".to_string(), json!(indoor.cooling_temp_c)),
            ("indoor_heating_c".to_string(), json!(indoor.heating_temp_c)),
            (
                "air_changes_per_hour".to_string(),
                json!(vent.air_changes_per_hour),
            ),
            ("room_volume_m3".to_string(), json!(room.volume_m3)),
            ("latent_formula".to_string(), json!(latent_formula)),
        ]),
        references: IndexMap::from([(
            "sash_table".to_string(),
            json!("aluminum_sash_infiltration"),
        )]),
        intermediates: IndexMap::from([
            ("outdoor_temp_series".to_string(), json!(outdoor_temps)),
            ("indoor_state".to_string(), json!(indoor_state)),
            ("outdoor_state".to_string(), json!(outdoor_state)),
        ]),
        output: load,
    };

    SourceLoad {
        resolved: ResolvedLoad::Computed(load),
        trace,
        group: LoadGroup::External,
    }
}
