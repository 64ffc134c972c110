//! Solar heat gain through glazed openings.

use crate::core::load::{preset_override, CalcTrace, LoadGroup, LoadVector, ResolvedLoad, SourceLoad, TraceMode};
use crate::core::reference::ReferenceRepository;
use crate::core::units::{round_half_up, COOLING_HOUR_KEYS};
use crate::input::{GlassSpec, Opening};
use indexmap::IndexMap;
use serde_json::json;

// Glass correction saturates at a reference U-value of 6 W/m²K.
const GLASS_FACTOR_REFERENCE_U: f64 = 6.0;

fn opening_area(opening: &Opening) -> f64 {
    if let Some(area) = opening.area_m2 {
        return area;
    }
    match (opening.width_m, opening.height_m) {
        (Some(width), Some(height)) => width * height,
        _ => 0.0,
    }
}

fn glass_factor(glass: Option<&GlassSpec>) -> f64 {
    match glass.and_then(|g| g.u_value_w_m2k) {
        Some(u_value) if u_value > 0.0 => (GLASS_FACTOR_REFERENCE_U / u_value).min(1.0),
        _ => 1.0,
    }
}

/// Per cooling hour the gain is `area · unit gain · SC · (solar area ratio /
/// 100) · glass factor`, with the unit gain from the standard solar gain
/// table unless the opening carries a per-hour override. Openings contribute
/// neither latent nor heating load and always sit in the envelope bucket.
pub fn calc_opening_solar_gain(
    opening: &Opening,
    glasses: &IndexMap<String, GlassSpec>,
    references: &ReferenceRepository,
    region: &str,
) -> SourceLoad {
    if let Some(preset) = opening.preset_load {
        return preset_override(
            "solar",
            "opening",
            &opening.id,
            TraceMode::Cooling,
            preset,
            LoadGroup::External,
        );
    }

    let area = opening_area(opening);
    let orientation = opening.orientation.as_deref().unwrap_or("N");
    let glass = opening.glass_id.as_ref().and_then(|id| glasses.get(id));
    let glass_factor = glass_factor(glass);

    let mut unit_gain_source = "reference.solar";
    let mut cooling = IndexMap::new();
    for hour in COOLING_HOUR_KEYS {
        let unit_gain = match opening
            .solar_gain_override
            .as_ref()
            .and_then(|overrides| overrides.get(hour))
        {
            Some(gain) => {
                unit_gain_source = "override";
                *gain
            }
            None => references.lookup_solar_gain(region, orientation, hour),
        };
        let gain = area
            * unit_gain
            * opening.shading_sc
            * (opening.solar_area_ratio_pct / 100.0)
            * glass_factor;
        cooling.insert(hour.to_string(), round_half_up(gain, 0));
    }

    let load = LoadVector {
        cool_9: cooling["9"],
        cool_12: cooling["12"],
        cool_14: cooling["14"],
        cool_16: cooling["16"],
        cool_latent: 0.0,
        heat_sensible: 0.0,
        heat_latent: 0.0,
    };

    let trace = CalcTrace {
        formula_id: "solar.opening_gain".to_string(),
        entity_type: "opening".to_string(),
        entity_id: opening.id.clone(),
        mode: TraceMode::Cooling,
        inputs: IndexMap::from([
            ("area_m2".to_string(), json!(area)),
            ("orientation".to_string(), json!(orientation)),
            ("shading_sc".to_string(), json!(opening.shading_sc)),
            (
                "solar_area_ratio_pct".to_string(),
                json!(opening.solar_area_ratio_pct),
            ),
            ("glass_factor".to_string(), json!(glass_factor)),
        ]),
        references: IndexMap::from([
            ("solar_table".to_string(), json!("standard_solar_gain")),
            ("unit_gain_source".to_string(), json!(unit_gain_source)),
        ]),
        intermediates: IndexMap::from([("hourly_gains".to_string(), json!(cooling))]),
        output: load,
    };

    SourceLoad {
        resolved: ResolvedLoad::Computed(load),
        trace,
        group: LoadGroup::External,
    }
}
