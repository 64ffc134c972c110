//! Conduction load through opaque surfaces (walls, roofs, floors and
//! internal partitions).

use crate::core::load::{preset_override, CalcTrace, LoadGroup, LoadVector, ResolvedLoad, SourceLoad, TraceMode};
use crate::core::loads::IndoorConditions;
use crate::core::reference::{OutdoorDesignRecord, ReferenceRepository};
use crate::core::units::{round_half_up, COOLING_HOUR_KEYS};
use crate::input::{ConstructionAssembly, Surface};
use indexmap::IndexMap;
use serde_json::json;

const DEFAULT_U_VALUE_W_M2K: f64 = 1.0;
const DEFAULT_WALL_TYPE: &str = "Ⅰ";
const DEFAULT_ETD_INDOOR_TEMP_KEY: &str = "28";

fn surface_area(surface: &Surface) -> f64 {
    if let Some(area) = surface.area_m2 {
        return area;
    }
    match (surface.width_m, surface.height_m) {
        (Some(width), Some(height)) => width * height,
        _ => 0.0,
    }
}

/// Cooling load per hour is `area · U · ΔT(region, orientation, hour) ·
/// intermittent factor`, with ΔT from the ETD table unless the surface
/// carries a per-hour override. The heating load uses the winter
/// indoor/outdoor difference (or an explicit override) times the heating
/// orientation factor; conduction never contributes latent load.
pub fn calc_surface_load(
    surface: &Surface,
    indoor: &IndoorConditions,
    constructions: &IndexMap<String, ConstructionAssembly>,
    references: &ReferenceRepository,
    region: &str,
    outdoor: &OutdoorDesignRecord,
) -> SourceLoad {
    let group = if surface.is_external() {
        LoadGroup::External
    } else {
        LoadGroup::Internal
    };
    if let Some(preset) = surface.preset_load {
        return preset_override(
            "transmission",
            "surface",
            &surface.id,
            TraceMode::Both,
            preset,
            group,
        );
    }

    let area = surface_area(surface);
    let construction = surface
        .construction_id
        .as_ref()
        .and_then(|id| constructions.get(id));
    let u_value = construction
        .map(|c| c.u_value_w_m2k)
        .unwrap_or(DEFAULT_U_VALUE_W_M2K);
    let wall_type = construction
        .and_then(|c| c.wall_type.as_deref())
        .unwrap_or(DEFAULT_WALL_TYPE);
    let orientation = surface.orientation.as_deref().unwrap_or("N");

    let mut delta_source = "reference.etd";
    let mut cooling = IndexMap::new();
    for hour in COOLING_HOUR_KEYS {
        let delta = match surface
            .temperature_difference_override
            .as_ref()
            .and_then(|overrides| overrides.get(hour))
        {
            Some(delta) => {
                delta_source = "override";
                *delta
            }
            None => references.lookup_etd(
                region,
                orientation,
                hour,
                wall_type,
                DEFAULT_ETD_INDOOR_TEMP_KEY,
            ),
        };
        cooling.insert(
            hour.to_string(),
            round_half_up(area * u_value * delta * surface.intermittent_factor, 0),
        );
    }

    let outdoor_winter = outdoor.heating_drybulb_c.unwrap_or(0.0);
    let heating_delta = surface
        .heating_delta_override
        .unwrap_or_else(|| (indoor.heating_temp_c - outdoor_winter).max(0.0));
    let heating_factor = references.lookup_orientation_factor_for_heating(orientation);
    let heat_sensible = round_half_up(area * u_value * heating_delta * heating_factor, 0);

    let load = LoadVector {
        cool_9: cooling["9"],
        cool_12: cooling["12"],
        cool_14: cooling["14"],
        cool_16: cooling["16"],
        cool_latent: 0.0,
        heat_sensible,
        heat_latent: 0.0,
    };

    let trace = CalcTrace {
        formula_id: "transmission.surface_conduction".to_string(),
        entity_type: "surface".to_string(),
        entity_id: surface.id.clone(),
        mode: TraceMode::Both,
        inputs: IndexMap::from([
            ("area_m2".to_string(), json!(area)),
            ("u_value_w_m2k".to_string(), json!(u_value)),
            ("orientation".to_string(), json!(orientation)),
            ("wall_type".to_string(), json!(wall_type)),
            (
                "intermittent_factor".to_string(),
                json!(surface.intermittent_factor),
            ),
            ("indoor_winter_c".to_string(), json!(indoor.heating_temp_c)),
            ("outdoor_winter_c".to_string(), json!(outdoor_winter)),
        ]),
        references: IndexMap::from([
            (
                "etd_table".to_string(),
                json!("execution_temperature_difference"),
            ),
            (
                "orientation_factor".to_string(),
                json!("heating_orientation_factors"),
            ),
            ("delta_source".to_string(), json!(delta_source)),
        ]),
        intermediates: IndexMap::from([
            ("delta_t_cooling".to_string(), json!(cooling)),
            ("heating_delta".to_string(), json!(heating_delta)),
            ("heating_factor".to_string(), json!(heating_factor)),
        ]),
        output: load,
    };

    SourceLoad {
        resolved: ResolvedLoad::Computed(load),
        trace,
        group,
    }
}
