//! Mechanical equipment loads. Same shape as the internal gains calculation
//! but the heating contribution is additive: fans, pumps and similar
//! equipment add heat in winter as well.

use crate::core::load::{preset_override, CalcTrace, LoadGroup, LoadVector, ResolvedLoad, SourceLoad, TraceMode};
use crate::core::loads::HEATING_CONTRIBUTION_RATIO;
use crate::core::units::{round_half_up, COOLING_HOUR_KEYS};
use crate::input::{InternalHeatingPolicy, MechanicalLoad};
use indexmap::IndexMap;
use serde_json::json;

pub fn calc_mechanical_load(
    load: &MechanicalLoad,
    heating_policy: InternalHeatingPolicy,
) -> SourceLoad {
    if let Some(preset) = load.preset_load {
        return preset_override(
            "mechanical",
            "mechanical_load",
            &load.id,
            TraceMode::Both,
            preset,
            LoadGroup::Internal,
        );
    }

    let mut cooling = IndexMap::new();
    for hour in COOLING_HOUR_KEYS {
        let ratio = load
            .schedule_ratio
            .as_ref()
            .and_then(|ratios| ratios.get(hour))
            .copied()
            .unwrap_or(1.0);
        cooling.insert(
            hour.to_string(),
            round_half_up(load.sensible_w * ratio, 0),
        );
    }
    let latent = round_half_up(load.latent_w, 0);

    let (heat_sensible, heat_latent) = match heating_policy {
        InternalHeatingPolicy::Exclude => (0.0, 0.0),
        InternalHeatingPolicy::FixedOffset => (
            round_half_up(load.sensible_w * HEATING_CONTRIBUTION_RATIO, 0),
            round_half_up(load.latent_w * HEATING_CONTRIBUTION_RATIO, 0),
        ),
    };

    let vector = LoadVector {
        cool_9: cooling["9"],
        cool_12: cooling["12"],
        cool_14: cooling["14"],
        cool_16: cooling["16"],
        cool_latent: latent,
        heat_sensible,
        heat_latent,
    };

    let trace = CalcTrace {
        formula_id: "mechanical.load_simple".to_string(),
        entity_type: "mechanical_load".to_string(),
        entity_id: load.id.clone(),
        mode: TraceMode::Both,
        inputs: IndexMap::from([
            ("sensible_w".to_string(), json!(load.sensible_w)),
            ("latent_w".to_string(), json!(load.latent_w)),
            ("schedule_ratio".to_string(), json!(load.schedule_ratio)),
            ("heating_policy".to_string(), json!(heating_policy)),
        ]),
        references: IndexMap::new(),
        intermediates: IndexMap::from([(
            "cooling_sensible_times".to_string(),
            json!(cooling),
        )]),
        output: vector,
    };

    SourceLoad {
        resolved: ResolvedLoad::Computed(vector),
        trace,
        group: LoadGroup::Internal,
    }
}
