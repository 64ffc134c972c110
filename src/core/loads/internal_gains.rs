//! Internal gains from occupancy, lighting, equipment and other in-room
//! sources.

use crate::core::load::{preset_override, CalcTrace, LoadGroup, LoadVector, ResolvedLoad, SourceLoad, TraceMode};
use crate::core::loads::HEATING_CONTRIBUTION_RATIO;
use crate::core::units::{round_by_mode, round_half_up, COOLING_HOUR_KEYS};
use crate::input::{InternalHeatingPolicy, InternalLoad, InternalLoadKind, StepRounding};
use indexmap::IndexMap;
use serde_json::json;

fn schedule_ratio(ratios: Option<&IndexMap<String, f64>>, hour: &str) -> f64 {
    ratios
        .and_then(|ratios| ratios.get(hour))
        .copied()
        .unwrap_or(1.0)
}

/// Cooling sensible per hour is the rated power scaled by the schedule
/// ratio; the latent value is flat. Occupancy loads round through the
/// configured occupancy policy instead of plain half-up. The heating
/// contribution is either excluded entirely or a fixed −25% offset of the
/// rated powers, as selected by the project policy.
pub fn calc_internal_load(
    load: &InternalLoad,
    occupancy_rounding: Option<StepRounding>,
    heating_policy: InternalHeatingPolicy,
) -> SourceLoad {
    if let Some(preset) = load.preset_load {
        return preset_override(
            "internal",
            "internal_load",
            &load.id,
            TraceMode::Both,
            preset,
            LoadGroup::Internal,
        );
    }

    let step_rounding = match load.kind {
        InternalLoadKind::Occupancy => occupancy_rounding,
        _ => None,
    };
    let round_power = |value: f64| match step_rounding {
        Some(rounding) => round_by_mode(value, rounding.mode, rounding.step),
        None => round_half_up(value, 0),
    };

    let mut cooling = IndexMap::new();
    for hour in COOLING_HOUR_KEYS {
        let ratio = schedule_ratio(load.schedule_ratio.as_ref(), hour);
        cooling.insert(hour.to_string(), round_power(load.sensible_w * ratio));
    }
    let latent = round_power(load.latent_w);

    let (heat_sensible, heat_latent) = match heating_policy {
        InternalHeatingPolicy::Exclude => (0.0, 0.0),
        InternalHeatingPolicy::FixedOffset => (
            -round_power(load.sensible_w * HEATING_CONTRIBUTION_RATIO),
            -round_power(load.latent_w * HEATING_CONTRIBUTION_RATIO),
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
        formula_id: "internal.load_simple".to_string(),
        entity_type: "internal_load".to_string(),
        entity_id: load.id.clone(),
        mode: TraceMode::Both,
        inputs: IndexMap::from([
            ("kind".to_string(), json!(load.kind)),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::units::RoundingMode;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::Value;

    fn load(value: Value) -> InternalLoad {
        serde_json::from_value(value).unwrap()
    }

    #[rstest]
    fn should_scale_sensible_by_schedule_ratio() {
        let load = load(json!({
            "id": "i1", "room_id": "r1", "kind": "lighting",
            "sensible_w": 500.0, "latent_w": 0.0,
            "schedule_ratio": {"9": 0.5, "12": 1.0, "14": 1.0, "16": 0.25}
        }));
        let result = calc_internal_load(&load, None, InternalHeatingPolicy::Exclude);
        assert_eq!(
            result.vector(),
            LoadVector {
                cool_9: 250.0,
                cool_12: 500.0,
                cool_14: 500.0,
                cool_16: 125.0,
                ..Default::default()
            }
        );
        assert_eq!(result.group, LoadGroup::Internal);
    }

    #[rstest]
    fn should_default_schedule_ratio_to_one() {
        let load = load(json!({
            "id": "i1", "room_id": "r1", "kind": "equipment",
            "sensible_w": 320.4, "latent_w": 60.5
        }));
        let result = calc_internal_load(&load, None, InternalHeatingPolicy::Exclude);
        assert_eq!(result.vector().cool_9, 320.0);
        assert_eq!(result.vector().cool_latent, 61.0);
    }

    #[rstest]
    fn should_use_occupancy_rounding_for_occupancy_kind_only() {
        let occupancy = load(json!({
            "id": "i1", "room_id": "r1", "kind": "occupancy",
            "sensible_w": 91.2, "latent_w": 52.1
        }));
        let rounding = StepRounding {
            mode: RoundingMode::Ceil,
            step: 10.0,
        };
        let result = calc_internal_load(&occupancy, Some(rounding), InternalHeatingPolicy::Exclude);
        assert_eq!(result.vector().cool_9, 100.0);
        assert_eq!(result.vector().cool_latent, 60.0);

        let lighting = load(json!({
            "id": "i2", "room_id": "r1", "kind": "lighting",
            "sensible_w": 91.2, "latent_w": 0.0
        }));
        let result = calc_internal_load(&lighting, Some(rounding), InternalHeatingPolicy::Exclude);
        assert_eq!(result.vector().cool_9, 91.0);
    }

    #[rstest]
    fn should_exclude_heating_contribution_by_policy() {
        let load = load(json!({
            "id": "i1", "room_id": "r1", "kind": "occupancy",
            "sensible_w": 400.0, "latent_w": 200.0
        }));
        let result = calc_internal_load(&load, None, InternalHeatingPolicy::Exclude);
        assert_eq!(result.vector().heat_sensible, 0.0);
        assert_eq!(result.vector().heat_latent, 0.0);
    }

    #[rstest]
    fn should_subtract_quarter_of_rated_power_under_fixed_offset() {
        let load = load(json!({
            "id": "i1", "room_id": "r1", "kind": "occupancy",
            "sensible_w": 400.0, "latent_w": 202.0
        }));
        let result = calc_internal_load(&load, None, InternalHeatingPolicy::FixedOffset);
        assert_eq!(result.vector().heat_sensible, -100.0);
        assert_eq!(result.vector().heat_latent, -51.0);
    }

    #[rstest]
    fn should_short_circuit_on_preset() {
        let load = load(json!({
            "id": "i1", "room_id": "r1", "kind": "other",
            "sensible_w": 400.0,
            "preset_load": {"cool_9": 42.0}
        }));
        let result = calc_internal_load(&load, None, InternalHeatingPolicy::FixedOffset);
        assert!(matches!(result.resolved, ResolvedLoad::Overridden(_)));
        assert_eq!(result.vector().cool_9, 42.0);
        assert_eq!(result.trace.formula_id, "internal.preset_override");
    }
}
