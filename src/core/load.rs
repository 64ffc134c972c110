use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::iter::Sum;
use std::ops::Add;

/// The unit of heat load passed between the per-source calculators and the
/// aggregation engine: four cooling sensible values at the evaluated hours,
/// one cooling latent value and a heating sensible/latent pair, all in W.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct LoadVector {
    pub cool_9: f64,
    pub cool_12: f64,
    pub cool_14: f64,
    pub cool_16: f64,
    pub cool_latent: f64,
    pub heat_sensible: f64,
    pub heat_latent: f64,
}

impl LoadVector {
    pub const ZERO: LoadVector = LoadVector {
        cool_9: 0.0,
        cool_12: 0.0,
        cool_14: 0.0,
        cool_16: 0.0,
        cool_latent: 0.0,
        heat_sensible: 0.0,
        heat_latent: 0.0,
    };

    pub fn add(&self, other: &LoadVector) -> LoadVector {
        LoadVector {
            cool_9: self.cool_9 + other.cool_9,
            cool_12: self.cool_12 + other.cool_12,
            cool_14: self.cool_14 + other.cool_14,
            cool_16: self.cool_16 + other.cool_16,
            cool_latent: self.cool_latent + other.cool_latent,
            heat_sensible: self.heat_sensible + other.heat_sensible,
            heat_latent: self.heat_latent + other.heat_latent,
        }
    }

    /// False when any component is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        [
            self.cool_9,
            self.cool_12,
            self.cool_14,
            self.cool_16,
            self.cool_latent,
            self.heat_sensible,
            self.heat_latent,
        ]
        .iter()
        .all(|component| component.is_finite())
    }
}

impl Add for LoadVector {
    type Output = LoadVector;

    fn add(self, rhs: Self) -> Self::Output {
        LoadVector::add(&self, &rhs)
    }
}

impl Sum for LoadVector {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(LoadVector::ZERO, |acc, vec| acc + vec)
    }
}

/// Which aggregation bucket a load source contributes to. Envelope sources
/// (surfaces, openings, outdoor air) report External, occupant and equipment
/// sources report Internal.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LoadGroup {
    External,
    Internal,
}

#[derive(
    Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TraceMode {
    Cooling,
    Heating,
    Both,
}

/// Audit record emitted exactly once per calculator invocation, capturing the
/// formula applied, its inputs, the reference tables consulted and the
/// intermediate values leading to the output vector.
#[derive(Clone, Debug, Serialize)]
pub struct CalcTrace {
    pub formula_id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub mode: TraceMode,
    pub inputs: IndexMap<String, Value>,
    pub references: IndexMap<String, Value>,
    pub intermediates: IndexMap<String, Value>,
    pub output: LoadVector,
}

/// A per-entity load after the preset check: either computed by formula or
/// taken verbatim from the entity's preset vector. The preset always wins
/// over formula computation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResolvedLoad {
    Computed(LoadVector),
    Overridden(LoadVector),
}

impl ResolvedLoad {
    pub fn vector(&self) -> LoadVector {
        match self {
            ResolvedLoad::Computed(vec) | ResolvedLoad::Overridden(vec) => *vec,
        }
    }
}

/// The full outcome of one calculator invocation.
#[derive(Clone, Debug)]
pub struct SourceLoad {
    pub resolved: ResolvedLoad,
    pub trace: CalcTrace,
    pub group: LoadGroup,
}

impl SourceLoad {
    pub fn vector(&self) -> LoadVector {
        self.resolved.vector()
    }
}

/// Builds the short-circuit outcome for an entity carrying a preset load
/// vector. No table lookup happens on this path and the trace is tagged as an
/// override rather than a formula.
pub(crate) fn preset_override(
    formula_area: &str,
    entity_type: &str,
    entity_id: &str,
    mode: TraceMode,
    preset: LoadVector,
    group: LoadGroup,
) -> SourceLoad {
    SourceLoad {
        resolved: ResolvedLoad::Overridden(preset),
        trace: CalcTrace {
            formula_id: format!("{formula_area}.preset_override"),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            mode,
            inputs: IndexMap::from([("preset".to_string(), json!(preset))]),
            references: IndexMap::new(),
            intermediates: IndexMap::new(),
            output: preset,
        },
        group,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn vec_a() -> LoadVector {
        LoadVector {
            cool_9: 1.0,
            cool_12: 2.0,
            cool_14: 3.0,
            cool_16: 4.0,
            cool_latent: 5.0,
            heat_sensible: 6.0,
            heat_latent: 7.0,
        }
    }

    #[fixture]
    fn vec_b() -> LoadVector {
        LoadVector {
            cool_9: 10.0,
            cool_12: -2.0,
            cool_14: 0.5,
            cool_16: 0.0,
            cool_latent: 1.0,
            heat_sensible: -6.0,
            heat_latent: 3.0,
        }
    }

    #[rstest]
    fn addition_should_be_commutative(vec_a: LoadVector, vec_b: LoadVector) {
        assert_eq!(vec_a + vec_b, vec_b + vec_a);
    }

    #[rstest]
    fn addition_should_be_associative(vec_a: LoadVector, vec_b: LoadVector) {
        let vec_c = LoadVector {
            cool_9: -1.5,
            ..Default::default()
        };
        assert_eq!((vec_a + vec_b) + vec_c, vec_a + (vec_b + vec_c));
    }

    #[rstest]
    fn zero_should_be_additive_identity(vec_a: LoadVector) {
        assert_eq!(vec_a + LoadVector::ZERO, vec_a);
        assert_eq!(LoadVector::ZERO + vec_a, vec_a);
    }

    #[rstest]
    fn sum_should_fold_from_zero(vec_a: LoadVector, vec_b: LoadVector) {
        let total: LoadVector = [vec_a, vec_b].into_iter().sum();
        assert_eq!(total, vec_a + vec_b);
    }

    #[rstest]
    fn preset_override_should_carry_the_literal_vector(vec_a: LoadVector) {
        let outcome = preset_override(
            "transmission",
            "surface",
            "s1",
            TraceMode::Both,
            vec_a,
            LoadGroup::External,
        );
        assert_eq!(outcome.resolved, ResolvedLoad::Overridden(vec_a));
        assert_eq!(outcome.vector(), vec_a);
        assert_eq!(outcome.trace.formula_id, "transmission.preset_override");
        assert!(outcome.trace.references.is_empty());
    }
}
