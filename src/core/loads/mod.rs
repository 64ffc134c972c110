//! Per-source load calculators. Each one consumes a single entity plus its
//! room context, conditions and the reference repository, and produces a
//! [`SourceLoad`](crate::core::load::SourceLoad): one load vector, one audit
//! trace and an aggregation group tag. Every calculator checks the entity's
//! preset vector first; a preset always replaces formula computation.

pub mod eave_shading;
pub mod internal_gains;
pub mod mechanical_gains;
pub mod solar_gain;
pub mod transmission;
pub mod ventilation;

use crate::input::{DesignCondition, Season};

/// Fraction of rated internal/mechanical power contributing to the heating
/// load under the fixed-offset policy.
pub(crate) const HEATING_CONTRIBUTION_RATIO: f64 = 0.25;

/// Indoor design state for one room after resolving its referenced design
/// condition, regardless of which historical condition shape the project
/// used.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IndoorConditions {
    pub cooling_temp_c: f64,
    pub cooling_rh_pct: f64,
    pub heating_temp_c: f64,
}

impl Default for IndoorConditions {
    fn default() -> Self {
        Self {
            cooling_temp_c: 26.0,
            cooling_rh_pct: 50.0,
            heating_temp_c: 20.0,
        }
    }
}

impl IndoorConditions {
    /// Resolves the condition a room references (falling back to the first
    /// condition in the project, then to the defaults). A unified condition
    /// supplies both seasons directly; a season-tagged flat condition
    /// supplies its own season, with the opposite season taken from the
    /// first condition tagged with it.
    pub fn resolve(conditions: &[DesignCondition], condition_id: Option<&str>) -> Self {
        let referenced = condition_id
            .and_then(|id| conditions.iter().find(|cond| cond.id == id))
            .or_else(|| conditions.first());
        let Some(condition) = referenced else {
            return Self::default();
        };

        let mut resolved = Self::default();
        if let Some(summer) = &condition.summer {
            resolved.cooling_temp_c = summer.indoor_temp_c;
            resolved.cooling_rh_pct = summer.indoor_rh_pct;
        }
        if let Some(winter) = &condition.winter {
            resolved.heating_temp_c = winter.indoor_temp_c;
        }
        if condition.summer.is_some() || condition.winter.is_some() {
            return resolved;
        }

        match condition.season {
            Some(Season::Winter) => {
                if let Some(temp) = condition.indoor_temp_c {
                    resolved.heating_temp_c = temp;
                }
                if let Some(summer) = first_for_season(conditions, Season::Summer) {
                    if let Some(temp) = summer.indoor_temp_c {
                        resolved.cooling_temp_c = temp;
                    }
                    if let Some(rh) = summer.indoor_rh_pct {
                        resolved.cooling_rh_pct = rh;
                    }
                }
            }
            Some(Season::Summer) | None => {
                if let Some(temp) = condition.indoor_temp_c {
                    resolved.cooling_temp_c = temp;
                }
                if let Some(rh) = condition.indoor_rh_pct {
                    resolved.cooling_rh_pct = rh;
                }
                // an untagged flat condition stands for both seasons
                if condition.season.is_none() {
                    if let Some(temp) = condition.indoor_temp_c {
                        resolved.heating_temp_c = temp;
                    }
                }
                if let Some(winter) = first_for_season(conditions, Season::Winter) {
                    if let Some(temp) = winter.indoor_temp_c {
                        resolved.heating_temp_c = temp;
                    }
                }
            }
        }
        resolved
    }
}

fn first_for_season(conditions: &[DesignCondition], season: Season) -> Option<&DesignCondition> {
    conditions.iter().find(|cond| cond.season == Some(season))
}
