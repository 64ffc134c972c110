//! The project graph consumed by the calculation: rooms, opaque surfaces,
//! glazed openings, internal/mechanical loads, ventilation entities and the
//! global settings (region, correction factors, rounding and methodology
//! policy). Entities are created fresh from an input payload and live only
//! for the duration of one calculation call; the only mutation after
//! construction is the one-time room volume backfill at ingest.

use crate::core::load::LoadVector;
use crate::core::units::RoundingMode;
use crate::errors::HeatLoadError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Read};

/// Deserializes a project JSON payload and applies the one-time room volume
/// backfill. Entity id uniqueness and reference integrity are an upstream
/// validation concern; the engine trusts them.
pub fn ingest_for_processing(json: impl Read) -> Result<Project, HeatLoadError> {
    let mut project: Project = serde_json::from_reader(BufReader::new(json))?;
    project.backfill_room_volumes();
    Ok(project)
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Season {
    Summer,
    Winter,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SurfaceKind {
    Wall,
    Roof,
    Floor,
    Internal,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InternalLoadKind {
    Lighting,
    Occupancy,
    Equipment,
    Other,
    InternalEnvelope,
    InternalSolar,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InfiltrationMode {
    #[default]
    None,
    Door,
    Sash,
}

/// Indoor design temperature and humidity for one season.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct SeasonalIndoor {
    pub indoor_temp_c: f64,
    pub indoor_rh_pct: f64,
}

/// An indoor design condition. Two historical shapes deserialize into this
/// one type: the unified shape carries `summer` and `winter` sub-records,
/// the older shape carries flat `indoor_temp_c`/`indoor_rh_pct` fields with a
/// `season` tag.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DesignCondition {
    pub id: String,
    #[serde(default)]
    pub season: Option<Season>,
    #[serde(default)]
    pub indoor_temp_c: Option<f64>,
    #[serde(default)]
    pub indoor_rh_pct: Option<f64>,
    #[serde(default)]
    pub summer: Option<SeasonalIndoor>,
    #[serde(default)]
    pub winter: Option<SeasonalIndoor>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub usage: Option<String>,
    #[serde(default)]
    pub floor: Option<String>,
    pub area_m2: f64,
    #[serde(default)]
    pub ceiling_height_m: Option<f64>,
    #[serde(default)]
    pub volume_m3: Option<f64>,
    #[serde(default)]
    pub design_condition_id: Option<String>,
    #[serde(default)]
    pub system_id: Option<String>,
}

fn default_adjacent_type() -> String {
    "outdoor".to_string()
}

fn default_intermittent_factor() -> f64 {
    1.0
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Surface {
    pub id: String,
    pub room_id: String,
    pub kind: SurfaceKind,
    #[serde(default)]
    pub orientation: Option<String>,
    #[serde(default)]
    pub width_m: Option<f64>,
    #[serde(default)]
    pub height_m: Option<f64>,
    #[serde(default)]
    pub area_m2: Option<f64>,
    #[serde(default = "default_adjacent_type")]
    pub adjacent_type: String,
    #[serde(default)]
    pub construction_id: Option<String>,
    #[serde(default = "default_intermittent_factor")]
    pub intermittent_factor: f64,
    /// Per-hour replacement for the ETD table lookup, keyed "9"/"12"/"14"/"16".
    #[serde(default)]
    pub temperature_difference_override: Option<IndexMap<String, f64>>,
    #[serde(default)]
    pub heating_delta_override: Option<f64>,
    #[serde(default)]
    pub preset_load: Option<LoadVector>,
}

impl Surface {
    /// A surface facing outdoors or ground contributes to the external
    /// (envelope) bucket; anything else is internal partition area.
    pub fn is_external(&self) -> bool {
        matches!(self.adjacent_type.as_str(), "outdoor" | "external" | "ground")
    }
}

fn default_shading_sc() -> f64 {
    1.0
}

fn default_solar_area_ratio_pct() -> f64 {
    100.0
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Opening {
    pub id: String,
    pub room_id: String,
    #[serde(default)]
    pub surface_id: Option<String>,
    #[serde(default)]
    pub orientation: Option<String>,
    #[serde(default)]
    pub width_m: Option<f64>,
    #[serde(default)]
    pub height_m: Option<f64>,
    #[serde(default)]
    pub area_m2: Option<f64>,
    #[serde(default)]
    pub glass_id: Option<String>,
    #[serde(default = "default_shading_sc")]
    pub shading_sc: f64,
    #[serde(default = "default_solar_area_ratio_pct")]
    pub solar_area_ratio_pct: f64,
    /// Per-hour replacement for the standard solar gain lookup.
    #[serde(default)]
    pub solar_gain_override: Option<IndexMap<String, f64>>,
    #[serde(default)]
    pub preset_load: Option<LoadVector>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ConstructionAssembly {
    pub id: String,
    pub name: String,
    pub u_value_w_m2k: f64,
    /// ETD wall type class (Ⅰ–Ⅳ); lookups default to Ⅰ when absent.
    #[serde(default)]
    pub wall_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GlassSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub solar_gain_key: Option<String>,
    #[serde(default)]
    pub u_value_w_m2k: Option<f64>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InternalLoad {
    pub id: String,
    pub room_id: String,
    pub kind: InternalLoadKind,
    #[serde(default)]
    pub sensible_w: f64,
    #[serde(default)]
    pub latent_w: f64,
    #[serde(default)]
    pub schedule_id: Option<String>,
    /// Fraction of the rated power present per hour key; 1.0 everywhere when
    /// unspecified.
    #[serde(default)]
    pub schedule_ratio: Option<IndexMap<String, f64>>,
    #[serde(default)]
    pub preset_load: Option<LoadVector>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MechanicalLoad {
    pub id: String,
    pub room_id: String,
    #[serde(default)]
    pub sensible_w: f64,
    #[serde(default)]
    pub latent_w: f64,
    #[serde(default)]
    pub schedule_ratio: Option<IndexMap<String, f64>>,
    #[serde(default)]
    pub preset_load: Option<LoadVector>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct VentilationInfiltration {
    pub id: String,
    pub room_id: String,
    #[serde(default)]
    pub outdoor_air_m3h: f64,
    #[serde(default)]
    pub infiltration_mode: InfiltrationMode,
    #[serde(default)]
    pub air_changes_per_hour: Option<f64>,
    #[serde(default)]
    pub infiltration_area_m2: Option<f64>,
    #[serde(default)]
    pub sash_type: Option<String>,
    #[serde(default)]
    pub airtightness: Option<String>,
    #[serde(default)]
    pub wind_speed_ms: Option<f64>,
    #[serde(default)]
    pub preset_load: Option<LoadVector>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct System {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub room_ids: Vec<String>,
}

/// One multiplicative factor per load vector component, applied once during
/// aggregation.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct CorrectionFactors {
    pub cool_9: f64,
    pub cool_12: f64,
    pub cool_14: f64,
    pub cool_16: f64,
    pub cool_latent: f64,
    pub heat_sensible: f64,
    pub heat_latent: f64,
}

impl Default for CorrectionFactors {
    fn default() -> Self {
        Self {
            cool_9: 1.0,
            cool_12: 1.0,
            cool_14: 1.0,
            cool_16: 1.0,
            cool_latent: 1.0,
            heat_sensible: 1.0,
            heat_latent: 1.0,
        }
    }
}

fn default_step() -> f64 {
    1.0
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct StepRounding {
    #[serde(default)]
    pub mode: RoundingMode,
    #[serde(default = "default_step")]
    pub step: f64,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct RoundingSettings {
    /// Rounding applied to scheduled occupancy loads instead of plain
    /// round-half-up.
    pub occupancy: Option<StepRounding>,
    /// Rounding applied to the configured outdoor air flow before
    /// infiltration is added.
    pub outdoor_air: Option<StepRounding>,
}

/// Which of the two ventilation latent load formulas in the methodology
/// lineage applies.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VentilationLatentFormula {
    /// Latent load is the positive enthalpy difference between the outdoor
    /// and indoor cooling design states.
    #[default]
    EnthalpyDifference,
    /// Latent load is driven by the humidity ratio difference (833 · flow/3.6
    /// · Δw); the enthalpy residual lands in the 14:00 sensible slot.
    HumidityRatioSplit,
}

/// How internal and mechanical loads contribute to the heating totals.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InternalHeatingPolicy {
    /// Internal and mechanical loads are excluded from heating entirely.
    #[default]
    Exclude,
    /// A fixed quarter of the rated power contributes: subtractive for
    /// internal gains, additive for mechanical loads.
    FixedOffset,
}

/// Explicit methodology version switches. The lineage of the calculation
/// sheet contains more than one formula for some loads; which one applies is
/// a project-level choice, never guessed.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct CalcPolicy {
    pub ventilation_latent: VentilationLatentFormula,
    pub internal_heating: InternalHeatingPolicy,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectMetadata {
    pub source: Option<String>,
    pub version: Option<String>,
    pub notes: Option<String>,
    pub correction_factors: CorrectionFactors,
    pub rounding: RoundingSettings,
    pub policy: CalcPolicy,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub building_name: Option<String>,
    #[serde(default)]
    pub building_location: Option<String>,
    #[serde(default)]
    pub building_usage: Option<String>,
    #[serde(default)]
    pub total_floor_area_m2: Option<f64>,
    pub region: String,
    /// Region key for the solar tables when it differs from the climate
    /// region.
    #[serde(default)]
    pub solar_region: Option<String>,
    #[serde(default)]
    pub location_lat: Option<f64>,
    #[serde(default)]
    pub location_lon: Option<f64>,
    #[serde(default)]
    pub design_conditions: Vec<DesignCondition>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub surfaces: Vec<Surface>,
    #[serde(default)]
    pub openings: Vec<Opening>,
    #[serde(default)]
    pub constructions: Vec<ConstructionAssembly>,
    #[serde(default)]
    pub glasses: Vec<GlassSpec>,
    #[serde(default)]
    pub internal_loads: Vec<InternalLoad>,
    #[serde(default)]
    pub mechanical_loads: Vec<MechanicalLoad>,
    #[serde(default)]
    pub ventilation_infiltration: Vec<VentilationInfiltration>,
    #[serde(default)]
    pub systems: Vec<System>,
    #[serde(default)]
    pub metadata: ProjectMetadata,
}

impl Project {
    /// One-time backfill of room volume from floor area and ceiling height,
    /// for rooms that did not state a volume explicitly.
    pub(crate) fn backfill_room_volumes(&mut self) {
        for room in &mut self.rooms {
            if room.volume_m3.is_none() {
                if let Some(height) = room.ceiling_height_m {
                    room.volume_m3 = Some(room.area_m2 * height);
                }
            }
        }
    }
}
