//! The calculation run over a whole project: groups entities by room, feeds
//! each through its calculator, folds the per-source vectors into the result
//! grid per room and rolls rooms up into system and project totals.

use crate::core::aggregation::{compute_major_cells, MajorCells};
use crate::core::load::{CalcTrace, LoadVector};
use crate::core::loads::internal_gains::calc_internal_load;
use crate::core::loads::mechanical_gains::calc_mechanical_load;
use crate::core::loads::solar_gain::calc_opening_solar_gain;
use crate::core::loads::transmission::calc_surface_load;
use crate::core::loads::ventilation::calc_ventilation_load;
use crate::core::loads::IndoorConditions;
use crate::core::reference::{OutdoorDesignRecord, ReferenceRepository};
use crate::errors::{CalculationError, HeatLoadError};
use crate::input::{ConstructionAssembly, GlassSpec, Project};
use anyhow::anyhow;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;

/// The row-56 totals of one room, the values systems and the whole project
/// sum over.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct FinalTotals {
    pub cool_9_total: f64,
    pub cool_12_total: f64,
    pub cool_14_total: f64,
    pub cool_16_total: f64,
    pub heating_total: f64,
}

impl FinalTotals {
    fn from_cells(cells: &MajorCells) -> Self {
        Self {
            cool_9_total: cells.combined.cool_9,
            cool_12_total: cells.combined.cool_12,
            cool_14_total: cells.combined.cool_14,
            cool_16_total: cells.combined.cool_16,
            heating_total: cells.combined.heating,
        }
    }

    fn accumulate(&mut self, other: &FinalTotals) {
        self.cool_9_total += other.cool_9_total;
        self.cool_12_total += other.cool_12_total;
        self.cool_14_total += other.cool_14_total;
        self.cool_16_total += other.cool_16_total;
        self.heating_total += other.heating_total;
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RoomLoadSummary {
    pub room_id: String,
    pub room_name: String,
    pub envelope_loads: LoadVector,
    pub envelope_loads_by_orientation: IndexMap<String, LoadVector>,
    pub internal_loads: LoadVector,
    pub ventilation_loads: LoadVector,
    /// Sum of the three category subtotals before correction factors.
    pub pre_correction: LoadVector,
    /// The corrected (row 55) vector.
    pub post_correction: LoadVector,
    pub final_totals: FinalTotals,
    pub major_cells: IndexMap<String, Option<f64>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SystemLoadSummary {
    pub system_id: String,
    pub system_name: String,
    pub room_ids: Vec<String>,
    pub totals: FinalTotals,
}

#[derive(Debug, Serialize)]
pub struct CalcResult {
    /// The result grid of the last room, mirroring the single-sheet layout
    /// downstream consumers fill cell by cell. Per-room grids live on the
    /// room summaries.
    pub major_cells: IndexMap<String, Option<f64>>,
    pub room_results: Vec<RoomLoadSummary>,
    pub system_results: Vec<SystemLoadSummary>,
    pub totals: FinalTotals,
    pub traces: Vec<CalcTrace>,
}

fn group_by_room<'a, T>(
    items: &'a [T],
    room_id: impl Fn(&T) -> &str,
) -> IndexMap<&'a str, Vec<&'a T>> {
    let mut grouped: IndexMap<&str, Vec<&T>> = IndexMap::new();
    for item in items {
        grouped.entry(room_id(item)).or_default().push(item);
    }
    grouped
}

pub struct Corpus<'a> {
    project: &'a Project,
    references: &'a ReferenceRepository,
    outdoor: OutdoorDesignRecord,
    constructions: IndexMap<String, ConstructionAssembly>,
    glasses: IndexMap<String, GlassSpec>,
}

impl<'a> Corpus<'a> {
    pub fn from_inputs(project: &'a Project, references: &'a ReferenceRepository) -> Self {
        let outdoor = references.lookup_outdoor(&project.region);
        let constructions = project
            .constructions
            .iter()
            .map(|c| (c.id.clone(), c.clone()))
            .collect();
        let glasses = project
            .glasses
            .iter()
            .map(|g| (g.id.clone(), g.clone()))
            .collect();
        Self {
            project,
            references,
            outdoor,
            constructions,
            glasses,
        }
    }

    pub fn run(&self) -> Result<CalcResult, CalculationError> {
        let project = self.project;
        let solar_region = project.solar_region.as_deref().unwrap_or(&project.region);
        let correction = &project.metadata.correction_factors;
        let rounding = &project.metadata.rounding;
        let policy = &project.metadata.policy;

        let surfaces_by_room = group_by_room(&project.surfaces, |s| s.room_id.as_str());
        let openings_by_room = group_by_room(&project.openings, |o| o.room_id.as_str());
        let internal_by_room = group_by_room(&project.internal_loads, |l| l.room_id.as_str());
        let mechanical_by_room =
            group_by_room(&project.mechanical_loads, |l| l.room_id.as_str());
        let vents_by_room =
            group_by_room(&project.ventilation_infiltration, |v| v.room_id.as_str());

        let mut traces = Vec::new();
        let mut room_results = Vec::with_capacity(project.rooms.len());
        let mut last_major_cells = IndexMap::new();

        for room in &project.rooms {
            let indoor = IndoorConditions::resolve(
                &project.design_conditions,
                room.design_condition_id.as_deref(),
            );

            let mut envelope_by_orientation: IndexMap<String, LoadVector> = IndexMap::new();
            let mut internal_total = LoadVector::ZERO;
            let mut ventilation_total = LoadVector::ZERO;

            for surface in surfaces_by_room.get(room.id.as_str()).into_iter().flatten() {
                let result = calc_surface_load(
                    surface,
                    &indoor,
                    &self.constructions,
                    self.references,
                    &project.region,
                    &self.outdoor,
                );
                let orientation = surface.orientation.as_deref().unwrap_or("N");
                let slot = envelope_by_orientation
                    .entry(orientation.to_string())
                    .or_insert(LoadVector::ZERO);
                *slot = *slot + result.vector();
                traces.push(result.trace);
            }

            for opening in openings_by_room.get(room.id.as_str()).into_iter().flatten() {
                let result =
                    calc_opening_solar_gain(opening, &self.glasses, self.references, solar_region);
                let orientation = opening.orientation.as_deref().unwrap_or("N");
                let slot = envelope_by_orientation
                    .entry(orientation.to_string())
                    .or_insert(LoadVector::ZERO);
                *slot = *slot + result.vector();
                traces.push(result.trace);
            }

            for load in internal_by_room.get(room.id.as_str()).into_iter().flatten() {
                let result = calc_internal_load(load, rounding.occupancy, policy.internal_heating);
                internal_total = internal_total + result.vector();
                traces.push(result.trace);
            }

            for load in mechanical_by_room.get(room.id.as_str()).into_iter().flatten() {
                let result = calc_mechanical_load(load, policy.internal_heating);
                internal_total = internal_total + result.vector();
                traces.push(result.trace);
            }

            for vent in vents_by_room.get(room.id.as_str()).into_iter().flatten() {
                let result = calc_ventilation_load(
                    vent,
                    room,
                    &indoor,
                    &self.outdoor,
                    self.references,
                    rounding.outdoor_air,
                    policy.ventilation_latent,
                );
                ventilation_total = ventilation_total + result.vector();
                traces.push(result.trace);
            }

            let envelope_total: LoadVector =
                envelope_by_orientation.values().copied().sum();
            let pre_correction = envelope_total + internal_total + ventilation_total;
            if !pre_correction.is_finite() {
                return Err(CalculationError::new(anyhow!(
                    "non-finite load total for room {}",
                    room.id
                )));
            }

            let cells = compute_major_cells(
                envelope_total,
                internal_total,
                ventilation_total,
                room.area_m2,
                correction,
            );
            let major_cells = cells.to_cell_map();
            last_major_cells = major_cells.clone();

            room_results.push(RoomLoadSummary {
                room_id: room.id.clone(),
                room_name: room.name.clone(),
                envelope_loads: envelope_total,
                envelope_loads_by_orientation: envelope_by_orientation,
                internal_loads: internal_total,
                ventilation_loads: ventilation_total,
                pre_correction,
                post_correction: cells.corrected,
                final_totals: FinalTotals::from_cells(&cells),
                major_cells,
            });
        }

        let room_result_map: IndexMap<&str, &RoomLoadSummary> = room_results
            .iter()
            .map(|summary| (summary.room_id.as_str(), summary))
            .collect();
        let system_results = project
            .systems
            .iter()
            .map(|system| {
                let mut totals = FinalTotals::default();
                for room_id in &system.room_ids {
                    if let Some(summary) = room_result_map.get(room_id.as_str()) {
                        totals.accumulate(&summary.final_totals);
                    }
                }
                SystemLoadSummary {
                    system_id: system.id.clone(),
                    system_name: system.name.clone(),
                    room_ids: system.room_ids.clone(),
                    totals,
                }
            })
            .collect_vec();

        let mut totals = FinalTotals::default();
        for summary in &room_results {
            totals.accumulate(&summary.final_totals);
        }

        Ok(CalcResult {
            major_cells: last_major_cells,
            room_results,
            system_results,
            totals,
            traces,
        })
    }
}

/// Runs the full calculation for one project against a reference repository.
pub fn run_calculation(
    project: &Project,
    references: &ReferenceRepository,
) -> Result<CalcResult, HeatLoadError> {
    Ok(Corpus::from_inputs(project, references).run()?)
}
