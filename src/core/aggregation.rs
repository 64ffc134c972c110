//! Combines the per-source subtotals of one room into the named result grid
//! of the calculation sheet ("major cells"). Internally the grid is a typed
//! structure per category and time column; the legacy spreadsheet cell keys
//! (N48 … AJ57) are produced only at the boundary, for downstream consumers
//! keyed to the sheet layout.
//!
//! Null-vs-zero: the latent and heating slots distinguish "no load of this
//! kind" (null) from a computed value, so an exact 0 serializes as null
//! there. The cooling sensible slots always carry a number, 0 included.

use crate::core::load::LoadVector;
use crate::core::units::round_half_up;
use crate::input::CorrectionFactors;
use indexmap::IndexMap;
use serde::Serialize;

/// Sensible-plus-latent totals per cooling column, and latent-plus-sensible
/// for heating.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CombinedRow {
    pub cool_9: f64,
    pub cool_12: f64,
    pub cool_14: f64,
    pub cool_16: f64,
    pub heating: f64,
}

/// Combined totals divided by room floor area. Only present when the room
/// has positive area; the heating slot is additionally absent when the
/// combined heating total is zero.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PerAreaRow {
    pub cool_9: f64,
    pub cool_12: f64,
    pub cool_14: f64,
    pub cool_16: f64,
    pub heating: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MajorCells {
    pub envelope: LoadVector,
    pub internal: LoadVector,
    pub ventilation: LoadVector,
    /// Component-wise sum of the three category rows.
    pub raw_total: LoadVector,
    /// Raw total with the correction factors applied and re-rounded.
    pub corrected: LoadVector,
    pub combined: CombinedRow,
    pub per_area: Option<PerAreaRow>,
}

/// Builds the full result grid from the three category subtotals of a room.
pub fn compute_major_cells(
    envelope: LoadVector,
    internal: LoadVector,
    ventilation: LoadVector,
    area_m2: f64,
    correction: &CorrectionFactors,
) -> MajorCells {
    let raw_total = envelope + internal + ventilation;

    let corrected = LoadVector {
        cool_9: round_half_up(raw_total.cool_9 * correction.cool_9, 0),
        cool_12: round_half_up(raw_total.cool_12 * correction.cool_12, 0),
        cool_14: round_half_up(raw_total.cool_14 * correction.cool_14, 0),
        cool_16: round_half_up(raw_total.cool_16 * correction.cool_16, 0),
        cool_latent: round_half_up(raw_total.cool_latent * correction.cool_latent, 0),
        heat_sensible: round_half_up(raw_total.heat_sensible * correction.heat_sensible, 0),
        heat_latent: round_half_up(raw_total.heat_latent * correction.heat_latent, 0),
    };

    let combined = CombinedRow {
        cool_9: corrected.cool_9 + corrected.cool_latent,
        cool_12: corrected.cool_12 + corrected.cool_latent,
        cool_14: corrected.cool_14 + corrected.cool_latent,
        cool_16: corrected.cool_16 + corrected.cool_latent,
        heating: corrected.heat_latent + corrected.heat_sensible,
    };

    let per_area = (area_m2 > 0.0).then(|| PerAreaRow {
        cool_9: round_half_up(combined.cool_9 / area_m2, 0),
        cool_12: round_half_up(combined.cool_12 / area_m2, 0),
        cool_14: round_half_up(combined.cool_14 / area_m2, 0),
        cool_16: round_half_up(combined.cool_16 / area_m2, 0),
        heating: (combined.heating != 0.0)
            .then(|| round_half_up(combined.heating / area_m2, 0)),
    });

    MajorCells {
        envelope,
        internal,
        ventilation,
        raw_total,
        corrected,
        combined,
        per_area,
    }
}

fn some_unless_zero(value: f64) -> Option<f64> {
    (value != 0.0).then_some(value)
}

impl MajorCells {
    /// The legacy spreadsheet key map. Column letters are N (cooling
    /// latent), R/X/AB/AF (cooling sensible at 9/12/14/16), AJ (heating
    /// latent) and AL (heating sensible); rows are 48 envelope, 50 internal,
    /// 52 outdoor air, 54 raw total, 55 corrected, 56 combined and 57 per
    /// unit area.
    pub fn to_cell_map(&self) -> IndexMap<String, Option<f64>> {
        let mut cells = IndexMap::new();
        let mut category_row = |row: u32, vector: &LoadVector| {
            cells.insert(format!("N{row}"), some_unless_zero(vector.cool_latent));
            cells.insert(format!("R{row}"), Some(vector.cool_9));
            cells.insert(format!("X{row}"), Some(vector.cool_12));
            cells.insert(format!("AB{row}"), Some(vector.cool_14));
            cells.insert(format!("AF{row}"), Some(vector.cool_16));
            cells.insert(format!("AJ{row}"), some_unless_zero(vector.heat_latent));
            cells.insert(format!("AL{row}"), some_unless_zero(vector.heat_sensible));
        };
        category_row(48, &self.envelope);
        category_row(50, &self.internal);
        category_row(52, &self.ventilation);
        category_row(54, &self.raw_total);
        category_row(55, &self.corrected);

        cells.insert("R56".to_string(), Some(self.combined.cool_9));
        cells.insert("X56".to_string(), Some(self.combined.cool_12));
        cells.insert("AB56".to_string(), Some(self.combined.cool_14));
        cells.insert("AF56".to_string(), Some(self.combined.cool_16));
        cells.insert("AJ56".to_string(), some_unless_zero(self.combined.heating));

        cells.insert("R57".to_string(), self.per_area.map(|row| row.cool_9));
        cells.insert("X57".to_string(), self.per_area.map(|row| row.cool_12));
        cells.insert("AB57".to_string(), self.per_area.map(|row| row.cool_14));
        cells.insert("AF57".to_string(), self.per_area.map(|row| row.cool_16));
        cells.insert(
            "AJ57".to_string(),
            self.per_area.and_then(|row| row.heating),
        );
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn envelope() -> LoadVector {
        LoadVector {
            cool_9: 100.0,
            cool_12: 200.0,
            cool_14: 300.0,
            cool_16: 250.0,
            cool_latent: 0.0,
            heat_sensible: 500.0,
            heat_latent: 0.0,
        }
    }

    #[fixture]
    fn internal() -> LoadVector {
        LoadVector {
            cool_9: 50.0,
            cool_12: 50.0,
            cool_14: 50.0,
            cool_16: 50.0,
            cool_latent: 20.0,
            heat_sensible: 0.0,
            heat_latent: 0.0,
        }
    }

    #[fixture]
    fn ventilation() -> LoadVector {
        LoadVector {
            cool_9: 400.0,
            cool_12: 600.0,
            cool_14: 800.0,
            cool_16: 700.0,
            cool_latent: 300.0,
            heat_sensible: 2100.0,
            heat_latent: 0.0,
        }
    }

    #[rstest]
    fn should_sum_categories_into_raw_total(
        envelope: LoadVector,
        internal: LoadVector,
        ventilation: LoadVector,
    ) {
        let cells = compute_major_cells(
            envelope,
            internal,
            ventilation,
            20.0,
            &CorrectionFactors::default(),
        );
        assert_eq!(cells.raw_total.cool_14, 1150.0);
        assert_eq!(cells.raw_total.cool_latent, 320.0);
        assert_eq!(cells.raw_total.heat_sensible, 2600.0);
    }

    #[rstest]
    fn should_round_corrected_cells_after_applying_factors(
        envelope: LoadVector,
        internal: LoadVector,
        ventilation: LoadVector,
    ) {
        let correction = CorrectionFactors {
            cool_14: 1.05,
            cool_latent: 1.15,
            ..Default::default()
        };
        let cells = compute_major_cells(envelope, internal, ventilation, 20.0, &correction);
        // 1150 · 1.05 = 1207.5 → half-up
        assert_eq!(cells.corrected.cool_14, 1208.0);
        // 320 · 1.15 = 368.0
        assert_eq!(cells.corrected.cool_latent, 368.0);
        assert_eq!(cells.combined.cool_14, 1576.0);
        assert_eq!(cells.per_area.unwrap().cool_14, 79.0);
    }

    #[rstest]
    fn should_null_latent_and_heating_cells_that_are_exactly_zero(
        envelope: LoadVector,
        internal: LoadVector,
        ventilation: LoadVector,
    ) {
        let map = compute_major_cells(
            envelope,
            internal,
            ventilation,
            20.0,
            &CorrectionFactors::default(),
        )
        .to_cell_map();
        // envelope has no latent load: null, not 0
        assert_eq!(map["N48"], None);
        assert_eq!(map["AJ48"], None);
        assert_eq!(map["AL48"], Some(500.0));
        // internal heating is zero under the exclusion policy
        assert_eq!(map["AL50"], None);
        // sensible cooling slots always carry a number
        assert_eq!(map["R50"], Some(50.0));
        assert_eq!(map["N50"], Some(20.0));
    }

    #[rstest]
    fn should_combine_corrected_sensible_and_latent(
        envelope: LoadVector,
        internal: LoadVector,
        ventilation: LoadVector,
    ) {
        let map = compute_major_cells(
            envelope,
            internal,
            ventilation,
            20.0,
            &CorrectionFactors::default(),
        )
        .to_cell_map();
        assert_eq!(map["R56"], Some(870.0));
        assert_eq!(map["AB56"], Some(1470.0));
        assert_eq!(map["AJ56"], Some(2600.0));
        // per unit area over 20 m²
        assert_eq!(map["AB57"], Some(74.0)); // 1470 / 20 = 73.5 → half-up
        assert_eq!(map["AJ57"], Some(130.0));
    }

    #[rstest]
    fn should_null_per_area_cells_for_degenerate_area(
        envelope: LoadVector,
        internal: LoadVector,
        ventilation: LoadVector,
    ) {
        let cells = compute_major_cells(
            envelope,
            internal,
            ventilation,
            0.0,
            &CorrectionFactors::default(),
        );
        assert_eq!(cells.per_area, None);
        let map = cells.to_cell_map();
        assert_eq!(map["R57"], None);
        assert_eq!(map["AJ57"], None);
        // the rest of the grid is unaffected
        assert_eq!(map["R56"], Some(870.0));
    }

    #[rstest]
    fn should_null_per_area_heating_when_combined_heating_is_zero(internal: LoadVector) {
        let cells = compute_major_cells(
            LoadVector::ZERO,
            internal,
            LoadVector::ZERO,
            10.0,
            &CorrectionFactors::default(),
        );
        let map = cells.to_cell_map();
        assert_eq!(map["AJ57"], None);
        assert_eq!(map["R57"], Some(7.0));
    }
}
