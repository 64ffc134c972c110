pub mod core;
pub mod corpus;
pub mod errors;
pub mod input;
pub mod output;

pub use crate::corpus::{run_calculation, CalcResult};
pub use crate::errors::HeatLoadError;

use crate::core::reference::ReferenceRepository;
use crate::corpus::RoomLoadSummary;
use crate::input::{ingest_for_processing, Project};
use crate::output::Output;
use csv::WriterBuilder;
use serde::Serialize;
use std::io::Read;
use tracing::info;

const RESULTS_LOCATION_KEY: &str = "results.json";
const ROOMS_LOCATION_KEY: &str = "rooms.csv";

#[derive(Serialize)]
struct ResultEnvelope<'a> {
    project_id: &'a str,
    project_name: &'a str,
    region: &'a str,
    result: &'a CalcResult,
}

/// Reads a project JSON payload, runs the calculation against the given
/// reference repository and writes the result files (full JSON envelope plus
/// a per-room CSV summary) through the output. The result is also returned
/// for callers that consume it directly.
pub fn run_project(
    input: impl Read,
    references: &ReferenceRepository,
    output: impl Output,
) -> Result<CalcResult, HeatLoadError> {
    let project = ingest_for_processing(input)?;
    let result = run_calculation(&project, references)?;
    if !output.is_noop() {
        write_results_file(&project, &result, &output).map_err(HeatLoadError::FailureInOutput)?;
        write_room_summary_file(&result.room_results, &output)
            .map_err(HeatLoadError::FailureInOutput)?;
    }
    Ok(result)
}

fn write_results_file(
    project: &Project,
    result: &CalcResult,
    output: &impl Output,
) -> anyhow::Result<()> {
    info!("writing calculation results to {RESULTS_LOCATION_KEY}");
    let writer = output.writer_for_location_key(RESULTS_LOCATION_KEY)?;
    serde_json::to_writer_pretty(
        writer,
        &ResultEnvelope {
            project_id: &project.id,
            project_name: &project.name,
            region: &project.region,
            result,
        },
    )?;
    Ok(())
}

fn write_room_summary_file(
    room_results: &[RoomLoadSummary],
    output: &impl Output,
) -> anyhow::Result<()> {
    info!("writing room summary to {ROOMS_LOCATION_KEY}");
    let writer = output.writer_for_location_key(ROOMS_LOCATION_KEY)?;
    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record([
        "room_id",
        "room_name",
        "cool_9_total_w",
        "cool_12_total_w",
        "cool_14_total_w",
        "cool_16_total_w",
        "heating_total_w",
    ])?;
    for room in room_results {
        writer.write_record([
            room.room_id.as_str(),
            room.room_name.as_str(),
            &room.final_totals.cool_9_total.to_string(),
            &room.final_totals.cool_12_total.to_string(),
            &room.final_totals.cool_14_total.to_string(),
            &room.final_totals.cool_16_total.to_string(),
            &room.final_totals.heating_total.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::BufferOutput;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::json;

    fn preset_project_payload() -> String {
        json!({
            "id": "p1", "name": "Preset project", "region": "東京",
            "rooms": [{"id": "r1", "name": "Office A", "area_m2": 10.0}],
            "surfaces": [{"id": "s1", "room_id": "r1", "kind": "wall", "preset_load": {
                "cool_9": 100.0, "cool_12": 120.0, "cool_14": 140.0,
                "cool_16": 130.0, "heat_sensible": 200.0
            }}]
        })
        .to_string()
    }

    #[rstest]
    fn should_write_result_envelope_and_room_summary() {
        let references = ReferenceRepository::default();
        let output = BufferOutput::default();
        let result = run_project(
            preset_project_payload().as_bytes(),
            &references,
            &output,
        )
        .expect("project runs");
        assert_eq!(result.totals.cool_14_total, 140.0);

        let envelope: serde_json::Value = serde_json::from_str(
            &output.contents(RESULTS_LOCATION_KEY).expect("results written"),
        )
        .expect("valid JSON envelope");
        assert_eq!(envelope["project_id"], "p1");
        assert_eq!(envelope["result"]["totals"]["heating_total"], 200.0);
        assert_eq!(envelope["result"]["major_cells"]["AB56"], 140.0);
        // null-vs-zero convention survives serialization
        assert_eq!(
            envelope["result"]["major_cells"]["N48"],
            serde_json::Value::Null
        );

        let rooms_csv = output.contents(ROOMS_LOCATION_KEY).expect("rooms written");
        let mut lines = rooms_csv.lines();
        assert_eq!(
            lines.next(),
            Some(
                "room_id,room_name,cool_9_total_w,cool_12_total_w,cool_14_total_w,\
                 cool_16_total_w,heating_total_w"
            )
        );
        assert_eq!(lines.next(), Some("r1,Office A,100,120,140,130,200"));
    }

    #[rstest]
    fn should_skip_writing_for_a_noop_output() {
        let references = ReferenceRepository::default();
        let result = run_project(
            preset_project_payload().as_bytes(),
            &references,
            crate::output::SinkOutput,
        )
        .expect("project runs");
        assert_eq!(result.room_results.len(), 1);
    }

    #[rstest]
    fn should_report_malformed_input_as_invalid() {
        let references = ReferenceRepository::default();
        let error = run_project(
            "{not json".as_bytes(),
            &references,
            crate::output::SinkOutput,
        )
        .expect_err("must fail");
        assert!(matches!(error, HeatLoadError::InvalidInput(_)));
    }
}
