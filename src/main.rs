extern crate heatload;

use clap::Parser;
use heatload::core::reference::ReferenceRepository;
use heatload::output::FileOutput;
use heatload::run_project;
use std::ffi::OsStr;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct HeatLoadArgs {
    /// Project JSON file to calculate
    input_file: String,
    /// Directory holding the reference tables as `<table name>.json` files
    #[arg(long, short)]
    reference_dir: PathBuf,
    /// Directory the result files are written to (defaults to the input
    /// file's directory)
    #[arg(long, short)]
    output_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = HeatLoadArgs::parse();

    let input_path = Path::new(&args.input_file);
    let input_stem = input_path
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("project");
    let output_dir = args.output_dir.unwrap_or_else(|| {
        input_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    });

    let references = ReferenceRepository::from_dir(args.reference_dir);
    let output = FileOutput::new(output_dir, format!("{input_stem}_{{}}"));
    let input = BufReader::new(File::open(input_path)?);

    let result = run_project(input, &references, output)?;
    println!(
        "calculated {} room(s), {} system(s)",
        result.room_results.len(),
        result.system_results.len()
    );

    Ok(())
}
