//! drift_monitor: predicts over a current dataset (and optionally a
//! reference dataset) with the deployed model and writes a JSON report of
//! regression performance and per-column drift.
//!
//! ```bash
//! drift_monitor --current data/current.json \
//!     --reference data/reference.json \
//!     --model-uri file:///models/flight-price.json \
//!     --out reports/drift.json
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use flight_price_api::model::Model;
use flight_price_api::monitor::{build_report, write_report, Dataset};

#[derive(Parser, Debug)]
#[command(name = "drift_monitor", about = "Performance and drift report job")]
struct Args {
    /// Dataset to evaluate.
    #[arg(long)]
    current: PathBuf,

    /// Baseline dataset to compare against. Without it the report covers
    /// performance on the current data only.
    #[arg(long)]
    reference: Option<PathBuf>,

    /// URI of the model artifact.
    #[arg(long, env = "MODEL_URI")]
    model_uri: String,

    /// Where to write the JSON report.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let model = Model::load(&args.model_uri)?;
    let current = Dataset::load(&args.current)?;
    let reference = args
        .reference
        .as_deref()
        .map(Dataset::load)
        .transpose()?;

    let report = build_report(&model, &current, reference.as_ref())?;
    write_report(&report, &args.out)?;

    if let Some(drift) = &report.drift {
        tracing::info!(
            drifted_share = drift.drifted_share,
            dataset_drifted = drift.dataset_drifted,
            "drift computed"
        );
    }
    tracing::info!(
        rows = report.current.rows,
        rmse = report.current.rmse,
        report = %args.out.display(),
        "report written"
    );
    Ok(())
}
