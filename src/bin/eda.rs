use anyhow::{Context, Result};
use clap::Parser;
use claimscope::{eda, io, logging, columns::TRANSACTION_MONTH};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Descriptive plots of an insurance claims table"
)]
struct Args {
    /// Cleaned claims CSV
    #[arg(long)]
    input: PathBuf,
    /// Directory the PNG figures are written to
    #[arg(long)]
    outdir: PathBuf,
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    info!("Starting EDA on {}", args.input.display());
    let df = io::read_tabular(&args.input, &[TRANSACTION_MONTH])
        .with_context(|| format!("Failed to load {}", args.input.display()))?;
    eda::run_eda(&df, &args.outdir)?;
    Ok(())
}
