use anyhow::{Context, Result};
use clap::Parser;
use claimscope::columns::LOSS_RATIO;
use claimscope::hypothesis::{self, GroupComparison, TestPlan, DEFAULT_ALPHA};
use claimscope::{io, logging};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Hypothesis tests of risk differences across claim groups"
)]
struct Args {
    /// Cleaned claims CSV
    #[arg(long)]
    input: PathBuf,
    /// Significance level for the Tukey HSD follow-up
    #[arg(long, default_value_t = DEFAULT_ALPHA)]
    alpha: f64,
    /// Test claim frequency (has_claim) against this column; repeatable
    #[arg(long = "frequency-by", value_name = "COL")]
    frequency_by: Vec<String>,
    /// Welch t-test of --value-column between two groups, e.g. Gender=Male,Female; repeatable
    #[arg(long, value_name = "COL=A,B")]
    compare: Vec<GroupComparison>,
    /// Numeric column the --compare tests use
    #[arg(long, default_value = LOSS_RATIO)]
    value_column: String,
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let mut df = io::read_tabular(&args.input, &[])
        .with_context(|| format!("Failed to load {}", args.input.display()))?;
    if hypothesis::add_claim_indicator(&mut df)? {
        info!("Added has_claim indicator");
    }

    let plan = TestPlan {
        alpha: args.alpha,
        frequency_by: args.frequency_by,
        comparisons: args.compare,
        value_column: args.value_column,
    };
    let results = hypothesis::run_all_tests(&df, &plan)?;
    println!(
        "Test results: {}",
        serde_json::to_string(&results).context("Failed to serialize test results")?
    );
    Ok(())
}
