//! `tb-reducer` command-line interface

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use tb_reducer::reduce::parse_ops;
use tb_reducer::{
    load, reduce_with, write_reduced, DuplicatePolicy, LoadOptions, StepPolicy, TagPolicy,
};

/// Environment variable holding a tracing filter directive
const LOG_ENV: &str = "TB_REDUCER_LOG";

#[derive(Parser)]
#[command(name = "tb-reducer", version)]
#[command(about = "Reduce multiple TensorBoard runs to new event files or a data file")]
struct Cli {
    /// Run directories to reduce (let the shell expand globs)
    #[arg(required = true)]
    input_dirs: Vec<PathBuf>,

    /// Output path: a directory prefix for event files, or a .csv, .json or
    /// .parquet file (.csv and .json may end in .gz or .zst)
    #[arg(short = 'o', long)]
    outpath: PathBuf,

    /// Comma-separated reduce operations
    #[arg(short = 'r', long, default_value = "mean", value_delimiter = ',')]
    reduce_ops: Vec<String>,

    /// Replace existing outputs written by a previous run
    #[arg(short = 'f', long)]
    overwrite: bool,

    /// Align each tag over the runs that contain it instead of requiring
    /// identical tag sets
    #[arg(long)]
    lax_tags: bool,

    /// Allow runs to log different numbers of steps for a tag
    #[arg(long)]
    lax_steps: bool,

    /// How to treat repeated steps within a run (rejected if not set)
    #[arg(long, value_enum)]
    handle_dup_steps: Option<DupSteps>,

    /// Outer-join steps and keep those logged by at least N runs
    #[arg(long, value_name = "N")]
    min_runs_per_step: Option<usize>,

    /// Enable debug logging
    #[arg(long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum DupSteps {
    KeepFirst,
    KeepLast,
    Mean,
}

impl From<DupSteps> for DuplicatePolicy {
    fn from(value: DupSteps) -> Self {
        match value {
            DupSteps::KeepFirst => Self::KeepFirst,
            DupSteps::KeepLast => Self::KeepLast,
            DupSteps::Mean => Self::Mean,
        }
    }
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        let mut options = LoadOptions::new();
        if self.lax_tags {
            options = options.tag_policy(TagPolicy::Lax);
        }
        if self.lax_steps {
            options = options.step_policy(StepPolicy::Lax);
        }
        if let Some(policy) = self.handle_dup_steps {
            options = options.duplicate_policy(policy.into());
        }
        if let Some(min_runs) = self.min_runs_per_step {
            options = options.min_runs_per_step(min_runs);
        }
        options
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // fail on bad op names before reading any run
    let ops = parse_ops(&cli.reduce_ops)?;

    let aligned = load(&cli.input_dirs, &cli.load_options()).context("failed to load runs")?;
    let reduced = reduce_with(&aligned, &ops).context("failed to reduce runs")?;
    let written = write_reduced(&reduced, &cli.outpath, cli.overwrite)
        .with_context(|| format!("failed to write '{}'", cli.outpath.display()))?;

    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}
