//! Command-line entry point.
//!
//! ```text
//! # Run a walk-forward evaluation with the baseline model
//! scopewalk run --data matches.csv --labels outcome --features elo_home,elo_away
//!
//! # Print every train/test combination without fitting anything
//! scopewalk enumerate --data matches.csv --by League
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use polars::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use scopewalk::data::{load_csv, write_csv, Dataset};
use scopewalk::learner::{shared_model, MeanModel, Tester, Trainer, UpdatingLearner};
use scopewalk::scope::{
    DataSelector, EnumScopeConfig, Scope, ScopeSelector, WindowBound, WindowScopeConfig,
};

#[derive(Parser)]
#[command(name = "scopewalk")]
#[command(about = "Walk-forward evaluation over partitioned tabular data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a walk-forward evaluation with the baseline mean model
    Run {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Label columns (comma separated)
        #[arg(long, value_delimiter = ',', required = true)]
        labels: Vec<String>,

        /// Feature columns (comma separated)
        #[arg(long, value_delimiter = ',', default_value = "")]
        features: Vec<String>,

        /// Write the augmented dataset to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print every train/test combination the scopes yield, without fitting
    Enumerate {
        #[command(flatten)]
        scope: ScopeArgs,
    },
}

#[derive(Args)]
struct ScopeArgs {
    /// Path to the input CSV file
    #[arg(short, long)]
    data: PathBuf,

    /// Ordered column to window over
    #[arg(long, default_value = "Season")]
    time_col: String,

    /// First window start (defaults to the column minimum)
    #[arg(long)]
    start: Option<i64>,

    /// Window ceiling (defaults to the column maximum)
    #[arg(long)]
    max: Option<i64>,

    /// Initial training window width
    #[arg(long, default_value_t = 1)]
    train_size: i64,

    /// Rolling test window width
    #[arg(long, default_value_t = 1)]
    test_size: i64,

    /// Advance per step
    #[arg(long, default_value_t = 1)]
    stride: i64,

    /// Stratify by this categorical column (e.g. League)
    #[arg(long)]
    by: Option<String>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scope,
            labels,
            features,
            output,
        } => run(scope, labels, features, output),
        Commands::Enumerate { scope } => enumerate(scope),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(
    scope: ScopeArgs,
    labels: Vec<String>,
    features: Vec<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let frame = load_csv(&scope.data)
        .with_context(|| format!("loading {}", scope.data.display()))?;
    let features: Vec<&str> = features
        .iter()
        .map(String::as_str)
        .filter(|f| !f.is_empty())
        .collect();
    let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
    let dataset = Dataset::new(frame, &features, &labels)?;

    let selector = build_selector(&scope, &dataset)?;
    let model = shared_model(MeanModel::new());
    let mut learner = UpdatingLearner::new(
        Some(Trainer::new(model.clone())),
        Some(Tester::new(model)),
        selector,
    );

    let augmented = learner.compute(&dataset)?;
    let prediction_cols: Vec<&str> = augmented.prediction_columns().collect();
    info!(
        rows = augmented.height(),
        predictions = ?prediction_cols,
        "walk-forward evaluation finished"
    );

    if let Some(path) = output {
        let mut frame = augmented.dataframe().clone();
        write_csv(&mut frame, &path).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "augmented dataset written");
    }
    Ok(())
}

fn enumerate(scope: ScopeArgs) -> Result<()> {
    let frame = load_csv(&scope.data)
        .with_context(|| format!("loading {}", scope.data.display()))?;
    let dataset = Dataset::new(frame, &[], &[])?;
    let mut selector = build_selector(&scope, &dataset)?;

    let mut step = 0usize;
    while selector.holds() {
        step += 1;
        let train = selector.transform_train(&dataset)?;
        let test = selector.transform_test(&dataset)?;
        println!(
            "{:>4}: {} ({} train rows, {} test rows)",
            step,
            selector.describe(),
            train.height(),
            test.height()
        );
        selector.update();
    }
    println!("{} combinations", step);
    Ok(())
}

fn build_selector(scope: &ScopeArgs, dataset: &Dataset) -> Result<DataSelector> {
    let start = match scope.start {
        Some(v) => v,
        None => column_extreme(dataset, &scope.time_col, true)?,
    };
    let max = match scope.max {
        Some(v) => v,
        None => column_extreme(dataset, &scope.time_col, false)?,
    };

    let train_config = WindowScopeConfig {
        col: scope.time_col.clone(),
        start: WindowBound::Int(start),
        max: WindowBound::Int(max),
        size: scope.train_size,
        stride: scope.stride,
    };
    let test_config = WindowScopeConfig::testing_window(&train_config, scope.test_size);

    let mut train_chain = Vec::new();
    let mut test_chain = Vec::new();
    if let Some(by) = &scope.by {
        let enum_config = EnumScopeConfig {
            col: by.clone(),
            values: None,
        };
        train_chain.push(ScopeSelector::new(Scope::enumeration(enum_config.clone())?));
        test_chain.push(ScopeSelector::new(Scope::enumeration(enum_config)?));
    }
    train_chain.push(ScopeSelector::new(Scope::expander(train_config)?));
    test_chain.push(ScopeSelector::new(Scope::roller(test_config)?));

    Ok(DataSelector::new(train_chain, test_chain))
}

fn column_extreme(dataset: &Dataset, column: &str, min: bool) -> Result<i64> {
    let cast = dataset
        .dataframe()
        .column(column)
        .with_context(|| format!("column {column} not found"))?
        .cast(&DataType::Int64)?;
    let values = cast.i64()?;
    let extreme = if min { values.min() } else { values.max() };
    extreme.ok_or_else(|| anyhow!("column {column} has no values"))
}
