//! CLI entry point for exploring a CSV or Excel file.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use serde::Serialize;
use std::path::Path;
use tabletalk::{Aggregation, ChartKind, DataExplorer, ExplorerConfig, PlotAggregation};
use tracing::{debug, info};

/// CLI-compatible aggregation enum for top-k
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliAggregation {
    /// Sum the metric per group
    Sum,
    /// Average the metric per group
    Mean,
}

impl From<CliAggregation> for Aggregation {
    fn from(cli: CliAggregation) -> Self {
        match cli {
            CliAggregation::Sum => Aggregation::Sum,
            CliAggregation::Mean => Aggregation::Mean,
        }
    }
}

/// CLI-compatible chart kind enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliChartKind {
    Line,
    Bar,
    Area,
}

impl From<CliChartKind> for ChartKind {
    fn from(cli: CliChartKind) -> Self {
        match cli {
            CliChartKind::Line => ChartKind::Line,
            CliChartKind::Bar => ChartKind::Bar,
            CliChartKind::Area => ChartKind::Area,
        }
    }
}

/// CLI-compatible plot aggregation enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliPlotAggregation {
    Sum,
    Mean,
    /// Count non-null y values per x
    Count,
}

impl From<CliPlotAggregation> for PlotAggregation {
    fn from(cli: CliPlotAggregation) -> Self {
        match cli {
            CliPlotAggregation::Sum => PlotAggregation::Sum,
            CliPlotAggregation::Mean => PlotAggregation::Mean,
            CliPlotAggregation::Count => PlotAggregation::Count,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    disable_help_subcommand = true,
    about = "Conversational data exploration over CSV and Excel files",
    long_about = "Loads a CSV (or the first sheet of an Excel workbook), canonicalizes its \
                  headers and runs one analysis tool on it. Results are printed as JSON.\n\n\
                  EXAMPLES:\n  \
                  # Which columns are customers, sales, regions?\n  \
                  tabletalk -i sales.csv roles\n\n  \
                  # Top 10 customers by revenue\n  \
                  tabletalk -i sales.csv top-k --metric revenue --by customer --k 10\n\n  \
                  # Preview a filter\n  \
                  tabletalk -i sales.csv filter \"total_sales > 100 & region == 'West'\""
)]
struct Args {
    /// Path to the CSV or Excel file to load
    #[arg(short, long)]
    input: String,

    /// Table name used in the session (defaults to the file stem)
    #[arg(short, long)]
    name: Option<String>,

    /// JSON file with explorer settings; missing fields use defaults
    #[arg(short, long)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Numeric / datetime / categorical column buckets
    Schema,
    /// Columns detected for each business role
    Roles,
    /// Resolve a free-text term to a column
    Resolve { term: String },
    /// Key columns and headline insights
    Explore,
    /// Analysis ideas for the table
    Suggest,
    /// Descriptive statistics (all columns when none are given)
    Describe { columns: Vec<String> },
    /// Largest groups by an aggregated metric
    TopK {
        #[arg(long)]
        metric: String,
        #[arg(long)]
        by: String,
        #[arg(long)]
        k: Option<usize>,
        #[arg(long, value_enum, default_value = "sum")]
        agg: CliAggregation,
    },
    /// Preview rows matching a filter expression
    Filter {
        expression: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Chart data and description
    Plot {
        #[arg(long)]
        x: String,
        #[arg(long)]
        y: String,
        #[arg(long, value_enum, default_value = "line")]
        kind: CliChartKind,
        #[arg(long, value_enum)]
        agg: Option<CliPlotAggregation>,
    },
    /// Recovery hints for an error context such as "column not found"
    Help { context: String },
}

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr so stdout only carries the JSON result.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet);

    // Load environment variables from .env file
    dotenv().ok();

    let path = Path::new(&args.input);
    if !path.exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let config = match &args.config {
        Some(config_path) => ExplorerConfig::from_json_file(config_path)
            .with_context(|| format!("Loading config from {config_path}"))?,
        None => ExplorerConfig::default(),
    };
    debug!("Using config: {:?}", config);

    let explorer = DataExplorer::builder().config(config).build()?;

    let name = args.name.clone().unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data".to_string())
    });
    let bytes = std::fs::read(path).with_context(|| format!("Reading {}", args.input))?;

    info!("Loading dataset from: {}", args.input);
    let summary = explorer.ingest(None, &bytes, &name)?;
    info!(
        "Dataset loaded: {} rows x {} columns",
        summary.rows,
        summary.columns.len()
    );

    run_command(&explorer, &summary.session_id, args.command)
}

fn run_command(explorer: &DataExplorer, session: &str, command: Command) -> Result<()> {
    match command {
        Command::Schema => print_json(&explorer.schema(session)?),
        Command::Roles => print_json(&explorer.roles(session)?),
        Command::Resolve { term } => print_json(&explorer.resolve(session, &term)?),
        Command::Explore => print_json(&explorer.smart_explore(session)?),
        Command::Suggest => print_json(&explorer.suggest_analysis(session)?),
        Command::Describe { columns } => print_json(&explorer.describe(session, &columns)?),
        Command::TopK { metric, by, k, agg } => {
            print_json(&explorer.top_k(session, &metric, &by, k, agg.into())?)
        }
        Command::Filter { expression, limit } => {
            print_json(&explorer.filter_preview(session, &expression, limit)?)
        }
        Command::Plot { x, y, kind, agg } => print_json(&explorer.plot(
            session,
            &x,
            &y,
            kind.into(),
            agg.map(Into::into),
        )?),
        Command::Help { context } => print_json(&explorer.fallback_help(session, &context)?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
