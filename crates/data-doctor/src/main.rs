//! CLI entry point for the data-quality pipeline.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use data_doctor::reporting::{AuditReport, ReportGenerator, ReportPaths};
use data_doctor::{
    CategoricalStrategy, DriftRecord, NumericStrategy, Pipeline, PipelineConfig,
    PipelineConfigBuilder, PipelineResult, ProblemType, Suggestion, SvgDriftVisualizer, loader,
};
use dotenv::dotenv;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// CLI-compatible numeric imputation strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliNumericStrategy {
    /// Use the mean of observed values
    Mean,
    /// Use the median of observed values
    Median,
}

impl From<CliNumericStrategy> for NumericStrategy {
    fn from(cli: CliNumericStrategy) -> Self {
        match cli {
            CliNumericStrategy::Mean => NumericStrategy::Mean,
            CliNumericStrategy::Median => NumericStrategy::Median,
        }
    }
}

/// CLI-compatible categorical imputation strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliCategoricalStrategy {
    /// Use the most frequent value (mode)
    MostFrequent,
    /// Use the reserved "__MISSING__" token
    Constant,
}

impl From<CliCategoricalStrategy> for CategoricalStrategy {
    fn from(cli: CliCategoricalStrategy) -> Self {
        match cli {
            CliCategoricalStrategy::MostFrequent => CategoricalStrategy::MostFrequent,
            CliCategoricalStrategy::Constant => CategoricalStrategy::Constant,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliProblemType {
    Classification,
    Regression,
}

impl From<CliProblemType> for ProblemType {
    fn from(cli: CliProblemType) -> Self {
        match cli {
            CliProblemType::Classification => ProblemType::Classification,
            CliProblemType::Regression => ProblemType::Regression,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Data-quality audit and cleaning for tabular datasets",
    long_about = "Profiles a CSV dataset, imputes missing values, removes duplicates and \
                  reports drift against an optional baseline.\n\n\
                  OUTPUTS (in --output):\n  \
                  cleaned_output.csv    imputed and deduplicated dataset\n  \
                  audit_report.md       human-readable audit report\n  \
                  audit_report.json     full result record\n  \
                  plots/                drift artifacts (with --baseline --plots)\n\n\
                  EXAMPLES:\n  \
                  # Basic audit\n  \
                  data-doctor -i data.csv\n\n  \
                  # Compare against last month's extract and render drift plots\n  \
                  data-doctor -i data.csv --baseline last_month.csv --plots\n\n  \
                  # Pick the imputation strategy empirically\n  \
                  data-doctor -i data.csv --evaluate-imputations --target churned"
)]
struct Args {
    /// Path to the CSV file to audit
    #[arg(short, long)]
    input: PathBuf,

    /// Baseline CSV for drift detection
    #[arg(short, long)]
    baseline: Option<PathBuf>,

    /// Output directory for results
    #[arg(short, long, default_value = "outputs")]
    output: PathBuf,

    /// JSON pipeline configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Score every imputation pairing and use the best one
    #[arg(long)]
    evaluate_imputations: bool,

    /// Target column for the imputation strategy search
    #[arg(short, long)]
    target: Option<String>,

    /// Problem type of the target column
    #[arg(long, value_enum)]
    problem_type: Option<CliProblemType>,

    /// Strategy for imputing missing numeric values
    #[arg(long, value_enum)]
    numeric_imputation: Option<CliNumericStrategy>,

    /// Strategy for imputing missing non-numeric values
    #[arg(long, value_enum)]
    categorical_imputation: Option<CliCategoricalStrategy>,

    /// Columns that identify a duplicate row (default: all columns)
    #[arg(long, value_delimiter = ',')]
    dedupe_on: Option<Vec<String>>,

    /// Columns compared for drift (default: columns shared with the baseline)
    #[arg(long, value_delimiter = ',')]
    drift_columns: Option<Vec<String>>,

    /// Draw drift charts (SVG) to <output>/plots
    #[arg(long)]
    plots: bool,

    /// Print the JSON report to stdout instead of a summary
    ///
    /// Disables all logging so stdout carries only JSON.
    #[arg(long)]
    json: bool,

    /// Suppress progress output (only show warnings and errors)
    #[arg(short, long)]
    quiet: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    dotenv().ok();

    let config = build_config(&args)?;

    info!("Loading dataset from: {}", args.input.display());
    let data = loader::load_csv(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;

    let baseline = args
        .baseline
        .as_ref()
        .map(|path| {
            info!("Loading baseline from: {}", path.display());
            loader::load_csv(path).with_context(|| format!("Failed to load baseline {}", path.display()))
        })
        .transpose()?;

    let pipeline = build_pipeline(&args, config)?;
    let result = pipeline.run(&data, baseline.as_ref()).map_err(|e| {
        error!("Pipeline failed: {}", e);
        anyhow!("Pipeline failed: {}", e)
    })?;

    let input_name = args.input.display().to_string();
    let generator = ReportGenerator::new(args.output.clone());
    let paths = generator
        .write_all(&input_name, &result)
        .context("Failed to write outputs")?;

    if args.json {
        let report: AuditReport<'_> = ReportGenerator::build_report(&input_name, &result);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_human_readable_summary(&input_name, &result, &paths);
    Ok(())
}

/// Start from the config file (if any) and apply command-line overrides.
fn build_config(args: &Args) -> Result<PipelineConfig> {
    let base = match &args.config {
        Some(path) => read_config_file(path)?,
        None => PipelineConfig::default(),
    };

    let mut builder = PipelineConfigBuilder::from_config(base);

    if args.evaluate_imputations {
        builder = builder.evaluate_imputations(true);
    }
    if let Some(target) = &args.target {
        builder = builder.target_column(target);
    }
    if let Some(problem_type) = args.problem_type {
        builder = builder.problem_type(problem_type.into());
    }
    if let Some(strategy) = args.numeric_imputation {
        builder = builder.numeric_imputation(strategy.into());
    }
    if let Some(strategy) = args.categorical_imputation {
        builder = builder.categorical_imputation(strategy.into());
    }
    if let Some(columns) = &args.dedupe_on {
        builder = builder.dedupe_subset(columns.iter().cloned());
    }
    if let Some(columns) = &args.drift_columns {
        builder = builder.drift_columns(columns.iter().cloned());
    }

    Ok(builder.build()?)
}

fn read_config_file(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = serde_json::from_str(&content)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

fn build_pipeline(args: &Args, config: PipelineConfig) -> Result<Pipeline> {
    let mut builder = Pipeline::builder().config(config);

    if args.plots {
        builder = builder.drift_visualizer(Arc::new(SvgDriftVisualizer::new(&args.output)));
    }

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:>3.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

/// Print a human-readable summary of the run.
///
/// Uses `println!` on purpose: this is the command's output, not logging.
fn print_human_readable_summary(input: &str, result: &PipelineResult, paths: &ReportPaths) {
    let summary = &result.summary;

    println!();
    println!("{}", "=".repeat(80));
    println!("AUDIT COMPLETE");
    println!("{}", "=".repeat(80));
    println!();
    println!("Input: {} ({} rows x {} columns)", input, summary.rows_before, summary.columns);
    println!(
        "Rows: {} -> {} ({} duplicates removed)",
        summary.rows_before, summary.rows_after, result.dedupe_meta.removed_duplicates
    );
    println!(
        "Missing cells: {} -> {} (completeness {:.1}%)",
        summary.missing_before,
        summary.missing_after,
        summary.completeness_after() * 100.0
    );
    println!("Duration: {}ms", summary.duration_ms);
    println!();

    if let Some(search) = &result.strategy_search {
        match &search.best {
            Some(best) => println!(
                "Best imputation strategy for '{}': {} (score {:.4})",
                search.target_column, best.pair, best.score
            ),
            None => println!(
                "No imputation strategy could be evaluated for '{}'; defaults used",
                search.target_column
            ),
        }
        println!();
    }

    let flagged: Vec<_> = result
        .suggestions
        .iter()
        .filter(|(_, s)| **s != Suggestion::CleanOk)
        .collect();
    if !flagged.is_empty() {
        println!("Suggestions:");
        for (column, suggestion) in flagged {
            println!("  - {}: {}", column, suggestion.as_str());
        }
        println!();
    }

    let drifted: Vec<_> = result
        .drift
        .iter()
        .filter_map(|(column, record)| match record {
            DriftRecord::Computed { mean_diff, .. } if *mean_diff != 0.0 => Some((column, *mean_diff)),
            _ => None,
        })
        .collect();
    if !result.drift.is_empty() {
        println!("Drift: {} columns compared, {} shifted", result.drift.len(), drifted.len());
        for (column, diff) in drifted {
            println!("  - {}: mean_diff {:+.4}", column, diff);
        }
        println!();
    }

    println!("Outputs:");
    println!("  - {}", paths.cleaned_csv.display());
    println!("  - {}", paths.markdown_report.display());
    println!("  - {}", paths.json_report.display());
    if !result.drift_plots.is_empty() {
        println!("  - {} drift plots", result.drift_plots.len());
    }
    println!("{}", "=".repeat(80));
}
