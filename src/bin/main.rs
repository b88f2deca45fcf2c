//! recbench Command Line Interface
//!
//! Runs cross-validated benchmarks of rating prediction algorithms on
//! MovieLens-style datasets and inspects or compares the resulting tables.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info};
use recbench::core::{RatingScale, ResultRecord, Result};
use recbench::runner::RunReport;
use recbench::{
    resolve, AlgorithmKind, AlgorithmSelection, BenchmarkConfig, BenchmarkRunner, Comparison,
    ComparisonEngine, DatasetId, FailurePolicy, ResultStore, SourceFormat, WriteMode,
};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "recbench")]
#[command(about = "Cross-validated benchmarks for rating prediction algorithms")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "recbench Contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Benchmark algorithms on a dataset and record the results
    Run(RunArgs),
    /// Compare two result tables
    Compare(CompareArgs),
    /// Summarize a result table
    Show(ShowArgs),
    /// List the available algorithms and their default options
    Algorithms,
}

#[derive(Args)]
struct RunArgs {
    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Catalog dataset to benchmark
    #[arg(long)]
    dataset: Option<CliDataset>,

    /// Directory holding the catalog datasets
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Ratings file outside the catalog
    #[arg(long)]
    data: Option<PathBuf>,

    /// Format of --data (detected from the extension when omitted)
    #[arg(short, long)]
    format: Option<CliFormat>,

    /// Lowest valid rating in --data
    #[arg(long, default_value = "1.0")]
    scale_min: f64,

    /// Highest valid rating in --data
    #[arg(long, default_value = "5.0")]
    scale_max: f64,

    /// Dataset name recorded for --data (defaults to the file stem)
    #[arg(long)]
    name: Option<String>,

    /// Number of cross-validation folds
    #[arg(short = 'k', long)]
    folds: Option<usize>,

    /// Comma separated algorithm names, or "all"
    #[arg(short, long)]
    algorithms: Option<String>,

    /// Result table to write (defaults to <output_dir>/results_<dataset>.csv)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seed for the fold shuffle
    #[arg(short, long)]
    seed: Option<u64>,

    /// Skip failing folds instead of failing the algorithm
    #[arg(long)]
    best_effort: bool,

    /// Replace the result table instead of appending to it
    #[arg(long)]
    overwrite: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliDataset {
    /// MovieLens 100K (ml-100k/u.data)
    #[value(name = "100k")]
    MovieLens100k,
    /// MovieLens 32M (ml-32m/ratings.csv)
    #[value(name = "32m")]
    MovieLens32m,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliFormat {
    /// user item rating timestamp, whitespace separated
    #[value(name = "delimited")]
    Delimited,
    /// Headed CSV with userId,movieId,rating[,timestamp]
    #[value(name = "csv")]
    Csv,
}

impl From<CliDataset> for DatasetId {
    fn from(cli_dataset: CliDataset) -> Self {
        match cli_dataset {
            CliDataset::MovieLens100k => DatasetId::MovieLens100k,
            CliDataset::MovieLens32m => DatasetId::MovieLens32m,
        }
    }
}

impl From<CliFormat> for SourceFormat {
    fn from(cli_format: CliFormat) -> Self {
        match cli_format {
            CliFormat::Delimited => SourceFormat::Delimited,
            CliFormat::Csv => SourceFormat::Csv,
        }
    }
}

#[derive(Args)]
struct CompareArgs {
    /// First result table
    first: PathBuf,

    /// Second result table
    second: PathBuf,

    /// Write the comparison as CSV
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct ShowArgs {
    /// Result table
    file: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose || config_requests_verbose(&cli.command) {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Run(args) => run_command(args),
        Commands::Compare(args) => compare_command(args),
        Commands::Show(args) => show_command(args),
        Commands::Algorithms => algorithms_command(),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

/// Whether a run's configuration file sets `verbose`
fn config_requests_verbose(command: &Commands) -> bool {
    match command {
        Commands::Run(RunArgs {
            config: Some(path), ..
        }) => BenchmarkConfig::from_file(path).map_or(false, |c| c.verbose),
        _ => false,
    }
}

fn build_config(args: &RunArgs) -> Result<BenchmarkConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {path:?}");
            BenchmarkConfig::from_file(path)?
        }
        None => BenchmarkConfig::default(),
    };

    if let Some(dataset) = args.dataset {
        config = config.with_dataset(dataset.into());
    }
    if let Some(data_dir) = &args.data_dir {
        config = config.with_data_dir(data_dir);
    }
    if let Some(folds) = args.folds {
        config = config.with_folds(folds);
    }
    if let Some(algorithms) = &args.algorithms {
        config = config.with_algorithms(AlgorithmSelection::parse_list(algorithms));
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if args.best_effort {
        config = config.with_failure_policy(FailurePolicy::BestEffort);
    }
    if args.overwrite {
        config = config.with_write_mode(WriteMode::Overwrite);
    }

    config.validate()?;
    Ok(config)
}

fn run_command(args: RunArgs) -> Result<()> {
    let config = build_config(&args)?;

    // Resolve every algorithm before touching the data
    let entries = resolve(&config.algorithm_specs()?)?;
    info!(
        "Algorithms: {}",
        entries
            .iter()
            .map(|e| e.spec.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let (source, dataset_name) = match &args.data {
        Some(path) => {
            let scale = RatingScale::new(args.scale_min, args.scale_max)?;
            let format = args
                .format
                .map(SourceFormat::from)
                .unwrap_or_else(|| SourceFormat::detect(path));
            let name = args.name.clone().unwrap_or_else(|| file_label(path));
            (format.source(path, scale), name)
        }
        None => (
            config.dataset.source(&config.data_dir),
            config.dataset.name().to_string(),
        ),
    };

    info!("Loading ratings from {:?}", source.path());
    let dataset = source.load()?;
    info!(
        "Loaded {} ratings on scale {}",
        dataset.len(),
        dataset.scale()
    );

    let records = BenchmarkRunner::new(&config).run(&dataset, &dataset_name, &entries)?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| config.results_path_for(&dataset_name));
    ResultStore::append(&records, &output, config.write_mode)?;

    println!(
        "Benchmark on {dataset_name} ({} ratings, {} folds)",
        dataset.len(),
        config.folds
    );
    print_ranking(&records);
    println!("Results saved to: {}", output.display());

    Ok(())
}

fn compare_command(args: CompareArgs) -> Result<()> {
    let label_a = file_label(&args.first);
    let label_b = file_label(&args.second);

    let (first, second) = match (load_if_present(&args.first)?, load_if_present(&args.second)?) {
        (Some(first), Some(second)) => (first, second),
        (Some(store), None) => {
            print_single_table(&store, &label_a, &args.second);
            return Ok(());
        }
        (None, Some(store)) => {
            print_single_table(&store, &label_b, &args.first);
            return Ok(());
        }
        (None, None) => {
            println!(
                "No results found at {} or {}",
                args.first.display(),
                args.second.display()
            );
            return Ok(());
        }
    };

    match ComparisonEngine::compare(&first, &label_a, &second, &label_b) {
        Comparison::NoCommonAlgorithms {
            only_in_first,
            only_in_second,
        } => {
            println!("No common algorithms between {label_a} and {label_b}");
            println!("Only in {label_a}: {}", list_or_none(&only_in_first));
            println!("Only in {label_b}: {}", list_or_none(&only_in_second));
        }
        Comparison::Common(table) => {
            let (a, b) = table.column_labels();
            println!(
                "{:<18} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
                "Algorithm",
                format!("RMSE_{a}"),
                format!("RMSE_{b}"),
                "RMSE_diff",
                format!("MAE_{a}"),
                format!("MAE_{b}"),
                "MAE_diff",
                format!("Time_{a}"),
                format!("Time_{b}")
            );
            for row in &table.rows {
                println!(
                    "{:<18} {:>10.4} {:>10.4} {:>+10.4} {:>10.4} {:>10.4} {:>+10.4} {:>10.2} {:>10.2}",
                    row.algorithm,
                    row.rmse_a,
                    row.rmse_b,
                    row.rmse_diff,
                    row.mae_a,
                    row.mae_b,
                    row.mae_diff,
                    row.time_a,
                    row.time_b
                );
            }
            if let Some(best) = table.best_first() {
                println!("Best on {a}: {} (RMSE {:.4})", best.algorithm, best.rmse_a);
            }
            if let Some(best) = table.best_second() {
                println!("Best on {b}: {} (RMSE {:.4})", best.algorithm, best.rmse_b);
            }
            if !table.only_in_first.is_empty() {
                println!("Only in {a}: {}", table.only_in_first.join(", "));
            }
            if !table.only_in_second.is_empty() {
                println!("Only in {b}: {}", table.only_in_second.join(", "));
            }
            if let Some(output) = &args.output {
                table.save(output)?;
                println!("Comparison saved to: {}", output.display());
            }
        }
    }

    Ok(())
}

fn show_command(args: ShowArgs) -> Result<()> {
    let store = ResultStore::load(&args.file)?;

    println!("Result table: {}", args.file.display());
    println!("Rows: {}", store.len());
    println!(
        "Algorithms: {}",
        list_or_none(
            &store
                .successful_algorithms()
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        )
    );
    println!("Failed rows: {}", store.failures().len());
    if let Some(last) = store.last_run() {
        println!("Last run: {}", last.format(recbench::persistence::TIMESTAMP_FORMAT));
    }

    let latest: Vec<ResultRecord> = store.latest().into_iter().cloned().collect();
    print_ranking(&latest);
    for failed in store.failures() {
        println!(
            "  {} failed at {}: {}",
            failed.algorithm,
            failed.timestamp,
            failed.error().unwrap_or_default()
        );
    }

    Ok(())
}

fn algorithms_command() -> Result<()> {
    println!("Available algorithms:");
    for kind in AlgorithmKind::ALL {
        println!("  {:<16} {}", kind.name(), kind.default_params().describe());
    }
    Ok(())
}

fn print_ranking(records: &[ResultRecord]) {
    let report = RunReport::new(records);
    let ranked = report.rank_by_rmse();

    if !ranked.is_empty() {
        println!(
            "{:<4} {:<18} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "Rank", "Algorithm", "RMSE", "RMSE_std", "MAE", "MAE_std", "Time(s)"
        );
    }
    for (rank, record) in ranked.iter().enumerate() {
        if let Some(m) = record.metrics() {
            println!(
                "{:<4} {:<18} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.2}",
                rank + 1,
                record.algorithm,
                m.summary.rmse_mean,
                m.summary.rmse_std,
                m.summary.mae_mean,
                m.summary.mae_std,
                m.total_time
            );
        }
    }

    if let Some(best) = report.best_rmse() {
        println!("Best RMSE: {}", best.algorithm);
    }
    if let Some(best) = report.best_mae() {
        println!("Best MAE: {}", best.algorithm);
    }
    if let (Some(fastest), Some(slowest)) = (report.fastest(), report.slowest()) {
        println!("Fastest: {}, slowest: {}", fastest.algorithm, slowest.algorithm);
    }
    let failures = report.failures();
    if !failures.is_empty() {
        println!(
            "Failed: {}",
            failures
                .iter()
                .map(|r| r.algorithm.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}

/// Short label for a result or data file: its stem without a `results_` prefix
fn print_single_table(store: &ResultStore, label: &str, missing: &Path) {
    println!("No results at {}, nothing to compare", missing.display());
    println!("Results for {label}:");
    print_ranking(store.records());
}

/// A missing table means no prior results
fn load_if_present(path: &Path) -> Result<Option<ResultStore>> {
    match ResultStore::load(path) {
        Ok(store) => Ok(Some(store)),
        Err(e) if e.is_not_found() => {
            info!("No results at {}", path.display());
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn file_label(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("results");
    stem.strip_prefix("results_").unwrap_or(stem).to_string()
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}
