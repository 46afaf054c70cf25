//! revlens - LLM-powered customer review analyzer
//!
//! A CLI tool that uses Ollama to fold product reviews into running
//! per-product memories, gate analyses on dataset quality, and
//! generate review signal reports.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, dataset failure, etc.)
//!   2 - Quality gate closed for every product (nothing authorized)

mod analysis;
mod cli;
mod config;
mod context;
mod dataset;
mod memory;
mod models;
mod oracle;
mod quality;
mod report;
mod selfeval;
mod weighting;

use analysis::features::FeatureKind;
use analysis::trend::TimeSpan;
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::Config;
use dataset::{RawReview, ReviewRecord};
use memory::ProductMemory;
use models::{
    AnalysisTask, OverallLabel, ProductAnalysis, QualityMetrics, RecentReview, Report,
    ReportMetadata,
};
use oracle::{OllamaOracle, Oracle, OracleConfig};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// How many of the latest folded reviews the report shows per product.
const RECENT_REVIEWS_SHOWN: usize = 5;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("revlens v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Run the analysis
    match run_analysis(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .revlens.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".revlens.toml");

    if path.exists() {
        eprintln!("⚠️  .revlens.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .revlens.toml")?;

    println!("✅ Created .revlens.toml with default settings.");
    println!("   Edit it to customize model, dataset paths, trend span, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete analysis workflow. Returns exit code (0 or 2).
async fn run_analysis(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let input = config
        .dataset
        .input
        .clone()
        .context("No dataset given. Pass --input or set [dataset] input in .revlens.toml")?;
    let input_path = PathBuf::from(&input);

    // Try to load config shipped next to the dataset
    if let Ok(Some(dataset_config)) = Config::load_near(&input_path) {
        info!("Found .revlens.toml next to the dataset");
        config = dataset_config;
        config.merge_with_args(&args);
    }

    // Step 1: Load the dataset
    println!("📥 Loading reviews: {}", input);
    let rows = load_reviews(&input_path)?;

    let total_rows = rows.len();
    let products = dataset::group_by_product(rows);
    println!("   {} products, {} reviews", products.len(), total_rows);

    // Handle --dry-run: assess quality and exit
    if args.dry_run {
        return handle_dry_run(&products);
    }

    // Step 2: Initialize the oracle
    println!("🤖 Initializing analyst...");
    println!("   Model: {}", config.model.name);
    println!("   Ollama: {}", config.model.ollama_url);
    println!("   Timeout: {}s", config.model.timeout_seconds);

    let oracle = OllamaOracle::new(OracleConfig::from(&config.model));
    let span = TimeSpan::from(config.analysis.trend_span.as_str());

    let memory_dir = config.dataset.memory_dir.as_ref().map(PathBuf::from);
    if let Some(ref dir) = memory_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create memory directory {}", dir.display()))?;
    }

    // Step 3: Analyze each product in turn
    let mut analyses: Vec<ProductAnalysis> = Vec::new();
    let mut reviews_total = 0usize;
    let mut reviews_accepted = 0usize;

    for (product_name, raw_rows) in &products {
        println!(
            "\n🔬 Analyzing {} ({} reviews)...",
            product_name,
            raw_rows.len()
        );

        let quality = quality::assess(raw_rows);
        let tasks = quality::select_tasks(quality.as_ref(), raw_rows.len());

        if tasks.is_empty() {
            warn!("Quality gate closed for {}", product_name);
            println!("   ⛔ Quality gate closed; no analysis authorized.");
            analyses.push(gate_closed_analysis(product_name, quality));
            continue;
        }
        info!("Authorized tasks for {}: {:?}", product_name, tasks);

        let records: Vec<ReviewRecord> = raw_rows.iter().map(ReviewRecord::from).collect();
        let mut memory = load_or_new_memory(memory_dir.as_deref(), product_name)?;

        // The fold is the expensive part: one oracle call per review.
        let stats =
            analysis::sentiment::run_sentiment_pass(&oracle, &records, &mut memory, !args.quiet)
                .await;
        reviews_total += stats.folded;
        reviews_accepted += stats.accepted;

        let (overall, overall_score) =
            weighting::rollup_overall(&mut memory, Utc::now().date_naive())
                .with_context(|| format!("Sentiment rollup failed for {}", product_name))?;
        println!(
            "   {} Overall: {} (score {:.2})",
            overall.emoji(),
            overall,
            overall_score
        );

        let top_usps = if config.analysis.run_features && tasks.contains(&AnalysisTask::Usps) {
            match analysis::features::extract_features(&oracle, &memory, FeatureKind::Usps).await {
                Ok(digest) => digest.top_features,
                Err(e) => {
                    error!("USP extraction failed for {}: {}", product_name, e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let top_issues = if config.analysis.run_features && tasks.contains(&AnalysisTask::Issues) {
            match analysis::features::extract_features(&oracle, &memory, FeatureKind::Issues).await
            {
                Ok(digest) => digest.top_features,
                Err(e) => {
                    error!("Issue extraction failed for {}: {}", product_name, e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let (trend_report, trend_metrics) = if tasks.contains(&AnalysisTask::TrendAnalysis) {
            match analysis::trend::run_trend_analysis(&oracle, &memory, span).await {
                Ok(Some((digest, metrics))) => (Some(digest), Some(metrics)),
                Ok(None) => (None, None),
                Err(e) => {
                    error!("Trend analysis failed for {}: {}", product_name, e);
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

        let narrative_summary =
            if config.analysis.run_summary && tasks.contains(&AnalysisTask::Summary) {
                match analysis::summary::run_summary(&oracle, &memory).await {
                    Ok(digest) => Some(digest),
                    Err(e) => {
                        error!("Summary failed for {}: {}", product_name, e);
                        None
                    }
                }
            } else {
                None
            };

        if let Some(ref dir) = memory_dir {
            let path = memory.save(dir)?;
            println!("   💾 Memory saved to {}", path.display());
        }

        let recent_reviews = memory
            .recent_reviews(RECENT_REVIEWS_SHOWN)
            .into_iter()
            .map(RecentReview::from)
            .collect();

        analyses.push(ProductAnalysis {
            product_name: product_name.clone(),
            quality,
            authorized_tasks: tasks,
            memory: memory.generate_summary(),
            overall_sentiment: overall,
            overall_sentiment_score: overall_score,
            top_usps,
            top_issues,
            recent_reviews,
            trend_metrics,
            trend_report,
            narrative_summary,
        });
    }

    // Step 4: Build and save the report
    println!("\n📝 Generating report...");

    let duration = start_time.elapsed().as_secs_f64();
    let gate_open = analyses
        .iter()
        .filter(|a| !a.authorized_tasks.is_empty())
        .count();

    let metadata = ReportMetadata {
        dataset: input.clone(),
        analysis_date: Utc::now(),
        model_used: oracle.model_name().to_string(),
        products_analyzed: analyses.len(),
        reviews_total,
        reviews_accepted,
        duration_seconds: duration,
    };

    let report = Report {
        metadata,
        products: analyses,
    };

    let output_path = PathBuf::from(&config.general.output);
    match args.format {
        OutputFormat::Json => report::write_json_report(&report, &output_path),
        OutputFormat::Markdown => report::write_report(&report, &output_path),
    }
    .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    // Print summary
    println!("\n📊 Analysis Summary:");
    println!(
        "   Products: {} ({} passed the quality gate)",
        report.products.len(),
        gate_open
    );
    println!(
        "   Reviews folded: {} ({} accepted)",
        reviews_total, reviews_accepted
    );
    println!("   Duration: {:.1}s", duration);
    println!(
        "\n✅ Analysis complete! Report saved to: {}",
        output_path.display()
    );

    if gate_open == 0 {
        eprintln!("\n⛔ The quality gate closed for every product. Failing (exit code 2).");
        return Ok(2);
    }

    Ok(0)
}

/// Handle --dry-run: assess quality per product, print the gate's
/// decision, exit without any LLM call.
fn handle_dry_run(products: &BTreeMap<String, Vec<RawReview>>) -> Result<i32> {
    println!("\n🔍 Dry run: assessing dataset quality (no LLM calls)...\n");

    let mut any_authorized = false;
    for (product_name, rows) in products {
        let quality = quality::assess(rows);
        let tasks = quality::select_tasks(quality.as_ref(), rows.len());

        if tasks.is_empty() {
            println!(
                "   ⛔ {} ({} reviews): quality gate closed",
                product_name,
                rows.len()
            );
        } else {
            any_authorized = true;
            let list = tasks
                .iter()
                .map(|task| task.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            println!("   ✅ {} ({} reviews): {}", product_name, rows.len(), list);
        }
    }

    println!("\n✅ Dry run complete. No LLM calls were made.");
    if !any_authorized {
        eprintln!("\n⛔ The quality gate closed for every product. Failing (exit code 2).");
        return Ok(2);
    }
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .revlens.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

/// Load review rows from a dataset file, or every dataset in a directory.
fn load_reviews(input: &Path) -> Result<Vec<RawReview>> {
    if input.is_dir() {
        let files = dataset::discover_datasets(input);
        if files.is_empty() {
            anyhow::bail!("No .json/.jsonl datasets found under {}", input.display());
        }
        info!("Discovered {} dataset files", files.len());

        let mut rows = Vec::new();
        for file in &files {
            rows.extend(dataset::load_rows(file)?);
        }
        Ok(rows)
    } else {
        Ok(dataset::load_rows(input)?)
    }
}

/// Resume a persisted memory snapshot if one exists, else start fresh.
fn load_or_new_memory(memory_dir: Option<&Path>, product_name: &str) -> Result<ProductMemory> {
    if let Some(dir) = memory_dir {
        let path = ProductMemory::snapshot_path(dir, product_name);
        if path.exists() {
            info!("Resuming memory snapshot {}", path.display());
            return ProductMemory::load(&path);
        }
    }
    Ok(ProductMemory::new(product_name))
}

/// Report entry for a product the quality gate rejected.
fn gate_closed_analysis(product_name: &str, quality: Option<QualityMetrics>) -> ProductAnalysis {
    let memory = ProductMemory::new(product_name);
    ProductAnalysis {
        product_name: product_name.to_string(),
        quality,
        authorized_tasks: Vec::new(),
        memory: memory.generate_summary(),
        overall_sentiment: OverallLabel::Unknown,
        overall_sentiment_score: 0.0,
        top_usps: Vec::new(),
        top_issues: Vec::new(),
        recent_reviews: Vec::new(),
        trend_metrics: None,
        trend_report: None,
        narrative_summary: None,
    }
}
