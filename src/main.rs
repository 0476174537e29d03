//! CLI entry point for the investor rater.
//!
//! Provides subcommands for scoring one investor and for exporting the
//! enriched company table.

use std::ffi::OsStr;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use investor_rater::config::PipelineConfig;
use investor_rater::output::{
    RunRecord, ScoredEventRow, append_record, print_json, print_pretty, write_records,
};
use investor_rater::pipeline::{run_features, run_score};
use investor_rater::scoring::types::InvestorKey;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "investor_rater")]
#[command(about = "Scores startup investors from historical investment records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Input tables and pipeline settings shared by every subcommand.
#[derive(Args)]
struct InputArgs {
    /// Investment relationship table (CSV, optionally .gz)
    #[arg(long = "investment-relationship-path", visible_alias = "ir-path")]
    investment_relationship_path: String,

    /// Company details table (CSV, optionally .gz)
    #[arg(long = "company-details-path", visible_alias = "cd-path")]
    company_details_path: String,

    /// JSON file with pipeline settings
    #[arg(long)]
    config: Option<String>,

    /// Year company ages are measured against (defaults to the current year)
    #[arg(long)]
    reference_year: Option<i32>,

    /// Seed for reproducible peer grouping
    #[arg(long)]
    seed: Option<u64>,

    /// Number of peer groups
    #[arg(long)]
    clusters: Option<usize>,
}

impl InputArgs {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)
                .with_context(|| format!("failed to load config from '{path}'"))?,
            None => PipelineConfig::default(),
        };
        if self.reference_year.is_some() {
            config.reference_year = self.reference_year;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(clusters) = self.clusters {
            config.n_clusters = clusters;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the mean investment score of one investor
    Score {
        #[command(flatten)]
        input: InputArgs,

        /// Investing company id
        #[arg(long = "company-id", conflicts_with = "person_id", required_unless_present = "person_id")]
        company_id: Option<i64>,

        /// Investing person id
        #[arg(long = "person-id")]
        person_id: Option<i64>,

        /// CSV file to append the result to
        #[arg(short, long)]
        output: Option<String>,

        /// CSV file to write every scored investment event to
        #[arg(long)]
        scores_out: Option<String>,

        /// Log the result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Export the company table with age, performance and peer group
    Features {
        #[command(flatten)]
        input: InputArgs,

        /// CSV file to write the enriched company table to
        #[arg(short, long, default_value = "company_features.csv")]
        output: String,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/investor_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("investor_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Score {
            input,
            company_id,
            person_id,
            output,
            scores_out,
            json,
        } => {
            let investor = match (company_id, person_id) {
                (Some(id), _) => InvestorKey::Company(id),
                (None, Some(id)) => InvestorKey::Person(id),
                (None, None) => anyhow::bail!(
                    "Pass at least one of the following: --company-id, --person-id"
                ),
            };
            let config = input.pipeline_config()?;

            let (result, run) = run_score(
                &input.investment_relationship_path,
                &input.company_details_path,
                investor,
                &config,
            )?;

            if let Some(path) = scores_out {
                write_records(&path, run.scored.iter().map(ScoredEventRow::from))
                    .with_context(|| format!("failed to write scored events to '{path}'"))?;
            }
            if let Some(path) = output {
                append_record(&path, &RunRecord::new(&result, config.reference_year(), config.seed))
                    .with_context(|| format!("failed to append result to '{path}'"))?;
            }

            if json {
                print_json(&result)?;
            } else {
                print_pretty(&result);
            }
            info!(investor = %investor, score = result.score, "Score for the investor");
            println!("{}", result.score);
        }
        Commands::Features { input, output } => {
            let config = input.pipeline_config()?;
            let features = run_features(
                &input.investment_relationship_path,
                &input.company_details_path,
                &config,
            )?;
            write_records(&output, &features)
                .with_context(|| format!("failed to write company features to '{output}'"))?;
        }
    }

    Ok(())
}
