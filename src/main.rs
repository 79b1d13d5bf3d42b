use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use placement_tracker::io::seed_roster;
use placement_tracker::stages::{effective_watermark, parse_timestamp};
use placement_tracker::{
    read_transcript, select_batch, AnthropicClient, AnthropicConfig, Extractor, Pipeline,
    PipelineConfig, PlacementReport, RetryPolicy, RosterFormat, SqliteStore,
};

#[derive(Parser)]
#[command(name = "placement-tracker")]
#[command(author, version, about = "Placement extraction from exported chat transcripts", long_about = None)]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, default_value = "placements.db")]
    db: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract placements from a transcript and reconcile them with the roster
    Process {
        /// Exported chat transcript (text)
        #[arg(short, long)]
        input: PathBuf,

        /// Maximum messages to process in this run
        #[arg(long, default_value = "20")]
        batch_size: usize,

        /// Process only messages after this time ("M/D/YY, H:MM AM"), ignoring the checkpoint
        #[arg(long, value_parser = parse_since)]
        since: Option<NaiveDateTime>,

        /// Give up on a call after this many attempts (default: retry forever)
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Model override
        #[arg(long)]
        model: Option<String>,
    },

    /// Show what a run would process without calling the extraction service
    Analyze {
        /// Exported chat transcript (text)
        #[arg(short, long)]
        input: PathBuf,

        /// Maximum messages to process in this run
        #[arg(long, default_value = "20")]
        batch_size: usize,

        /// Process only messages after this time ("M/D/YY, H:MM AM"), ignoring the checkpoint
        #[arg(long, value_parser = parse_since)]
        since: Option<NaiveDateTime>,
    },

    /// Load the student roster
    SeedRoster {
        /// Roster file
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long, value_enum, default_value = "formatted")]
        format: RosterFormat,
    },

    /// Print placed, unplaced and unresolved students
    Report {
        /// Write JSON to this file instead of printing text
        #[arg(long, conflicts_with = "text")]
        json: Option<PathBuf>,

        /// Write the text report to this file instead of printing it
        #[arg(long)]
        text: Option<PathBuf>,
    },
}

fn parse_since(raw: &str) -> Result<NaiveDateTime, String> {
    parse_timestamp(raw).ok_or_else(|| format!("expected \"M/D/YY, H:MM AM\", got {:?}", raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let store = SqliteStore::connect(&cli.db)
        .await
        .context("Failed to open placement database")?;

    match cli.command {
        Commands::Process {
            input,
            batch_size,
            since,
            max_attempts,
            model,
        } => process_transcript(store, input, batch_size, since, max_attempts, model).await,
        Commands::Analyze {
            input,
            batch_size,
            since,
        } => analyze_transcript(store, input, batch_size, since).await,
        Commands::SeedRoster { input, format } => {
            let added = seed_roster(&store, &input, format).await?;
            println!("Added {} students", added);
            Ok(())
        }
        Commands::Report { json, text } => {
            let report = PlacementReport::load(&store).await?;
            match (json, text) {
                (Some(path), _) => {
                    report.write_json(&path)?;
                    info!("Report written to {:?}", path);
                }
                (None, Some(path)) => {
                    report.write_text(&path)?;
                    info!("Report written to {:?}", path);
                }
                (None, None) => print!("{}", report.format()),
            }
            Ok(())
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn pipeline_config(
    batch_size: usize,
    since: Option<NaiveDateTime>,
    max_attempts: Option<u32>,
) -> PipelineConfig {
    let mut config = PipelineConfig {
        batch_size,
        watermark_override: since,
        ..Default::default()
    };

    if let Some(max) = max_attempts {
        config.store_retry = config.store_retry.with_max_attempts(max);
        config.students.retry = config.students.retry.with_max_attempts(max);
    }
    config
}

async fn process_transcript(
    store: SqliteStore,
    input: PathBuf,
    batch_size: usize,
    since: Option<NaiveDateTime>,
    max_attempts: Option<u32>,
    model: Option<String>,
) -> Result<()> {
    info!("Loading transcript from {:?}", input);
    let transcript = read_transcript(&input)?;

    let mut api_config = AnthropicConfig::from_env()?;
    if let Some(model) = model {
        api_config = api_config.with_model(model);
    }
    let client = AnthropicClient::new(api_config);
    info!("Using model {}", client.model());

    let mut extraction_policy = RetryPolicy::extraction();
    if let Some(max) = max_attempts {
        extraction_policy = extraction_policy.with_max_attempts(max);
    }

    let pipeline = Pipeline::new(
        Arc::new(store),
        Extractor::new(Arc::new(client), extraction_policy),
        pipeline_config(batch_size, since, max_attempts),
    );

    let batch = pipeline.plan(&transcript).await?;
    if batch.is_empty() {
        println!("No new messages since {}", pipeline.current_watermark().await?);
        return Ok(());
    }
    println!("Scheduled {} messages", batch.len());

    let report = pipeline.process_batch(&batch).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(reason) = &report.halted {
        anyhow::bail!("Batch halted after {} messages: {}", report.processed, reason);
    }
    Ok(())
}

async fn analyze_transcript(
    store: SqliteStore,
    input: PathBuf,
    batch_size: usize,
    since: Option<NaiveDateTime>,
) -> Result<()> {
    let transcript = read_transcript(&input)?;

    let config = pipeline_config(batch_size, since, None);
    let watermark = effective_watermark(&store, &config).await?;
    let batch = select_batch(&transcript, watermark, &config.filter, config.batch_size)?;

    println!("Transcript Analysis");
    println!("==================");
    println!("Watermark: {}", watermark);
    println!("Messages segmented: {}", batch.total_segmented);
    println!("Eligible after filter: {}", batch.total_eligible);
    println!("Scheduled this run: {}", batch.len());
    println!("Deferred: {}", batch.deferred());

    if let (Some(first), Some(last)) = (batch.messages.first(), batch.messages.last()) {
        println!("Batch spans {} to {}", first.timestamp, last.timestamp);
    }

    Ok(())
}
