//! datagen: command-line client for the data generation service.
//!
//! Set DATAGEN_API_URL (or API_URL). DATAGEN_API_TOKEN / DATAGEN_API_KEY are
//! attached when present.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use datagen_api_client::ApiClient;
use datagen_cli::{init_tracing, render_preview, OutcomeSummary};
use datagen_core::{
    ClientConfig, DirectoryDownloader, ErrorMetadata, GenerationMode, RetryStep, UploadedSchema,
    Workflow, WorkflowConfig, WorkflowError, WorkflowOutcome,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "datagen", about = "Generate synthetic CSV data from a schema")]
struct Cli {
    /// Base URL of the generation service (overrides DATAGEN_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate data from a schema, then download and preview the result
    Generate {
        /// Schema as JSON text (wins over --schema-file)
        #[arg(long)]
        schema: Option<String>,
        /// Path to a schema file
        #[arg(long, value_name = "PATH")]
        schema_file: Option<PathBuf>,
        /// Number of records, sent as entered
        #[arg(long, default_value = "10")]
        records: String,
        /// Interval in minutes for stream mode, sent as entered
        #[arg(long, default_value = "1")]
        interval: String,
        /// Delivery mode: batch or stream
        #[arg(long, default_value = "batch")]
        mode: GenerationMode,
        /// Output name on the server (without extension)
        #[arg(long)]
        output_name: Option<String>,
        /// Print the schema that will be submitted
        #[arg(long)]
        show_schema: bool,
        /// In stream mode, re-fetch this many times at the stream interval
        #[arg(long, default_value = "0")]
        watch: u32,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Fetch an already generated file again, without regenerating it
    Fetch {
        /// File name returned by a previous generate
        output_file: String,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args)]
struct OutputArgs {
    /// Directory to save downloaded files in (overrides DATAGEN_DOWNLOAD_DIR)
    #[arg(long, value_name = "DIR")]
    download_dir: Option<PathBuf>,
    /// Number of preview rows to print (overrides DATAGEN_PREVIEW_ROWS)
    #[arg(long)]
    preview_rows: Option<usize>,
    /// Print a JSON summary instead of a table
    #[arg(long)]
    json: bool,
}

type CliWorkflow = Workflow<ApiClient, DirectoryDownloader>;

fn build_workflow(config: &ClientConfig, output: &OutputArgs) -> Result<CliWorkflow> {
    let client = ApiClient::from_config(config).context("Failed to create API client")?;
    let download_dir = output
        .download_dir
        .clone()
        .unwrap_or_else(|| config.download_dir.clone());

    Ok(Workflow::new(
        client,
        DirectoryDownloader::new(download_dir),
        WorkflowConfig::from(config),
    ))
}

fn read_schema_file(path: &Path) -> Result<UploadedSchema> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("schema.json");
    Ok(UploadedSchema::new(file_name, bytes))
}

fn print_outcome(
    outcome: &WorkflowOutcome,
    output: &OutputArgs,
    config: &ClientConfig,
) -> Result<()> {
    let max_rows = output.preview_rows.unwrap_or(config.preview_rows);

    if output.json {
        let summary = OutcomeSummary::new(outcome, max_rows);
        let out = serde_json::to_string_pretty(&summary).context("Serialize summary")?;
        println!("{}", out);
        return Ok(());
    }

    println!("{}", outcome.status_message);
    match (&outcome.saved_to, &outcome.download_failure) {
        (Some(path), _) => println!("Saved to {}", path.display()),
        (None, Some(failure)) => eprintln!("{}", failure.message),
        (None, None) => {}
    }
    println!();
    print!("{}", render_preview(&outcome.preview, max_rows));
    Ok(())
}

/// Print the status line and a hint for the step that can be retried.
fn report_failure(err: &WorkflowError, workflow: &CliWorkflow) -> anyhow::Error {
    let status = workflow.status().unwrap_or_else(|| err.client_message());
    eprintln!("{}", status);
    match (err.retry_step(), workflow.last_output()) {
        (RetryStep::Fetch, Some(name)) => {
            eprintln!("Retry the download with: datagen fetch {}", name)
        }
        (RetryStep::Resubmit, _) => eprintln!("Run the same command again to resubmit."),
        _ => {}
    }
    anyhow::anyhow!("{} ({})", status, err.error_code())
}

/// Delay between stream snapshots, from the interval in minutes.
fn watch_interval(raw: &str) -> Result<Duration> {
    let minutes: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("--watch needs the interval in minutes, got {:?}", raw))?;
    if !minutes.is_finite() || minutes <= 0.0 {
        anyhow::bail!("--watch needs a positive interval, got {:?}", raw);
    }
    Duration::try_from_secs_f64(minutes * 60.0)
        .with_context(|| format!("--watch interval out of range: {:?}", raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env().context("Invalid configuration")?;
    init_tracing();
    if let Some(url) = cli.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }

    match cli.command {
        Commands::Generate {
            schema,
            schema_file,
            records,
            interval,
            mode,
            output_name,
            show_schema,
            watch,
            output,
        } => {
            let every = if mode == GenerationMode::Stream && watch > 0 {
                Some(watch_interval(&interval)?)
            } else {
                None
            };
            let mut workflow = build_workflow(&config, &output)?;

            if let Some(path) = &schema_file {
                workflow.select_file(read_schema_file(path)?);
            }
            if let Some(text) = schema {
                workflow.set_typed_text(text);
            }
            workflow.set_record_count(records);
            workflow.set_interval_minutes(interval.clone());
            workflow.set_mode(mode);
            workflow.set_output_name(output_name);

            if show_schema {
                println!("{}\n", workflow.form().typed_text);
            }

            let outcome = match workflow.submit().await {
                Ok(outcome) => outcome,
                Err(err) => return Err(report_failure(&err, &workflow)),
            };
            print_outcome(&outcome, &output, &config)?;

            if let Some(every) = every {
                for round in 1..=watch {
                    info!(round, every_secs = every.as_secs(), "Waiting for next stream snapshot");
                    tokio::time::sleep(every).await;
                    match workflow.refresh().await {
                        Ok(outcome) => print_outcome(&outcome, &output, &config)?,
                        Err(err) => return Err(report_failure(&err, &workflow)),
                    }
                }
            }
        }
        Commands::Fetch {
            output_file,
            output,
        } => {
            let mut workflow = build_workflow(&config, &output)?;
            workflow.remember_artifact(output_file);

            match workflow.retry_fetch().await {
                Ok(outcome) => print_outcome(&outcome, &output, &config)?,
                Err(err) => return Err(report_failure(&err, &workflow)),
            }
        }
    }

    Ok(())
}
