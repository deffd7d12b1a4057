use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use coststream::aggregator::CostAggregator;
use coststream::aws::AwsCollaborators;
use coststream::config::{self, Config};
use coststream::estimator::CostEstimator;
use coststream::exit_codes::{codes, exit_code_for_anyhow};
use coststream::provider::{CostSink, Resource, ServiceKind};
use coststream::run::{self, RunStatus};
use coststream::sink::StdoutSink;
use coststream::utils::{cost_table, format_duration, format_monthly};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coststream")]
#[command(
    about = "Estimate and stream the running cost of serverless AWS resources",
    long_about = "coststream prices Lambda functions, DynamoDB tables and RDS instances from their\nrecent CloudWatch usage and the AWS price list.\n\nCommands:\n  - estimate: price each resource over the trailing window\n  - publish:  price each resource and publish its cost as a CloudWatch metric\n  - stream:   sum the published cost metrics and emit a monthly projection"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text")]
    output: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "COSTSTREAM_LOG_JSON")]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Price each resource over the trailing window
    ///
    /// Examples:
    ///   coststream estimate
    ///   coststream estimate --resource dynamodb:orders --resource lambda:checkout
    Estimate {
        /// Resource to price as SERVICE:ID (overrides [[resources]] in the config)
        #[arg(short, long = "resource", value_parser = parse_resource)]
        resources: Vec<Resource>,
        /// Show the per-component breakdown
        #[arg(short, long)]
        detailed: bool,
    },
    /// Price each resource and publish its cost metric (scheduled run)
    Publish {
        #[arg(short, long = "resource", value_parser = parse_resource)]
        resources: Vec<Resource>,
    },
    /// Aggregate published cost metrics and emit a monthly estimate (scheduled run)
    Stream {
        #[arg(short, long = "resource", value_parser = parse_resource)]
        resources: Vec<Resource>,
        /// Print the record instead of writing it to Kinesis
        #[arg(long)]
        stdout: bool,
    },
    /// Initialize configuration
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = ".coststream.toml")]
        path: PathBuf,
    },
}

fn parse_resource(value: &str) -> std::result::Result<Resource, String> {
    let (service, id) = value
        .split_once(':')
        .ok_or_else(|| format!("expected SERVICE:ID, got '{}'", value))?;
    if id.is_empty() {
        return Err(format!("missing resource id in '{}'", value));
    }
    Ok(Resource::new(id, service.parse::<ServiceKind>()?))
}

fn resources_or_configured(resources: Vec<Resource>, config: &Config) -> Vec<Resource> {
    if resources.is_empty() {
        config.resources.clone()
    } else {
        resources
    }
}

fn init_tracing(verbose: bool, json: bool) {
    // Suppress INFO by default; only warnings and errors
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

fn report_status(status: &RunStatus, output: &str) -> Result<()> {
    if output == "json" {
        println!("{}", serde_json::to_string(status)?);
    } else if let Some(message) = &status.message {
        eprintln!("Run failed ({}): {}", status.status, message);
    } else {
        println!("Run succeeded ({})", status.status);
    }
    if !status.is_ok() {
        std::process::exit(codes::ESTIMATION_ERROR);
    }
    Ok(())
}

async fn estimate(
    resources: Vec<Resource>,
    detailed: bool,
    config: Config,
    output: &str,
) -> Result<()> {
    let resources = resources_or_configured(resources, &config);
    if resources.is_empty() {
        println!("No resources configured. Add [[resources]] to the config or pass --resource.");
        return Ok(());
    }

    let window = config.window_at(Utc::now())?;
    let aws = AwsCollaborators::load(&config).await;
    let estimator = CostEstimator::new(aws.pricing, aws.metrics, aws.attributes, config);
    let costs = estimator.estimate(&resources, window).await?;

    if output == "json" {
        println!("{}", serde_json::to_string_pretty(&costs)?);
        return Ok(());
    }

    println!(
        "Window: {} to {} ({})",
        window.start().format("%Y-%m-%d %H:%M:%S UTC"),
        window.end().format("%Y-%m-%d %H:%M:%S UTC"),
        format_duration(window.duration_seconds() as u64)
    );
    println!("{}", cost_table(&costs, detailed));
    let monthly: f64 = costs.iter().map(|c| c.result.estimated_monthly_charge).sum();
    let currency = costs
        .first()
        .map(|c| c.result.currency.as_str())
        .unwrap_or("USD");
    println!("Projected monthly total: {}", format_monthly(monthly, currency));
    Ok(())
}

async fn publish(resources: Vec<Resource>, config: Config, output: &str) -> Result<()> {
    let resources = resources_or_configured(resources, &config);
    let window = config.window_at(Utc::now())?;
    let aws = AwsCollaborators::load(&config).await;
    let estimator = CostEstimator::new(
        aws.pricing.clone(),
        aws.metrics.clone(),
        aws.attributes.clone(),
        config,
    )
    .with_publisher(aws.metrics);

    let status = run::publish_costs(&estimator, &resources, window).await;
    report_status(&status, output)
}

async fn stream(resources: Vec<Resource>, stdout: bool, config: Config, output: &str) -> Result<()> {
    let resources = resources_or_configured(resources, &config);
    let window = config.window_at(Utc::now())?;
    let aws = AwsCollaborators::load(&config).await;
    let sink: Box<dyn CostSink> = if stdout {
        Box::new(StdoutSink::new())
    } else {
        Box::new(
            aws.kinesis_sink(&config)
                .context("Streaming to Kinesis needs stream.name (or pass --stdout)")?,
        )
    };
    let aggregator = CostAggregator::new(aws.metrics, config.metrics.clone());

    let status = run::stream_costs(&aggregator, sink.as_ref(), &resources, window).await;
    report_status(&status, output)
}

async fn execute(cli: Cli) -> Result<()> {
    if let Commands::Init { path } = &cli.command {
        return config::init_config(path);
    }

    let config = Config::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Estimate {
            resources,
            detailed,
        } => estimate(resources, detailed, config, &cli.output).await,
        Commands::Publish { resources } => publish(resources, config, &cli.output).await,
        Commands::Stream { resources, stdout } => {
            stream(resources, stdout, config, &cli.output).await
        }
        Commands::Init { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    if let Err(e) = execute(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code_for_anyhow(&e));
    }
}
