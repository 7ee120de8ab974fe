use analytics::{MetricsEngine, MetricsReport};
use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use configuration::{Config, ProbabilitySource};
use core_types::{Opportunity, Stage, StageProbabilities};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use web_server::AppState;

/// The main entry point for the pipeline forecasting toolkit.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // PIPELINE__* overrides may live in a .env file; it is optional.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = configuration::load_config(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let _log_guard = configuration::init_tracing(&config.logging)?;

    let data_path = cli.data.clone().unwrap_or_else(|| config.data.path.clone());
    tracing::info!(data = %data_path.display(), "Pipeline forecast starting.");

    match cli.command {
        Commands::Forecast(args) => handle_forecast(&config, &data_path, &args),
        Commands::Charts(args) => handle_charts(&config, &data_path, &args),
        Commands::Export(args) => handle_export(&config, &data_path, &args),
        Commands::Serve(args) => handle_serve(&config, &data_path, args).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Sales pipeline forecasting and health analytics from a CRM opportunity export.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file (defaults to ./config.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the opportunity CSV, overriding `data.path` from the configuration.
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the full pipeline report to the console.
    Forecast(ReportArgs),
    /// Write the interactive chart pages as standalone HTML files.
    Charts(ChartsArgs),
    /// Export the weighted forecast of every open deal as CSV.
    Export(ExportArgs),
    /// Serve the interactive dashboard.
    Serve(ServeArgs),
}

/// Options shared by every command that computes a report.
#[derive(Args)]
struct ReportArgs {
    /// Discovery stage probability, in percent.
    #[arg(long)]
    discovery: Option<Decimal>,

    /// Demo stage probability, in percent.
    #[arg(long)]
    demo: Option<Decimal>,

    /// Proposal stage probability, in percent.
    #[arg(long)]
    proposal: Option<Decimal>,

    /// Negotiation stage probability, in percent.
    #[arg(long)]
    negotiation: Option<Decimal>,

    /// Weight the pipeline with historical win rates where closed history exists.
    #[arg(long)]
    use_historical: bool,

    /// Reference date for ages and at-risk detection (format: YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

#[derive(Args)]
struct ChartsArgs {
    #[command(flatten)]
    report: ReportArgs,

    /// Directory the chart pages are written into.
    #[arg(long, default_value = "charts")]
    out_dir: PathBuf,
}

#[derive(Args)]
struct ExportArgs {
    #[command(flatten)]
    report: ReportArgs,

    /// Output file. Defaults to forecast_YYYYMMDD.csv for the reference date.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct ServeArgs {
    #[command(flatten)]
    report: ReportArgs,

    /// Address to bind, overriding `server.host`.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, overriding `server.port`.
    #[arg(long)]
    port: Option<u16>,
}

impl ReportArgs {
    /// Configured probabilities with any command-line overrides applied.
    fn probabilities(&self, config: &Config) -> anyhow::Result<StageProbabilities> {
        let mut probabilities = config.forecast.probabilities.to_stage_probabilities()?;
        let overrides = [
            (Stage::Discovery, self.discovery),
            (Stage::Demo, self.demo),
            (Stage::Proposal, self.proposal),
            (Stage::Negotiation, self.negotiation),
        ];
        for (stage, percent) in overrides {
            if let Some(percent) = percent {
                probabilities = probabilities
                    .with(stage, percent / dec!(100))
                    .with_context(|| format!("--{} must be between 0 and 100", stage.to_string().to_lowercase()))?;
            }
        }
        Ok(probabilities)
    }

    fn source(&self, config: &Config) -> ProbabilitySource {
        if self.use_historical {
            ProbabilitySource::Historical
        } else {
            config.forecast.probability_source
        }
    }

    fn as_of(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

// ==============================================================================
// Command Logic
// ==============================================================================

fn load(data_path: &Path) -> anyhow::Result<Vec<Opportunity>> {
    let opportunities = loader::load_opportunities(data_path)
        .with_context(|| format!("Failed to load opportunities from {}", data_path.display()))?;
    if opportunities.is_empty() {
        bail!("No opportunities found in {}", data_path.display());
    }
    Ok(opportunities)
}

fn build_report(config: &Config, data_path: &Path, args: &ReportArgs) -> anyhow::Result<MetricsReport> {
    let opportunities = load(data_path)?;
    let probabilities = args.probabilities(config)?;
    let source = args.source(config);
    let as_of = args.as_of();
    tracing::info!(records = opportunities.len(), ?source, %as_of, "Running the metrics engine.");

    let engine = MetricsEngine::new(config.analysis.clone());
    let report = engine.calculate(&opportunities, &probabilities, source, as_of)?;
    Ok(report)
}

fn handle_forecast(config: &Config, data_path: &Path, args: &ReportArgs) -> anyhow::Result<()> {
    let report = build_report(config, data_path, args)?;
    println!("{}", reporting::console::render(&report, &config.report));
    Ok(())
}

fn handle_charts(config: &Config, data_path: &Path, args: &ChartsArgs) -> anyhow::Result<()> {
    let report = build_report(config, data_path, &args.report)?;
    let written = reporting::charts::write_all(&report, &args.out_dir)?;
    tracing::info!(count = written.len(), dir = %args.out_dir.display(), "Charts written.");
    for path in &written {
        println!("Chart saved to {}", path.display());
    }
    Ok(())
}

fn handle_export(config: &Config, data_path: &Path, args: &ExportArgs) -> anyhow::Result<()> {
    let report = build_report(config, data_path, &args.report)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("forecast_{}.csv", report.as_of.format("%Y%m%d"))));
    reporting::export::write_forecast_file(&report, &output)?;
    tracing::info!(path = %output.display(), "Forecast exported.");
    println!(
        "Forecast exported to {} ({} open deals)",
        output.display(),
        report.pipeline.len()
    );
    Ok(())
}

async fn handle_serve(config: &Config, data_path: &Path, args: ServeArgs) -> anyhow::Result<()> {
    let opportunities = load(data_path)?;
    let probabilities = args.report.probabilities(config)?;
    let source = args.report.source(config);

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = (host.as_str(), port)
        .to_socket_addrs()
        .with_context(|| format!("Invalid server address {host}:{port}"))?
        .next()
        .with_context(|| format!("No address resolved for {host}:{port}"))?;

    tracing::info!(records = opportunities.len(), ?source, "Starting dashboard.");
    let state = AppState {
        opportunities: Arc::new(opportunities),
        engine: MetricsEngine::new(config.analysis.clone()),
        probabilities,
        source,
    };
    web_server::run_server(addr, state).await
}
