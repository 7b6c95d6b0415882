//! HomeOps Doctor - CLI entry point

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use colored::Colorize;
use homeops_doctor::{
    analysis::{Analyzer, Report},
    cli::{load_registry, load_snapshot, Args, Commands, OutputFormat, Verbosity},
    config::Config,
    doctor::Doctor,
    http::{self, AppState},
    hub::HubClient,
    poller::ReportPublisher,
    DoctorError,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Exit code when the hub could not be analyzed (as opposed to a bad invocation)
const EXIT_CODE_NOT_ANALYZED: i32 = 2;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbosity());

    if let Err(e) = run(args).await {
        eprintln!("{} {:#}", "error:".red().bold(), e);

        let not_analyzed = matches!(
            e.downcast_ref::<DoctorError>(),
            Some(
                DoctorError::EmptySnapshot
                    | DoctorError::HubApiError(_)
                    | DoctorError::HttpError(_)
                    | DoctorError::Timeout { .. }
            )
        );
        std::process::exit(if not_analyzed { EXIT_CODE_NOT_ANALYZED } else { 1 });
    }
}

fn init_logging(verbosity: Verbosity) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.clone()).context("Failed to load configuration")?;

    match args.command {
        Commands::Report { format, registry } => {
            let client = hub_client(&config, registry.as_deref())?;
            let analyzer = Analyzer::new(config.analysis.clone())?;
            let doctor = Doctor::new(Arc::new(client), analyzer, config.hub_timeout());

            let diagnosis = doctor.run().await?;
            print_report(&diagnosis.report, format)?;
        }

        Commands::Analyze {
            snapshot,
            registry,
            format,
            at,
        } => {
            let mut snap = load_snapshot(&snapshot)
                .with_context(|| format!("Failed to load snapshot {}", snapshot.display()))?;
            if let Some(path) = registry {
                let registry = load_registry(&path)
                    .with_context(|| format!("Failed to load registry {}", path.display()))?;
                snap = snap.with_registry(registry);
            }

            let now = match at {
                Some(ts) => DateTime::parse_from_rfc3339(&ts)
                    .with_context(|| format!("Invalid --at timestamp '{}'", ts))?
                    .with_timezone(&Utc),
                None => Utc::now(),
            };

            let analyzer = Analyzer::new(config.analysis.clone())?;
            let report = analyzer.analyze_at(&snap, now)?;
            print_report(&report, format)?;
        }

        Commands::Serve { port } => {
            let client = hub_client(&config, None)?;
            let analyzer = Analyzer::new(config.analysis.clone())?;
            let doctor = Doctor::new(Arc::new(client), analyzer, config.hub_timeout());
            let publisher = Arc::new(ReportPublisher::new(doctor));

            tokio::spawn(publisher.clone().run(config.poll_interval()));

            let addr: SocketAddr = format!("{}:{}", config.server.bind, port.unwrap_or(config.server.port))
                .parse()
                .context("Invalid server bind address")?;
            info!(poll_interval_s = config.poll.interval_secs, "starting HomeOps Doctor");

            http::serve(addr, AppState::new(publisher)).await?;
        }

        Commands::Config { init } => {
            if init {
                let path = Config::default_path().context("Could not determine home directory")?;
                if path.exists() {
                    bail!("{} already exists", path.display());
                }
                Config::default().save(&path)?;
                println!("Wrote default configuration to {}", path.display());
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

/// Build the hub client; the token comes from the configured env var
fn hub_client(config: &Config, registry: Option<&Path>) -> Result<HubClient> {
    let token = std::env::var(&config.hub.token_env).with_context(|| {
        format!(
            "{} is not set. Run as an add-on with homeassistant_api: true, or export a long-lived token",
            config.hub.token_env
        )
    })?;

    let mut client = HubClient::new(&config.hub.base_url, token, config.hub_timeout())?;
    if let Some(path) = registry {
        let registry = load_registry(path).with_context(|| format!("Failed to load registry {}", path.display()))?;
        client = client.with_registry(registry);
    }

    Ok(client)
}

fn print_report(report: &Report, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => Doctor::display_report(report),
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Markdown => print!("{}", report.to_markdown()),
    }
    Ok(())
}
