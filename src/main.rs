//! rune: bootstrap deploy keys and Kubernetes secrets for CI/CD pipelines.
//!
//! Entry point and error handling boundary. Uses `anyhow` for
//! ergonomic error propagation and user-facing messages.

mod cli;

use rune::config;
use rune::constants;
use rune::env;
use rune::keys;
use rune::models;
use rune::orchestrator;
use rune::pipeline;
use rune::secret;
use rune::vcs;

use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::args::{BootstrapArgs, Cli, Command};
use config::Config;
use env::Env;
use models::ProvisioningRequest;
use orchestrator::Bootstrapper;
use pipeline::EventListenerClient;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Bootstrap(args) => run_bootstrap(*args).await,
        Command::Version => run_version(),
    }
}

/// Log to stderr. `RUST_LOG` takes precedence over `-v`.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}={default_level},warn", constants::APP_NAME)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Print version and build information.
fn run_version() -> Result<()> {
    use colored::Colorize;

    println!("{} {}", constants::APP_NAME.bold(), constants::VERSION.green().bold());
    println!("{}     {}", "target:".dimmed(), constants::TARGET);
    Ok(())
}

/// Run one bootstrap transaction.
async fn run_bootstrap(args: BootstrapArgs) -> Result<()> {
    let env = Env::real();
    let work_dir = std::env::current_dir().context("failed to determine working directory")?;

    let mut config = Config::load(Some(work_dir.as_path()), args.config.as_deref(), &env)?;
    args.apply_to(&mut config);
    config.resolve_provider_token(&env);
    tracing::debug!(?config, "resolved configuration");

    let request = ProvisioningRequest::from_config(&config)?;
    if request.default_destination {
        cli::print_default_destination_notice(&request.destination);
    }

    let vcs = vcs::client_for(request.provider, &request.api_base_url, &request.token)
        .context("failed to set up provider client")?;
    let backend = keys::backend_for(&request);
    let sink = secret::sink_for(&request.destination);
    let wirer = request
        .pipeline
        .as_ref()
        .map(EventListenerClient::for_target)
        .transpose()
        .context("failed to set up pipeline client")?;

    let mut bootstrapper = Bootstrapper::new(vcs.as_ref(), backend.as_ref(), sink.as_ref());
    if let Some(ref wirer) = wirer {
        bootstrapper = bootstrapper.with_wirer(wirer);
    }

    let report = bootstrapper.run(&request).await?;
    println!("{}", cli::render_report(&request, &report));
    Ok(())
}
