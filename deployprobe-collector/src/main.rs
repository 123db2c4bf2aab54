#![forbid(unsafe_code)]

use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use confique::Config;
use deployprobe_collector::{Fetcher, filter::DeploymentsFilter, fixture::StaticDirector};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod serve;

#[derive(Debug, Parser)]
#[command(name = "deployprobe")]
struct Cli {
    #[arg(short, long, value_name = "FILE", help = "Path to config file")]
    config_path: Option<String>,
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Collect one snapshot of every deployment and print it as JSON
    Collect {
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Collect snapshots periodically until interrupted
    Serve,
}

#[derive(Config, Debug)]
struct Conf {
    /// JSON file the director serves deployments from
    #[config(default = "deployments.json", env = "DEPLOYPROBE_DIRECTOR_FIXTURE")]
    director_fixture: PathBuf,

    /// Deployments to collect, all deployments when empty
    #[config(default = [])]
    deployments: Vec<String>,

    /// Seconds between two collection cycles
    #[config(default = 30, env = "DEPLOYPROBE_SCRAPE_INTERVAL")]
    scrape_interval: u64,

    /// Seconds one collection cycle may take before it is abandoned
    #[config(default = 60, env = "DEPLOYPROBE_COLLECT_TIMEOUT")]
    collect_timeout: u64,
}

fn config(path: &str) -> anyhow::Result<Conf> {
    Conf::builder()
        .env()
        .file(path)
        .load()
        .map_err(|e| e.into())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    trace!("using command line arguments {:?}", cli);

    let config = config(&cli.config_path.unwrap_or("config.toml".to_owned()))?;
    trace!("using config {:?}", config);

    let director = StaticDirector::from_file(&config.director_fixture).await?;
    info!(
        "loaded {} deployments from {}",
        director.len(),
        config.director_fixture.display()
    );
    let fetcher = Fetcher::new(DeploymentsFilter::new(director, &config.deployments));
    let collect_timeout = Duration::from_secs(config.collect_timeout);

    match cli.commands {
        Commands::Collect { pretty } => {
            let mut result = serve::collect_once(&fetcher, collect_timeout).await?;
            result.sort_by_name();
            let json = if pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            println!("{json}");
        }
        Commands::Serve => {
            let shutdown = CancellationToken::new();
            tokio::spawn(shutdown_signal(shutdown.clone()));

            serve::serve(
                &fetcher,
                Duration::from_secs(config.scrape_interval),
                collect_timeout,
                shutdown,
            )
            .await;
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                #[cfg(debug_assertions)]
                let default_log_level = format!(
                    "{}=debug,deployprobe_collector=debug",
                    env!("CARGO_CRATE_NAME")
                )
                .into();

                #[cfg(not(debug_assertions))]
                let default_log_level = format!(
                    "{}=info,deployprobe_collector=info",
                    env!("CARGO_CRATE_NAME")
                )
                .into();

                default_log_level
            }),
        )
        // stdout carries the snapshot JSON
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn shutdown_signal(token: CancellationToken) {
    let _shutdown_guard = token.drop_guard();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
