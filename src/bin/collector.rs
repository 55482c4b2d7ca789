use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use points_collector::{
    collector::Collector,
    config::{Config, read_config_file},
};
use tracing::{info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (defaults are used when omitted)
    #[arg(short)]
    file: Option<String>,

    /// Run a single collection cycle and exit
    #[arg(long)]
    once: bool,
}

fn init(config: &Config) -> anyhow::Result<()> {
    let filter = filter::Targets::new().with_target("points_collector", LevelFilter::DEBUG);

    let file_layer = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(file_layer)
        .with(filter)
        .init();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let mut config = match &args.file {
        Some(file) => read_config_file(file)?,
        None => Config::default(),
    };
    config.apply_env_overrides()?;
    config.validate()?;

    init(&config)?;
    trace!("started with args: {args:?}");

    let collector = Collector::from_config(&config)?;

    let report = if args.once {
        collector.run_once().await
    } else {
        collector.run(shutdown_signal()).await
    };

    info!("{report}");

    Ok(())
}
