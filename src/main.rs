use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;

pub mod config;
pub mod http_probe;
pub mod monitor;
pub mod probe;
pub mod record;
pub mod stats;

use config::load_config;
use http_probe::HttpFetcher;
use monitor::{Monitor, shutdown};
use record::StdoutSink;

#[derive(Debug, Parser)]
#[command(name = "netpulse", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Probe latency and bandwidth until interrupted, one JSON record per probe on stdout
    Monitor,
    /// Summarize records written by `monitor`
    Stats {
        /// Record file to read, stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Command::Monitor) => run_monitor().await,
        Some(Command::Stats { input }) => run_stats(input),
        None => {
            eprintln!("no command specified");
            std::process::exit(1);
        }
    }
}

async fn run_monitor() -> Result<()> {
    let app_config = load_config().context("Failed to load probe configuration")?;
    if let Some(source) = &app_config.source {
        log::debug!("Probe configuration read from {}", source.display());
    }

    for spec in &app_config.probes {
        log::info!(
            "Probe {}: {} {} {} every {:?}, dial timeout {:?}",
            spec.name,
            spec.kind,
            spec.method,
            spec.url,
            spec.period,
            spec.dial_timeout
        );
    }

    let (trigger, shutdown) = shutdown::channel();
    let stop = stop_signal().context("Failed to install signal handlers")?;
    tokio::spawn(async move {
        let name = stop.await;
        log::info!("Received {}, stopping monitor", name);
        trigger.trigger();
    });

    let monitor = Monitor::new(
        app_config.probes,
        Arc::new(HttpFetcher::new()),
        Arc::new(StdoutSink),
    );
    monitor.run(shutdown).await.context("Monitor stopped")?;

    log::info!("Monitor stopped");
    Ok(())
}

/// Installs the handlers right away; the returned future resolves with the
/// name of the first stop signal (SIGINT or SIGTERM).
#[cfg(unix)]
fn stop_signal() -> io::Result<impl Future<Output = &'static str>> {
    use signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
        }
    })
}

#[cfg(not(unix))]
fn stop_signal() -> io::Result<impl Future<Output = &'static str>> {
    Ok(async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C, monitor can only be killed: {}", e);
            std::future::pending::<()>().await;
        }
        "Ctrl-C"
    })
}

fn run_stats(input: Option<PathBuf>) -> Result<()> {
    let summary = match &input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            stats::summarize(BufReader::new(file))
        }
        None => stats::summarize(io::stdin().lock()),
    }
    .context("Failed to read records")?;

    io::stdout()
        .write_all(summary.render().as_bytes())
        .context("Failed to write summary")?;
    Ok(())
}
