//! tabrotor CLI entry point

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use tabrotor::browser::SimBrowser;
use tabrotor::cli::{Cli, Command};
use tabrotor::config::DaemonConfig;
use tabrotor::daemon::Daemon;
use tabrotor::ipc::{self, DaemonClient};
use tabrotor::rotation::{RotationEngine, StartOptions};
use tabrotor::store::FileStore;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            other => {
                eprintln!("Warning: Unknown log-level '{other}', defaulting to INFO");
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = DaemonConfig::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.log_level.as_deref(), config.daemon.log_level.as_deref())
        .context("Failed to setup logging")?;

    match cli.command {
        Command::Run { simulate, seed } => cmd_run(&config, simulate, &seed).await,
        Command::Start {
            interval,
            url,
            profile,
            shuffle,
            dedicated_window,
            exclude,
            no_badge,
        } => {
            cmd_start(
                &config,
                interval,
                &url,
                profile.as_ref(),
                shuffle,
                dedicated_window,
                exclude,
                no_badge,
            )
            .await
        }
        Command::Stop => cmd_simple(&config, ipc::Command::Stop).await,
        Command::Status => cmd_status(&config).await,
        Command::Ping => cmd_ping(&config).await,
    }
}

async fn cmd_run(config: &DaemonConfig, simulate: bool, seed: &[String]) -> Result<()> {
    if !simulate {
        eyre::bail!(
            "no browser bridge is wired into this binary; run with --simulate, \
             or embed the engine through the library"
        );
    }

    let sim = SimBrowser::new();
    if !seed.is_empty() {
        let refs: Vec<&str> = seed.iter().map(String::as_str).collect();
        let win = sim.open_window(&refs).await;
        info!(window = %win, tabs = seed.len(), "seeded simulated browser");
    }

    let store = FileStore::new(config.state_path());
    let engine = RotationEngine::spawn(Arc::new(sim), Arc::new(store));
    Daemon::new(engine, config.socket_path()).run().await
}

#[allow(clippy::too_many_arguments)]
async fn cmd_start(
    config: &DaemonConfig,
    interval: f64,
    urls: &[String],
    profile: Option<&PathBuf>,
    shuffle: bool,
    dedicated_window: bool,
    exclude: Option<String>,
    no_badge: bool,
) -> Result<()> {
    let mut options: StartOptions = match profile {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .context(format!("Failed to read profile {}", path.display()))?;
            serde_json::from_str(&content).context("Failed to parse profile JSON")?
        }
        None => StartOptions::default(),
    };

    options.interval_sec = Some(interval);
    if !urls.is_empty() {
        options.use_custom_list = Some(true);
        options.custom_urls = urls.to_vec();
    }
    if shuffle {
        options.shuffle = Some(true);
    }
    if dedicated_window {
        options.use_dedicated_window = Some(true);
    }
    if let Some(domains) = exclude {
        options.exclude_domains = Some(domains);
    }
    if no_badge {
        options.badge_countdown = Some(false);
    }

    let result = DaemonClient::new(config.socket_path())
        .request(ipc::Command::Start { options })
        .await?;
    if result.ok {
        if result.deferred == Some(true) {
            println!("start deferred until the control surface closes");
        } else {
            println!("rotation started");
        }
        Ok(())
    } else {
        eyre::bail!("daemon refused start: {:?}", result.error)
    }
}

async fn cmd_simple(config: &DaemonConfig, command: ipc::Command) -> Result<()> {
    let result = DaemonClient::new(config.socket_path()).request(command).await?;
    if result.ok {
        println!("ok");
        Ok(())
    } else {
        eyre::bail!("daemon returned error: {:?}", result.error)
    }
}

async fn cmd_status(config: &DaemonConfig) -> Result<()> {
    let result = DaemonClient::new(config.socket_path())
        .request(ipc::Command::Status)
        .await?;
    if !result.ok {
        eyre::bail!("daemon returned error: {:?}", result.error);
    }
    let running = result.running.unwrap_or(false);
    println!(
        "{} (interval {}s, {} resolved targets)",
        if running { "running" } else { "stopped" },
        result.interval_sec.unwrap_or_default(),
        result.targets.unwrap_or_default(),
    );
    Ok(())
}

async fn cmd_ping(config: &DaemonConfig) -> Result<()> {
    let result = DaemonClient::new(config.socket_path())
        .request(ipc::Command::Ping)
        .await?;
    match result.version {
        Some(version) if result.ok => {
            println!("daemon alive (version {version})");
            Ok(())
        }
        _ => eyre::bail!("unexpected ping response"),
    }
}
