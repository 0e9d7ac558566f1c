//! golemworks - A deterministic golem automation sandbox server
//!
//! Headless authority binary: binds the QUIC endpoint and drives the
//! fixed-rate tick loop.

mod config;

use anyhow::Result;
use config::ServerConfig;
use golemworks_core::MachineCatalog;
use golemworks_server::MultiplayerServer;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use std::env;
use tracing::{info, warn};

fn main() -> Result<()> {
    // Initialize tracing with WARN level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    info!("Starting golemworks v{}", env!("CARGO_PKG_VERSION"));

    let cli = CliOptions::parse(env::args().skip(1));

    let mut config = match &cli.config_path {
        Some(path) => ServerConfig::load_from_path(path),
        None => ServerConfig::load(),
    };
    if let Some(bind_addr) = cli.bind_addr {
        config.bind_addr = bind_addr;
    }

    // All machine kinds are registered once, here, before the server starts.
    let catalog = MachineCatalog::with_defaults();
    info!(machine_kinds = catalog.len(), "Machine catalog registered");

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(config, catalog, cli.max_ticks))
}

async fn run(config: ServerConfig, catalog: MachineCatalog, max_ticks: Option<u64>) -> Result<()> {
    let mut server = MultiplayerServer::bind(config.bind_addr, catalog)?;
    info!("Listening on {}", server.local_addr());

    let mut interval = tokio::time::interval(Duration::from_millis(config.tick_interval_ms()));
    let mut ticks_run: u64 = 0;

    loop {
        interval.tick().await;

        // Admit at most one pending connection per tick without blocking
        // the cadence.
        if let Ok(result) = tokio::time::timeout(Duration::ZERO, server.accept_client()).await {
            if let Err(e) = result {
                warn!("Failed to accept client: {e}");
            }
        }

        server.pump_inbound().await;
        server.tick().await?;

        ticks_run += 1;
        if let Some(limit) = max_ticks {
            if ticks_run >= limit {
                info!(ticks_run, "Tick limit reached, shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Command line options.
#[derive(Debug, Default)]
struct CliOptions {
    config_path: Option<PathBuf>,
    bind_addr: Option<SocketAddr>,
    max_ticks: Option<u64>,
}

impl CliOptions {
    fn parse<I>(mut args: I) -> Self
    where
        I: Iterator<Item = String>,
    {
        let mut options = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => options.config_path = args.next().map(PathBuf::from),
                "--bind" => {
                    options.bind_addr = args.next().and_then(|value| match value.parse() {
                        Ok(addr) => Some(addr),
                        Err(e) => {
                            warn!("Ignoring invalid --bind value: {e}");
                            None
                        }
                    });
                }
                "--max-ticks" => {
                    options.max_ticks = args.next().and_then(|value| match value.parse() {
                        Ok(ticks) => Some(ticks),
                        Err(e) => {
                            warn!("Ignoring invalid --max-ticks value: {e}");
                            None
                        }
                    });
                }
                other => warn!("Ignoring unknown argument: {other}"),
            }
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args<'a>(values: &'a [&'a str]) -> impl Iterator<Item = String> + 'a {
        values.iter().map(|s| s.to_string())
    }

    #[test]
    fn parses_all_options() {
        let options = CliOptions::parse(args(&[
            "--config",
            "custom/server.toml",
            "--bind",
            "127.0.0.1:9000",
            "--max-ticks",
            "100",
        ]));
        assert_eq!(
            options.config_path.as_deref(),
            Some(std::path::Path::new("custom/server.toml"))
        );
        assert_eq!(options.bind_addr, Some("127.0.0.1:9000".parse().unwrap()));
        assert_eq!(options.max_ticks, Some(100));
    }

    #[test]
    fn unknown_arguments_are_ignored() {
        let options = CliOptions::parse(args(&["--frobnicate", "--max-ticks", "5"]));
        assert_eq!(options.max_ticks, Some(5));
    }

    #[test]
    fn invalid_values_are_dropped() {
        let options = CliOptions::parse(args(&["--bind", "not-an-addr", "--max-ticks", "abc"]));
        assert!(options.bind_addr.is_none());
        assert!(options.max_ticks.is_none());
    }
}
