mod auth;
mod error;
mod keyword_filter;
mod logging;
mod mail_reader;
mod notifier;
mod poller;
mod settings;
mod web;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::{error, info};

use crate::poller::scheduler::{self, Watcher};
use crate::settings::environment::Environment;

/// Polls a mailbox for unread mail matching keywords and forwards hits to a chat.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Settings file (YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Check the mailbox once and exit
    #[arg(long)]
    once: bool,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::setup_logger(&cli.log_level)?;

    let config = settings::load_settings(cli.config.as_deref())?;
    let env = Environment::from_env()?;
    let watcher = Arc::new(Watcher::from_config(&config, &env)?);

    if cli.once {
        watcher.invoke().await;
        return Ok(());
    }

    if config.keep_alive.enabled {
        let host = config.keep_alive.host.clone();
        let port = env.port.unwrap_or(config.keep_alive.port);
        tokio::spawn(async move {
            if let Err(e) = web::entrypoint(&host, port).await {
                error!("Keep-alive listener stopped: {}", e);
            }
        });
    }

    let mut sched = scheduler::entrypoint(Arc::clone(&watcher), &config.poller.schedule).await?;

    if config.poller.run_on_start {
        info!("Initial mailbox check");
        watcher.invoke().await;
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    sched.shutdown().await?;
    Ok(())
}
