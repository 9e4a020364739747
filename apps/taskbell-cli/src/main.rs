//! taskbell terminal client entry point.

mod app;
mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;

/// Prints task reminders pushed by the taskbell server.
#[derive(Debug, Parser)]
#[command(name = "taskbell", version, about)]
struct Args {
    /// Config file (defaults to the platform config dir).
    #[arg(long, env = "TASKBELL_CONFIG")]
    config: Option<PathBuf>,

    /// Server host, with optional port.
    #[arg(long)]
    host: Option<String>,

    /// Use wss:// instead of ws://.
    #[arg(long)]
    secure: bool,

    /// Explicit base URL, e.g. `wss://push.example.com`. Overrides host.
    #[arg(long, env = "TASKBELL_WS_URL")]
    base_url: Option<String>,

    /// User whose reminders to receive.
    #[arg(long, short = 'u', env = "TASKBELL_USER")]
    user: Option<String>,

    /// Delay between reconnect attempts, in milliseconds.
    #[arg(long)]
    reconnect_interval_ms: Option<u64>,

    /// Retries before giving up.
    #[arg(long)]
    max_reconnect_attempts: Option<u32>,

    /// Send an application ping at this interval, in seconds.
    #[arg(long)]
    ping_interval_secs: Option<u64>,

    /// Do not track toasts for incoming reminders.
    #[arg(long)]
    no_toasts: bool,

    /// Write the merged settings back to the config file.
    #[arg(long)]
    save: bool,
}

impl Args {
    fn apply(&self, config: &mut CliConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if self.secure {
            config.secure = true;
        }
        if let Some(base) = &self.base_url {
            config.base_url = Some(base.clone());
        }
        if let Some(user) = &self.user {
            config.user_id = user.clone();
        }
        if let Some(ms) = self.reconnect_interval_ms {
            config.reconnect_interval_ms = ms;
        }
        if let Some(max) = self.max_reconnect_attempts {
            config.max_reconnect_attempts = max;
        }
        if let Some(secs) = self.ping_interval_secs {
            config.ping_interval_secs = Some(secs);
        }
        if self.no_toasts {
            config.toasts = false;
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let path = match &args.config {
        Some(path) => path.clone(),
        None => config::config_path()?,
    };
    let mut config = CliConfig::load_from(&path)?;
    args.apply(&mut config);
    if args.save {
        config.save_to(&path)?;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        user = %config.user_id,
        "starting taskbell"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config))?;

    tracing::info!("taskbell shut down cleanly");
    Ok(())
}
