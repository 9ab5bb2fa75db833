//! incident-watch - Binary Entry Point
//!
//! Follows a backend's incident stream and logs one summary line per state
//! change. Stands in for a dashboard: it only reads session views.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Duration as ChronoDuration;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use incident_feed::utils::{format_relative, now_utc};
use incident_feed::{FeedConfig, IncidentView, Session, SessionHandle};

/// One year
const MAX_WINDOW_MINS: i64 = 60 * 24 * 365;

#[derive(Debug, Parser)]
#[command(name = "incident-watch", version, about = "Follow a live incident stream")]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "INCIDENT_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL, e.g. http://localhost:8000
    #[arg(long)]
    base_url: Option<String>,

    /// Window for the "recent" count, in minutes
    #[arg(long, default_value_t = 15, value_parser = clap::value_parser!(i64).range(1..=MAX_WINDOW_MINS))]
    window_mins: i64,

    /// Confidence above which an incident counts as high
    #[arg(long, default_value_t = 0.8)]
    threshold: f64,
}

impl Args {
    fn load_config(&self) -> Result<FeedConfig> {
        let mut config = match &self.config {
            Some(path) => FeedConfig::from_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => FeedConfig::default(),
        };
        config.apply_env();
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        Ok(config)
    }

    fn window(&self) -> Result<ChronoDuration> {
        ChronoDuration::try_minutes(self.window_mins)
            .with_context(|| format!("window of {} minutes is out of range", self.window_mins))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args.load_config()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    runtime.block_on(watch(args, config))
}

async fn watch(args: Args, config: FeedConfig) -> Result<()> {
    let (stop_tx, mut stop_rx) = mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .context("failed to install Ctrl-C handler")?;

    info!(version = incident_feed::VERSION, "incident-watch starting");
    let session = Session::connect(&config).context("invalid backend URL")?;

    let window = args.window()?;
    let mut views = session.subscribe();
    let mut connection = session.subscribe_connection();

    loop {
        tokio::select! {
            _ = stop_rx.recv() => {
                info!("interrupt received, shutting down");
                break;
            }
            changed = views.changed() => {
                if changed.is_err() {
                    warn!("session ended unexpectedly");
                    break;
                }
            }
            changed = connection.changed() => {
                if changed.is_err() {
                    warn!("push channel manager ended unexpectedly");
                    break;
                }
            }
        }

        let view = views.borrow_and_update().clone();
        let _ = connection.borrow_and_update();
        log_summary(&session, &view, window, args.threshold);
    }

    session.shutdown().await;
    Ok(())
}

fn log_summary(session: &SessionHandle, view: &IncidentView, window: ChronoDuration, threshold: f64) {
    let now = now_utc();
    let stats = view.stats(now, window, threshold);
    let last = view
        .last_detection()
        .map(|ts| format_relative(ts, now))
        .unwrap_or_else(|| "never".to_string());

    let mut new_ids: Vec<&str> = view.highlighted.iter().map(String::as_str).collect();
    new_ids.sort_unstable();

    info!(
        connection = %session.connection_state(),
        total = stats.total,
        recent = stats.recent,
        above_threshold = stats.above_threshold,
        last_detection = %last,
        new = ?new_ids,
        "incident feed"
    );
}
