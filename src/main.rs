//! dental-feed-monitor: binary entrypoint.
//! Runs one check (fetch, filter, classify, notify) and exits. Schedule it
//! with cron or a systemd timer.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dental_feed_monitor::checkpoint::JsonFileCheckpointStore;
use dental_feed_monitor::config::{self, ConfigError, ENV_API_BASE, ENV_BOT_TOKEN, ENV_CHAT_ID};
use dental_feed_monitor::ingest::providers::HttpFeedSource;
use dental_feed_monitor::metrics::Metrics;
use dental_feed_monitor::monitor::Monitor;
use dental_feed_monitor::notify::telegram::DEFAULT_API_BASE;
use dental_feed_monitor::notify::{LogNotifier, Notifier, TelegramNotifier};

/// Exit status when the check ran but the digest or the checkpoints were lost.
const EXIT_PARTIAL: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "dental-feed-monitor", version, about)]
struct Cli {
    /// Config file (JSON or TOML). Defaults to $MONITOR_CONFIG_PATH, then
    /// config/monitor.toml, config/monitor.json, rss_config.json.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Checkpoint file, overrides config and $MONITOR_CHECKPOINT_PATH.
    #[arg(long)]
    checkpoints: Option<PathBuf>,

    /// Print the digest instead of sending it; checkpoints are not saved.
    #[arg(long)]
    dry_run: bool,

    /// Send a Telegram test message and exit.
    #[arg(long, conflicts_with = "dry_run")]
    test: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dental_feed_monitor=info,warn"));

    let json = std::env::var("MONITOR_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // stdout is reserved for the dry-run digest.
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env if present; TELEGRAM_* and MONITOR_* can live there.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "check aborted");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    if cli.test {
        return run_connection_test(&cli).await;
    }

    let cfg = config::load(cli.config.as_deref()).context("loading configuration")?;
    let metrics = Metrics::from_env()?;

    let notifier: Arc<dyn Notifier> = if cli.dry_run {
        Arc::new(LogNotifier)
    } else {
        let (token, chat) = cfg.require_telegram()?;
        Arc::new(TelegramNotifier::new(token, chat).with_api_base(cfg.telegram_api_base()))
    };

    let checkpoint_path = cli.checkpoints.clone().unwrap_or_else(|| cfg.checkpoint_path.clone());
    let store = Arc::new(JsonFileCheckpointStore::new(checkpoint_path));
    let feed = Arc::new(
        HttpFeedSource::new(&cfg.user_agent, Duration::from_secs(cfg.fetch_timeout_secs))
            .context("building HTTP client")?,
    );

    let monitor = Monitor::from_config(&cfg, feed, notifier, store).save_checkpoints(!cli.dry_run);
    let report = monitor.run_check(&cfg.rss_sources).await?;

    if let Some(m) = &metrics {
        if let Err(e) = m.flush() {
            tracing::warn!(error = %format!("{e:#}"), "metrics textfile not written");
        }
    }

    tracing::info!(
        qualified = report.qualified,
        notified = report.notified,
        checkpoints_saved = report.checkpoints_saved,
        "check complete"
    );

    let lost_checkpoints = !cli.dry_run && !report.checkpoints_saved;
    if report.notify_error.is_some() || lost_checkpoints {
        return Ok(ExitCode::from(EXIT_PARTIAL));
    }
    Ok(ExitCode::SUCCESS)
}

/// `--test`: credentials come from the config when there is one, else from env.
async fn run_connection_test(cli: &Cli) -> Result<ExitCode> {
    let (token, chat, api_base) = match config::load(cli.config.as_deref()) {
        Ok(cfg) => {
            let (token, chat) = cfg.require_telegram()?;
            (token, chat, cfg.telegram_api_base())
        }
        Err(ConfigError::Missing { .. }) => {
            let token = std::env::var(ENV_BOT_TOKEN).unwrap_or_default();
            let chat = std::env::var(ENV_CHAT_ID).unwrap_or_default();
            if token.trim().is_empty() || chat.trim().is_empty() {
                anyhow::bail!("{ENV_BOT_TOKEN} and {ENV_CHAT_ID} are required for --test");
            }
            let api_base = std::env::var(ENV_API_BASE)
                .ok()
                .filter(|b| !b.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
            (token.trim().to_string(), chat.trim().to_string(), api_base)
        }
        Err(e) => return Err(e).context("loading configuration"),
    };

    TelegramNotifier::new(token, chat)
        .with_api_base(api_base.trim())
        .test_connection()
        .await
        .context("Telegram connection test")?;
    tracing::info!("Telegram connection successful");
    Ok(ExitCode::SUCCESS)
}
