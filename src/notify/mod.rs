// src/notify/mod.rs
pub mod telegram;

pub use telegram::TelegramNotifier;

use anyhow::Result;
use async_trait::async_trait;

/// Message sink for a composed digest.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Dry-run sink: prints the digest to stdout instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        tracing::info!(chars = message.chars().count(), "dry run, digest not delivered");
        println!("{message}");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
