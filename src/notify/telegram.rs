// src/notify/telegram.rs
use super::Notifier;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";
pub const TEST_MESSAGE: &str = "✅ Digital Dentistry Monitor: Configuration test successful!";
/// `sendMessage` text limit, counted in UTF-16 code units.
pub const MAX_MESSAGE_LEN: usize = 4096;

fn text_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Split `text` into parts of at most `limit` UTF-16 units.
///
/// Parts break at blank lines (item boundaries) first, then at line ends. A
/// single line longer than `limit` is cut on char boundaries.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    if text_len(text) <= limit {
        return vec![text.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();

    fn push_piece(
        parts: &mut Vec<String>,
        current: &mut String,
        piece: &str,
        sep: &str,
        limit: usize,
    ) {
        let joined = if current.is_empty() {
            text_len(piece)
        } else {
            text_len(current) + text_len(sep) + text_len(piece)
        };
        if joined <= limit {
            if !current.is_empty() {
                current.push_str(sep);
            }
            current.push_str(piece);
            return;
        }
        if !current.is_empty() {
            parts.push(std::mem::take(current));
        }
        if text_len(piece) <= limit {
            current.push_str(piece);
            return;
        }
        // Oversized piece: retry line by line, then char by char.
        if piece.contains('\n') {
            for line in piece.split('\n') {
                push_piece(parts, current, line, "\n", limit);
            }
            return;
        }
        let mut units = 0;
        for ch in piece.chars() {
            let w = ch.len_utf16();
            if units + w > limit {
                parts.push(std::mem::take(current));
                units = 0;
            }
            current.push(ch);
            units += w;
        }
    }

    for block in text.split("\n\n") {
        push_piece(&mut parts, &mut current, block, "\n\n", limit);
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts.retain(|p| !p.trim().is_empty());
    parts
}

/// Telegram Bot API `sendMessage` client. Credentials live here and nowhere else.
#[derive(Clone)]
pub struct TelegramNotifier {
    api_base: String,
    bot_token: String,
    chat_id: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
    backoff: Duration,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("api_base", &self.api_base)
            .field("chat_id", &self.chat_id)
            .field("bot_token", &"<redacted>")
            .finish()
    }
}

impl TelegramNotifier {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
            backoff: Duration::from_millis(500),
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    /// Base delay; attempt n waits `backoff * 2^(n-1)`.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }

    pub async fn send_message(&self, text: &str) -> Result<()> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: false,
        };
        let url = self.endpoint();

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&url)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            // Errors are stripped of the URL, which embeds the bot token.
            let err = match res {
                Ok(rsp) if rsp.status().is_success() => return Ok(()),
                Ok(rsp) => {
                    let status = rsp.status();
                    let body = rsp.text().await.unwrap_or_default();
                    let err = anyhow!("Telegram sendMessage HTTP {status}: {}", body.trim());
                    // A rejected request fails the same way every time; 429 is rate limiting.
                    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
                        return Err(err);
                    }
                    err
                }
                Err(e) => anyhow!("Telegram sendMessage request failed: {}", e.without_url()),
            };

            if attempt >= self.max_retries {
                return Err(err);
            }
            tracing::warn!(attempt, error = %err, "telegram send failed, retrying");
            tokio::time::sleep(self.backoff * (1u32 << (attempt - 1))).await;
        }
    }

    /// Sends a short confirmation message to the configured chat.
    pub async fn test_connection(&self) -> Result<()> {
        self.send_message(TEST_MESSAGE).await
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    /// Digests over the Telegram limit go out as several messages, in order.
    async fn send(&self, message: &str) -> Result<()> {
        let parts = split_message(message, MAX_MESSAGE_LEN);
        let total = parts.len();
        for (i, part) in parts.iter().enumerate() {
            self.send_message(part)
                .await
                .with_context(|| format!("message part {} of {total}", i + 1))?;
        }
        if total > 1 {
            tracing::debug!(parts = total, "digest split across messages");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_embeds_token_and_trims_base() {
        let n = TelegramNotifier::new("123:abc", "42").with_api_base("http://localhost:9/");
        assert_eq!(n.endpoint(), "http://localhost:9/bot123:abc/sendMessage");
    }

    #[test]
    fn debug_redacts_token() {
        let n = TelegramNotifier::new("123:secret", "42");
        assert!(!format!("{n:?}").contains("secret"));
    }

    #[test]
    fn short_message_is_one_part() {
        assert_eq!(split_message("hello\n\nworld", 4096), vec!["hello\n\nworld"]);
    }

    #[test]
    fn splits_at_item_boundaries() {
        let block = "x".repeat(30);
        let text = [block.as_str(); 5].join("\n\n");
        let parts = split_message(&text, 70);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], format!("{block}\n\n{block}"));
        assert_eq!(parts[2], block);
        assert!(parts.iter().all(|p| text_len(p) <= 70));
    }

    #[test]
    fn oversized_block_splits_by_line_then_char() {
        let text = format!("{}\n{}", "a".repeat(8), "b".repeat(25));
        let parts = split_message(&text, 10);
        assert!(parts.iter().all(|p| text_len(p) <= 10), "{parts:?}");
        assert_eq!(parts.concat(), format!("{}{}", "a".repeat(8), "b".repeat(25)));
    }

    #[test]
    fn limit_counts_utf16_units() {
        let text = "🦷".repeat(3);
        let parts = split_message(&text, 4);
        assert_eq!(parts, vec!["🦷🦷", "🦷"]);
    }

    #[test]
    fn payload_shape() {
        let p = SendMessage {
            chat_id: "42",
            text: "hi",
            parse_mode: "HTML",
            disable_web_page_preview: false,
        };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["parse_mode"], "HTML");
        assert_eq!(v["disable_web_page_preview"], false);
        assert_eq!(v["chat_id"], "42");
    }
}
