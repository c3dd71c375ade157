//! Telegram channel: posts operator messages through the Bot API.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::channels::LeadChannel;
use crate::config::{ChannelSetting, Lookup, non_empty, required_all};
use crate::error::ChannelError;
use crate::pipeline::types::ClassifiedLead;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Default Bot API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    /// Chat that receives operator messages.
    pub chat_id: String,
    pub api_base: String,
}

impl TelegramConfig {
    /// Enabled when both `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID` are set.
    pub fn from_lookup(lookup: Lookup<'_>) -> ChannelSetting<Self> {
        match required_all(lookup, ["TELEGRAM_BOT_TOKEN", "TELEGRAM_CHAT_ID"]) {
            Ok([bot_token, chat_id]) => ChannelSetting::Enabled(Self {
                bot_token: SecretString::from(bot_token),
                chat_id,
                api_base: non_empty(lookup, "TELEGRAM_API_BASE")
                    .unwrap_or_else(|| DEFAULT_API_BASE.into()),
            }),
            Err(missing) => ChannelSetting::Disabled { missing },
        }
    }
}

/// Telegram channel. Sends one `sendMessage` per lead to the operator chat.
pub struct TelegramChannel {
    bot_token: SecretString,
    chat_id: String,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            bot_token: config.bot_token,
            chat_id: config.chat_id,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.api_base,
            self.bot_token.expose_secret()
        )
    }

    /// Send a text message, trying Markdown first with plain text fallback.
    /// Splits long messages that exceed Telegram's 4096 char limit.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        let chunks = split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH);

        for chunk in &chunks {
            self.send_message_chunk(chat_id, chunk).await?;
        }
        Ok(())
    }

    /// Send a single message chunk, Markdown-first with fallback.
    ///
    /// Lead answers are free text and may break Markdown parsing. Only that
    /// rejection triggers a plain resend; any other failure ends the
    /// delivery after one request.
    async fn send_message_chunk(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        let markdown_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown"
        });

        let markdown_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&markdown_body)
            .send()
            .await
            .map_err(send_failed)?;

        let markdown_status = markdown_resp.status();
        if markdown_status.is_success() {
            return Ok(());
        }

        let markdown_err = markdown_resp.text().await.unwrap_or_default();
        if !is_markdown_rejection(markdown_status, &markdown_err) {
            return Err(ChannelError::Rejected {
                name: "telegram".into(),
                status: markdown_status.as_u16(),
                body: markdown_err,
            });
        }

        tracing::warn!(
            status = ?markdown_status,
            error = %markdown_err,
            "Telegram rejected Markdown; resending without parse_mode"
        );

        let plain_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        let plain_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&plain_body)
            .send()
            .await
            .map_err(send_failed)?;

        let plain_status = plain_resp.status();
        if !plain_status.is_success() {
            let plain_err = plain_resp.text().await.unwrap_or_default();
            return Err(ChannelError::Rejected {
                name: "telegram".into(),
                status: plain_status.as_u16(),
                body: format!("markdown: {markdown_err}; plain: {plain_err}"),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl LeadChannel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn deliver(&self, lead: &ClassifiedLead) -> Result<(), ChannelError> {
        self.send_message(&self.chat_id, &lead.operator_message)
            .await?;
        tracing::info!(lead_id = %lead.id, "Lead notification sent to Telegram");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Request errors carry the URL, which embeds the bot token.
fn send_failed(e: reqwest::Error) -> ChannelError {
    ChannelError::SendFailed {
        name: "telegram".into(),
        reason: e.without_url().to_string(),
    }
}

/// Telegram answers unparseable Markdown with 400 "can't parse entities".
fn is_markdown_rejection(status: reqwest::StatusCode, body: &str) -> bool {
    status == reqwest::StatusCode::BAD_REQUEST && body.contains("can't parse entities")
}

/// Split a message into chunks of at most `max_len` bytes.
/// Tries to split on newlines, then spaces, then hard-cuts on a char boundary.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let boundary = floor_char_boundary(remaining, max_len);
        let chunk = &remaining[..boundary];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(boundary);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

/// Largest char boundary `<= index`, but never 0 for a non-empty string.
fn floor_char_boundary(s: &str, index: usize) -> usize {
    let mut i = index.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    if i == 0 {
        s.chars().next().map(char::len_utf8).unwrap_or(0)
    } else {
        i
    }
}

// ── Tests ───────────────────────────────────────────────────────────
