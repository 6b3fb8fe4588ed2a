use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::borrow::Cow;

use autoid_core::NotifyError;

use crate::config::TelegramConfig;

/// Bot API limits, in characters.
pub(crate) const MESSAGE_LIMIT: usize = 4096;
pub(crate) const CAPTION_LIMIT: usize = 1024;

/// Room kept for the closing tags appended after a cut.
const CLOSING_RESERVE: usize = 64;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

/// The parts of a Bot API `Message` we read back.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SentMessage {
    pub message_id: i64,
    #[serde(default)]
    pub photo: Vec<PhotoSize>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
}

impl SentMessage {
    /// Telegram lists every resolution it stored; keep the biggest.
    pub fn largest_photo(&self) -> Option<&PhotoSize> {
        self.photo
            .iter()
            .max_by_key(|p| u64::from(p.width) * u64::from(p.height))
    }
}

/// Thin Bot API client bound to one chat.
pub(crate) struct BotClient {
    http: reqwest::Client,
    config: TelegramConfig,
}

impl BotClient {
    pub fn new(config: TelegramConfig) -> Result<Self, NotifyError> {
        if config.bot_token.is_empty() || config.chat_id.is_empty() {
            return Err(NotifyError::Other(
                "telegram bot token and chat id are required".into(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(map_reqwest_err)?;
        Ok(Self { http, config })
    }

    pub fn chat_id(&self) -> &str {
        &self.config.chat_id
    }

    pub fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.config.base_url.trim_end_matches('/'),
            self.config.bot_token
        )
    }

    pub async fn send_message(&self, text: &str) -> Result<SentMessage, NotifyError> {
        let body = json!({
            "chat_id": self.config.chat_id,
            "text": truncate_html(text, MESSAGE_LIMIT),
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        let resp = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_err)?;
        check(resp).await
    }

    /// Captions go out as plain text.
    pub async fn send_photo(&self, png: Bytes, caption: &str) -> Result<SentMessage, NotifyError> {
        let photo = Part::bytes(png.to_vec())
            .file_name("evidence.png")
            .mime_str("image/png")
            .map_err(map_reqwest_err)?;
        let form = Form::new()
            .text("chat_id", self.config.chat_id.clone())
            .text("caption", truncate(caption, CAPTION_LIMIT).to_string())
            .part("photo", photo);
        let resp = self
            .http
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_err)?;
        check(resp).await
    }
}

/// Request URLs embed the bot token; drop them from errors.
#[allow(clippy::needless_pass_by_value)] // signature required for use with .map_err()
fn map_reqwest_err(e: reqwest::Error) -> NotifyError {
    NotifyError::Delivery(e.without_url().to_string())
}

async fn check<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, NotifyError> {
    let status = resp.status();
    let body = resp.text().await.map_err(map_reqwest_err)?;
    interpret(status.as_u16(), &body)
}

pub(crate) fn interpret<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, NotifyError> {
    match serde_json::from_str::<ApiResponse<T>>(body) {
        Ok(ApiResponse {
            ok: true,
            result: Some(result),
            ..
        }) => Ok(result),
        Ok(ApiResponse { ok: true, .. }) => Err(NotifyError::Delivery(format!(
            "HTTP {status}: response carried no result"
        ))),
        Ok(ApiResponse { description, .. }) => Err(NotifyError::Rejected(
            description.unwrap_or_else(|| format!("HTTP {status}")),
        )),
        Err(_) => Err(NotifyError::Delivery(format!(
            "HTTP {status}: {}",
            truncate(body.trim(), 200)
        ))),
    }
}

/// Longest prefix of `text` with at most `limit` characters.
pub(crate) fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Cut HTML message text to at most `limit` characters without splitting
/// a tag or an entity, then close the tags the cut left open.
pub(crate) fn truncate_html(text: &str, limit: usize) -> Cow<'_, str> {
    if text.chars().count() <= limit {
        return Cow::Borrowed(text);
    }
    let budget = limit.saturating_sub(CLOSING_RESERVE);
    let mut open: Vec<&str> = Vec::new();
    // start and opening char of the tag or entity being read
    let mut markup: Option<(usize, char)> = None;
    let mut cut = 0;
    for (i, c) in text.char_indices().take(budget) {
        match (markup, c) {
            (None, '<' | '&') => markup = Some((i, c)),
            (None, _) => cut = i + c.len_utf8(),
            (Some((start, '<')), '>') => {
                track_tag(&text[start + 1..i], &mut open);
                markup = None;
                cut = i + 1;
            }
            (Some((_, '&')), ';') => {
                markup = None;
                cut = i + 1;
            }
            _ => {}
        }
    }

    let mut out = text[..cut].to_string();
    for tag in open.iter().rev() {
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }
    Cow::Owned(out)
}

fn track_tag<'a>(inner: &'a str, open: &mut Vec<&'a str>) {
    if let Some(name) = inner.strip_prefix('/') {
        let name = name.trim();
        if let Some(pos) = open.iter().rposition(|t| t.eq_ignore_ascii_case(name)) {
            open.truncate(pos);
        }
    } else if !inner.ends_with('/')
        && let Some(name) = inner.split_whitespace().next()
    {
        open.push(name);
    }
}
