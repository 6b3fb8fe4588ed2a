use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use autoid_core::{EvidenceError, EvidenceStore, NotifyError};
use autoid_domain::{EvidenceRef, RowIndex};

use crate::client::{BotClient, SentMessage};
use crate::config::TelegramConfig;

/// Scheme for references that only the bot can resolve.
const FILE_ID_SCHEME: &str = "telegram:";

/// Posts screenshots to the notification chat and records a link to the
/// posted message, so everyone with access to the chat can open the
/// evidence from the sheet.
///
/// Uploads that fail go to the fallback store when one is set.
pub struct TelegramEvidenceStore {
    client: BotClient,
    fallback: Option<Arc<dyn EvidenceStore>>,
}

impl TelegramEvidenceStore {
    /// # Errors
    ///
    /// Returns [`NotifyError::Other`] if the token or chat id is missing.
    pub fn new(config: TelegramConfig) -> Result<Self, NotifyError> {
        Ok(Self {
            client: BotClient::new(config)?,
            fallback: None,
        })
    }

    #[must_use]
    pub fn with_fallback(mut self, store: Arc<dyn EvidenceStore>) -> Self {
        self.fallback = Some(store);
        self
    }

    async fn upload(&self, row: RowIndex, png: Bytes) -> Result<EvidenceRef, NotifyError> {
        let sent = self
            .client
            .send_photo(png, &format!("Evidence row {row}"))
            .await?;
        message_ref(self.client.chat_id(), &sent).ok_or_else(|| {
            NotifyError::Delivery(format!("message {} carried no photo", sent.message_id))
        })
    }
}

#[async_trait]
impl EvidenceStore for TelegramEvidenceStore {
    async fn save(&self, row: RowIndex, png: Bytes) -> Result<EvidenceRef, EvidenceError> {
        if png.is_empty() {
            return Err(EvidenceError::Other("empty screenshot".to_string()));
        }
        let err = match self.upload(row, png.clone()).await {
            Ok(evidence) => {
                tracing::debug!(row = %row, evidence = %evidence, "evidence posted to telegram");
                return Ok(evidence);
            }
            Err(e) => e,
        };
        match &self.fallback {
            Some(store) => {
                tracing::warn!(row = %row, error = %err, "telegram upload failed, keeping evidence locally");
                store.save(row, png).await
            }
            None => Err(EvidenceError::Other(format!("telegram upload: {err}"))),
        }
    }

    fn delivered(&self, evidence: &EvidenceRef) -> bool {
        let link = evidence.as_str();
        link.starts_with("https://t.me/") || link.starts_with(FILE_ID_SCHEME)
    }
}

/// Shareable link to a posted photo. Supergroups and channels get a
/// `t.me` message link; other chats fall back to the photo's file id.
/// Never embeds the bot token.
fn message_ref(chat_id: &str, sent: &SentMessage) -> Option<EvidenceRef> {
    if let Some(internal) = chat_id.strip_prefix("-100")
        && !internal.is_empty()
        && internal.chars().all(|c| c.is_ascii_digit())
    {
        return Some(EvidenceRef::new(format!(
            "https://t.me/c/{internal}/{}",
            sent.message_id
        )));
    }
    if let Some(channel) = chat_id.strip_prefix('@')
        && !channel.is_empty()
    {
        return Some(EvidenceRef::new(format!(
            "https://t.me/{channel}/{}",
            sent.message_id
        )));
    }
    sent.largest_photo()
        .map(|p| EvidenceRef::new(format!("{FILE_ID_SCHEME}{}", p.file_id)))
}
