use async_trait::async_trait;
use tracing::debug;

use autoid_core::{Notification, Notifier, NotifyError};

use crate::client::BotClient;
use crate::config::TelegramConfig;

/// Sends notifications to one Telegram chat. Attachments go out as a
/// photo first, then the text as an HTML message.
pub struct TelegramNotifier {
    client: BotClient,
}

impl TelegramNotifier {
    /// # Errors
    ///
    /// Returns [`NotifyError::Other`] if the token or chat id is missing.
    pub fn new(config: TelegramConfig) -> Result<Self, NotifyError> {
        Ok(Self {
            client: BotClient::new(config)?,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        if let Some(attachment) = &notification.attachment {
            self.client
                .send_photo(attachment.png.clone(), &attachment.caption)
                .await?;
        }
        self.client.send_message(&notification.text).await?;
        debug!(
            chat = %self.client.chat_id(),
            photo = notification.attachment.is_some(),
            "telegram notification delivered"
        );
        Ok(())
    }
}
