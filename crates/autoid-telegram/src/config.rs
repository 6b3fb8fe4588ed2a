use std::fmt;
use std::time::Duration;

/// Configuration for the Telegram notifier.
#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// User, group or channel id.
    pub chat_id: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            base_url: "https://api.telegram.org".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}
