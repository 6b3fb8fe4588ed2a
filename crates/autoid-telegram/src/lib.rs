mod client;
mod config;
mod evidence;
mod notifier;

pub use config::TelegramConfig;
pub use evidence::TelegramEvidenceStore;
pub use notifier::TelegramNotifier;
