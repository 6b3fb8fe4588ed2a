mod automation;
mod client;
mod config;
mod error;
mod portal;
mod session;

pub use automation::WebDriverAutomation;
pub use client::{ElementId, WebDriverClient};
pub use config::{PortalCredentials, WebDriverConfig};
pub use session::PortalSession;
