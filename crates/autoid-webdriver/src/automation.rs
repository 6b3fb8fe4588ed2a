use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use autoid_core::{Automation, AutomationError, ProviderSession};
use autoid_domain::ProviderFamily;

use crate::client::WebDriverClient;
use crate::config::WebDriverConfig;
use crate::portal::Portal;
use crate::session::{PortalSession, login};

/// Opens one browser per provider family against a WebDriver server.
pub struct WebDriverAutomation {
    config: Arc<WebDriverConfig>,
}

impl WebDriverAutomation {
    pub fn new(config: WebDriverConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &WebDriverConfig {
        &self.config
    }
}

#[async_trait]
impl Automation for WebDriverAutomation {
    async fn open(
        &self,
        family: ProviderFamily,
        headless: bool,
    ) -> Result<Box<dyn ProviderSession>, AutomationError> {
        let client = WebDriverClient::start(&self.config, headless || self.config.headless).await?;
        let portal = Portal::for_family(family);

        if let Err(e) = login(&client, portal, &self.config).await {
            if let Err(quit) = client.quit().await {
                warn!(portal = portal.name, error = %quit, "could not end browser after failed login");
            }
            return Err(match e {
                AutomationError::LoginRejected(_) | AutomationError::SessionUnavailable(_) => e,
                other => AutomationError::LoginRejected(format!("{}: {other}", portal.name)),
            });
        }
        Ok(Box::new(PortalSession::new(client, portal, self.config.clone())))
    }
}
