use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use autoid_core::{AutomationError, ProviderSession};
use autoid_domain::{ProviderFamily, ProviderFlow};

use crate::client::WebDriverClient;
use crate::config::WebDriverConfig;
use crate::portal::{Portal, Step, input_text};

/// A logged-in portal inside one browser session.
pub struct PortalSession {
    client: WebDriverClient,
    portal: &'static Portal,
    config: Arc<WebDriverConfig>,
    closed: bool,
}

/// Log into `portal` on a fresh browser session.
///
/// A login that does not reach the portal menu is
/// [`AutomationError::LoginRejected`].
pub(crate) async fn login(
    client: &WebDriverClient,
    portal: &Portal,
    config: &WebDriverConfig,
) -> Result<(), AutomationError> {
    let creds = portal.credentials(config);
    if !creds.is_set() {
        return Err(AutomationError::LoginRejected(format!(
            "no {} credentials configured",
            portal.name
        )));
    }

    client.navigate(portal.login_url).await?;
    client.fill(portal.username_field, &creds.username).await?;
    client.fill(portal.password_field, &creds.password).await?;
    client.click_at(portal.login_button).await?;
    tokio::time::sleep(config.settle_delay).await;

    if let Some(menu) = portal.to_form.first() {
        client.wait_for(menu).await.map_err(|e| {
            AutomationError::LoginRejected(format!("{} login did not complete: {e}", portal.name))
        })?;
    }
    info!(portal = portal.name, session = client.session_id(), "portal login complete");
    Ok(())
}

impl PortalSession {
    pub(crate) fn new(
        client: WebDriverClient,
        portal: &'static Portal,
        config: Arc<WebDriverConfig>,
    ) -> Self {
        Self {
            client,
            portal,
            config,
            closed: false,
        }
    }

    fn pause(&self) -> Duration {
        self.config.settle_delay / 3
    }

    async fn open_form(&self) -> Result<(), AutomationError> {
        if self.client.is_present(self.portal.form_marker).await? {
            return Ok(());
        }
        debug!(portal = self.portal.name, "navigating to inquiry form");
        for menu in self.portal.to_form {
            self.client.click_at(menu).await?;
            tokio::time::sleep(self.pause()).await;
        }
        self.client.wait_for(self.portal.form_marker).await.map(drop)
    }

    async fn run_step(
        &self,
        step: Step,
        flow: &ProviderFlow,
        account_number: &str,
    ) -> Result<(), AutomationError> {
        match step {
            Step::Fill(xpath, input) => {
                let text = input_text(input, flow, account_number, &self.config);
                self.client.fill(xpath, text).await
            }
            Step::Click(xpath) => self.client.click_at(xpath).await,
            Step::TryClick(xpath) => {
                if let Ok(element) = self.client.find(xpath).await
                    && let Err(e) = self.client.click(&element).await
                {
                    debug!(xpath, error = %e, "optional click skipped");
                }
                Ok(())
            }
            Step::Pause => {
                tokio::time::sleep(self.pause()).await;
                Ok(())
            }
            Step::Settle => {
                tokio::time::sleep(self.config.settle_delay).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ProviderSession for PortalSession {
    fn family(&self) -> ProviderFamily {
        self.portal.family
    }

    async fn inquire(
        &mut self,
        flow: &ProviderFlow,
        account_number: &str,
    ) -> Result<String, AutomationError> {
        if self.closed {
            return Err(AutomationError::Other(format!("{} session closed", self.portal.name)));
        }
        if flow.family() != self.portal.family {
            return Err(AutomationError::Other(format!(
                "{} cannot inquire {} accounts",
                self.portal.name,
                flow.family()
            )));
        }

        self.open_form().await?;
        for step in self.portal.inquiry {
            self.run_step(*step, flow, account_number).await?;
        }
        let raw = self.client.text_at(self.portal.result).await?;
        debug!(portal = self.portal.name, account = account_number, raw = %raw, "inquiry result");
        Ok(raw)
    }

    async fn screenshot(&mut self) -> Result<Bytes, AutomationError> {
        self.client.screenshot().await
    }

    async fn close(&mut self) -> Result<(), AutomationError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Err(e) = self.client.click_at(self.portal.logout).await {
            warn!(portal = self.portal.name, error = %e, "logout failed");
        } else {
            tokio::time::sleep(self.pause()).await;
        }
        self.client.quit().await
    }
}
