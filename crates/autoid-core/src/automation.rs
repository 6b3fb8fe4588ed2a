use async_trait::async_trait;
use bytes::Bytes;

use autoid_domain::{ProviderFamily, ProviderFlow};

use crate::error::AutomationError;

/// Browser automation backend. Created once, shared across the run.
#[async_trait]
pub trait Automation: Send + Sync {
    /// Open and authenticate a session for one provider family.
    async fn open(
        &self,
        family: ProviderFamily,
        headless: bool,
    ) -> Result<Box<dyn ProviderSession>, AutomationError>;
}

/// One authenticated provider portal session.
///
/// Sessions are stateful and not safe for concurrent inquiries; the
/// orchestrator holds each one exclusively.
#[async_trait]
pub trait ProviderSession: Send {
    fn family(&self) -> ProviderFamily;

    /// Run the flow's inquiry for `account_number` and return the raw
    /// result text exactly as the portal shows it.
    async fn inquire(
        &mut self,
        flow: &ProviderFlow,
        account_number: &str,
    ) -> Result<String, AutomationError>;

    /// PNG of the current page.
    async fn screenshot(&mut self) -> Result<Bytes, AutomationError>;

    /// Log out and tear the session down.
    async fn close(&mut self) -> Result<(), AutomationError>;
}
