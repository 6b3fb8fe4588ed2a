use std::collections::HashMap;
use std::sync::Arc;

use autoid_domain::ProviderFamily;

use crate::automation::{Automation, ProviderSession};
use crate::error::AutomationError;

/// At most one live session per provider family, opened on first use and
/// reused for every later row of that family.
pub struct SessionPool {
    automation: Arc<dyn Automation>,
    headless: bool,
    sessions: HashMap<ProviderFamily, Box<dyn ProviderSession>>,
}

impl SessionPool {
    pub fn new(automation: Arc<dyn Automation>, headless: bool) -> Self {
        Self {
            automation,
            headless,
            sessions: HashMap::new(),
        }
    }

    /// Session for `family`, logging in if needed. A failed login is an
    /// outage regardless of how the backend reported it.
    pub async fn session(
        &mut self,
        family: ProviderFamily,
    ) -> Result<&mut dyn ProviderSession, AutomationError> {
        if !self.sessions.contains_key(&family) {
            tracing::info!(family = %family, headless = self.headless, "opening provider session");
            let session = self
                .automation
                .open(family, self.headless)
                .await
                .map_err(|e| {
                    if e.is_outage() {
                        e
                    } else {
                        AutomationError::SessionUnavailable(format!("{family}: {e}"))
                    }
                })?;
            self.sessions.insert(family, session);
        }
        self.sessions
            .get_mut(&family)
            .map(|s| &mut **s as &mut dyn ProviderSession)
            .ok_or_else(|| AutomationError::Other(format!("{family} session missing")))
    }

    pub fn is_open(&self, family: ProviderFamily) -> bool {
        self.sessions.contains_key(&family)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop the session for `family` so the next `session` call logs in
    /// again. Close failures are logged; a dead driver cannot log out.
    pub async fn reset(&mut self, family: ProviderFamily) {
        let Some(mut session) = self.sessions.remove(&family) else {
            return;
        };
        tracing::warn!(family = %family, "discarding provider session");
        if let Err(e) = session.close().await {
            tracing::warn!(family = %family, error = %e, "closing discarded session");
        }
    }

    /// Close every open session. Close failures are logged, never returned.
    pub async fn release_all(&mut self) {
        for (family, mut session) in self.sessions.drain() {
            match session.close().await {
                Ok(()) => tracing::info!(family = %family, "provider session closed"),
                Err(e) => tracing::warn!(family = %family, error = %e, "closing provider session"),
            }
        }
    }
}
