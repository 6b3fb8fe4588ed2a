use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::Mutex;

use autoid_core::{Automation, AutomationError, ProviderSession};
use autoid_domain::{ProviderFamily, ProviderFlow};

/// What the scripted portal does for one inquiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Result text as the portal would render it.
    Page(String),
    /// Result never appeared.
    Timeout,
    /// Portal dropped the login mid-run.
    SessionLost,
    /// Browser driver is gone; every command fails to connect.
    Disconnected,
}

impl Reply {
    pub fn page(text: impl Into<String>) -> Self {
        Self::Page(text.into())
    }
}

#[derive(Default)]
struct State {
    /// Per-account queue; the last reply repeats once the queue drains.
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    inquired: Mutex<Vec<(ProviderFamily, String)>>,
    inquiries: AtomicU32,
    opens: AtomicU32,
    closes: AtomicU32,
    failing_open: AtomicBool,
}

/// Automation backend that answers from a script instead of a browser.
#[derive(Clone, Default)]
pub struct ScriptedAutomation {
    state: Arc<State>,
}

impl ScriptedAutomation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue replies for `account`, in order.
    pub async fn script(&self, account: &str, replies: impl IntoIterator<Item = Reply>) {
        self.state
            .scripts
            .lock()
            .await
            .entry(account.to_string())
            .or_default()
            .extend(replies);
    }

    pub async fn reply(&self, account: &str, reply: Reply) {
        self.script(account, [reply]).await;
    }

    /// Make every later `open` fail as if no browser could be started.
    pub fn fail_open(&self, failing: bool) {
        self.state.failing_open.store(failing, Ordering::Release);
    }

    pub fn inquiries(&self) -> u32 {
        self.state.inquiries.load(Ordering::Acquire)
    }

    pub fn opens(&self) -> u32 {
        self.state.opens.load(Ordering::Acquire)
    }

    pub fn closes(&self) -> u32 {
        self.state.closes.load(Ordering::Acquire)
    }

    /// `(family, account)` for every inquiry, in order.
    pub async fn inquired(&self) -> Vec<(ProviderFamily, String)> {
        self.state.inquired.lock().await.clone()
    }
}

#[async_trait]
impl Automation for ScriptedAutomation {
    async fn open(
        &self,
        family: ProviderFamily,
        headless: bool,
    ) -> Result<Box<dyn ProviderSession>, AutomationError> {
        self.state.opens.fetch_add(1, Ordering::AcqRel);
        if self.state.failing_open.load(Ordering::Acquire) {
            return Err(AutomationError::SessionUnavailable(
                "scripted browser refused to start".to_string(),
            ));
        }
        tracing::debug!(family = %family, headless, "scripted session opened");
        Ok(Box::new(ScriptedSession {
            family,
            state: self.state.clone(),
            closed: false,
        }))
    }
}

struct ScriptedSession {
    family: ProviderFamily,
    state: Arc<State>,
    closed: bool,
}

impl ScriptedSession {
    async fn next_reply(&self, account: &str) -> Reply {
        let mut scripts = self.state.scripts.lock().await;
        let Some(queue) = scripts.get_mut(account) else {
            return Reply::Page(String::new());
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap_or(Reply::Timeout)
        } else {
            queue.front().cloned().unwrap_or(Reply::Timeout)
        }
    }
}

#[async_trait]
impl ProviderSession for ScriptedSession {
    fn family(&self) -> ProviderFamily {
        self.family
    }

    async fn inquire(
        &mut self,
        flow: &ProviderFlow,
        account_number: &str,
    ) -> Result<String, AutomationError> {
        if self.closed {
            return Err(AutomationError::Other("session closed".to_string()));
        }
        self.state.inquiries.fetch_add(1, Ordering::AcqRel);
        self.state
            .inquired
            .lock()
            .await
            .push((flow.family(), account_number.to_string()));

        match self.next_reply(account_number).await {
            Reply::Page(text) => Ok(text),
            Reply::Timeout => Err(AutomationError::Timeout(format!(
                "{} result for {account_number}",
                flow.display_name()
            ))),
            Reply::SessionLost => Err(AutomationError::LoginRejected(format!(
                "{} session expired",
                self.family
            ))),
            Reply::Disconnected => Err(AutomationError::Connection(format!(
                "{} driver: connection refused",
                self.family
            ))),
        }
    }

    async fn screenshot(&mut self) -> Result<Bytes, AutomationError> {
        let n = self.state.inquiries.load(Ordering::Acquire);
        Ok(Bytes::from(format!("png:{}:{n}", self.family)))
    }

    async fn close(&mut self) -> Result<(), AutomationError> {
        if !self.closed {
            self.closed = true;
            self.state.closes.fetch_add(1, Ordering::AcqRel);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn last_reply_repeats() {
        let automation = ScriptedAutomation::new();
        automation
            .script("1", [Reply::Timeout, Reply::page("Nama: Marwan")])
            .await;
        let flow = ProviderFlow::bank("Bank Central Asia");
        let mut session = automation.open(ProviderFamily::Bank, true).await.unwrap();

        assert!(session.inquire(&flow, "1").await.is_err());
        assert_eq!(session.inquire(&flow, "1").await.unwrap(), "Nama: Marwan");
        assert_eq!(session.inquire(&flow, "1").await.unwrap(), "Nama: Marwan");
        assert_eq!(automation.inquiries(), 3);
    }

    #[tokio::test]
    async fn unscripted_account_returns_blank_page() {
        let automation = ScriptedAutomation::new();
        let flow = ProviderFlow::ewallet("DANA");
        let mut session = automation.open(ProviderFamily::Ewallet, true).await.unwrap();
        assert_eq!(session.inquire(&flow, "999").await.unwrap(), "");
    }

    #[tokio::test]
    async fn disconnected_is_transient_connection_error() {
        let automation = ScriptedAutomation::new();
        automation.reply("1", Reply::Disconnected).await;
        let flow = ProviderFlow::bank("Bank Central Asia");
        let mut session = automation.open(ProviderFamily::Bank, true).await.unwrap();

        let err = session.inquire(&flow, "1").await.unwrap_err();
        assert!(matches!(err, AutomationError::Connection(_)));
        assert!(!err.is_outage());
    }

    #[tokio::test]
    async fn close_is_counted_once() {
        let automation = ScriptedAutomation::new();
        let mut session = automation.open(ProviderFamily::Bank, false).await.unwrap();
        session.close().await.unwrap();
        session.close().await.unwrap();
        assert_eq!(automation.closes(), 1);
        assert_eq!(automation.opens(), 1);
    }

    #[tokio::test]
    async fn failing_open_is_an_outage() {
        let automation = ScriptedAutomation::new();
        automation.fail_open(true);
        let err = automation
            .open(ProviderFamily::Bank, true)
            .await
            .err()
            .unwrap();
        assert!(err.is_outage());
    }
}
