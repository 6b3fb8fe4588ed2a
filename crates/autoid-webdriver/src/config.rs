use std::fmt;
use std::time::Duration;

/// Login for one provider portal.
#[derive(Clone, Default)]
pub struct PortalCredentials {
    pub username: String,
    pub password: String,
}

impl PortalCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn is_set(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for PortalCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configuration for the WebDriver automation backend.
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    /// WebDriver server URL (chromedriver, selenium, ...).
    pub url: String,
    /// Default when the run does not say otherwise.
    pub headless: bool,
    /// Per-request timeout, also the wait budget for elements to appear.
    pub timeout: Duration,
    /// Pause after actions that trigger portal-side rendering.
    pub settle_delay: Duration,
    /// How often a missing element is looked up again while waiting.
    pub poll_interval: Duration,
    pub window_width: u32,
    pub window_height: u32,
    /// CIMB OCTO, used for bank inquiries.
    pub cimb: PortalCredentials,
    /// KlikBCA, used for e-wallet virtual account inquiries.
    pub klikbca: PortalCredentials,
    /// Transfer amount entered to unlock the CIMB validation button.
    pub nominal: String,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:4444".to_string(),
            headless: false,
            timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(3),
            poll_interval: Duration::from_millis(250),
            window_width: 1366,
            window_height: 768,
            cimb: PortalCredentials::default(),
            klikbca: PortalCredentials::default(),
            nominal: "20000".to_string(),
        }
    }
}
