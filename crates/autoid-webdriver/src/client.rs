use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use reqwest::Method;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use autoid_core::AutomationError;

use crate::config::WebDriverConfig;
use crate::error::{map_protocol_err, map_reqwest_err};

/// W3C web element reference key.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Opaque element reference returned by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementId(String);

impl ElementId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Minimal W3C WebDriver client bound to one browser session.
///
/// Only the commands the portal flows need: navigation, XPath lookup,
/// typing, clicking, reading text and screenshots.
pub struct WebDriverClient {
    http: reqwest::Client,
    base_url: String,
    session_id: String,
    wait_timeout: Duration,
    poll_interval: Duration,
}

impl WebDriverClient {
    /// Start a new browser session.
    ///
    /// # Errors
    ///
    /// Any failure here is [`AutomationError::SessionUnavailable`]: without a
    /// session there is nothing to retry against.
    pub async fn start(config: &WebDriverConfig, headless: bool) -> Result<Self, AutomationError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AutomationError::SessionUnavailable(e.to_string()))?;
        let base_url = config.url.trim_end_matches('/').to_string();

        let value = async {
            let resp = http
                .post(format!("{base_url}/session"))
                .json(&capabilities(config, headless))
                .send()
                .await
                .map_err(map_reqwest_err)?;
            read_value(resp).await
        }
        .await
        .map_err(|e| AutomationError::SessionUnavailable(format!("webdriver at {base_url}: {e}")))?;

        let session_id = session_id(&value)?;
        debug!(session = %session_id, headless, "webdriver session created");
        Ok(Self {
            http,
            base_url,
            session_id,
            wait_timeout: config.timeout,
            poll_interval: config.poll_interval,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, AutomationError> {
        let url = format!("{}/session/{}{path}", self.base_url, self.session_id);
        debug!(%method, path, "webdriver command");
        let mut req = self.http.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.map_err(map_reqwest_err)?;
        read_value(resp).await
    }

    pub async fn navigate(&self, url: &str) -> Result<(), AutomationError> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(drop)
    }

    pub async fn find(&self, xpath: &str) -> Result<ElementId, AutomationError> {
        let value = self
            .command(Method::POST, "/element", Some(xpath_locator(xpath)))
            .await?;
        element_id(&value)
    }

    pub async fn find_all(&self, xpath: &str) -> Result<Vec<ElementId>, AutomationError> {
        let value = self
            .command(Method::POST, "/elements", Some(xpath_locator(xpath)))
            .await?;
        match value {
            Value::Array(items) => items.iter().map(element_id).collect(),
            other => Err(AutomationError::Other(format!(
                "expected element list, got {other}"
            ))),
        }
    }

    pub async fn is_present(&self, xpath: &str) -> Result<bool, AutomationError> {
        Ok(!self.find_all(xpath).await?.is_empty())
    }

    /// Poll for `xpath` until it appears or the wait budget runs out.
    pub async fn wait_for(&self, xpath: &str) -> Result<ElementId, AutomationError> {
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            match self.find(xpath).await {
                Ok(element) => return Ok(element),
                Err(AutomationError::ElementMissing(_)) if Instant::now() < deadline => {
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(AutomationError::ElementMissing(_)) => {
                    return Err(AutomationError::Timeout(format!("waiting for {xpath}")));
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn clear(&self, element: &ElementId) -> Result<(), AutomationError> {
        let path = format!("/element/{}/clear", element.as_str());
        self.command(Method::POST, &path, Some(json!({})))
            .await
            .map(drop)
    }

    pub async fn send_keys(&self, element: &ElementId, text: &str) -> Result<(), AutomationError> {
        let path = format!("/element/{}/value", element.as_str());
        self.command(Method::POST, &path, Some(json!({ "text": text })))
            .await
            .map(drop)
    }

    pub async fn click(&self, element: &ElementId) -> Result<(), AutomationError> {
        let path = format!("/element/{}/click", element.as_str());
        self.command(Method::POST, &path, Some(json!({})))
            .await
            .map(drop)
    }

    pub async fn text(&self, element: &ElementId) -> Result<String, AutomationError> {
        let path = format!("/element/{}/text", element.as_str());
        let value = self.command(Method::GET, &path, None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Wait for the field, replace its content with `text`.
    pub async fn fill(&self, xpath: &str, text: &str) -> Result<(), AutomationError> {
        let element = self.wait_for(xpath).await?;
        self.clear(&element).await?;
        self.send_keys(&element, text).await
    }

    pub async fn click_at(&self, xpath: &str) -> Result<(), AutomationError> {
        let element = self.wait_for(xpath).await?;
        self.click(&element).await
    }

    pub async fn text_at(&self, xpath: &str) -> Result<String, AutomationError> {
        let element = self.wait_for(xpath).await?;
        self.text(&element).await
    }

    /// PNG of the current viewport.
    pub async fn screenshot(&self) -> Result<Bytes, AutomationError> {
        let value = self.command(Method::GET, "/screenshot", None).await?;
        decode_screenshot(&value)
    }

    /// End the browser session.
    pub async fn quit(&self) -> Result<(), AutomationError> {
        self.command(Method::DELETE, "", None).await?;
        debug!(session = %self.session_id, "webdriver session deleted");
        Ok(())
    }
}

/// New-session payload for Chrome.
pub(crate) fn capabilities(config: &WebDriverConfig, headless: bool) -> Value {
    let mut args = vec![
        format!(
            "--window-size={},{}",
            config.window_width, config.window_height
        ),
        "--disable-gpu".to_string(),
        "--no-sandbox".to_string(),
    ];
    if headless {
        args.push("--headless=new".to_string());
    }
    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "goog:chromeOptions": { "args": args }
            }
        }
    })
}

fn xpath_locator(xpath: &str) -> Value {
    json!({ "using": "xpath", "value": xpath })
}

async fn read_value(resp: reqwest::Response) -> Result<Value, AutomationError> {
    let ok = resp.status().is_success();
    let body: Value = resp.json().await.map_err(map_reqwest_err)?;
    unwrap_value(ok, body)
}

/// Split a driver response into its `value` or a mapped protocol error.
pub(crate) fn unwrap_value(ok: bool, mut body: Value) -> Result<Value, AutomationError> {
    let value = body.get_mut("value").map(Value::take).unwrap_or_default();
    if ok {
        return Ok(value);
    }
    let code = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Err(map_protocol_err(code, message))
}

pub(crate) fn session_id(value: &Value) -> Result<String, AutomationError> {
    value
        .get("sessionId")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AutomationError::SessionUnavailable("driver returned no sessionId".into()))
}

pub(crate) fn element_id(value: &Value) -> Result<ElementId, AutomationError> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementId(id.to_string()))
        .ok_or_else(|| AutomationError::Other(format!("not an element reference: {value}")))
}

pub(crate) fn decode_screenshot(value: &Value) -> Result<Bytes, AutomationError> {
    let encoded = value
        .as_str()
        .ok_or_else(|| AutomationError::Other("screenshot is not a string".into()))?;
    STANDARD
        .decode(encoded)
        .map(Bytes::from)
        .map_err(|e| AutomationError::Other(format!("screenshot is not base64: {e}")))
}
