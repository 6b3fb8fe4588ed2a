//! Integration tests for the WebDriver backend.
//!
//! Requires a running WebDriver server (chromedriver or selenium). Set
//! AUTOID_WEBDRIVER_URL to enable these tests.
//!
//! Run with: AUTOID_WEBDRIVER_URL=http://localhost:4444 cargo test --package autoid-webdriver

use std::time::Duration;

use autoid_core::{Automation, AutomationError};
use autoid_domain::ProviderFamily;
use autoid_webdriver::{WebDriverAutomation, WebDriverClient, WebDriverConfig};

fn webdriver_url() -> Option<String> {
    std::env::var("AUTOID_WEBDRIVER_URL").ok()
}

fn config() -> WebDriverConfig {
    WebDriverConfig {
        url: webdriver_url().expect("AUTOID_WEBDRIVER_URL must be set for integration tests"),
        headless: true,
        timeout: Duration::from_secs(5),
        settle_delay: Duration::from_millis(100),
        ..Default::default()
    }
}

const PAGE: &str = "data:text/html,<form><input id='va' value='old'/><span id='out'>Nama: MARWAN</span></form>";

// --- Client ---

#[tokio::test]
async fn test_session_lifecycle() {
    if webdriver_url().is_none() {
        return;
    }
    let client = WebDriverClient::start(&config(), true).await.unwrap();
    assert!(!client.session_id().is_empty());
    client.navigate(PAGE).await.unwrap();

    let png = client.screenshot().await.unwrap();
    assert!(png.starts_with(b"\x89PNG"));

    client.quit().await.unwrap();
}

#[tokio::test]
async fn test_fill_and_read() {
    if webdriver_url().is_none() {
        return;
    }
    let client = WebDriverClient::start(&config(), true).await.unwrap();
    client.navigate(PAGE).await.unwrap();

    client.fill("//input[@id='va']", "25449874").await.unwrap();
    assert_eq!(client.text_at("//span[@id='out']").await.unwrap(), "Nama: MARWAN");
    assert!(client.is_present("//input[@id='va']").await.unwrap());
    assert!(!client.is_present("//input[@id='missing']").await.unwrap());

    client.quit().await.unwrap();
}

#[tokio::test]
async fn test_missing_element_times_out() {
    if webdriver_url().is_none() {
        return;
    }
    let client = WebDriverClient::start(
        &WebDriverConfig {
            timeout: Duration::from_secs(1),
            ..config()
        },
        true,
    )
    .await
    .unwrap();
    client.navigate(PAGE).await.unwrap();

    let err = client.wait_for("//button[@id='nope']").await.unwrap_err();
    assert!(matches!(err, AutomationError::Timeout(_)));

    client.quit().await.unwrap();
}

// --- Automation ---

#[tokio::test]
async fn test_open_without_credentials_is_an_outage() {
    if webdriver_url().is_none() {
        return;
    }
    let automation = WebDriverAutomation::new(config());
    let err = automation
        .open(ProviderFamily::Bank, true)
        .await
        .err()
        .unwrap();
    assert!(err.is_outage());
}

#[tokio::test]
async fn test_unreachable_driver_is_unavailable() {
    let automation = WebDriverAutomation::new(WebDriverConfig {
        url: "http://127.0.0.1:9".to_string(),
        timeout: Duration::from_secs(2),
        ..Default::default()
    });
    let err = automation
        .open(ProviderFamily::Ewallet, true)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, AutomationError::SessionUnavailable(_)));
}
