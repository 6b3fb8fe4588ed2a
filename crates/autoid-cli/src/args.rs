use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

use autoid_core::{OrchestratorConfig, RunOptions};
use autoid_domain::{ProviderRegistry, RegistryDefinition};
use autoid_sheets::SheetsConfig;
use autoid_telegram::TelegramConfig;
use autoid_webdriver::{PortalCredentials, WebDriverConfig};

/// Command-line arguments for autoid
#[derive(Parser, Debug)]
#[command(name = "autoid")]
#[command(about = "Validate account ownership rows in a spreadsheet against provider portals")]
#[command(version)]
pub struct Args {
    /// Synthesize successful inquiries instead of driving a browser
    #[arg(long)]
    pub demo: bool,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// Maximum rows to validate this run (0 = no cap)
    #[arg(long, default_value_t = 0)]
    pub max_rows: usize,

    /// Pause between rows, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub row_delay_ms: u64,

    /// Google spreadsheet id
    #[arg(long, env = "AUTOID_SHEET_ID")]
    pub sheet_id: Option<String>,

    /// OAuth2 access token for the Sheets API
    #[arg(long, env = "AUTOID_SHEETS_TOKEN", hide_env_values = true)]
    pub sheets_token: Option<String>,

    /// Tab holding the validation table
    #[arg(long, default_value = "Sheet1")]
    pub sheet_name: String,

    /// First data row of the table
    #[arg(long, default_value_t = 9)]
    pub first_row: u32,

    #[arg(long, env = "AUTOID_TELEGRAM_TOKEN", hide_env_values = true)]
    pub telegram_token: Option<String>,

    #[arg(long, env = "AUTOID_TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,

    #[arg(long, env = "AUTOID_CIMB_USERNAME", default_value = "")]
    pub cimb_username: String,

    #[arg(long, env = "AUTOID_CIMB_PASSWORD", default_value = "", hide_env_values = true)]
    pub cimb_password: String,

    #[arg(long, env = "AUTOID_BCA_USERNAME", default_value = "")]
    pub bca_username: String,

    #[arg(long, env = "AUTOID_BCA_PASSWORD", default_value = "", hide_env_values = true)]
    pub bca_password: String,

    /// WebDriver server (chromedriver, selenium)
    #[arg(long, env = "AUTOID_WEBDRIVER_URL", default_value = "http://localhost:4444")]
    pub webdriver_url: String,

    /// Directory for evidence screenshots
    #[arg(long, default_value = "screenshots")]
    pub evidence_dir: PathBuf,

    /// Provider registry definition (YAML or JSON) replacing the built-in one
    #[arg(long)]
    pub providers: Option<PathBuf>,

    /// Write the run report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl Args {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            max_rows: (self.max_rows > 0).then_some(self.max_rows),
            demo_mode: self.demo,
            headless: self.headless,
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            row_delay: Duration::from_millis(self.row_delay_ms),
            ..Default::default()
        }
    }

    pub fn webdriver_config(&self) -> WebDriverConfig {
        WebDriverConfig {
            url: self.webdriver_url.clone(),
            headless: self.headless,
            cimb: PortalCredentials::new(&self.cimb_username, &self.cimb_password),
            klikbca: PortalCredentials::new(&self.bca_username, &self.bca_password),
            ..Default::default()
        }
    }

    /// `None` when no spreadsheet is configured; that is only allowed in
    /// demo mode.
    pub fn sheets_config(&self) -> Result<Option<SheetsConfig>> {
        match (&self.sheet_id, &self.sheets_token) {
            (Some(id), Some(token)) => Ok(Some(SheetsConfig {
                spreadsheet_id: id.clone(),
                access_token: token.clone(),
                sheet_name: self.sheet_name.clone(),
                first_row: self.first_row,
                ..Default::default()
            })),
            (Some(_), None) => bail!("--sheet-id needs --sheets-token (AUTOID_SHEETS_TOKEN)"),
            (None, _) if self.demo => Ok(None),
            (None, _) => bail!("--sheet-id (AUTOID_SHEET_ID) is required outside demo mode"),
        }
    }

    /// `None` leaves notifications off.
    pub fn telegram_config(&self) -> Option<TelegramConfig> {
        match (&self.telegram_token, &self.telegram_chat_id) {
            (Some(token), Some(chat)) if !token.is_empty() && !chat.is_empty() => {
                Some(TelegramConfig {
                    bot_token: token.clone(),
                    chat_id: chat.clone(),
                    ..Default::default()
                })
            }
            _ => None,
        }
    }

    pub fn registry(&self) -> Result<ProviderRegistry> {
        match &self.providers {
            Some(path) => load_registry(path),
            None => Ok(ProviderRegistry::indonesia()),
        }
    }
}

pub fn load_registry(path: &Path) -> Result<ProviderRegistry> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading provider definition {}", path.display()))?;
    let json = path.extension().is_some_and(|ext| ext == "json");
    parse_registry(&text, json).with_context(|| format!("loading {}", path.display()))
}

fn parse_registry(text: &str, json: bool) -> Result<ProviderRegistry> {
    let def: RegistryDefinition = if json {
        serde_json::from_str(text)?
    } else {
        serde_yaml::from_str(text)?
    };
    Ok(ProviderRegistry::from_definition(&def)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["autoid"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn zero_max_rows_means_no_cap() {
        assert_eq!(parse(&["--demo"]).run_options().max_rows, None);
        let args = parse(&["--demo", "--headless", "--max-rows", "5"]);
        assert_eq!(
            args.run_options(),
            RunOptions {
                max_rows: Some(5),
                demo_mode: true,
                headless: true,
            }
        );
    }

    #[test]
    fn demo_runs_without_a_sheet() {
        let args = parse(&["--demo"]);
        if args.sheet_id.is_none() {
            assert!(args.sheets_config().unwrap().is_none());
        }
    }

    #[test]
    fn sheet_settings_flow_into_config() {
        let args = parse(&[
            "--sheet-id",
            "abc",
            "--sheets-token",
            "tok",
            "--sheet-name",
            "Data Rek",
            "--first-row",
            "3",
        ]);
        let cfg = args.sheets_config().unwrap().unwrap();
        assert_eq!(cfg.spreadsheet_id, "abc");
        assert_eq!(cfg.sheet_name, "Data Rek");
        assert_eq!(cfg.first_row, 3);
    }

    #[test]
    fn sheet_without_token_is_an_error() {
        let args = parse(&["--sheet-id", "abc"]);
        if args.sheets_token.is_none() {
            assert!(args.sheets_config().is_err());
        }
    }

    #[test]
    fn telegram_needs_token_and_chat() {
        let args = parse(&["--telegram-token", "1:a"]);
        if args.telegram_chat_id.is_none() {
            assert!(args.telegram_config().is_none());
        }
        let args = parse(&["--telegram-token", "1:a", "--telegram-chat-id", "42"]);
        assert_eq!(args.telegram_config().unwrap().chat_id, "42");
    }

    #[test]
    fn credentials_reach_webdriver_config() {
        let args = parse(&[
            "--cimb-username",
            "octo",
            "--cimb-password",
            "pw",
            "--webdriver-url",
            "http://grid:4444",
        ]);
        let cfg = args.webdriver_config();
        assert_eq!(cfg.url, "http://grid:4444");
        assert!(cfg.cimb.is_set());
        assert_eq!(cfg.cimb.username, "octo");
    }

    #[test]
    fn row_delay_is_configurable() {
        let args = parse(&["--row-delay-ms", "0"]);
        assert_eq!(args.orchestrator_config().row_delay, Duration::ZERO);
        assert_eq!(args.orchestrator_config().provider_retry, 1);
    }

    #[test]
    fn registry_defaults_to_indonesia() {
        let registry = parse(&[]).registry().unwrap();
        assert!(registry.resolve("bca").is_ok());
        assert!(registry.resolve("dana").is_ok());
    }

    #[test]
    fn registry_file_replaces_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "v: 1\nproviders:\n  - name: Bank Syariah Indonesia\n    family: bank\n    codes: [bsi]"
        )
        .unwrap();
        let registry = load_registry(file.path()).unwrap();
        assert!(registry.resolve("BSI").is_ok());
        assert!(registry.resolve("bca").is_err());
    }

    #[test]
    fn json_registry_is_accepted() {
        let text = r#"{"v":1,"providers":[{"name":"OVO","family":"ewallet","codes":["ovo"]}]}"#;
        let registry = parse_registry(text, true).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_codes_are_rejected() {
        let text = "v: 1\nproviders:\n  - {name: A, family: bank, codes: [x]}\n  - {name: B, family: bank, codes: [x]}\n";
        assert!(parse_registry(text, false).is_err());
    }
}
