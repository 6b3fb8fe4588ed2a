//! Provider responses and the pattern tables that interpret them.

/// What a provider flow observed for one account inquiry.
/// Exactly one variant per invocation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawProviderResult {
    Success {
        actual_name: String,
    },
    /// Account or virtual account does not exist. `message` is the
    /// provider's text, recorded as the observed name.
    NotFound {
        message: String,
    },
    /// E-wallet account exists but is not name-resolvable. `raw_label` is
    /// the provider's label verbatim and is never compared as a name.
    NotPremium {
        raw_label: String,
    },
    /// Transient automation failure or unexpected page state.
    ProviderError {
        message: String,
    },
}

impl RawProviderResult {
    pub fn provider_error(message: impl Into<String>) -> Self {
        Self::ProviderError {
            message: message.into(),
        }
    }

    /// A success envelope without a usable name is a provider error.
    #[must_use]
    pub fn sanitize(self) -> Self {
        match self {
            Self::Success { actual_name } if actual_name.trim().is_empty() => {
                Self::provider_error("success response carried no account name")
            }
            other => other,
        }
    }

    /// Text written to the sheet's actual-name column.
    pub fn observed_text(&self) -> &str {
        match self {
            Self::Success { actual_name } => actual_name,
            Self::NotFound { message } => message,
            Self::NotPremium { raw_label } => raw_label,
            Self::ProviderError { .. } => "",
        }
    }

    pub fn is_provider_error(&self) -> bool {
        matches!(self, Self::ProviderError { .. })
    }

    /// The portal logged us out; only a fresh login gets past this page.
    pub fn is_session_expired(&self) -> bool {
        let Self::ProviderError { message } = self else {
            return false;
        };
        let lower = message.to_lowercase();
        SESSION_EXPIRED.iter().any(|i| lower.contains(i))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::NotFound { .. } => "not_found",
            Self::NotPremium { .. } => "not_premium",
            Self::ProviderError { .. } => "provider_error",
        }
    }
}

const NOT_FOUND: &[&str] = &[
    "virtual account tidak ditemukan",
    "rekening tidak ditemukan",
    "tidak ditemukan",
    "nomor tidak valid",
    "account not found",
    "not found",
    "invalid account",
];

const PROVIDER_ERROR: &[&str] = &[
    "sesi anda telah berakhir",
    "session expired",
    "terjadi kesalahan",
    "system error",
    "service unavailable",
    "silakan login",
];

const SESSION_EXPIRED: &[&str] = &["sesi anda telah berakhir", "session expired", "silakan login"];

const BANK_LABEL_PREFIXES: &[&str] = &["ACCOUNT HOLDER:", "Nama:", "Name:"];
const EWALLET_LABEL_PREFIXES: &[&str] = &["DNID", "VA", "Nama:", "Name:"];

/// A label made only of digits this long is a phone or VA number, not a name.
const MIN_NUMBER_LABEL_DIGITS: usize = 8;

/// Per-flow table of raw-response patterns.
///
/// Matching is case-insensitive on whitespace-collapsed text, so the table
/// can be exercised with recorded page text and no browser.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResponsePatterns {
    #[serde(default)]
    pub not_found: Vec<String>,
    #[serde(default)]
    pub provider_error: Vec<String>,
    /// Stripped from the front of the label before it is read as a name.
    #[serde(default)]
    pub label_prefixes: Vec<String>,
    /// Treat number-only labels as `NotPremium`.
    #[serde(default)]
    pub detect_non_premium: bool,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

impl ResponsePatterns {
    #[must_use]
    pub fn bank_inquiry() -> Self {
        Self {
            not_found: owned(NOT_FOUND),
            provider_error: owned(PROVIDER_ERROR),
            label_prefixes: owned(BANK_LABEL_PREFIXES),
            detect_non_premium: false,
        }
    }

    #[must_use]
    pub fn ewallet_inquiry() -> Self {
        Self {
            not_found: owned(NOT_FOUND),
            provider_error: owned(PROVIDER_ERROR),
            label_prefixes: owned(EWALLET_LABEL_PREFIXES),
            detect_non_premium: true,
        }
    }

    pub fn interpret(&self, raw: &str, account_number: &str) -> RawProviderResult {
        let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            return RawProviderResult::provider_error("provider returned an empty response");
        }

        let lower = text.to_lowercase();
        if let Some(hit) = find_indicator(&self.provider_error, &lower) {
            return RawProviderResult::provider_error(format!("provider reported \"{hit}\": {text}"));
        }
        if find_indicator(&self.not_found, &lower).is_some() {
            return RawProviderResult::NotFound { message: text };
        }

        let label = self.strip_label_prefixes(&text);
        if self.detect_non_premium && is_number_label(label, account_number) {
            return RawProviderResult::NotPremium { raw_label: text };
        }

        RawProviderResult::Success {
            actual_name: label.to_string(),
        }
        .sanitize()
    }

    fn strip_label_prefixes<'a>(&self, text: &'a str) -> &'a str {
        let mut rest = text;
        while let Some(stripped) = self
            .label_prefixes
            .iter()
            .find_map(move |p| strip_prefix_word(rest, p))
        {
            rest = stripped;
        }
        rest
    }
}

fn find_indicator<'a>(indicators: &'a [String], lower: &str) -> Option<&'a str> {
    indicators
        .iter()
        .map(String::as_str)
        .find(|i| !i.is_empty() && lower.contains(&i.to_lowercase()))
}

/// Case-insensitive prefix strip that refuses to cut a word in half
/// ("VA" must not eat the front of "Valentino").
fn strip_prefix_word<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return None;
    }
    let head = text.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let rest = &text[prefix.len()..];
    let boundary = prefix.ends_with(|c: char| !c.is_alphanumeric())
        || rest.chars().next().is_none_or(|c| !c.is_alphanumeric());
    boundary.then(|| rest.trim_start())
}

fn is_number_label(label: &str, account_number: &str) -> bool {
    let digits: String = label.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    digits.len() >= MIN_NUMBER_LABEL_DIGITS || account_number.trim().ends_with(&digits)
}
