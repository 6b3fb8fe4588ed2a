//! Provider flow registry: which automation flow validates which provider code.

use std::collections::HashMap;

use crate::error::DomainError;
use crate::name::{Comparator, Normalizer};
use crate::response::{RawProviderResult, ResponsePatterns};

/// Provider family. Each family has its own portal, login and browser session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFamily {
    /// Bank account inquiry through the transfer-validation form.
    Bank,
    /// E-wallet top-up virtual account inquiry.
    Ewallet,
}

impl ProviderFamily {
    pub const ALL: [Self; 2] = [Self::Bank, Self::Ewallet];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::Ewallet => "ewallet",
        }
    }
}

impl std::fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider code as typed in the sheet's type column, canonicalized:
/// trimmed, lowercased, inner whitespace collapsed. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProviderCode(String);

impl ProviderCode {
    pub fn new(raw: &str) -> Result<Self, DomainError> {
        let code = canonical_code(raw);
        if code.is_empty() {
            return Err(DomainError::InvalidProviderCode(raw.to_string()));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn canonical_code(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

impl TryFrom<String> for ProviderCode {
    type Error = DomainError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<ProviderCode> for String {
    fn from(code: ProviderCode) -> String {
        code.0
    }
}

impl std::fmt::Display for ProviderCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProviderCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How one provider is inquired and how its answer is read.
///
/// Adding a provider means adding a registry entry; adding a portal means
/// adding a variant here and a matching flow in the automation backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderFlow {
    /// `bank_name` is the value picked in the destination-bank selector.
    BankInquiry {
        bank_name: String,
        patterns: ResponsePatterns,
    },
    /// Premium wallets show masked names ("DNID marxxx"); basic wallets
    /// show the phone number instead of a name.
    EwalletInquiry {
        wallet_name: String,
        patterns: ResponsePatterns,
    },
}

impl ProviderFlow {
    pub fn bank(bank_name: impl Into<String>) -> Self {
        Self::BankInquiry {
            bank_name: bank_name.into(),
            patterns: ResponsePatterns::bank_inquiry(),
        }
    }

    pub fn ewallet(wallet_name: impl Into<String>) -> Self {
        Self::EwalletInquiry {
            wallet_name: wallet_name.into(),
            patterns: ResponsePatterns::ewallet_inquiry(),
        }
    }

    pub fn family(&self) -> ProviderFamily {
        match self {
            Self::BankInquiry { .. } => ProviderFamily::Bank,
            Self::EwalletInquiry { .. } => ProviderFamily::Ewallet,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::BankInquiry { bank_name, .. } => bank_name,
            Self::EwalletInquiry { wallet_name, .. } => wallet_name,
        }
    }

    pub fn patterns(&self) -> &ResponsePatterns {
        match self {
            Self::BankInquiry { patterns, .. } | Self::EwalletInquiry { patterns, .. } => patterns,
        }
    }

    pub fn masked_names(&self) -> bool {
        matches!(self, Self::EwalletInquiry { .. })
    }

    /// Read the provider's raw result text for `account_number`.
    pub fn interpret(&self, raw: &str, account_number: &str) -> RawProviderResult {
        self.patterns().interpret(raw, account_number)
    }

    /// Comparator configured for this flow's name presentation.
    pub fn comparator(&self, normalizer: Normalizer) -> Comparator {
        Comparator::new(normalizer).masked(self.masked_names())
    }
}

/// Serializable registry definition (YAML or JSON).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RegistryDefinition {
    /// Schema version for the definition format itself.
    pub v: u32,
    pub providers: Vec<ProviderEntry>,
}

/// One provider with every code the sheet may use for it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProviderEntry {
    /// Display name; for banks this is what the bank selector is filled with.
    pub name: String,
    pub family: ProviderFamily,
    pub codes: Vec<ProviderCode>,
    /// Overrides the family's default pattern table.
    #[serde(default)]
    pub patterns: Option<ResponsePatterns>,
}

const INDONESIA: &[(&str, ProviderFamily, &[&str])] = &[
    ("Bank Central Asia", ProviderFamily::Bank, &["bca", "bank centra", "central asia"]),
    ("Bank Rakyat Indonesia", ProviderFamily::Bank, &["bri", "bank rakyat"]),
    ("Bank Mandiri", ProviderFamily::Bank, &["mandiri", "bank mandiri"]),
    ("Bank Jago", ProviderFamily::Bank, &["jago", "bank jago"]),
    ("Bank Danamon", ProviderFamily::Bank, &["danamon", "bank danamon"]),
    ("Bank Negara Indonesia", ProviderFamily::Bank, &["bni", "bank negara"]),
    ("Bank BTPN", ProviderFamily::Bank, &["btpn"]),
    ("Bank Permata", ProviderFamily::Bank, &["permata", "bank permata"]),
    ("Bank CIMB Niaga", ProviderFamily::Bank, &["cimb", "cimb niaga", "niaga"]),
    ("Bank OCBC NISP", ProviderFamily::Bank, &["ocbc", "ocbc nisp", "nisp"]),
    ("GoPay", ProviderFamily::Ewallet, &["gopay"]),
    ("OVO", ProviderFamily::Ewallet, &["ovo"]),
    ("DANA", ProviderFamily::Ewallet, &["dana"]),
    ("LinkAja", ProviderFamily::Ewallet, &["linkaja"]),
    ("ShopeePay", ProviderFamily::Ewallet, &["shopeepay"]),
];

/// Maps provider codes to flows. Built once per run, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    flows: HashMap<ProviderCode, ProviderFlow>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indonesian banks (bank inquiry) and e-wallets (VA inquiry).
    #[must_use]
    pub fn indonesia() -> Self {
        let flows = INDONESIA
            .iter()
            .flat_map(|(name, family, codes)| {
                codes.iter().map(move |code| {
                    let flow = match family {
                        ProviderFamily::Bank => ProviderFlow::bank(*name),
                        ProviderFamily::Ewallet => ProviderFlow::ewallet(*name),
                    };
                    (ProviderCode(canonical_code(code)), flow)
                })
            })
            .collect();
        Self { flows }
    }

    /// Build from a definition: every entry needs a name and at least one
    /// code, and no code may appear twice.
    pub fn from_definition(def: &RegistryDefinition) -> Result<Self, DomainError> {
        if def.providers.is_empty() {
            return Err(DomainError::ValidationFailed(
                "registry must define at least one provider".to_string(),
            ));
        }

        let mut registry = Self::new();
        for entry in &def.providers {
            if entry.name.trim().is_empty() {
                return Err(DomainError::ValidationFailed(
                    "provider name must not be empty".to_string(),
                ));
            }
            if entry.codes.is_empty() {
                return Err(DomainError::ValidationFailed(format!(
                    "provider '{}' has no codes",
                    entry.name
                )));
            }
            let patterns = entry.patterns.clone().unwrap_or_else(|| match entry.family {
                ProviderFamily::Bank => ResponsePatterns::bank_inquiry(),
                ProviderFamily::Ewallet => ResponsePatterns::ewallet_inquiry(),
            });
            let flow = match entry.family {
                ProviderFamily::Bank => ProviderFlow::BankInquiry {
                    bank_name: entry.name.clone(),
                    patterns,
                },
                ProviderFamily::Ewallet => ProviderFlow::EwalletInquiry {
                    wallet_name: entry.name.clone(),
                    patterns,
                },
            };
            for code in &entry.codes {
                registry.register(code.clone(), flow.clone())?;
            }
        }
        Ok(registry)
    }

    pub fn register(&mut self, code: ProviderCode, flow: ProviderFlow) -> Result<(), DomainError> {
        if self.flows.contains_key(&code) {
            return Err(DomainError::DuplicateProvider(code.0));
        }
        self.flows.insert(code, flow);
        Ok(())
    }

    /// Resolve a raw sheet value. Unknown codes are a row-level error.
    pub fn resolve(&self, raw_code: &str) -> Result<&ProviderFlow, DomainError> {
        let code = ProviderCode::new(raw_code)?;
        self.flows
            .get(&code)
            .ok_or(DomainError::UnsupportedProvider(code.0))
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Registered codes, sorted.
    pub fn codes(&self) -> Vec<&ProviderCode> {
        let mut codes: Vec<_> = self.flows.keys().collect();
        codes.sort();
        codes
    }
}
