use crate::classification::Classification;
use crate::name::MatchVerdict;
use crate::response::RawProviderResult;
use crate::row::RowIndex;

/// Location of captured evidence (a screenshot path or URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct EvidenceRef(String);

impl EvidenceRef {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EvidenceRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EvidenceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a row got its classification.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    Compared { verdict: MatchVerdict },
    NotFound,
    NotPremium,
    ProviderError { message: String },
    UnsupportedProvider { code: String },
    MalformedRow { reason: String },
    /// Synthetic result; no provider was contacted.
    Demo,
}

impl Finding {
    /// Finding for a provider result that was (or was not) name-compared.
    pub fn from_result(raw: &RawProviderResult, verdict: Option<MatchVerdict>) -> Self {
        match (raw, verdict) {
            (RawProviderResult::NotFound { .. }, _) => Self::NotFound,
            (RawProviderResult::NotPremium { .. }, _) => Self::NotPremium,
            (RawProviderResult::ProviderError { message }, _) => Self::ProviderError {
                message: message.clone(),
            },
            (RawProviderResult::Success { .. }, Some(verdict)) => Self::Compared { verdict },
            (RawProviderResult::Success { .. }, None) => Self::ProviderError {
                message: "success result was not compared".into(),
            },
        }
    }

    /// Short human-readable note, in the operators' language.
    pub fn detail(&self) -> String {
        match self {
            Self::Compared { verdict } => match verdict {
                MatchVerdict::Exact => "Nama cocok sempurna".into(),
                MatchVerdict::ExpectedEmpty => "Nama pembanding kosong".into(),
                MatchVerdict::Truncated => "Nama tidak lengkap".into(),
                MatchVerdict::Different => "Nama berbeda".into(),
            },
            Self::NotFound => "Virtual Account tidak ditemukan".into(),
            Self::NotPremium => "Account tidak premium (menampilkan nomor)".into(),
            Self::ProviderError { message } => format!("Gagal cek rekening: {message}"),
            Self::UnsupportedProvider { code } => format!("Provider tidak didukung: {code}"),
            Self::MalformedRow { reason } => format!("Data baris tidak valid: {reason}"),
            Self::Demo => "Mode demo".into(),
        }
    }

    pub fn is_provider_error(&self) -> bool {
        matches!(self, Self::ProviderError { .. })
    }
}

/// Result of validating one row. Built once by the validator and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidationOutcome {
    pub row: RowIndex,
    pub classification: Classification,
    pub finding: Finding,
    /// Name or message the provider showed; empty when nothing usable came back.
    pub actual_name: String,
    pub evidence: Option<EvidenceRef>,
    /// Unix millis.
    pub timestamp: u64,
    /// Provider invocations spent on this row.
    pub attempts: u32,
}

impl ValidationOutcome {
    pub fn new(
        row: RowIndex,
        classification: Classification,
        finding: Finding,
        actual_name: impl Into<String>,
    ) -> Self {
        Self {
            row,
            classification,
            finding,
            actual_name: actual_name.into(),
            evidence: None,
            timestamp: now_millis(),
            attempts: 0,
        }
    }

    #[must_use]
    pub fn with_evidence(mut self, evidence: Option<EvidenceRef>) -> Self {
        self.evidence = evidence;
        self
    }

    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Value for the sheet's evidence column.
    pub fn evidence_link(&self) -> &str {
        self.evidence.as_ref().map_or("", EvidenceRef::as_str)
    }
}

#[allow(clippy::cast_possible_truncation)]
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}
