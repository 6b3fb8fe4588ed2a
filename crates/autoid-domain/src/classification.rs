use crate::error::DomainError;
use crate::name::MatchVerdict;
use crate::response::RawProviderResult;

/// Final, user-facing outcome of validating one row.
///
/// Labels are written verbatim into the sheet's status column, so they are
/// part of the spreadsheet contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Classification {
    Valid,
    RekTidakValid,
    RekBelumPremium,
    RekBedaNama,
    RekNamaTidakLengkap,
}

impl Classification {
    pub const ALL: [Self; 5] = [
        Self::Valid,
        Self::RekTidakValid,
        Self::RekBelumPremium,
        Self::RekBedaNama,
        Self::RekNamaTidakLengkap,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::RekTidakValid => "REK TIDAK VALID",
            Self::RekBelumPremium => "REK BELUM PREMIUM",
            Self::RekBedaNama => "REK BEDA NAMA",
            Self::RekNamaTidakLengkap => "REK NAMA TIDAK LENGKAP",
        }
    }

    /// Parse a status cell. Accepts the sheet labels and their
    /// underscore-joined identifiers (`REK_BEDA_NAMA`), case-insensitively.
    pub fn from_label(raw: &str) -> Result<Self, DomainError> {
        let wanted = raw.trim().replace('_', " ");
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| DomainError::UnknownLabel(raw.to_string()))
    }

    /// Decision table. First matching row wins:
    ///
    /// | provider result          | verdict                 | classification          |
    /// |--------------------------|-------------------------|-------------------------|
    /// | `NotFound`               | any                     | REK TIDAK VALID         |
    /// | `ProviderError`          | any                     | REK TIDAK VALID         |
    /// | `NotPremium`             | any                     | REK BELUM PREMIUM       |
    /// | `Success` (empty name)   | any                     | REK TIDAK VALID         |
    /// | `Success`                | `ExpectedEmpty`/`Exact` | VALID                   |
    /// | `Success`                | `Truncated`             | REK NAMA TIDAK LENGKAP  |
    /// | `Success`                | `Different`             | REK BEDA NAMA           |
    /// | `Success`                | none                    | REK TIDAK VALID         |
    pub fn derive(raw: &RawProviderResult, verdict: Option<MatchVerdict>) -> Self {
        match raw {
            RawProviderResult::NotFound { .. } | RawProviderResult::ProviderError { .. } => {
                Self::RekTidakValid
            }
            RawProviderResult::NotPremium { .. } => Self::RekBelumPremium,
            RawProviderResult::Success { actual_name } if actual_name.trim().is_empty() => {
                Self::RekTidakValid
            }
            RawProviderResult::Success { .. } => match verdict {
                Some(MatchVerdict::ExpectedEmpty | MatchVerdict::Exact) => Self::Valid,
                Some(MatchVerdict::Truncated) => Self::RekNamaTidakLengkap,
                Some(MatchVerdict::Different) => Self::RekBedaNama,
                None => Self::RekTidakValid,
            },
        }
    }

    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }

    /// Marker shown next to the label in notifications.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Valid => "✅",
            Self::RekTidakValid => "❌",
            Self::RekBelumPremium => "⚠️",
            Self::RekBedaNama => "🔄",
            Self::RekNamaTidakLengkap => "📝",
        }
    }
}

impl TryFrom<String> for Classification {
    type Error = DomainError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_label(&s)
    }
}

impl From<Classification> for String {
    fn from(c: Classification) -> String {
        c.label().to_string()
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
