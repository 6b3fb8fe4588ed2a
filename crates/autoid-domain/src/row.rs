use crate::error::DomainError;

/// 1-based spreadsheet row number. Only the orchestrator uses it to address
/// the sheet; validators treat it as an opaque handle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub struct RowIndex(u32);

impl RowIndex {
    pub fn new(raw: u32) -> Result<Self, DomainError> {
        if raw == 0 {
            return Err(DomainError::InvalidRowIndex(raw));
        }
        Ok(Self(raw))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Row `offset` places below `self`.
    #[must_use]
    pub fn offset(self, offset: u32) -> Self {
        Self(self.0.saturating_add(offset))
    }
}

impl TryFrom<u32> for RowIndex {
    type Error = DomainError;
    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<RowIndex> for u32 {
    fn from(index: RowIndex) -> u32 {
        index.0
    }
}

impl std::fmt::Display for RowIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A sheet row as read, input and result columns together.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SheetRow {
    pub index: RowIndex,
    pub expected_name: String,
    pub account_number: String,
    pub provider_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub actual_name: String,
    #[serde(default)]
    pub evidence_link: String,
}

impl SheetRow {
    /// A fresh row with empty result columns.
    pub fn pending(
        index: RowIndex,
        expected_name: impl Into<String>,
        account_number: impl Into<String>,
        provider_type: impl Into<String>,
    ) -> Self {
        Self {
            index,
            expected_name: expected_name.into(),
            account_number: account_number.into(),
            provider_type: provider_type.into(),
            status: String::new(),
            actual_name: String::new(),
            evidence_link: String::new(),
        }
    }

    /// Rows with any status are done; re-runs skip them.
    pub fn is_pending(&self) -> bool {
        self.status.trim().is_empty()
    }

    pub fn to_row(&self) -> Row {
        Row::new(
            self.index,
            &self.expected_name,
            &self.account_number,
            &self.provider_type,
        )
    }
}

/// One validation task. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Row {
    index: RowIndex,
    expected_name: String,
    account_number: String,
    provider_code: String,
}

impl Row {
    /// Spreadsheet cells often carry grouping spaces in account numbers;
    /// they are dropped here.
    pub fn new(
        index: RowIndex,
        expected_name: &str,
        account_number: &str,
        provider_code: &str,
    ) -> Self {
        Self {
            index,
            expected_name: expected_name.trim().to_string(),
            account_number: account_number.split_whitespace().collect(),
            provider_code: provider_code.trim().to_string(),
        }
    }

    pub fn index(&self) -> RowIndex {
        self.index
    }

    pub fn expected_name(&self) -> &str {
        &self.expected_name
    }

    pub fn account_number(&self) -> &str {
        &self.account_number
    }

    pub fn provider_code(&self) -> &str {
        &self.provider_code
    }

    /// Reason the row cannot be inquired at all, if any.
    pub fn malformed_reason(&self) -> Option<&'static str> {
        if self.account_number.is_empty() {
            Some("account number is empty")
        } else if !self
            .account_number
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-')
        {
            Some("account number contains non-digit characters")
        } else if !self.account_number.chars().any(|c| c.is_ascii_digit()) {
            Some("account number has no digits")
        } else {
            None
        }
    }
}
