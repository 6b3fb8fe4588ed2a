/// Errors for validation domain schemas.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("invalid provider code: {0:?}")]
    InvalidProviderCode(String),

    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("duplicate provider code: {0}")]
    DuplicateProvider(String),

    #[error("invalid row index: {0}")]
    InvalidRowIndex(u32),

    #[error("unknown classification label: {0:?}")]
    UnknownLabel(String),

    #[error("provider registry validation: {0}")]
    ValidationFailed(String),
}
