pub mod classification;
pub mod error;
pub mod name;
pub mod outcome;
pub mod provider;
pub mod response;
pub mod row;

pub use classification::Classification;
pub use error::DomainError;
pub use name::{Comparator, MatchVerdict, Normalizer, compare, normalize};
pub use outcome::{EvidenceRef, Finding, ValidationOutcome, now_millis};
pub use provider::{
    ProviderCode, ProviderEntry, ProviderFamily, ProviderFlow, ProviderRegistry,
    RegistryDefinition,
};
pub use response::{RawProviderResult, ResponsePatterns};
pub use row::{Row, RowIndex, SheetRow};
