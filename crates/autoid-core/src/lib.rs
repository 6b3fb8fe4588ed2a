mod automation;
mod config;
mod error;
mod evidence;
mod notify;
mod orchestrator;
mod report;
mod retry;
mod sessions;
mod sheet;
mod validator;

pub use automation::{Automation, ProviderSession};
pub use config::{OrchestratorConfig, RunOptions};
pub use error::{AutomationError, EvidenceError, NotifyError, RunError, SheetError};
pub use evidence::{EvidenceStore, FileEvidenceStore, evidence_file_name};
pub use notify::{Attachment, Notification, Notifier, messages};
pub use orchestrator::BatchOrchestrator;
pub use report::RunReport;
pub use retry::RetryPolicy;
pub use sessions::SessionPool;
pub use sheet::{RowSink, RowSource};
pub use validator::{RowValidator, Validation};
