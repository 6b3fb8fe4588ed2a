use std::time::Duration;

use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Pause between rows, as a courtesy to provider rate limits.
    pub row_delay: Duration,
    /// Extra inquiries allowed after a transient provider error.
    pub provider_retry: u32,
    pub sink_retry: RetryPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            row_delay: Duration::from_secs(2),
            provider_retry: 1,
            sink_retry: RetryPolicy::default(),
        }
    }
}

/// Per-run switches, populated from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Cap on rows validated this run. `None` means no cap.
    pub max_rows: Option<usize>,
    /// Skip the automation backend and synthesize successful inquiries.
    pub demo_mode: bool,
    /// Passed through to the automation backend untouched.
    pub headless: bool,
}
