use bytes::Bytes;
use std::sync::Arc;

use autoid_domain::{
    Classification, EvidenceRef, Finding, Normalizer, ProviderFlow, ProviderRegistry,
    RawProviderResult, Row, RowIndex, ValidationOutcome,
};

use crate::automation::ProviderSession;
use crate::error::AutomationError;
use crate::evidence::EvidenceStore;
use crate::sessions::SessionPool;

/// Placeholder name returned by demo inquiries when the row expects none.
const DEMO_NAME: &str = "DEMO ACCOUNT";

/// What validating one row produced.
#[derive(Debug, Clone)]
pub struct Validation {
    pub outcome: ValidationOutcome,
    /// Raw screenshot, kept for the notifier.
    pub screenshot: Option<Bytes>,
}

impl Validation {
    fn without_evidence(outcome: ValidationOutcome) -> Self {
        Self {
            outcome,
            screenshot: None,
        }
    }
}

/// Turns one row into one outcome.
///
/// Row-scoped problems (bad data, unknown provider, transient page
/// failures) always come back as an outcome. Only automation outages are
/// returned as errors.
pub struct RowValidator {
    registry: Arc<ProviderRegistry>,
    normalizer: Normalizer,
    evidence: Arc<dyn EvidenceStore>,
    provider_retry: u32,
}

impl RowValidator {
    pub fn new(registry: Arc<ProviderRegistry>, evidence: Arc<dyn EvidenceStore>) -> Self {
        Self {
            registry,
            normalizer: Normalizer::indonesian(),
            evidence,
            provider_retry: 1,
        }
    }

    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    #[must_use]
    pub fn with_provider_retry(mut self, retries: u32) -> Self {
        self.provider_retry = retries;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub async fn validate(
        &self,
        row: &Row,
        sessions: &mut SessionPool,
    ) -> Result<Validation, AutomationError> {
        let flow = match self.resolve(row) {
            Ok(flow) => flow,
            Err(outcome) => return Ok(Validation::without_evidence(outcome)),
        };

        let (raw, attempts) = self.inquire(row, flow, sessions).await?;
        let outcome = self.classify(row, flow, &raw).with_attempts(attempts);

        let session = sessions.session(flow.family()).await?;
        let (evidence, screenshot) = self.capture(row.index(), session).await;
        Ok(Validation {
            outcome: outcome.with_evidence(evidence),
            screenshot,
        })
    }

    /// Synthetic successful inquiry; no automation involved.
    pub fn demo(&self, row: &Row) -> Validation {
        let flow = match self.resolve(row) {
            Ok(flow) => flow,
            Err(outcome) => return Validation::without_evidence(outcome),
        };
        let name = if row.expected_name().is_empty() {
            DEMO_NAME
        } else {
            row.expected_name()
        };
        let raw = RawProviderResult::Success {
            actual_name: name.to_string(),
        };
        let mut outcome = self.classify(row, flow, &raw);
        outcome.finding = Finding::Demo;
        Validation::without_evidence(outcome)
    }

    /// Checks that need no provider. An `Err` is the row's final outcome.
    fn resolve(&self, row: &Row) -> Result<&ProviderFlow, ValidationOutcome> {
        if let Some(reason) = row.malformed_reason() {
            tracing::warn!(row = %row.index(), reason, "malformed row");
            return Err(ValidationOutcome::new(
                row.index(),
                Classification::RekTidakValid,
                Finding::MalformedRow {
                    reason: reason.to_string(),
                },
                "",
            ));
        }
        self.registry.resolve(row.provider_code()).map_err(|e| {
            tracing::warn!(row = %row.index(), provider = row.provider_code(), error = %e, "unsupported provider");
            ValidationOutcome::new(
                row.index(),
                Classification::RekTidakValid,
                Finding::UnsupportedProvider {
                    code: row.provider_code().to_string(),
                },
                "",
            )
        })
    }

    /// Inquire with retry. A lost session (dead driver connection or the
    /// portal's logged-out page) is re-opened once; losing the fresh one
    /// too is an outage, so later rows are never written off as invalid.
    async fn inquire(
        &self,
        row: &Row,
        flow: &ProviderFlow,
        sessions: &mut SessionPool,
    ) -> Result<(RawProviderResult, u32), AutomationError> {
        let family = flow.family();
        let account = row.account_number();
        let mut attempts = 0;
        let mut reopened = false;
        loop {
            attempts += 1;
            let session = sessions.session(family).await?;
            let (raw, lost) = match session.inquire(flow, account).await {
                Ok(text) => {
                    let raw = flow.interpret(&text, account);
                    let lost = raw.is_session_expired();
                    (raw, lost)
                }
                Err(e) if e.is_outage() => return Err(e),
                Err(e) => {
                    let lost = matches!(e, AutomationError::Connection(_));
                    (RawProviderResult::provider_error(e.to_string()), lost)
                }
            };
            if let RawProviderResult::ProviderError { message } = &raw {
                if lost && reopened {
                    return Err(AutomationError::SessionUnavailable(format!(
                        "{family} session lost again after re-login: {message}"
                    )));
                }
                if lost {
                    tracing::warn!(attempt = attempts, error = %message, "provider session lost, logging in again");
                    sessions.reset(family).await;
                    reopened = true;
                    continue;
                }
                if attempts <= self.provider_retry {
                    tracing::warn!(attempt = attempts, error = %message, "transient provider error, retrying");
                    continue;
                }
            }
            tracing::debug!(kind = raw.kind(), attempts, "inquiry finished");
            return Ok((raw, attempts));
        }
    }

    fn classify(&self, row: &Row, flow: &ProviderFlow, raw: &RawProviderResult) -> ValidationOutcome {
        let verdict = match raw {
            RawProviderResult::Success { actual_name } => Some(
                flow.comparator(self.normalizer.clone())
                    .compare(row.expected_name(), actual_name),
            ),
            _ => None,
        };
        ValidationOutcome::new(
            row.index(),
            Classification::derive(raw, verdict),
            Finding::from_result(raw, verdict),
            raw.observed_text(),
        )
    }

    /// Evidence failures never change the outcome.
    async fn capture(
        &self,
        row: RowIndex,
        session: &mut dyn ProviderSession,
    ) -> (Option<EvidenceRef>, Option<Bytes>) {
        let png = match session.screenshot().await {
            Ok(png) if !png.is_empty() => png,
            Ok(_) => {
                tracing::warn!(row = %row, "empty screenshot");
                return (None, None);
            }
            Err(e) => {
                tracing::warn!(row = %row, error = %e, "screenshot failed");
                return (None, None);
            }
        };
        match self.evidence.save(row, png.clone()).await {
            Ok(evidence) if self.evidence.delivered(&evidence) => (Some(evidence), None),
            Ok(evidence) => (Some(evidence), Some(png)),
            Err(e) => {
                tracing::warn!(row = %row, error = %e, "saving evidence failed");
                (None, Some(png))
            }
        }
    }
}
