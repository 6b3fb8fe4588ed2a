use autoid_domain::{Classification, RowIndex, ValidationOutcome};

/// Tally of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RunReport {
    /// Rows read from the source.
    pub total_rows: usize,
    /// Rows that already had a status.
    pub skipped: usize,
    /// Pending rows left for a later run by the row cap.
    pub deferred: usize,
    /// Rows with an outcome written this run.
    pub processed: usize,
    pub valid: usize,
    pub not_valid: usize,
    pub not_premium: usize,
    pub different_name: usize,
    pub incomplete_name: usize,
    /// Rows whose inquiry ended in a provider error (counted in `not_valid` too).
    pub provider_errors: usize,
    pub notify_failures: usize,
    pub stopped_at: Option<RowIndex>,
    pub cancelled: bool,
}

impl RunReport {
    pub fn record(&mut self, outcome: &ValidationOutcome) {
        self.processed += 1;
        match outcome.classification {
            Classification::Valid => self.valid += 1,
            Classification::RekTidakValid => self.not_valid += 1,
            Classification::RekBelumPremium => self.not_premium += 1,
            Classification::RekBedaNama => self.different_name += 1,
            Classification::RekNamaTidakLengkap => self.incomplete_name += 1,
        }
        if outcome.finding.is_provider_error() {
            self.provider_errors += 1;
        }
    }

    pub fn count(&self, classification: Classification) -> usize {
        match classification {
            Classification::Valid => self.valid,
            Classification::RekTidakValid => self.not_valid,
            Classification::RekBelumPremium => self.not_premium,
            Classification::RekBedaNama => self.different_name,
            Classification::RekNamaTidakLengkap => self.incomplete_name,
        }
    }

    /// Processed rows with any label other than VALID.
    pub fn invalid(&self) -> usize {
        self.processed - self.valid
    }

    /// Ran to the end of the pending rows.
    pub fn finished(&self) -> bool {
        self.stopped_at.is_none() && !self.cancelled
    }
}
