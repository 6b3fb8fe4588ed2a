use async_trait::async_trait;

use autoid_domain::{SheetRow, ValidationOutcome};

use crate::error::SheetError;

/// Where rows come from. Rows are returned in sheet order.
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn read_rows(&self) -> Result<Vec<SheetRow>, SheetError>;
}

/// Where outcomes go. Writes the status, actual-name and evidence columns
/// of `outcome.row`.
#[async_trait]
pub trait RowSink: Send + Sync {
    async fn write_outcome(&self, outcome: &ValidationOutcome) -> Result<(), SheetError>;
}
