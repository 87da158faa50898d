//! Traits for record abstraction and report storage

use async_trait::async_trait;
use uuid::Uuid;

use crate::report::ReconciliationReport;
use crate::types::*;

/// A record identified by an id unique within its set
pub trait KeyedRecord {
    /// Name of the record set, as shown in errors
    const SET: &'static str;

    fn record_id(&self) -> &str;
}

/// A record that a statement line can settle
pub trait SettlementRecord: KeyedRecord {
    /// Which settlement set the record belongs to
    const KIND: RecordKind;

    /// Settlement flag as it arrived with the input
    fn is_settled(&self) -> bool;
}

impl KeyedRecord for StatementLine {
    const SET: &'static str = "statement line";

    fn record_id(&self) -> &str {
        &self.id
    }
}

impl KeyedRecord for SaleInvoice {
    const SET: &'static str = "sale invoice";

    fn record_id(&self) -> &str {
        &self.id
    }
}

impl SettlementRecord for SaleInvoice {
    const KIND: RecordKind = RecordKind::Sale;

    fn is_settled(&self) -> bool {
        self.settled
    }
}

impl KeyedRecord for PurchaseInvoice {
    const SET: &'static str = "purchase invoice";

    fn record_id(&self) -> &str {
        &self.id
    }
}

impl SettlementRecord for PurchaseInvoice {
    const KIND: RecordKind = RecordKind::Purchase;

    fn is_settled(&self) -> bool {
        self.settled
    }
}

impl KeyedRecord for WithholdingRecord {
    const SET: &'static str = "withholding record";

    fn record_id(&self) -> &str {
        &self.id
    }
}

impl SettlementRecord for WithholdingRecord {
    const KIND: RecordKind = RecordKind::Withholding;

    fn is_settled(&self) -> bool {
        self.settled
    }
}

/// Storage abstraction for finished reconciliation reports
///
/// Reports are written after a run completes, so the matcher itself never
/// touches storage. Implement this for whatever backend keeps the reports.
#[async_trait]
pub trait ReportStorage: Send + Sync {
    /// Save a report, replacing any report with the same run id
    async fn save_report(&mut self, report: &ReconciliationReport) -> ReconcileResult<()>;

    /// Get a report by run id
    async fn get_report(&self, run_id: Uuid) -> ReconcileResult<Option<ReconciliationReport>>;

    /// List all stored reports, oldest as-of date first
    async fn list_reports(&self) -> ReconcileResult<Vec<ReconciliationReport>>;

    /// Delete a report
    async fn delete_report(&mut self, run_id: Uuid) -> ReconcileResult<()>;
}
