//! Record sets consumed by the reconciliation engine

pub mod normalizer;
pub mod raw;

pub use normalizer::*;
pub use raw::*;

use serde::{Deserialize, Serialize};

use crate::types::*;
use crate::utils::validation::validate_unique_ids;

/// The four typed record sets of one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    pub statement_lines: Vec<StatementLine>,
    pub sales: Vec<SaleInvoice>,
    pub purchases: Vec<PurchaseInvoice>,
    pub withholdings: Vec<WithholdingRecord>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize raw record sets, returning the typed records and every field error
    pub fn from_raw(raw: RawRecordSet, normalizer: &Normalizer) -> (Self, Vec<ReconcileError>) {
        let statement = normalizer.normalize_statement(raw.statement_lines);
        let sales = normalizer.normalize_sales(raw.sales);
        let purchases = normalizer.normalize_purchases(raw.purchases);
        let withholdings = normalizer.normalize_withholdings(raw.withholdings);

        let field_errors = statement
            .field_errors
            .into_iter()
            .chain(sales.field_errors)
            .chain(purchases.field_errors)
            .chain(withholdings.field_errors)
            .collect();

        let records = Self {
            statement_lines: statement.records,
            sales: sales.records,
            purchases: purchases.records,
            withholdings: withholdings.records,
        };
        (records, field_errors)
    }

    pub fn with_statement_lines(mut self, lines: Vec<StatementLine>) -> Self {
        self.statement_lines = lines;
        self
    }

    pub fn with_sales(mut self, sales: Vec<SaleInvoice>) -> Self {
        self.sales = sales;
        self
    }

    pub fn with_purchases(mut self, purchases: Vec<PurchaseInvoice>) -> Self {
        self.purchases = purchases;
        self
    }

    pub fn with_withholdings(mut self, withholdings: Vec<WithholdingRecord>) -> Self {
        self.withholdings = withholdings;
        self
    }

    /// Check that ids are unique within every set
    pub fn validate(&self) -> ReconcileResult<()> {
        validate_unique_ids(&self.statement_lines)?;
        validate_unique_ids(&self.sales)?;
        validate_unique_ids(&self.purchases)?;
        validate_unique_ids(&self.withholdings)?;
        Ok(())
    }

    pub fn deposit_count(&self) -> usize {
        self.statement_lines
            .iter()
            .filter(|line| line.direction == Some(Direction::Deposit))
            .count()
    }

    pub fn withdrawal_count(&self) -> usize {
        self.statement_lines
            .iter()
            .filter(|line| line.direction == Some(Direction::Withdrawal))
            .count()
    }
}
