//! Core types and data structures for the reconciliation engine

use bigdecimal::{BigDecimal, Zero};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Cash direction of a statement line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Money received into the account
    Deposit,
    /// Money paid out of the account
    Withdrawal,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Deposit => write!(f, "deposit"),
            Direction::Withdrawal => write!(f, "withdrawal"),
        }
    }
}

/// The kind of record a settlement refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Sale,
    Purchase,
    Withholding,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Sale => write!(f, "sale invoice"),
            RecordKind::Purchase => write!(f, "purchase invoice"),
            RecordKind::Withholding => write!(f, "withholding record"),
        }
    }
}

/// One row of a bank account's transaction history
///
/// `None` in a typed field means the value could not be read; such a line is
/// never matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    pub id: String,
    pub timestamp: Option<NaiveDateTime>,
    pub amount: Option<BigDecimal>,
    pub direction: Option<Direction>,
    pub balance: Option<BigDecimal>,
    pub page: Option<u32>,
}

impl StatementLine {
    /// Create a deposit line
    pub fn deposit(id: impl Into<String>, timestamp: NaiveDateTime, amount: BigDecimal) -> Self {
        Self::new(id, timestamp, amount, Direction::Deposit)
    }

    /// Create a withdrawal line
    pub fn withdrawal(id: impl Into<String>, timestamp: NaiveDateTime, amount: BigDecimal) -> Self {
        Self::new(id, timestamp, amount, Direction::Withdrawal)
    }

    fn new(
        id: impl Into<String>,
        timestamp: NaiveDateTime,
        amount: BigDecimal,
        direction: Direction,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp: Some(timestamp),
            amount: Some(amount),
            direction: Some(direction),
            balance: None,
            page: None,
        }
    }

    pub fn is_deposit(&self) -> bool {
        self.direction == Some(Direction::Deposit)
    }

    /// Calendar date of the line, if known
    pub fn date(&self) -> Option<NaiveDate> {
        self.timestamp.map(|ts| ts.date())
    }

    /// Whether every field needed for matching is known
    pub fn is_matchable(&self) -> bool {
        self.timestamp.is_some() && self.amount.is_some() && self.direction.is_some()
    }
}

/// Sale tax invoice issued to a customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleInvoice {
    pub id: String,
    pub invoice_date: Option<NaiveDate>,
    pub invoice_number: String,
    pub company_name: String,
    pub company_tax_id: String,
    pub product_value: Option<BigDecimal>,
    pub vat: Option<BigDecimal>,
    pub total_amount: Option<BigDecimal>,
    pub withholding_tax: Option<BigDecimal>,
    /// Amount the customer is expected to transfer after withholding
    pub net_amount: Option<BigDecimal>,
    pub settled: bool,
}

impl SaleInvoice {
    /// Create an unsettled sale invoice carrying only the fields used for matching
    pub fn new(
        id: impl Into<String>,
        invoice_date: NaiveDate,
        company_name: impl Into<String>,
        net_amount: BigDecimal,
    ) -> Self {
        let id = id.into();
        Self {
            invoice_number: id.clone(),
            id,
            invoice_date: Some(invoice_date),
            company_name: company_name.into(),
            company_tax_id: String::new(),
            product_value: None,
            vat: None,
            total_amount: None,
            withholding_tax: None,
            net_amount: Some(net_amount),
            settled: false,
        }
    }

    pub fn with_tax_id(mut self, tax_id: impl Into<String>) -> Self {
        self.company_tax_id = tax_id.into();
        self
    }

    pub fn with_invoice_number(mut self, invoice_number: impl Into<String>) -> Self {
        self.invoice_number = invoice_number.into();
        self
    }

    pub fn settled(mut self) -> Self {
        self.settled = true;
        self
    }
}

/// Purchase tax invoice received from a supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseInvoice {
    pub id: String,
    pub invoice_date: Option<NaiveDate>,
    pub invoice_number: String,
    pub document_id: String,
    pub company_name: String,
    pub company_tax_id: String,
    pub product_value: Option<BigDecimal>,
    pub vat: Option<BigDecimal>,
    pub total_amount: Option<BigDecimal>,
    pub settled: bool,
}

impl PurchaseInvoice {
    /// Create an unsettled purchase invoice carrying only the fields used for matching
    pub fn new(
        id: impl Into<String>,
        invoice_date: NaiveDate,
        company_name: impl Into<String>,
        total_amount: BigDecimal,
    ) -> Self {
        let id = id.into();
        Self {
            invoice_number: id.clone(),
            document_id: id.clone(),
            id,
            invoice_date: Some(invoice_date),
            company_name: company_name.into(),
            company_tax_id: String::new(),
            product_value: None,
            vat: None,
            total_amount: Some(total_amount),
            settled: false,
        }
    }

    pub fn with_tax_id(mut self, tax_id: impl Into<String>) -> Self {
        self.company_tax_id = tax_id.into();
        self
    }

    pub fn settled(mut self) -> Self {
        self.settled = true;
        self
    }
}

/// Withholding tax certificate issued by a customer that paid us
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithholdingRecord {
    pub id: String,
    pub paid_date: Option<NaiveDate>,
    pub company_name: String,
    pub tax_id: String,
    pub amount: Option<BigDecimal>,
    pub withholding_tax: Option<BigDecimal>,
    /// Amount actually transferred
    pub paid_amount: Option<BigDecimal>,
    pub settled: bool,
}

impl WithholdingRecord {
    /// Create an unsettled withholding record carrying only the fields used for matching
    pub fn new(
        id: impl Into<String>,
        paid_date: NaiveDate,
        company_name: impl Into<String>,
        paid_amount: BigDecimal,
    ) -> Self {
        Self {
            id: id.into(),
            paid_date: Some(paid_date),
            company_name: company_name.into(),
            tax_id: String::new(),
            amount: None,
            withholding_tax: None,
            paid_amount: Some(paid_amount),
            settled: false,
        }
    }

    pub fn with_tax_id(mut self, tax_id: impl Into<String>) -> Self {
        self.tax_id = tax_id.into();
        self
    }

    pub fn settled(mut self) -> Self {
        self.settled = true;
        self
    }
}

/// How a statement line was matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Unmatched,
    /// One sale invoice pays the deposit
    SaleSingle,
    /// Several sale invoices of one company pay the deposit together
    SaleCombination,
    /// A withholding record stands in for the missing sale invoice
    WithholdingFallback,
    /// One sale invoice pays the deposit and a withholding record corroborates it
    WithholdingConfirmed,
    /// One purchase invoice is paid by the withdrawal
    PurchaseSingle,
}

impl MatchType {
    pub fn is_matched(&self) -> bool {
        !matches!(self, MatchType::Unmatched)
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchType::Unmatched => "unmatched",
            MatchType::SaleSingle => "sale_single",
            MatchType::SaleCombination => "sale_combination",
            MatchType::WithholdingFallback => "withholding_fallback",
            MatchType::WithholdingConfirmed => "withholding_confirmed",
            MatchType::PurchaseSingle => "purchase_single",
        };
        f.write_str(name)
    }
}

/// Outcome of reconciling one statement line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub statement_line_id: String,
    pub direction: Option<Direction>,
    pub matched_sale_ids: Vec<String>,
    pub matched_purchase_ids: Vec<String>,
    pub matched_withholding_ids: Vec<String>,
    pub companies: BTreeSet<String>,
    pub total_matched_amount: BigDecimal,
    /// Statement amount minus `total_matched_amount`
    pub difference: BigDecimal,
    pub match_type: MatchType,
}

impl MatchResult {
    pub fn is_matched(&self) -> bool {
        self.match_type.is_matched()
    }

    /// Every record id referenced by this result, tagged with its kind
    pub fn referenced_ids(&self) -> impl Iterator<Item = (RecordKind, &str)> {
        self.matched_sale_ids
            .iter()
            .map(|id| (RecordKind::Sale, id.as_str()))
            .chain(
                self.matched_purchase_ids
                    .iter()
                    .map(|id| (RecordKind::Purchase, id.as_str())),
            )
            .chain(
                self.matched_withholding_ids
                    .iter()
                    .map(|id| (RecordKind::Withholding, id.as_str())),
            )
    }
}

/// Builder for [`MatchResult`]
///
/// A result is assembled while a strategy runs and frozen by [`build`](Self::build);
/// nothing mutates it afterwards.
#[derive(Debug)]
pub struct MatchResultBuilder {
    target_amount: BigDecimal,
    result: MatchResult,
}

impl MatchResultBuilder {
    /// Start a result for a statement line; the difference begins at the full target
    pub fn new(
        statement_line_id: impl Into<String>,
        direction: Option<Direction>,
        target_amount: BigDecimal,
    ) -> Self {
        Self {
            result: MatchResult {
                statement_line_id: statement_line_id.into(),
                direction,
                matched_sale_ids: Vec::new(),
                matched_purchase_ids: Vec::new(),
                matched_withholding_ids: Vec::new(),
                companies: BTreeSet::new(),
                total_matched_amount: BigDecimal::zero(),
                difference: target_amount.clone(),
                match_type: MatchType::Unmatched,
            },
            target_amount,
        }
    }

    /// Add a sale invoice whose net amount counts towards the matched total
    pub fn sale(mut self, invoice: &SaleInvoice) -> Self {
        self.result.matched_sale_ids.push(invoice.id.clone());
        self.result.companies.insert(invoice.company_name.clone());
        if let Some(net) = &invoice.net_amount {
            self.add_to_total(net);
        }
        self
    }

    /// Add a purchase invoice whose total counts towards the matched total
    pub fn purchase(mut self, invoice: &PurchaseInvoice) -> Self {
        self.result.matched_purchase_ids.push(invoice.id.clone());
        self.result.companies.insert(invoice.company_name.clone());
        if let Some(total) = &invoice.total_amount {
            self.add_to_total(total);
        }
        self
    }

    /// Add a withholding record whose paid amount counts towards the matched total
    pub fn withholding(mut self, record: &WithholdingRecord) -> Self {
        self.result.matched_withholding_ids.push(record.id.clone());
        self.result.companies.insert(record.company_name.clone());
        if let Some(paid) = &record.paid_amount {
            self.add_to_total(paid);
        }
        self
    }

    /// Attach a corroborating withholding record without touching the totals
    pub fn confirmation(mut self, record: &WithholdingRecord) -> Self {
        self.result.matched_withholding_ids.push(record.id.clone());
        self
    }

    pub fn match_type(mut self, match_type: MatchType) -> Self {
        self.result.match_type = match_type;
        self
    }

    fn add_to_total(&mut self, amount: &BigDecimal) {
        self.result.total_matched_amount += amount;
        self.result.difference = &self.target_amount - &self.result.total_matched_amount;
    }

    pub fn build(self) -> MatchResult {
        self.result
    }
}

/// A statement line that raised an error while being matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineFailure {
    pub statement_line_id: String,
    /// Note safe to show to a user
    pub note: String,
}

impl LineFailure {
    pub const GENERIC_NOTE: &'static str = "could not process this line";

    pub fn new(statement_line_id: impl Into<String>) -> Self {
        Self {
            statement_line_id: statement_line_id.into(),
            note: Self::GENERIC_NOTE.to_string(),
        }
    }
}

/// Errors that can occur while reconciling
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReconcileError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Missing data: {0}")]
    MissingData(String),
    #[error("Invalid field '{field}' on record {record_id}: {reason}")]
    RecordField {
        record_id: String,
        field: &'static str,
        reason: String,
    },
    #[error("Could not match statement line {line_id}: {reason}")]
    MatchAttempt { line_id: String, reason: String },
    #[error("Duplicate {set} id: {id}")]
    DuplicateRecordId { set: &'static str, id: String },
    #[error("{kind} {id} is already settled")]
    AlreadySettled { kind: RecordKind, id: String },
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Report not found: {0}")]
    ReportNotFound(String),
}

impl ReconcileError {
    pub fn record_field(
        record_id: impl Into<String>,
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        ReconcileError::RecordField {
            record_id: record_id.into(),
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for reconciliation operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;
