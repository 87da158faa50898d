//! Candidate lookup for a statement line
//!
//! Every query is read-only: it filters the record sets against the current
//! settlement state and returns borrowed records in a fixed order. The matcher
//! commits to the first qualifying candidate, so that order decides ties.

use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;

use super::settlement::SettlementState;
use crate::config::MatchConfig;
use crate::records::RecordSet;
use crate::types::*;

/// Withholding records must be paid within this many days of the statement line
pub const WITHHOLDING_WINDOW_DAYS: i64 = 3;

/// Whole calendar days from `from` to `to`
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Whether `amount` lies within `tolerance` of `target`
pub fn within_tolerance(amount: &BigDecimal, target: &BigDecimal, tolerance: &BigDecimal) -> bool {
    (amount - target).abs() <= *tolerance
}

/// Read-only queries over one run's record sets
#[derive(Debug, Clone, Copy)]
pub struct CandidateLocator<'a> {
    records: &'a RecordSet,
    config: &'a MatchConfig,
}

impl<'a> CandidateLocator<'a> {
    pub fn new(records: &'a RecordSet, config: &'a MatchConfig) -> Self {
        Self { records, config }
    }

    /// Unsettled sale invoices dated within the credit window on either side of
    /// `date`, whose net amount lies in `[0, amount + sale_tolerance]`
    ///
    /// The upper bound is wide on purpose: invoices smaller than the deposit stay
    /// in play for the combination search. Ordered by invoice date, oldest first.
    pub fn find_sale_candidates(
        &self,
        settlement: &SettlementState,
        date: NaiveDate,
        amount: &BigDecimal,
    ) -> Vec<&'a SaleInvoice> {
        let upper = amount + self.config.sale_tolerance();
        let zero = BigDecimal::zero();

        let mut candidates: Vec<&'a SaleInvoice> = self
            .records
            .sales
            .iter()
            .filter(|sale| !settlement.is_settled(RecordKind::Sale, &sale.id))
            .filter(|sale| {
                let (Some(invoice_date), Some(net)) = (sale.invoice_date, &sale.net_amount) else {
                    return false;
                };
                days_between(invoice_date, date).abs() <= self.config.max_credit_days()
                    && *net >= zero
                    && *net <= upper
            })
            .collect();

        candidates.sort_by_key(|sale| sale.invoice_date);
        candidates
    }

    /// Unsettled withholding records paid within three days of `date` whose paid
    /// amount is within `sale_tolerance` of `amount`, oldest first
    pub fn find_withholding_candidates(
        &self,
        settlement: &SettlementState,
        date: NaiveDate,
        amount: &BigDecimal,
    ) -> Vec<&'a WithholdingRecord> {
        let mut candidates: Vec<&'a WithholdingRecord> = self
            .records
            .withholdings
            .iter()
            .filter(|record| !settlement.is_settled(RecordKind::Withholding, &record.id))
            .filter(|record| {
                let (Some(paid_date), Some(paid)) = (record.paid_date, &record.paid_amount) else {
                    return false;
                };
                days_between(paid_date, date).abs() <= WITHHOLDING_WINDOW_DAYS
                    && within_tolerance(paid, amount, self.config.sale_tolerance())
            })
            .collect();

        candidates.sort_by_key(|record| record.paid_date);
        candidates
    }

    /// Unsettled purchase invoices dated on or before `date`, at most
    /// `max_credit_days` old, whose total is within `purchase_tolerance` of
    /// `amount`; most recent invoice first
    pub fn find_purchase_candidates(
        &self,
        settlement: &SettlementState,
        date: NaiveDate,
        amount: &BigDecimal,
    ) -> Vec<&'a PurchaseInvoice> {
        let mut candidates: Vec<&'a PurchaseInvoice> = self
            .records
            .purchases
            .iter()
            .filter(|purchase| !settlement.is_settled(RecordKind::Purchase, &purchase.id))
            .filter(|purchase| {
                let (Some(invoice_date), Some(total)) =
                    (purchase.invoice_date, &purchase.total_amount)
                else {
                    return false;
                };
                let age = days_between(invoice_date, date);
                (0..=self.config.max_credit_days()).contains(&age)
                    && within_tolerance(total, amount, self.config.purchase_tolerance())
            })
            .collect();

        candidates.sort_by(|a, b| b.invoice_date.cmp(&a.invoice_date));
        candidates
    }

    /// First unsettled withholding record that corroborates a matched sale
    ///
    /// It must be paid within three days of `date`, belong to the same company
    /// (by name or tax id) and carry a paid amount within `sale_tolerance` of the
    /// sale's net amount.
    pub fn find_confirming_withholding(
        &self,
        settlement: &SettlementState,
        date: NaiveDate,
        sale: &SaleInvoice,
    ) -> Option<&'a WithholdingRecord> {
        let net = sale.net_amount.as_ref()?;

        let mut candidates: Vec<&'a WithholdingRecord> = self
            .records
            .withholdings
            .iter()
            .filter(|record| !settlement.is_settled(RecordKind::Withholding, &record.id))
            .filter(|record| same_company(sale, record))
            .filter(|record| {
                let (Some(paid_date), Some(paid)) = (record.paid_date, &record.paid_amount) else {
                    return false;
                };
                days_between(paid_date, date).abs() <= WITHHOLDING_WINDOW_DAYS
                    && within_tolerance(paid, net, self.config.sale_tolerance())
            })
            .collect();

        candidates.sort_by_key(|record| record.paid_date);
        candidates.into_iter().next()
    }
}

/// Blank names or tax ids never count as equal
fn same_company(sale: &SaleInvoice, record: &WithholdingRecord) -> bool {
    let name_matches = {
        let name = sale.company_name.trim();
        !name.is_empty() && name == record.company_name.trim()
    };
    let tax_id_matches = {
        let tax_id = sale.company_tax_id.trim();
        !tax_id.is_empty() && tax_id == record.tax_id.trim()
    };
    name_matches || tax_id_matches
}
