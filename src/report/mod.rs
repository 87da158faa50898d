//! Report tables projected from a finished reconciliation
//!
//! Assembling a report is a pure function of the record sets and the run's
//! results; nothing is matched or settled here.

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::reconciliation::candidates::days_between;
use crate::reconciliation::Reconciliation;
use crate::records::RecordSet;
use crate::types::*;

/// Separator used when several values share one report cell
pub const JOIN_SEPARATOR: &str = " | ";

/// How one statement line was reconciled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionMatchRow {
    pub statement_line_id: String,
    pub direction: Option<Direction>,
    pub transaction_date: Option<NaiveDateTime>,
    pub amount: Option<BigDecimal>,
    pub companies: String,
    pub tax_ids: String,
    pub invoice_numbers: String,
    pub withholding_dates: String,
    pub matched_amount: BigDecimal,
    pub difference: BigDecimal,
    pub match_type: MatchType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleStatusRow {
    pub id: String,
    pub invoice_date: Option<NaiveDate>,
    pub invoice_number: String,
    pub company_name: String,
    pub company_tax_id: String,
    pub total_amount: Option<BigDecimal>,
    pub withholding_tax: Option<BigDecimal>,
    pub net_amount: Option<BigDecimal>,
    pub settled: bool,
    /// Statement line that settled the invoice during this run
    pub settled_by: Option<String>,
    /// Days from the invoice date to the report date, for unsettled invoices
    pub days_outstanding: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseStatusRow {
    pub id: String,
    pub invoice_date: Option<NaiveDate>,
    pub invoice_number: String,
    pub document_id: String,
    pub company_name: String,
    pub company_tax_id: String,
    pub total_amount: Option<BigDecimal>,
    pub settled: bool,
    pub settled_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithholdingStatusRow {
    pub id: String,
    pub paid_date: Option<NaiveDate>,
    pub company_name: String,
    pub tax_id: String,
    pub paid_amount: Option<BigDecimal>,
    pub settled: bool,
    pub settled_by: Option<String>,
    /// Days from the payment date to the report date, for unsettled records
    pub days_since_payment: Option<i64>,
}

/// Summary counts for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub total_lines: usize,
    pub matched_lines: usize,
    pub unmatched_lines: usize,
    pub deposits_matched: usize,
    pub withdrawals_matched: usize,
    pub skipped_lines: usize,
    pub failed_lines: usize,
    pub sales_matched: usize,
    pub sales_unmatched: usize,
    pub purchases_matched: usize,
    pub purchases_unmatched: usize,
    pub withholdings_matched: usize,
    pub withholdings_unmatched: usize,
    pub by_match_type: BTreeMap<MatchType, usize>,
}

/// The four report tables of one run plus its counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub run_id: Uuid,
    /// Latest statement date; age columns are measured to it
    pub as_of: Option<NaiveDate>,
    pub transactions: Vec<TransactionMatchRow>,
    pub sales: Vec<SaleStatusRow>,
    pub purchases: Vec<PurchaseStatusRow>,
    pub withholdings: Vec<WithholdingStatusRow>,
    pub counters: RunCounters,
}

/// Builds a [`ReconciliationReport`] from the records a run was given
#[derive(Debug, Clone, Copy)]
pub struct ReportAssembler<'a> {
    records: &'a RecordSet,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(records: &'a RecordSet) -> Self {
        Self { records }
    }

    pub fn assemble(&self, reconciliation: &Reconciliation) -> ReconciliationReport {
        let as_of = self
            .records
            .statement_lines
            .iter()
            .filter_map(|line| line.date())
            .max();

        let mut settled_by: HashMap<(RecordKind, &str), &str> = HashMap::new();
        for result in &reconciliation.results {
            for key in result.referenced_ids() {
                settled_by.insert(key, result.statement_line_id.as_str());
            }
        }

        let report = ReconciliationReport {
            run_id: reconciliation.run_id,
            as_of,
            transactions: self.transaction_rows(reconciliation),
            sales: self.sale_rows(reconciliation, &settled_by, as_of),
            purchases: self.purchase_rows(reconciliation, &settled_by),
            withholdings: self.withholding_rows(reconciliation, &settled_by, as_of),
            counters: self.counters(reconciliation),
        };

        tracing::debug!(
            run_id = %report.run_id,
            transactions = report.transactions.len(),
            "Assembled reconciliation report"
        );
        report
    }

    fn transaction_rows(&self, reconciliation: &Reconciliation) -> Vec<TransactionMatchRow> {
        let lines: HashMap<&str, &StatementLine> = self
            .records
            .statement_lines
            .iter()
            .map(|line| (line.id.as_str(), line))
            .collect();
        let sales: HashMap<&str, &SaleInvoice> =
            self.records.sales.iter().map(|s| (s.id.as_str(), s)).collect();
        let purchases: HashMap<&str, &PurchaseInvoice> =
            self.records.purchases.iter().map(|p| (p.id.as_str(), p)).collect();
        let withholdings: HashMap<&str, &WithholdingRecord> =
            self.records.withholdings.iter().map(|w| (w.id.as_str(), w)).collect();

        reconciliation
            .results
            .iter()
            .map(|result| {
                let line = lines.get(result.statement_line_id.as_str());
                let matched_sales: Vec<&SaleInvoice> = lookup(&sales, &result.matched_sale_ids);
                let matched_purchases: Vec<&PurchaseInvoice> =
                    lookup(&purchases, &result.matched_purchase_ids);
                let matched_withholdings: Vec<&WithholdingRecord> =
                    lookup(&withholdings, &result.matched_withholding_ids);

                let tax_ids = matched_sales
                    .iter()
                    .map(|s| s.company_tax_id.as_str())
                    .chain(matched_purchases.iter().map(|p| p.company_tax_id.as_str()))
                    .chain(matched_withholdings.iter().map(|w| w.tax_id.as_str()));
                let invoice_numbers = matched_sales
                    .iter()
                    .map(|s| s.invoice_number.as_str())
                    .chain(matched_purchases.iter().map(|p| p.invoice_number.as_str()));
                let withholding_dates: Vec<String> = matched_withholdings
                    .iter()
                    .filter_map(|w| w.paid_date)
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .collect();

                TransactionMatchRow {
                    statement_line_id: result.statement_line_id.clone(),
                    direction: result.direction,
                    transaction_date: line.and_then(|l| l.timestamp),
                    amount: line.and_then(|l| l.amount.as_ref()).map(|a| a.round(2)),
                    companies: join(result.companies.iter().map(String::as_str)),
                    tax_ids: join(tax_ids),
                    invoice_numbers: join(invoice_numbers),
                    withholding_dates: join(withholding_dates.iter().map(String::as_str)),
                    matched_amount: result.total_matched_amount.round(2),
                    difference: result.difference.round(2),
                    match_type: result.match_type,
                }
            })
            .collect()
    }

    fn sale_rows(
        &self,
        reconciliation: &Reconciliation,
        settled_by: &HashMap<(RecordKind, &str), &str>,
        as_of: Option<NaiveDate>,
    ) -> Vec<SaleStatusRow> {
        self.records
            .sales
            .iter()
            .map(|sale| {
                let settled = reconciliation
                    .settlement
                    .is_settled(RecordKind::Sale, &sale.id);
                SaleStatusRow {
                    id: sale.id.clone(),
                    invoice_date: sale.invoice_date,
                    invoice_number: sale.invoice_number.clone(),
                    company_name: sale.company_name.clone(),
                    company_tax_id: sale.company_tax_id.clone(),
                    total_amount: sale.total_amount.as_ref().map(|a| a.round(2)),
                    withholding_tax: sale.withholding_tax.as_ref().map(|a| a.round(2)),
                    net_amount: sale.net_amount.as_ref().map(|a| a.round(2)),
                    settled,
                    settled_by: settler(settled_by, RecordKind::Sale, &sale.id),
                    days_outstanding: age(settled, sale.invoice_date, as_of),
                }
            })
            .collect()
    }

    fn purchase_rows(
        &self,
        reconciliation: &Reconciliation,
        settled_by: &HashMap<(RecordKind, &str), &str>,
    ) -> Vec<PurchaseStatusRow> {
        self.records
            .purchases
            .iter()
            .map(|purchase| PurchaseStatusRow {
                id: purchase.id.clone(),
                invoice_date: purchase.invoice_date,
                invoice_number: purchase.invoice_number.clone(),
                document_id: purchase.document_id.clone(),
                company_name: purchase.company_name.clone(),
                company_tax_id: purchase.company_tax_id.clone(),
                total_amount: purchase.total_amount.as_ref().map(|a| a.round(2)),
                settled: reconciliation
                    .settlement
                    .is_settled(RecordKind::Purchase, &purchase.id),
                settled_by: settler(settled_by, RecordKind::Purchase, &purchase.id),
            })
            .collect()
    }

    fn withholding_rows(
        &self,
        reconciliation: &Reconciliation,
        settled_by: &HashMap<(RecordKind, &str), &str>,
        as_of: Option<NaiveDate>,
    ) -> Vec<WithholdingStatusRow> {
        self.records
            .withholdings
            .iter()
            .map(|record| {
                let settled = reconciliation
                    .settlement
                    .is_settled(RecordKind::Withholding, &record.id);
                WithholdingStatusRow {
                    id: record.id.clone(),
                    paid_date: record.paid_date,
                    company_name: record.company_name.clone(),
                    tax_id: record.tax_id.clone(),
                    paid_amount: record.paid_amount.as_ref().map(|a| a.round(2)),
                    settled,
                    settled_by: settler(settled_by, RecordKind::Withholding, &record.id),
                    days_since_payment: age(settled, record.paid_date, as_of),
                }
            })
            .collect()
    }

    fn counters(&self, reconciliation: &Reconciliation) -> RunCounters {
        let settlement = &reconciliation.settlement;
        let mut counters = RunCounters {
            total_lines: reconciliation.results.len(),
            skipped_lines: reconciliation.skipped.len(),
            failed_lines: reconciliation.failures.len(),
            ..Default::default()
        };

        for result in &reconciliation.results {
            *counters.by_match_type.entry(result.match_type).or_insert(0) += 1;
            if !result.is_matched() {
                counters.unmatched_lines += 1;
                continue;
            }
            counters.matched_lines += 1;
            match result.direction {
                Some(Direction::Deposit) => counters.deposits_matched += 1,
                Some(Direction::Withdrawal) => counters.withdrawals_matched += 1,
                None => {}
            }
        }

        let sales = &self.records.sales;
        counters.sales_matched = sales
            .iter()
            .filter(|s| settlement.is_settled(RecordKind::Sale, &s.id))
            .count();
        counters.sales_unmatched = sales.len() - counters.sales_matched;

        let purchases = &self.records.purchases;
        counters.purchases_matched = purchases
            .iter()
            .filter(|p| settlement.is_settled(RecordKind::Purchase, &p.id))
            .count();
        counters.purchases_unmatched = purchases.len() - counters.purchases_matched;

        let withholdings = &self.records.withholdings;
        counters.withholdings_matched = withholdings
            .iter()
            .filter(|w| settlement.is_settled(RecordKind::Withholding, &w.id))
            .count();
        counters.withholdings_unmatched = withholdings.len() - counters.withholdings_matched;

        counters
    }
}

fn lookup<'r, T>(index: &HashMap<&str, &'r T>, ids: &[String]) -> Vec<&'r T> {
    ids.iter()
        .filter_map(|id| index.get(id.as_str()).copied())
        .collect()
}

/// Join non-blank values, keeping first appearances only
fn join<'s>(values: impl Iterator<Item = &'s str>) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for value in values.map(str::trim).filter(|v| !v.is_empty()) {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen.join(JOIN_SEPARATOR)
}

fn settler(
    settled_by: &HashMap<(RecordKind, &str), &str>,
    kind: RecordKind,
    id: &str,
) -> Option<String> {
    settled_by.get(&(kind, id)).map(|line_id| line_id.to_string())
}

fn age(settled: bool, from: Option<NaiveDate>, as_of: Option<NaiveDate>) -> Option<i64> {
    if settled {
        return None;
    }
    Some(days_between(from?, as_of?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::reconciliation::Reconciler;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn records() -> RecordSet {
        RecordSet::new()
            .with_statement_lines(vec![
                StatementLine::deposit(
                    "d1",
                    date(3, 10).and_hms_opt(9, 0, 0).unwrap(),
                    dec("9800"),
                ),
                StatementLine::withdrawal(
                    "w1",
                    date(3, 12).and_hms_opt(9, 0, 0).unwrap(),
                    dec("777.004"),
                ),
            ])
            .with_sales(vec![
                SaleInvoice::new("s1", date(3, 1), "XYZ", dec("5000"))
                    .with_tax_id("0105")
                    .with_invoice_number("INV-1"),
                SaleInvoice::new("s2", date(3, 2), "XYZ", dec("4800"))
                    .with_tax_id("0105")
                    .with_invoice_number("INV-2"),
                SaleInvoice::new("s3", date(3, 2), "Other", dec("100000")),
            ])
            .with_withholdings(vec![WithholdingRecord::new("h1", date(3, 2), "Q", dec("5"))])
    }

    fn report(records: &RecordSet) -> ReconciliationReport {
        let reconciliation = Reconciler::new(records, MatchConfig::default()).unwrap().run();
        ReportAssembler::new(records).assemble(&reconciliation)
    }

    #[test]
    fn test_transaction_rows_join_values() {
        let records = records();
        let report = report(&records);

        let row = &report.transactions[0];
        assert_eq!(row.statement_line_id, "d1");
        assert_eq!(row.match_type, MatchType::SaleCombination);
        assert_eq!(row.companies, "XYZ");
        assert_eq!(row.tax_ids, "0105");
        assert_eq!(row.invoice_numbers, "INV-2 | INV-1");
        assert_eq!(row.difference, dec("0"));

        let unmatched = &report.transactions[1];
        assert_eq!(unmatched.match_type, MatchType::Unmatched);
        assert_eq!(unmatched.amount, Some(dec("777.00")));
        assert_eq!(unmatched.companies, "");
    }

    #[test]
    fn test_status_rows_and_ages() {
        let records = records();
        let report = report(&records);

        assert_eq!(report.as_of, Some(date(3, 12)));

        let s1 = &report.sales[0];
        assert!(s1.settled);
        assert_eq!(s1.settled_by.as_deref(), Some("d1"));
        assert_eq!(s1.days_outstanding, None);

        let s3 = &report.sales[2];
        assert!(!s3.settled);
        assert_eq!(s3.days_outstanding, Some(10));

        assert_eq!(report.withholdings[0].days_since_payment, Some(10));
    }

    #[test]
    fn test_counters() {
        let records = records();
        let counters = report(&records).counters;

        assert_eq!(counters.total_lines, 2);
        assert_eq!(counters.matched_lines, 1);
        assert_eq!(counters.unmatched_lines, 1);
        assert_eq!(counters.deposits_matched, 1);
        assert_eq!(counters.withdrawals_matched, 0);
        assert_eq!(counters.sales_matched, 2);
        assert_eq!(counters.sales_unmatched, 1);
        assert_eq!(counters.withholdings_unmatched, 1);
        assert_eq!(counters.by_match_type.get(&MatchType::SaleCombination), Some(&1));
    }

    #[test]
    fn test_report_serializes_to_json() {
        let records = records();
        let report = report(&records);

        let json = serde_json::to_string(&report).unwrap();
        let restored: ReconciliationReport = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.run_id, report.run_id);
        assert_eq!(restored.counters, report.counters);
    }
}
