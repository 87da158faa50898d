//! Integration tests for reconciliation-core

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use reconciliation_core::{
    utils::MemoryReportStorage, MatchConfig, MatchType, Normalizer, PurchaseInvoice,
    RawRecordSet, ReconcileError, Reconciler, RecordKind, RecordSet, ReportAssembler,
    ReportStorage, SaleInvoice, StatementLine, WithholdingRecord,
};
use std::str::FromStr;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(10, 0, 0).unwrap()
}

fn reconcile(records: &RecordSet) -> reconciliation_core::Reconciliation {
    init_tracing();
    Reconciler::new(records, MatchConfig::default())
        .unwrap()
        .run()
}

#[test]
fn test_single_sale_match() {
    let records = RecordSet::new()
        .with_statement_lines(vec![StatementLine::deposit(
            "line-1",
            at(2024, 3, 10),
            dec("5000.00"),
        )])
        .with_sales(vec![SaleInvoice::new(
            "INV-1",
            date(2024, 2, 20),
            "ABC",
            dec("5000.00"),
        )]);

    let reconciliation = reconcile(&records);

    let result = reconciliation.result_for("line-1").unwrap();
    assert_eq!(result.match_type, MatchType::SaleSingle);
    assert_eq!(result.matched_sale_ids, vec!["INV-1"]);
    assert_eq!(result.difference, dec("0.00"));
    assert!(reconciliation.settlement.is_settled(RecordKind::Sale, "INV-1"));
}

#[test]
fn test_sale_combination_match() {
    let records = RecordSet::new()
        .with_statement_lines(vec![StatementLine::deposit(
            "line-1",
            at(2024, 3, 10),
            dec("9800.00"),
        )])
        .with_sales(vec![
            SaleInvoice::new("INV-1", date(2024, 3, 1), "XYZ", dec("5000.00")),
            SaleInvoice::new("INV-2", date(2024, 3, 4), "XYZ", dec("4800.00")),
        ]);

    let reconciliation = reconcile(&records);

    let result = reconciliation.result_for("line-1").unwrap();
    assert_eq!(result.match_type, MatchType::SaleCombination);
    assert_eq!(result.matched_sale_ids.len(), 2);
    assert!(result.matched_sale_ids.contains(&"INV-1".to_string()));
    assert!(result.matched_sale_ids.contains(&"INV-2".to_string()));
    assert_eq!(result.total_matched_amount, dec("9800.00"));
    assert_eq!(result.difference, dec("0.00"));
    assert_eq!(reconciliation.settlement.count(RecordKind::Sale), 2);
}

#[test]
fn test_withholding_fallback_match() {
    let records = RecordSet::new()
        .with_statement_lines(vec![StatementLine::deposit(
            "line-1",
            at(2024, 3, 10),
            dec("3000.00"),
        )])
        .with_withholdings(vec![WithholdingRecord::new(
            "WHT-1",
            date(2024, 3, 8),
            "DEF",
            dec("3000.00"),
        )]);

    let reconciliation = reconcile(&records);

    let result = reconciliation.result_for("line-1").unwrap();
    assert_eq!(result.match_type, MatchType::WithholdingFallback);
    assert_eq!(result.matched_withholding_ids, vec!["WHT-1"]);
    assert!(result.matched_sale_ids.is_empty());
    assert!(reconciliation
        .settlement
        .is_settled(RecordKind::Withholding, "WHT-1"));
}

#[test]
fn test_single_purchase_match() {
    let records = RecordSet::new()
        .with_statement_lines(vec![StatementLine::withdrawal(
            "line-1",
            at(2024, 3, 10),
            dec("1200.00"),
        )])
        .with_purchases(vec![PurchaseInvoice::new(
            "PO-1",
            date(2024, 2, 29),
            "Supplier",
            dec("1150.00"),
        )]);

    let reconciliation = reconcile(&records);

    let result = reconciliation.result_for("line-1").unwrap();
    assert_eq!(result.match_type, MatchType::PurchaseSingle);
    assert_eq!(result.matched_purchase_ids, vec!["PO-1"]);
    assert_eq!(result.difference, dec("50.00"));
    assert!(reconciliation
        .settlement
        .is_settled(RecordKind::Purchase, "PO-1"));
}

#[test]
fn test_unmatched_line_changes_nothing() {
    let records = RecordSet::new()
        .with_statement_lines(vec![
            StatementLine::deposit("dep", at(2024, 3, 10), dec("777.00")),
            StatementLine::withdrawal("wd", at(2024, 3, 10), dec("777.00")),
        ])
        .with_sales(vec![SaleInvoice::new(
            "INV-1",
            date(2023, 1, 1),
            "ABC",
            dec("777.00"),
        )])
        .with_purchases(vec![PurchaseInvoice::new(
            "PO-1",
            date(2024, 3, 11),
            "Supplier",
            dec("777.00"),
        )]);

    let reconciliation = reconcile(&records);

    for id in ["dep", "wd"] {
        let result = reconciliation.result_for(id).unwrap();
        assert_eq!(result.match_type, MatchType::Unmatched);
        assert_eq!(result.difference, dec("777.00"));
    }
    assert_eq!(reconciliation.settlement.count(RecordKind::Sale), 0);
    assert_eq!(reconciliation.settlement.count(RecordKind::Purchase), 0);
}

#[test]
fn test_each_invoice_settled_once() {
    let records = RecordSet::new()
        .with_statement_lines(vec![
            StatementLine::deposit("first", at(2024, 3, 10), dec("5000.00")),
            StatementLine::deposit("second", at(2024, 3, 11), dec("5000.00")),
        ])
        .with_sales(vec![SaleInvoice::new(
            "INV-1",
            date(2024, 3, 1),
            "ABC",
            dec("5000.00"),
        )]);

    let reconciliation = reconcile(&records);

    // Earlier lines claim invoices first
    assert!(reconciliation.result_for("first").unwrap().is_matched());
    assert!(!reconciliation.result_for("second").unwrap().is_matched());

    let claims = reconciliation
        .results
        .iter()
        .filter(|r| r.matched_sale_ids.contains(&"INV-1".to_string()))
        .count();
    assert_eq!(claims, 1);
}

#[test]
fn test_first_candidate_wins_not_closest() {
    let records = RecordSet::new()
        .with_statement_lines(vec![StatementLine::deposit(
            "line-1",
            at(2024, 3, 10),
            dec("5000.00"),
        )])
        .with_sales(vec![
            SaleInvoice::new("close", date(2024, 3, 5), "ABC", dec("5000.00")),
            SaleInvoice::new("older", date(2024, 3, 1), "ABC", dec("4500.00")),
        ]);

    let reconciliation = reconcile(&records);

    let result = reconciliation.result_for("line-1").unwrap();
    assert_eq!(result.matched_sale_ids, vec!["older"]);
    assert_eq!(result.difference, dec("500.00"));
}

#[test]
fn test_rerun_on_settled_records_is_idempotent() {
    let mut records = RecordSet::new()
        .with_statement_lines(vec![
            StatementLine::deposit("dep", at(2024, 3, 10), dec("5000.00")),
            StatementLine::withdrawal("wd", at(2024, 3, 10), dec("1200.00")),
        ])
        .with_sales(vec![SaleInvoice::new(
            "INV-1",
            date(2024, 3, 1),
            "ABC",
            dec("5000.00"),
        )])
        .with_purchases(vec![PurchaseInvoice::new(
            "PO-1",
            date(2024, 3, 1),
            "Supplier",
            dec("1200.00"),
        )]);

    let first = reconcile(&records);
    assert_eq!(first.matched_count(), 2);

    for sale in &mut records.sales {
        sale.settled = first.settlement.is_settled(RecordKind::Sale, &sale.id);
    }
    for purchase in &mut records.purchases {
        purchase.settled = first
            .settlement
            .is_settled(RecordKind::Purchase, &purchase.id);
    }

    let second = reconcile(&records);
    assert_eq!(second.matched_count(), 0);
    assert_eq!(second.settlement, first.settlement);
}

#[test]
fn test_skipped_line_does_not_stop_the_run() {
    let mut broken = StatementLine::deposit("broken", at(2024, 3, 9), dec("5000.00"));
    broken.timestamp = None;
    let records = RecordSet::new()
        .with_statement_lines(vec![
            broken,
            StatementLine::deposit("good", at(2024, 3, 10), dec("5000.00")),
        ])
        .with_sales(vec![SaleInvoice::new(
            "INV-1",
            date(2024, 3, 1),
            "ABC",
            dec("5000.00"),
        )]);

    let reconciliation = reconcile(&records);

    assert_eq!(reconciliation.results.len(), 2);
    assert_eq!(reconciliation.results[1].statement_line_id, "broken");
    assert_eq!(reconciliation.skipped, vec!["broken"]);
    assert!(reconciliation.result_for("good").unwrap().is_matched());
}

#[test]
fn test_negative_tolerance_rejected() {
    let err = MatchConfig::new(30, dec("-1"), dec("50")).unwrap_err();
    assert!(matches!(err, ReconcileError::Configuration(_)));
}

#[test]
fn test_raw_records_pipeline() {
    init_tracing();
    let raw: RawRecordSet = serde_json::from_str(
        r#"{
            "statement_lines": [
                {"id": "s-1", "datetime": "10/03/2024 09:15", "amount": "9,800.00", "is_deposit": "1"},
                {"id": "s-2", "datetime": "11/03/2024", "amount": "1,200.00", "is_deposit": "0"},
                {"id": "s-3", "datetime": "12/03/2024", "amount": "", "is_deposit": "1"}
            ],
            "sales": [
                {"id": "a", "date_of_sale_invoice": "01/03/2567", "company_name": "XYZ",
                 "sale_invoice_tax_number": "IV-001", "net_amount": "5,000.00"},
                {"id": "b", "date_of_sale_invoice": "04/03/2567", "company_name": "XYZ",
                 "sale_invoice_tax_number": "IV-002", "net_amount": "4,800.00"}
            ],
            "purchases": [
                {"id": "p", "date_of_purchase_invoice": "2024-03-01", "company_name": "Supplier",
                 "total_amount": "1,175.00", "matched": "false"}
            ]
        }"#,
    )
    .unwrap();

    let (records, field_errors) = RecordSet::from_raw(raw, &Normalizer::new());
    assert_eq!(field_errors.len(), 1);

    let reconciliation = Reconciler::new(&records, MatchConfig::default())
        .unwrap()
        .run();
    let report = ReportAssembler::new(&records).assemble(&reconciliation);

    assert_eq!(report.counters.total_lines, 3);
    assert_eq!(report.counters.matched_lines, 2);
    assert_eq!(report.counters.skipped_lines, 1);
    assert_eq!(report.counters.sales_matched, 2);
    assert_eq!(report.counters.purchases_matched, 1);

    let combination = report
        .transactions
        .iter()
        .find(|row| row.statement_line_id == "s-1")
        .unwrap();
    assert_eq!(combination.match_type, MatchType::SaleCombination);
    assert_eq!(combination.companies, "XYZ");
    assert_eq!(combination.invoice_numbers, "IV-002 | IV-001");
}

#[test]
fn test_config_from_environment_lookup() {
    let config = MatchConfig::from_lookup(|key| match key {
        "RECON_MAX_CREDIT_DAYS" => Some("45".to_string()),
        "RECON_SALE_TOLERANCE" => Some("250.50".to_string()),
        _ => None,
    })
    .unwrap();

    assert_eq!(config.max_credit_days(), 45);
    assert_eq!(config.sale_tolerance(), &dec("250.50"));
    assert_eq!(config.purchase_tolerance(), &dec("50"));
}

fn sample_report() -> reconciliation_core::ReconciliationReport {
    let records = RecordSet::new()
        .with_statement_lines(vec![StatementLine::deposit(
            "line-1",
            at(2024, 3, 10),
            dec("5000.00"),
        )])
        .with_sales(vec![SaleInvoice::new(
            "INV-1",
            date(2024, 2, 20),
            "ABC",
            dec("5000.00"),
        )]);
    let reconciliation = reconcile(&records);
    ReportAssembler::new(&records).assemble(&reconciliation)
}

#[tokio::test]
async fn test_report_storage_roundtrip() {
    let mut storage = MemoryReportStorage::new();
    let report = sample_report();

    storage.save_report(&report).await.unwrap();

    let stored = storage.get_report(report.run_id).await.unwrap().unwrap();
    assert_eq!(stored, report);
    assert_eq!(storage.list_reports().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_report_storage_delete() {
    let mut storage = MemoryReportStorage::new();
    let report = sample_report();
    storage.save_report(&report).await.unwrap();

    storage.delete_report(report.run_id).await.unwrap();

    assert!(storage.get_report(report.run_id).await.unwrap().is_none());
    assert!(storage.is_empty().unwrap());
    assert!(matches!(
        storage.delete_report(report.run_id).await,
        Err(ReconcileError::ReportNotFound(_))
    ));
}

#[tokio::test]
async fn test_report_storage_lists_oldest_first() {
    let mut storage = MemoryReportStorage::new();
    let newer = sample_report();
    let mut older = sample_report();
    older.as_of = Some(date(2024, 1, 31));

    storage.save_report(&newer).await.unwrap();
    storage.save_report(&older).await.unwrap();

    let listed = storage.list_reports().await.unwrap();
    assert_eq!(listed[0].run_id, older.run_id);
    assert_eq!(listed[1].run_id, newer.run_id);
}
