//! Validation utilities

use bigdecimal::{BigDecimal, Zero};
use std::collections::HashSet;

use crate::traits::KeyedRecord;
use crate::types::*;

/// Validate that a tolerance is not negative
pub fn validate_tolerance(name: &str, tolerance: &BigDecimal) -> ReconcileResult<()> {
    if *tolerance < BigDecimal::zero() {
        return Err(ReconcileError::Configuration(format!(
            "{} cannot be negative (got {})",
            name, tolerance
        )));
    }
    Ok(())
}

/// Validate the credit window length in days
pub fn validate_credit_days(days: i64) -> ReconcileResult<()> {
    if days < 0 {
        return Err(ReconcileError::Configuration(format!(
            "max_credit_days cannot be negative (got {})",
            days
        )));
    }
    Ok(())
}

/// Validate that a record id is usable as a settlement key
pub fn validate_record_id(id: &str) -> ReconcileResult<()> {
    if id.trim().is_empty() {
        return Err(ReconcileError::Configuration(
            "Record id cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Ensure no two records of one set share an id
pub fn validate_unique_ids<R: KeyedRecord>(records: &[R]) -> ReconcileResult<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        validate_record_id(record.record_id())?;
        if !seen.insert(record.record_id()) {
            return Err(ReconcileError::DuplicateRecordId {
                set: R::SET,
                id: record.record_id().to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_negative_tolerance_rejected() {
        let err = validate_tolerance("sale_tolerance", &BigDecimal::from(-1)).unwrap_err();
        assert!(matches!(err, ReconcileError::Configuration(_)));
        assert!(validate_tolerance("sale_tolerance", &BigDecimal::zero()).is_ok());
    }

    #[test]
    fn test_negative_credit_days_rejected() {
        assert!(validate_credit_days(-1).is_err());
        assert!(validate_credit_days(0).is_ok());
    }

    #[test]
    fn test_duplicate_ids_detected() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let sales = vec![
            SaleInvoice::new("s1", date, "A", BigDecimal::from(1)),
            SaleInvoice::new("s1", date, "B", BigDecimal::from(2)),
        ];
        let err = validate_unique_ids(&sales).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::DuplicateRecordId {
                set: "sale invoice",
                id: "s1".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_statement_line_ids_detected() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let lines = vec![
            StatementLine::deposit("L", ts, BigDecimal::from(5000)),
            StatementLine::withdrawal("L", ts, BigDecimal::from(123)),
        ];
        let err = validate_unique_ids(&lines).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::DuplicateRecordId {
                set: "statement line",
                id: "L".to_string()
            }
        );
    }

    #[test]
    fn test_blank_id_rejected() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let sales = vec![SaleInvoice::new("  ", date, "A", BigDecimal::from(1))];
        assert!(validate_unique_ids(&sales).is_err());
    }
}
