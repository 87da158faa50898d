//! # Reconciliation Core
//!
//! A library for reconciling bank statement lines against sale invoices,
//! purchase invoices and withholding tax certificates.
//!
//! ## Features
//!
//! - **Record normalization**: Raw text records with thousands separators and Buddhist-era dates
//! - **Deposit matching**: Single sale invoices, combinations of up to three, withholding fallback
//! - **Withdrawal matching**: Single purchase invoices paid after they were issued
//! - **Exclusive settlement**: Every record is settled by at most one statement line
//! - **Reporting**: Per-line match table, per-record status tables and run counters
//! - **Storage abstraction**: Trait-based storage for finished reports
//!
//! ## Quick Start
//!
//! ```rust
//! use reconciliation_core::{
//!     MatchConfig, MatchType, Reconciler, RecordSet, ReportAssembler, SaleInvoice, StatementLine,
//! };
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
//! let records = RecordSet::new()
//!     .with_statement_lines(vec![StatementLine::deposit(
//!         "line-1",
//!         date.and_hms_opt(10, 0, 0).unwrap(),
//!         BigDecimal::from(5000),
//!     )])
//!     .with_sales(vec![SaleInvoice::new(
//!         "INV-1",
//!         NaiveDate::from_ymd_opt(2024, 2, 20).unwrap(),
//!         "ABC",
//!         BigDecimal::from(5000),
//!     )]);
//!
//! let reconciliation = Reconciler::new(&records, MatchConfig::default())
//!     .unwrap()
//!     .run();
//! assert_eq!(reconciliation.results[0].match_type, MatchType::SaleSingle);
//!
//! let report = ReportAssembler::new(&records).assemble(&reconciliation);
//! assert_eq!(report.counters.matched_lines, 1);
//! ```

pub mod config;
pub mod reconciliation;
pub mod records;
pub mod report;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::MatchConfig;
pub use reconciliation::{Reconciler, Reconciliation, SettlementState};
pub use records::{Normalizer, RawRecordSet, RecordSet};
pub use report::*;
pub use traits::*;
pub use types::*;
