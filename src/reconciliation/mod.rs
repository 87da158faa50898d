//! Reconciliation engine matching bank statement lines to invoices
//!
//! Deposits are matched against sale invoices (singly, or up to three from one
//! company), falling back to withholding tax records. Withdrawals are matched
//! against single purchase invoices. Every matched record is settled
//! exclusively for the rest of the run.

pub mod candidates;
pub mod combination;
pub mod matcher;
pub mod settlement;

pub use candidates::{CandidateLocator, WITHHOLDING_WINDOW_DAYS};
pub use combination::{find_sale_combination, MAX_COMBINATION_SIZE};
pub use matcher::{Reconciler, Reconciliation};
pub use settlement::SettlementState;
