//! Per-line match orchestration

use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use indexmap::IndexMap;
use uuid::Uuid;

use super::candidates::{within_tolerance, CandidateLocator};
use super::combination::find_sale_combination;
use super::settlement::SettlementState;
use crate::config::MatchConfig;
use crate::records::RecordSet;
use crate::types::*;

/// Reconciles one set of statement lines against one set of records
///
/// A reconciler is built per run and consumed by [`run`](Self::run). It owns the
/// settlement state for the whole run; the records it borrows are never mutated.
#[derive(Debug)]
pub struct Reconciler<'a> {
    records: &'a RecordSet,
    config: MatchConfig,
    settlement: SettlementState,
    run_id: Uuid,
}

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub run_id: Uuid,
    /// One result per statement line, in processing order
    pub results: Vec<MatchResult>,
    pub settlement: SettlementState,
    pub failures: Vec<LineFailure>,
    /// Ids of lines skipped for missing date, amount or direction
    pub skipped: Vec<String>,
    pub warnings: Vec<ReconcileError>,
}

impl Reconciliation {
    pub fn result_for(&self, statement_line_id: &str) -> Option<&MatchResult> {
        self.results
            .iter()
            .find(|result| result.statement_line_id == statement_line_id)
    }

    pub fn matched_count(&self) -> usize {
        self.results.iter().filter(|result| result.is_matched()).count()
    }

    pub fn unmatched_count(&self) -> usize {
        self.results.len() - self.matched_count()
    }
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler, rejecting record sets with duplicate ids
    pub fn new(records: &'a RecordSet, config: MatchConfig) -> ReconcileResult<Self> {
        records.validate()?;

        Ok(Self {
            records,
            config,
            settlement: SettlementState::from_records(records),
            run_id: Uuid::new_v4(),
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn settlement(&self) -> &SettlementState {
        &self.settlement
    }

    /// Match every statement line, oldest first
    pub fn run(mut self) -> Reconciliation {
        let span = tracing::info_span!("reconcile", run_id = %self.run_id);
        let _guard = span.enter();

        tracing::info!(
            lines = self.records.statement_lines.len(),
            sales = self.records.sales.len(),
            purchases = self.records.purchases.len(),
            withholdings = self.records.withholdings.len(),
            "Starting reconciliation"
        );

        let warnings = self.missing_data_warnings();
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }

        let mut lines: Vec<&'a StatementLine> = self.records.statement_lines.iter().collect();
        lines.sort_by_key(|line| (line.timestamp.is_none(), line.timestamp));

        let mut outcomes = LineOutcomes::with_capacity(lines.len());
        for line in lines {
            if !line.is_matchable() {
                tracing::warn!(line_id = %line.id, "Skipping statement line with missing data");
                outcomes.skip(line);
                continue;
            }

            let outcome = self.match_line(line);
            outcomes.record(line, outcome);
        }

        let reconciliation = Reconciliation {
            run_id: self.run_id,
            results: outcomes.results,
            settlement: self.settlement,
            failures: outcomes.failures,
            skipped: outcomes.skipped,
            warnings,
        };

        tracing::info!(
            matched = reconciliation.matched_count(),
            unmatched = reconciliation.unmatched_count(),
            skipped = reconciliation.skipped.len(),
            failed = reconciliation.failures.len(),
            "Reconciliation finished"
        );

        reconciliation
    }

    fn missing_data_warnings(&self) -> Vec<ReconcileError> {
        let records = self.records;
        let mut warnings = Vec::new();

        if records.deposit_count() > 0 && records.sales.is_empty() {
            warnings.push(ReconcileError::MissingData(format!(
                "{} deposits but no sale invoices",
                records.deposit_count()
            )));
        }
        if records.withdrawal_count() > 0 && records.purchases.is_empty() {
            warnings.push(ReconcileError::MissingData(format!(
                "{} withdrawals but no purchase invoices",
                records.withdrawal_count()
            )));
        }
        let invoices = records.sales.len() + records.purchases.len();
        if invoices > 0 && records.statement_lines.is_empty() {
            warnings.push(ReconcileError::MissingData(format!(
                "{} invoices but no statement lines",
                invoices
            )));
        }

        warnings
    }

    fn match_line(&mut self, line: &StatementLine) -> ReconcileResult<MatchResult> {
        let (Some(date), Some(amount), Some(direction)) =
            (line.date(), &line.amount, line.direction)
        else {
            return Err(ReconcileError::MatchAttempt {
                line_id: line.id.clone(),
                reason: "missing date, amount or direction".to_string(),
            });
        };
        let amount = amount.abs();

        let result = match direction {
            Direction::Deposit => self.match_deposit(line, date, &amount),
            Direction::Withdrawal => self.match_withdrawal(line, date, &amount),
        };

        if result.is_matched() {
            self.settlement
                .commit(&result)
                .map_err(|e| ReconcileError::MatchAttempt {
                    line_id: line.id.clone(),
                    reason: e.to_string(),
                })?;
            tracing::debug!(
                line_id = %line.id,
                match_type = %result.match_type,
                difference = %result.difference,
                "Matched statement line"
            );
        }

        Ok(result)
    }

    fn match_deposit(
        &self,
        line: &StatementLine,
        date: NaiveDate,
        amount: &BigDecimal,
    ) -> MatchResult {
        let locator = CandidateLocator::new(self.records, &self.config);
        let tolerance = self.config.sale_tolerance();
        let builder = MatchResultBuilder::new(line.id.clone(), line.direction, amount.clone());

        let candidates = locator.find_sale_candidates(&self.settlement, date, amount);
        tracing::debug!(line_id = %line.id, candidates = candidates.len(), "Sale candidates");

        let single = candidates.iter().find(|sale| {
            sale.net_amount
                .as_ref()
                .is_some_and(|net| within_tolerance(net, amount, tolerance))
        });
        if let Some(sale) = single {
            return match locator.find_confirming_withholding(&self.settlement, date, sale) {
                Some(withholding) => builder
                    .sale(sale)
                    .confirmation(withholding)
                    .match_type(MatchType::WithholdingConfirmed)
                    .build(),
                None => builder.sale(sale).match_type(MatchType::SaleSingle).build(),
            };
        }

        // Nameless invoices have no known counterparty to combine with
        let mut by_company: IndexMap<&str, Vec<&SaleInvoice>> = IndexMap::new();
        for sale in &candidates {
            let company = sale.company_name.trim();
            if company.is_empty() {
                continue;
            }
            by_company.entry(company).or_default().push(*sale);
        }
        for company_sales in by_company.values() {
            if let Some(combination) = find_sale_combination(company_sales, amount, tolerance) {
                return combination
                    .into_iter()
                    .fold(builder, |builder, sale| builder.sale(sale))
                    .match_type(MatchType::SaleCombination)
                    .build();
            }
        }

        let withholdings = locator.find_withholding_candidates(&self.settlement, date, amount);
        if let Some(withholding) = withholdings.first() {
            return builder
                .withholding(withholding)
                .match_type(MatchType::WithholdingFallback)
                .build();
        }

        builder.build()
    }

    fn match_withdrawal(
        &self,
        line: &StatementLine,
        date: NaiveDate,
        amount: &BigDecimal,
    ) -> MatchResult {
        let locator = CandidateLocator::new(self.records, &self.config);
        let builder = MatchResultBuilder::new(line.id.clone(), line.direction, amount.clone());

        let candidates = locator.find_purchase_candidates(&self.settlement, date, amount);
        tracing::debug!(line_id = %line.id, candidates = candidates.len(), "Purchase candidates");

        match candidates.first() {
            Some(purchase) => builder
                .purchase(purchase)
                .match_type(MatchType::PurchaseSingle)
                .build(),
            None => builder.build(),
        }
    }
}

/// Per-line results collected while a run progresses
#[derive(Debug, Default)]
struct LineOutcomes {
    results: Vec<MatchResult>,
    failures: Vec<LineFailure>,
    skipped: Vec<String>,
}

impl LineOutcomes {
    fn with_capacity(lines: usize) -> Self {
        Self {
            results: Vec::with_capacity(lines),
            ..Default::default()
        }
    }

    fn skip(&mut self, line: &StatementLine) {
        self.skipped.push(line.id.clone());
        self.results.push(unmatched(line));
    }

    /// A failed line is reported with a generic note and left unmatched
    fn record(&mut self, line: &StatementLine, outcome: ReconcileResult<MatchResult>) {
        match outcome {
            Ok(result) => self.results.push(result),
            Err(e) => {
                tracing::error!(line_id = %line.id, "Statement line failed: {}", e);
                self.failures.push(LineFailure::new(line.id.clone()));
                self.results.push(unmatched(line));
            }
        }
    }
}

fn unmatched(line: &StatementLine) -> MatchResult {
    let amount = line
        .amount
        .as_ref()
        .map(|amount| amount.abs())
        .unwrap_or_else(BigDecimal::zero);
    MatchResultBuilder::new(line.id.clone(), line.direction, amount).build()
}
