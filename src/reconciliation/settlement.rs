//! Settlement bookkeeping shared across one reconciliation run

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::records::RecordSet;
use crate::traits::SettlementRecord;
use crate::types::*;

/// Ids of every record settled so far, per record kind
///
/// Settlement only ever grows: an id is added once and never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementState {
    sales: BTreeSet<String>,
    purchases: BTreeSet<String>,
    withholdings: BTreeSet<String>,
}

impl SettlementState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the state with every record that arrived already settled
    pub fn from_records(records: &RecordSet) -> Self {
        let mut state = Self::new();
        state.seed(&records.sales);
        state.seed(&records.purchases);
        state.seed(&records.withholdings);
        state
    }

    fn seed<R: SettlementRecord>(&mut self, records: &[R]) {
        let ids = self.ids_mut(R::KIND);
        ids.extend(
            records
                .iter()
                .filter(|record| record.is_settled())
                .map(|record| record.record_id().to_string()),
        );
    }

    pub fn is_settled(&self, kind: RecordKind, id: &str) -> bool {
        self.ids(kind).contains(id)
    }

    pub fn ids(&self, kind: RecordKind) -> &BTreeSet<String> {
        match kind {
            RecordKind::Sale => &self.sales,
            RecordKind::Purchase => &self.purchases,
            RecordKind::Withholding => &self.withholdings,
        }
    }

    fn ids_mut(&mut self, kind: RecordKind) -> &mut BTreeSet<String> {
        match kind {
            RecordKind::Sale => &mut self.sales,
            RecordKind::Purchase => &mut self.purchases,
            RecordKind::Withholding => &mut self.withholdings,
        }
    }

    pub fn count(&self, kind: RecordKind) -> usize {
        self.ids(kind).len()
    }

    /// Settle every record referenced by a result
    ///
    /// Either all referenced ids are settled or, if any of them already is
    /// (or appears twice), none are and the state is left untouched.
    pub fn commit(&mut self, result: &MatchResult) -> ReconcileResult<()> {
        let mut pending: BTreeSet<(RecordKind, &str)> = BTreeSet::new();
        for (kind, id) in result.referenced_ids() {
            if self.is_settled(kind, id) || !pending.insert((kind, id)) {
                return Err(ReconcileError::AlreadySettled {
                    kind,
                    id: id.to_string(),
                });
            }
        }

        for (kind, id) in pending {
            self.ids_mut(kind).insert(id.to_string());
        }
        Ok(())
    }
}
