//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

use crate::report::ReconciliationReport;
use crate::traits::*;
use crate::types::*;

/// In-memory report storage for testing and development
#[derive(Debug, Clone)]
pub struct MemoryReportStorage {
    reports: Arc<RwLock<HashMap<Uuid, ReconciliationReport>>>,
}

impl MemoryReportStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self {
            reports: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> ReconcileResult<()> {
        self.reports.write().map_err(poisoned)?.clear();
        Ok(())
    }

    pub fn len(&self) -> ReconcileResult<usize> {
        Ok(self.reports.read().map_err(poisoned)?.len())
    }

    pub fn is_empty(&self) -> ReconcileResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl Default for MemoryReportStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: PoisonError<T>) -> ReconcileError {
    ReconcileError::Storage("report store lock poisoned".to_string())
}

#[async_trait]
impl ReportStorage for MemoryReportStorage {
    async fn save_report(&mut self, report: &ReconciliationReport) -> ReconcileResult<()> {
        self.reports
            .write()
            .map_err(poisoned)?
            .insert(report.run_id, report.clone());
        Ok(())
    }

    async fn get_report(&self, run_id: Uuid) -> ReconcileResult<Option<ReconciliationReport>> {
        Ok(self.reports.read().map_err(poisoned)?.get(&run_id).cloned())
    }

    async fn list_reports(&self) -> ReconcileResult<Vec<ReconciliationReport>> {
        let reports = self.reports.read().map_err(poisoned)?;
        let mut listed: Vec<ReconciliationReport> = reports.values().cloned().collect();
        listed.sort_by(|a, b| a.as_of.cmp(&b.as_of).then_with(|| a.run_id.cmp(&b.run_id)));
        Ok(listed)
    }

    async fn delete_report(&mut self, run_id: Uuid) -> ReconcileResult<()> {
        if self
            .reports
            .write()
            .map_err(poisoned)?
            .remove(&run_id)
            .is_some()
        {
            Ok(())
        } else {
            Err(ReconcileError::ReportNotFound(run_id.to_string()))
        }
    }
}
