// 🗂️ Validation Session - owns the audit log and ledger of one batch
//
// Every write goes through one lock and covers a whole entry or a whole
// report, so concurrent validations never interleave partial writes.

use crate::audit::{AuditEntry, AuditLog};
use crate::ledger::Ledger;
use crate::report::ValidationReport;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

#[derive(Debug, Default)]
struct SessionState {
    audit: AuditLog,
    ledger: Ledger,
}

#[derive(Debug)]
pub struct ValidationSession {
    id: String,
    next_validation_id: AtomicU64,
    state: Mutex<SessionState>,
}

impl ValidationSession {
    pub fn new() -> Self {
        ValidationSession {
            id: Uuid::new_v4().to_string(),
            next_validation_id: AtomicU64::new(1),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Reserve the id for a new validation call (1, 2, 3, ...)
    pub fn next_validation_id(&self) -> u64 {
        self.next_validation_id.fetch_add(1, Ordering::SeqCst)
    }

    // Both structures are append-only, so a poisoned lock still guards
    // consistent data.
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append_audit(&self, entry: AuditEntry) {
        self.state().audit.append(entry);
    }

    /// Place a finished report in the ledger; false if it was already there
    pub fn commit(&self, report: ValidationReport) -> bool {
        self.state().ledger.record(report)
    }

    /// Snapshot of the audit log
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.state().audit.entries().to_vec()
    }

    /// Read the ledger under the lock
    pub fn with_ledger<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        f(&self.state().ledger)
    }

    pub fn exportable(&self) -> Vec<ValidationReport> {
        self.with_ledger(|ledger| ledger.exportable().into_iter().cloned().collect())
    }

    pub fn rejected(&self) -> Vec<ValidationReport> {
        self.with_ledger(|ledger| ledger.rejected().to_vec())
    }

    /// Close the session and take its audit log and ledger
    pub fn into_parts(self) -> (AuditLog, Ledger) {
        let state = self
            .state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        (state.audit, state.ledger)
    }
}

impl Default for ValidationSession {
    fn default() -> Self {
        Self::new()
    }
}
