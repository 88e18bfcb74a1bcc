use std::sync::{Arc, Mutex};

use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::audit::{AuditEntry, AuditError, AuditFilter};
use crate::domain::ports::AuditStore;
use crate::schema::audit_logs;

use super::models::{AuditLogRow, NewAuditLogRow};

pub struct DieselAuditStore {
    pool: DbPool,
}

impl DieselAuditStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl AuditStore for DieselAuditStore {
    fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| AuditError::WriteFailed(e.to_string()))?;
        diesel::insert_into(audit_logs::table)
            .values(&NewAuditLogRow::from(entry))
            .execute(&mut conn)
            .map_err(|e| AuditError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| AuditError::QueryFailed(e.to_string()))?;

        let mut query = audit_logs::table
            .select(AuditLogRow::as_select())
            .into_boxed();
        if let Some(user_id) = filter.user_id {
            query = query.filter(audit_logs::user_id.eq(user_id));
        }
        if let Some(action) = &filter.action {
            query = query.filter(audit_logs::action.eq(action.clone()));
        }

        let rows = query
            .order((audit_logs::timestamp.desc(), audit_logs::id.desc()))
            .limit(filter.limit)
            .offset(filter.offset)
            .load(&mut conn)
            .map_err(|e| AuditError::QueryFailed(e.to_string()))?;
        Ok(rows.into_iter().map(AuditEntry::from).collect())
    }
}

/// Keeps entries in memory, newest last. Can be told to fail every write.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditStore {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
    failing: Arc<Mutex<bool>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().expect("audit store lock poisoned") = failing;
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().expect("audit store lock poisoned").clone()
    }
}

impl AuditStore for InMemoryAuditStore {
    fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let failing = *self
            .failing
            .lock()
            .map_err(|e| AuditError::WriteFailed(e.to_string()))?;
        if failing {
            return Err(AuditError::WriteFailed("audit sink unavailable".to_string()));
        }
        self.entries
            .lock()
            .map_err(|e| AuditError::WriteFailed(e.to_string()))?
            .push(entry.clone());
        Ok(())
    }

    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| AuditError::QueryFailed(e.to_string()))?;
        Ok(entries
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
