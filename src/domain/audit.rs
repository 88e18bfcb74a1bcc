use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Audit write failed: {0}")]
    WriteFailed(String),
    #[error("Audit query failed: {0}")]
    QueryFailed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub user_id: Option<i32>,
    pub action: String,
    pub table_name: String,
    pub record_id: Option<i32>,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AuditFilter {
    pub user_id: Option<i32>,
    pub action: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for AuditFilter {
    fn default() -> Self {
        Self {
            user_id: None,
            action: None,
            limit: 100,
            offset: 0,
        }
    }
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.user_id.map_or(true, |id| entry.user_id == Some(id))
            && self
                .action
                .as_deref()
                .map_or(true, |action| entry.action == action)
    }
}
