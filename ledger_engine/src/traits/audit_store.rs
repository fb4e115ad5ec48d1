use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{AuditLogEntry, NewAuditEntry};

/// An append-only store of audit facts. Entries are never updated or deleted once written.
#[allow(async_fn_in_trait)]
pub trait AuditStore: Clone {
    async fn insert_audit_entry(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, AuditError>;

    /// Counts failed entries from `ip_address` recorded at or after `since`.
    async fn count_recent_failures(&self, ip_address: &str, since: DateTime<Utc>) -> Result<i64, AuditError>;

    /// The most recent entries flagged for review, newest first.
    async fn fetch_flagged_entries(&self, limit: i64) -> Result<Vec<AuditLogEntry>, AuditError>;

    /// Every entry for the given resource, oldest first.
    async fn fetch_entries_for_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Vec<AuditLogEntry>, AuditError>;

    /// The most recent entries, newest first.
    async fn fetch_recent_entries(&self, limit: i64) -> Result<Vec<AuditLogEntry>, AuditError>;
}

#[derive(Debug, Clone, Error)]
pub enum AuditError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for AuditError {
    fn from(e: sqlx::Error) -> Self {
        AuditError::DatabaseError(e.to_string())
    }
}
