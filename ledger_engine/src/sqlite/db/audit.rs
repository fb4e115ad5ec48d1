use chrono::{DateTime, Utc};
use sqlx::{types::Json, SqliteConnection};

use crate::db_types::{AuditLogEntry, NewAuditEntry};

/// Appends an entry to the audit log. The table rejects updates and deletes, so this is the only write path.
pub async fn insert_entry(entry: NewAuditEntry, conn: &mut SqliteConnection) -> Result<AuditLogEntry, sqlx::Error> {
    let entry = sqlx::query_as(
        r#"
            INSERT INTO audit_log (
                action,
                resource_type,
                resource_id,
                success,
                severity,
                risk_score,
                amount,
                before_state,
                after_state,
                ip_address,
                user_agent,
                error_message,
                flagged_for_review,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
        "#,
    )
    .bind(entry.action.as_str())
    .bind(entry.resource_type)
    .bind(entry.resource_id)
    .bind(entry.success)
    .bind(entry.severity.to_string())
    .bind(entry.risk_score)
    .bind(entry.amount)
    .bind(entry.before_state.map(Json))
    .bind(entry.after_state.map(Json))
    .bind(entry.ip_address)
    .bind(entry.user_agent)
    .bind(entry.error_message)
    .bind(entry.flagged_for_review)
    .bind(entry.created_at)
    .fetch_one(conn)
    .await?;
    Ok(entry)
}

pub async fn count_failures_since(
    ip_address: &str,
    since: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM audit_log WHERE ip_address = $1 AND success = 0 AND created_at >= $2")
            .bind(ip_address)
            .bind(since)
            .fetch_one(conn)
            .await?;
    Ok(count)
}

pub async fn fetch_flagged(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<AuditLogEntry>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM audit_log WHERE flagged_for_review = 1 ORDER BY id DESC LIMIT $1")
        .bind(limit)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}

pub async fn fetch_for_resource(
    resource_type: &str,
    resource_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<AuditLogEntry>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM audit_log WHERE resource_type = $1 AND resource_id = $2 ORDER BY id")
        .bind(resource_type)
        .bind(resource_id)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}

pub async fn fetch_recent(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<AuditLogEntry>, sqlx::Error> {
    let entries =
        sqlx::query_as("SELECT * FROM audit_log ORDER BY id DESC LIMIT $1").bind(limit).fetch_all(conn).await?;
    Ok(entries)
}
