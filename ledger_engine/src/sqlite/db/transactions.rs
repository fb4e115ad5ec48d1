use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{ExchangeRate, NewPendingTransaction, PendingTransaction, TransactionStatus},
    traits::LedgerError,
};

/// Inserts a new pending transaction for the given wallet. Fails with [`LedgerError::DuplicateTransaction`] if the
/// external id is already known.
pub async fn insert_transaction(
    tx: NewPendingTransaction,
    wallet_id: i64,
    conn: &mut SqliteConnection,
) -> Result<PendingTransaction, LedgerError> {
    let external_id = tx.external_id.clone();
    let result: Result<PendingTransaction, sqlx::Error> = sqlx::query_as(
        r#"
            INSERT INTO pending_transactions (
                external_id,
                wallet_id,
                transaction_type,
                expected_amount,
                expected_fiat_amount,
                status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, 'Pending', $6, $6)
            RETURNING *;
        "#,
    )
    .bind(tx.external_id)
    .bind(wallet_id)
    .bind(tx.transaction_type.to_string())
    .bind(tx.expected_amount)
    .bind(tx.expected_fiat_amount)
    .bind(tx.created_at)
    .fetch_one(conn)
    .await;
    match result {
        Ok(tx) => Ok(tx),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(LedgerError::DuplicateTransaction(external_id)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_transaction(id: i64, conn: &mut SqliteConnection) -> Result<Option<PendingTransaction>, sqlx::Error> {
    let tx = sqlx::query_as("SELECT * FROM pending_transactions WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(tx)
}

/// Returns every transaction with the given external id, most recently created first.
pub async fn fetch_by_external_id(
    external_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<PendingTransaction>, sqlx::Error> {
    let txs = sqlx::query_as(
        "SELECT * FROM pending_transactions WHERE external_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(external_id)
    .fetch_all(conn)
    .await?;
    Ok(txs)
}

/// The guarded completion update. The row is only touched if it is not already terminal.
///
/// Returns `None` if the guard rejected the update (or the row does not exist).
pub async fn mark_completed(
    id: i64,
    exchange_rate: Option<ExchangeRate>,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<PendingTransaction>, sqlx::Error> {
    let tx: Option<PendingTransaction> = sqlx::query_as(
        r#"
            UPDATE pending_transactions SET
                previous_status = status,
                status = 'Completed',
                exchange_rate = $1,
                processed_at = $2,
                updated_at = $2
            WHERE id = $3 AND status NOT IN ('Completed', 'Failed', 'Expired', 'Cancelled')
            RETURNING *
        "#,
    )
    .bind(exchange_rate)
    .bind(at)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    trace!("🗃️ Guarded completion for transaction #{id} applied: {}", tx.is_some());
    Ok(tx)
}

/// The guarded status update for every non-crediting transition. The row is only touched if it is not terminal and
/// not already in `new_status`. Terminal transitions record `processed_at`.
pub async fn update_status(
    id: i64,
    new_status: TransactionStatus,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<PendingTransaction>, sqlx::Error> {
    let processed_at = new_status.is_terminal().then_some(at);
    let tx: Option<PendingTransaction> = sqlx::query_as(
        r#"
            UPDATE pending_transactions SET
                previous_status = status,
                status = $1,
                processed_at = COALESCE($2, processed_at),
                updated_at = $3
            WHERE id = $4 AND status NOT IN ('Completed', 'Failed', 'Expired', 'Cancelled') AND status != $1
            RETURNING *
        "#,
    )
    .bind(new_status.to_string())
    .bind(processed_at)
    .bind(at)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    if let Some(tx) = &tx {
        debug!("🗃️ Transaction {} moved to {new_status}", tx.external_id);
    }
    Ok(tx)
}

/// Fetches `Pending` and `Processing` transactions created before the given time, oldest first.
pub async fn fetch_stale(
    created_before: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<PendingTransaction>, sqlx::Error> {
    let txs = sqlx::query_as(
        r#"
            SELECT * FROM pending_transactions
            WHERE status IN ('Pending', 'Processing') AND created_at < $1
            ORDER BY created_at ASC
        "#,
    )
    .bind(created_before)
    .fetch_all(conn)
    .await?;
    Ok(txs)
}
