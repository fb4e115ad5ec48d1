use chrono::{DateTime, Utc};
use ledger_common::Amount;
use log::trace;
use sqlx::SqliteConnection;

use crate::{db_types::Wallet, traits::LedgerError};

pub async fn fetch_wallet_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Wallet>, sqlx::Error> {
    let wallet = sqlx::query_as("SELECT * FROM wallets WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(wallet)
}

pub async fn fetch_wallet_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<Wallet>, sqlx::Error> {
    let wallet =
        sqlx::query_as("SELECT * FROM wallets WHERE user_id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(wallet)
}

/// Returns the wallet for `user_id`, creating an empty one first if necessary.
///
/// The insert is attempted before the read, so that inside a transaction the write lock is taken up front.
pub async fn fetch_or_create_wallet(user_id: &str, conn: &mut SqliteConnection) -> Result<Wallet, LedgerError> {
    let now = Utc::now();
    let inserted = sqlx::query(
        r#"
            INSERT INTO wallets (user_id, created_at, updated_at) VALUES ($1, $2, $2)
            ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    if inserted > 0 {
        trace!("🗃️ Created a new wallet for user {user_id}");
    }
    let wallet = fetch_wallet_for_user(user_id, conn)
        .await?
        .ok_or_else(|| LedgerError::DatabaseError(format!("Wallet for {user_id} vanished after creation")))?;
    Ok(wallet)
}

/// Adds `amount` to the wallet balance and its running deposit total. This is not atomic on its own; call it inside
/// the transaction that performs the matching status change.
pub async fn credit_wallet(
    wallet_id: i64,
    amount: Amount,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Wallet, LedgerError> {
    let wallet: Option<Wallet> = sqlx::query_as(
        r#"
            UPDATE wallets SET
                balance = balance + $1,
                total_deposited = total_deposited + $1,
                updated_at = $2
            WHERE id = $3
            RETURNING *
        "#,
    )
    .bind(amount)
    .bind(at)
    .bind(wallet_id)
    .fetch_optional(conn)
    .await?;
    wallet.ok_or(LedgerError::WalletNotFound(wallet_id))
}
