use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{
    ExchangeRate,
    NewPendingTransaction,
    PendingTransaction,
    TransactionStatus,
    TransitionOutcome,
    Wallet,
};

/// The primary ledger behaviour: pending transactions, wallets and the state machine that links them.
///
/// Every method that changes a transaction's status is *guarded*: the "not already terminal" check happens in the same
/// atomic statement as the update, so concurrent or repeated deliveries of the same event can never apply two
/// terminal transitions, nor credit a wallet twice.
#[allow(async_fn_in_trait)]
pub trait LedgerDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new pending transaction in `Pending` status, creating the owner's wallet if necessary.
    ///
    /// Returns [`LedgerError::DuplicateTransaction`] if a transaction with the same external id already exists.
    async fn insert_pending_transaction(&self, tx: NewPendingTransaction) -> Result<PendingTransaction, LedgerError>;

    /// Fetches every pending transaction with the given external id, most recently created first.
    async fn fetch_transactions_by_external_id(&self, external_id: &str)
        -> Result<Vec<PendingTransaction>, LedgerError>;

    async fn fetch_transaction(&self, id: i64) -> Result<Option<PendingTransaction>, LedgerError>;

    async fn fetch_wallet(&self, wallet_id: i64) -> Result<Option<Wallet>, LedgerError>;

    async fn fetch_wallet_for_user(&self, user_id: &str) -> Result<Option<Wallet>, LedgerError>;

    /// Fetches the wallet for `user_id`, creating an empty one if it does not exist yet.
    async fn fetch_or_create_wallet(&self, user_id: &str) -> Result<Wallet, LedgerError>;

    /// In a single atomic transaction:
    /// * moves the transaction to `Completed` if, and only if, it is not already terminal,
    /// * records `processed_at` and the effective exchange rate,
    /// * adds the transaction's `expected_amount` to the owning wallet's `balance` and `total_deposited`.
    ///
    /// If the transaction was already terminal, nothing is changed and [`TransitionOutcome::NoOp`] is returned.
    async fn complete_and_credit(
        &self,
        id: i64,
        exchange_rate: Option<ExchangeRate>,
    ) -> Result<TransitionOutcome, LedgerError>;

    /// Moves the transaction to `new_status` without touching any wallet. The update is skipped (returning
    /// [`TransitionOutcome::NoOp`]) if the transaction is terminal or already in `new_status`.
    ///
    /// `Completed` is rejected here; use [`LedgerDatabase::complete_and_credit`] instead. `Pending` is never a valid
    /// target.
    async fn transition_status(
        &self,
        id: i64,
        new_status: TransactionStatus,
    ) -> Result<TransitionOutcome, LedgerError>;

    /// Fetches `Pending` and `Processing` transactions created before `created_before`.
    async fn fetch_stale_transactions(
        &self,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<PendingTransaction>, LedgerError>;

    /// Closes the database connection pool.
    async fn close(&mut self) -> Result<(), LedgerError>;
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("A transaction with external id {0} already exists")]
    DuplicateTransaction(String),
    #[error("The requested transaction (internal id {0}) does not exist")]
    TransactionIdNotFound(i64),
    #[error("The requested transaction {0} does not exist")]
    TransactionNotFound(String),
    #[error("The wallet (internal id {0}) does not exist")]
    WalletNotFound(i64),
    #[error("Illegal status change. {0}")]
    InvalidTransition(String),
    #[error("Invalid amount. {0}")]
    InvalidAmount(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}
