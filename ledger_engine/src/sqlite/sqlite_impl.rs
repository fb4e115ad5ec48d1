//! `SqliteDatabase` is a concrete implementation of a ledger engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
//!
//! SQLite allows a single writer at a time. Every write transaction here issues its write statement first, so the
//! write lock is acquired at the start of the transaction rather than upgraded from a read lock part-way through.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{migrate, SqlitePool};

use super::db::{audit, commissions, db_url, new_pool, transactions, wallets};
use crate::{
    db_types::{
        AuditLogEntry,
        CommissionBreakdown,
        CommissionCycle,
        CommissionRule,
        CycleStatus,
        CycleType,
        ExchangeRate,
        NewAuditEntry,
        NewCommissionCycle,
        NewCommissionRule,
        NewPendingTransaction,
        PendingTransaction,
        PeriodEarning,
        SalesRepAssignment,
        TransactionStatus,
        TransitionOutcome,
        VolumeDelta,
        Wallet,
    },
    traits::{AuditError, AuditStore, CommissionError, CommissionManagement, LedgerDatabase, LedgerError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using `LPG_DATABASE_URL` (or the default) as the database location.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        debug!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Explains why a guarded transition did not apply.
    async fn no_op(&self, id: i64, target: TransactionStatus) -> Result<TransitionOutcome, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let transaction =
            transactions::fetch_transaction(id, &mut conn).await?.ok_or(LedgerError::TransactionIdNotFound(id))?;
        let reason = if transaction.status == target {
            format!("Transaction is already {target}")
        } else {
            format!("Transaction is already in terminal state {}", transaction.status)
        };
        debug!("🗃️ Transition of {} to {target} skipped. {reason}", transaction.external_id);
        Ok(TransitionOutcome::NoOp { transaction, reason })
    }
}

impl LedgerDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_pending_transaction(&self, tx: NewPendingTransaction) -> Result<PendingTransaction, LedgerError> {
        let mut db_tx = self.pool.begin().await?;
        let wallet = wallets::fetch_or_create_wallet(&tx.user_id, &mut db_tx).await?;
        let transaction = transactions::insert_transaction(tx, wallet.id, &mut db_tx).await?;
        db_tx.commit().await?;
        debug!(
            "🗃️ Pending transaction {} saved with id {} for wallet #{}",
            transaction.external_id, transaction.id, wallet.id
        );
        Ok(transaction)
    }

    async fn fetch_transactions_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Vec<PendingTransaction>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let result = transactions::fetch_by_external_id(external_id, &mut conn).await?;
        Ok(result)
    }

    async fn fetch_transaction(&self, id: i64) -> Result<Option<PendingTransaction>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let result = transactions::fetch_transaction(id, &mut conn).await?;
        Ok(result)
    }

    async fn fetch_wallet(&self, wallet_id: i64) -> Result<Option<Wallet>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let wallet = wallets::fetch_wallet_by_id(wallet_id, &mut conn).await?;
        Ok(wallet)
    }

    async fn fetch_wallet_for_user(&self, user_id: &str) -> Result<Option<Wallet>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let wallet = wallets::fetch_wallet_for_user(user_id, &mut conn).await?;
        Ok(wallet)
    }

    async fn fetch_or_create_wallet(&self, user_id: &str) -> Result<Wallet, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        wallets::fetch_or_create_wallet(user_id, &mut conn).await
    }

    /// Takes a transaction id, and in a single atomic transaction,
    /// * applies the guarded update to `Completed`. If the transaction is already terminal, nothing further is done.
    /// * credits `expected_amount` to the owning wallet.
    async fn complete_and_credit(
        &self,
        id: i64,
        exchange_rate: Option<ExchangeRate>,
    ) -> Result<TransitionOutcome, LedgerError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let Some(transaction) = transactions::mark_completed(id, exchange_rate, now, &mut tx).await? else {
            tx.rollback().await?;
            return self.no_op(id, TransactionStatus::Completed).await;
        };
        let wallet = wallets::credit_wallet(transaction.wallet_id, transaction.expected_amount, now, &mut tx).await?;
        tx.commit().await?;
        info!(
            "🗃️ Transaction {} completed. {} credited to wallet #{} (balance {})",
            transaction.external_id, transaction.expected_amount, wallet.id, wallet.balance
        );
        Ok(TransitionOutcome::Applied { transaction })
    }

    async fn transition_status(
        &self,
        id: i64,
        new_status: TransactionStatus,
    ) -> Result<TransitionOutcome, LedgerError> {
        match new_status {
            TransactionStatus::Completed => {
                return Err(LedgerError::InvalidTransition(
                    "Completion must credit the wallet. Use complete_and_credit".into(),
                ))
            },
            TransactionStatus::Pending => {
                return Err(LedgerError::InvalidTransition("A transaction cannot move back to Pending".into()))
            },
            _ => {},
        }
        let mut conn = self.pool.acquire().await?;
        match transactions::update_status(id, new_status, Utc::now(), &mut conn).await? {
            Some(transaction) => Ok(TransitionOutcome::Applied { transaction }),
            None => {
                drop(conn);
                self.no_op(id, new_status).await
            },
        }
    }

    async fn fetch_stale_transactions(
        &self,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<PendingTransaction>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let result = transactions::fetch_stale(created_before, &mut conn).await?;
        Ok(result)
    }

    async fn close(&mut self) -> Result<(), LedgerError> {
        self.pool.close().await;
        Ok(())
    }
}

impl CommissionManagement for SqliteDatabase {
    async fn fetch_active_assignment(&self, seller_id: &str) -> Result<Option<SalesRepAssignment>, CommissionError> {
        let mut conn = self.pool.acquire().await?;
        let assignment = commissions::fetch_active_assignment(seller_id, &mut conn).await?;
        Ok(assignment)
    }

    async fn assign_sales_rep(
        &self,
        sales_rep_id: &str,
        seller_id: &str,
    ) -> Result<SalesRepAssignment, CommissionError> {
        let mut tx = self.pool.begin().await?;
        let assignment = commissions::replace_assignment(sales_rep_id, seller_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Seller {seller_id} is now assigned to sales rep {sales_rep_id}");
        Ok(assignment)
    }

    async fn insert_commission_rule(&self, rule: NewCommissionRule) -> Result<CommissionRule, CommissionError> {
        let mut tx = self.pool.begin().await?;
        let rule = commissions::replace_rule(rule, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Commission rule #{} set: {} at {}% for {}",
            rule.id,
            rule.transaction_type,
            rule.percentage,
            rule.sales_rep_id.as_deref().unwrap_or("all reps")
        );
        Ok(rule)
    }

    async fn fetch_active_rules(&self) -> Result<Vec<CommissionRule>, CommissionError> {
        let mut conn = self.pool.acquire().await?;
        let rules = commissions::fetch_active_rules(&mut conn).await?;
        Ok(rules)
    }

    async fn insert_cycle(&self, cycle: NewCommissionCycle) -> Result<CommissionCycle, CommissionError> {
        let mut conn = self.pool.acquire().await?;
        commissions::insert_cycle(cycle, &mut conn).await
    }

    async fn fetch_cycle(&self, cycle_id: i64) -> Result<Option<CommissionCycle>, CommissionError> {
        let mut conn = self.pool.acquire().await?;
        let cycle = commissions::fetch_cycle(cycle_id, &mut conn).await?;
        Ok(cycle)
    }

    async fn fetch_cycles(&self, cycle_type: Option<CycleType>) -> Result<Vec<CommissionCycle>, CommissionError> {
        let mut conn = self.pool.acquire().await?;
        let cycles = commissions::fetch_cycles(cycle_type, &mut conn).await?;
        Ok(cycles)
    }

    async fn fetch_active_cycles_at(&self, at: DateTime<Utc>) -> Result<Vec<CommissionCycle>, CommissionError> {
        let mut conn = self.pool.acquire().await?;
        let cycles = commissions::fetch_active_cycles_at(at, &mut conn).await?;
        Ok(cycles)
    }

    async fn increment_period_volume(
        &self,
        cycle_id: i64,
        sales_rep_id: &str,
        seller_id: &str,
        delta: VolumeDelta,
    ) -> Result<PeriodEarning, CommissionError> {
        let mut conn = self.pool.acquire().await?;
        let earning = commissions::increment_volume(cycle_id, sales_rep_id, seller_id, delta, &mut conn).await?;
        Ok(earning)
    }

    async fn begin_cycle_calculation(&self, cycle_id: i64) -> Result<CommissionCycle, CommissionError> {
        let mut conn = self.pool.acquire().await?;
        let from = [CycleStatus::Active, CycleStatus::Processing];
        match commissions::update_cycle_status(cycle_id, &from, CycleStatus::Processing, &mut conn).await? {
            Some(cycle) => Ok(cycle),
            None => {
                let cycle =
                    commissions::fetch_cycle(cycle_id, &mut conn).await?.ok_or(CommissionError::CycleNotFound(cycle_id))?;
                Err(CommissionError::InvalidCycleState {
                    id: cycle_id,
                    expected: CycleStatus::Active,
                    actual: cycle.status,
                })
            },
        }
    }

    async fn fetch_earnings_for_cycle(&self, cycle_id: i64) -> Result<Vec<PeriodEarning>, CommissionError> {
        let mut conn = self.pool.acquire().await?;
        let earnings = commissions::fetch_earnings_for_cycle(cycle_id, &mut conn).await?;
        Ok(earnings)
    }

    async fn fetch_earning(&self, earning_id: i64) -> Result<Option<PeriodEarning>, CommissionError> {
        let mut conn = self.pool.acquire().await?;
        let earning = commissions::fetch_earning(earning_id, &mut conn).await?;
        Ok(earning)
    }

    async fn write_commissions(
        &self,
        cycle_id: i64,
        breakdowns: Vec<(i64, CommissionBreakdown)>,
    ) -> Result<Vec<PeriodEarning>, CommissionError> {
        let mut tx = self.pool.begin().await?;
        let mut result = Vec::with_capacity(breakdowns.len());
        for (earning_id, breakdown) in breakdowns {
            match commissions::write_commission(cycle_id, earning_id, &breakdown, &mut tx).await? {
                Some(earning) => result.push(earning),
                None => {
                    tx.rollback().await?;
                    return Err(CommissionError::CalculationError(format!(
                        "Earning #{earning_id} could not be updated. Either it does not belong to cycle #{cycle_id}, \
                         or the cycle is no longer Processing"
                    )));
                },
            }
        }
        tx.commit().await?;
        Ok(result)
    }

    async fn complete_cycle(&self, cycle_id: i64) -> Result<CommissionCycle, CommissionError> {
        let mut conn = self.pool.acquire().await?;
        let from = [CycleStatus::Processing];
        match commissions::update_cycle_status(cycle_id, &from, CycleStatus::Completed, &mut conn).await? {
            Some(cycle) => Ok(cycle),
            None => {
                let cycle =
                    commissions::fetch_cycle(cycle_id, &mut conn).await?.ok_or(CommissionError::CycleNotFound(cycle_id))?;
                Err(CommissionError::InvalidCycleState {
                    id: cycle_id,
                    expected: CycleStatus::Processing,
                    actual: cycle.status,
                })
            },
        }
    }

    async fn mark_earning_paid(&self, earning_id: i64) -> Result<PeriodEarning, CommissionError> {
        let mut conn = self.pool.acquire().await?;
        if let Some(earning) = commissions::mark_paid(earning_id, &mut conn).await? {
            return Ok(earning);
        }
        let earning =
            commissions::fetch_earning(earning_id, &mut conn).await?.ok_or(CommissionError::EarningNotFound(earning_id))?;
        let reason = if earning.is_paid {
            "It has already been paid".to_string()
        } else {
            format!("Cycle #{} has not been completed", earning.cycle_id)
        };
        Err(CommissionError::EarningNotPayable(earning_id, reason))
    }
}

impl AuditStore for SqliteDatabase {
    async fn insert_audit_entry(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, AuditError> {
        let mut conn = self.pool.acquire().await?;
        let entry = audit::insert_entry(entry, &mut conn).await?;
        Ok(entry)
    }

    async fn count_recent_failures(&self, ip_address: &str, since: DateTime<Utc>) -> Result<i64, AuditError> {
        let mut conn = self.pool.acquire().await?;
        let count = audit::count_failures_since(ip_address, since, &mut conn).await?;
        Ok(count)
    }

    async fn fetch_flagged_entries(&self, limit: i64) -> Result<Vec<AuditLogEntry>, AuditError> {
        let mut conn = self.pool.acquire().await?;
        let entries = audit::fetch_flagged(limit, &mut conn).await?;
        Ok(entries)
    }

    async fn fetch_entries_for_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Vec<AuditLogEntry>, AuditError> {
        let mut conn = self.pool.acquire().await?;
        let entries = audit::fetch_for_resource(resource_type, resource_id, &mut conn).await?;
        Ok(entries)
    }

    async fn fetch_recent_entries(&self, limit: i64) -> Result<Vec<AuditLogEntry>, AuditError> {
        let mut conn = self.pool.acquire().await?;
        let entries = audit::fetch_recent(limit, &mut conn).await?;
        Ok(entries)
    }
}
