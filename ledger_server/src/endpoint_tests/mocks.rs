use std::cell::RefCell;

use chrono::{DateTime, Utc};
use ledger_engine::{
    db_types::{
        AuditLogEntry,
        CommissionBreakdown,
        CommissionCycle,
        CommissionRule,
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
use mockall::mock;

mock! {
    pub Backend {}
    impl Clone for Backend {
        fn clone(&self) -> Self;
    }
    impl LedgerDatabase for Backend {
        fn url(&self) -> &str;
        async fn insert_pending_transaction(&self, tx: NewPendingTransaction) -> Result<PendingTransaction, LedgerError>;
        async fn fetch_transactions_by_external_id(&self, external_id: &str) -> Result<Vec<PendingTransaction>, LedgerError>;
        async fn fetch_transaction(&self, id: i64) -> Result<Option<PendingTransaction>, LedgerError>;
        async fn fetch_wallet(&self, wallet_id: i64) -> Result<Option<Wallet>, LedgerError>;
        async fn fetch_wallet_for_user(&self, user_id: &str) -> Result<Option<Wallet>, LedgerError>;
        async fn fetch_or_create_wallet(&self, user_id: &str) -> Result<Wallet, LedgerError>;
        async fn complete_and_credit(&self, id: i64, exchange_rate: Option<ExchangeRate>) -> Result<TransitionOutcome, LedgerError>;
        async fn transition_status(&self, id: i64, new_status: TransactionStatus) -> Result<TransitionOutcome, LedgerError>;
        async fn fetch_stale_transactions(&self, created_before: DateTime<Utc>) -> Result<Vec<PendingTransaction>, LedgerError>;
        async fn close(&mut self) -> Result<(), LedgerError>;
    }
    impl CommissionManagement for Backend {
        async fn fetch_active_assignment(&self, seller_id: &str) -> Result<Option<SalesRepAssignment>, CommissionError>;
        async fn assign_sales_rep(&self, sales_rep_id: &str, seller_id: &str) -> Result<SalesRepAssignment, CommissionError>;
        async fn insert_commission_rule(&self, rule: NewCommissionRule) -> Result<CommissionRule, CommissionError>;
        async fn fetch_active_rules(&self) -> Result<Vec<CommissionRule>, CommissionError>;
        async fn insert_cycle(&self, cycle: NewCommissionCycle) -> Result<CommissionCycle, CommissionError>;
        async fn fetch_cycle(&self, cycle_id: i64) -> Result<Option<CommissionCycle>, CommissionError>;
        async fn fetch_cycles(&self, cycle_type: Option<CycleType>) -> Result<Vec<CommissionCycle>, CommissionError>;
        async fn fetch_active_cycles_at(&self, at: DateTime<Utc>) -> Result<Vec<CommissionCycle>, CommissionError>;
        async fn increment_period_volume(&self, cycle_id: i64, sales_rep_id: &str, seller_id: &str, delta: VolumeDelta) -> Result<PeriodEarning, CommissionError>;
        async fn begin_cycle_calculation(&self, cycle_id: i64) -> Result<CommissionCycle, CommissionError>;
        async fn fetch_earnings_for_cycle(&self, cycle_id: i64) -> Result<Vec<PeriodEarning>, CommissionError>;
        async fn fetch_earning(&self, earning_id: i64) -> Result<Option<PeriodEarning>, CommissionError>;
        async fn write_commissions(&self, cycle_id: i64, commissions: Vec<(i64, CommissionBreakdown)>) -> Result<Vec<PeriodEarning>, CommissionError>;
        async fn complete_cycle(&self, cycle_id: i64) -> Result<CommissionCycle, CommissionError>;
        async fn mark_earning_paid(&self, earning_id: i64) -> Result<PeriodEarning, CommissionError>;
    }
    impl AuditStore for Backend {
        async fn insert_audit_entry(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, AuditError>;
        async fn count_recent_failures(&self, ip_address: &str, since: DateTime<Utc>) -> Result<i64, AuditError>;
        async fn fetch_flagged_entries(&self, limit: i64) -> Result<Vec<AuditLogEntry>, AuditError>;
        async fn fetch_entries_for_resource(&self, resource_type: &str, resource_id: &str) -> Result<Vec<AuditLogEntry>, AuditError>;
        async fn fetch_recent_entries(&self, limit: i64) -> Result<Vec<AuditLogEntry>, AuditError>;
    }
}

thread_local! {
    static AUDIT_TRAIL: RefCell<Vec<NewAuditEntry>> = const { RefCell::new(Vec::new()) };
}

/// Removes and returns the audit entries written on this thread so far.
pub fn take_audit_trail() -> Vec<NewAuditEntry> {
    AUDIT_TRAIL.with(|trail| trail.take())
}

/// Builds a mock backend whose clones carry the same expectations. The engine clones its backend once per component,
/// so every copy must be able to answer.
pub fn mock_backend(setup: fn(&mut MockBackend)) -> MockBackend {
    let mut backend = MockBackend::new();
    setup(&mut backend);
    backend.expect_count_recent_failures().returning(|_, _| Ok(0));
    // Entries are kept on the test's thread for inspection. The store still reports a failure, since audit writes are
    // best-effort and must never change a response
    backend.expect_insert_audit_entry().returning(|entry| {
        AUDIT_TRAIL.with(|trail| trail.borrow_mut().push(entry));
        Err(AuditError::DatabaseError("audit store offline".into()))
    });
    backend.expect_clone().returning(move || mock_backend(setup));
    backend
}
