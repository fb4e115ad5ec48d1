//! Ledger Engine
//!
//! The ledger engine consumes asynchronous notifications from an external payment provider, matches them to the
//! pending transactions it is tracking, and credits user wallets exactly once per transaction, however many times the
//! provider delivers the same notification.
//!
//! The library is divided into these main sections:
//! 1. Storage contracts ([`mod@traits`]) and their SQLite implementation ([`SqliteDatabase`]). You should not need to
//!    touch the database directly. The data types stored in it are defined in [`mod@db_types`] and are public.
//! 2. The engine's public API ([`ReconciliationApi`], [`CommissionApi`] and friends). This normalises provider
//!    payloads, applies the transaction state machine, accrues sales-rep commission and keeps the audit log.
//!
//! Status changes are also emitted as events (see [`mod@events`]) so that other components, such as the live
//! [`NotificationHub`], can react to them without sitting on the critical path.
pub mod db_types;
pub mod events;
mod ledger_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "test_utils")]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use ledger_api::{
    audit_api::{risk_score, should_flag, AuditRecorder, RiskPolicy},
    commission_api::{applicable_percentage, calculate_commission, AccrualResult, CommissionApi, CycleCalculation},
    creditor::{effective_rate, LedgerCreditor},
    matcher::TransactionMatcher,
    notifications::{NotificationAmounts, NotificationHub, NotificationStatus, TransactionNotification},
    payment_event::{PayloadError, PaymentEvent, ProviderStatus, WebhookPayload},
    reconciliation_api::{IngestReport, ProcessingOutcome, ReconciliationApi},
};
pub use traits::{
    AuditError,
    AuditStore,
    CommissionError,
    CommissionManagement,
    LedgerBackend,
    LedgerDatabase,
    LedgerError,
};
