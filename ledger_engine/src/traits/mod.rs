//! # Storage contracts
//!
//! This module defines the behaviour that a storage backend must expose in order to drive the reconciliation engine.
//!
//! * [`LedgerDatabase`] owns pending transactions and wallets. It performs the guarded, atomic status transitions and
//!   the wallet credit that accompanies a completion.
//! * [`CommissionManagement`] owns sales-rep assignments, commission rules, commission cycles and period earnings.
//! * [`AuditStore`] is the append-only audit log.
//!
//! [`LedgerBackend`] is a convenience alias for a backend that implements all three.
mod audit_store;
mod commission_management;
mod ledger_database;

pub use audit_store::{AuditError, AuditStore};
pub use commission_management::{CommissionError, CommissionManagement};
pub use ledger_database::{LedgerDatabase, LedgerError};

/// A backend that can serve every component of the engine.
pub trait LedgerBackend: LedgerDatabase + CommissionManagement + AuditStore {}

impl<T> LedgerBackend for T where T: LedgerDatabase + CommissionManagement + AuditStore {}
