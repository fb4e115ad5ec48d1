use ledger_common::Amount;
use serde::{Deserialize, Serialize};

use crate::db_types::{PendingTransaction, TransactionStatus};

/// Emitted after a pending transaction's status change has been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStatusEvent {
    pub external_id: String,
    pub status: TransactionStatus,
    pub previous_status: Option<TransactionStatus>,
    /// The amount credited (or that would have been credited) to the wallet.
    pub expected_amount: Amount,
    pub expected_fiat_amount: Amount,
    /// The amount the provider claimed, if any. Informational only.
    pub reported_amount: Option<Amount>,
}

impl TransactionStatusEvent {
    pub fn new(transaction: &PendingTransaction, reported_amount: Option<Amount>) -> Self {
        Self {
            external_id: transaction.external_id.clone(),
            status: transaction.status,
            previous_status: transaction.previous_status,
            expected_amount: transaction.expected_amount,
            expected_fiat_amount: transaction.expected_fiat_amount,
            reported_amount,
        }
    }
}
