use log::*;
use rust_decimal::Decimal;

use crate::{
    db_types::{ExchangeRate, PendingTransaction, TransactionStatus, TransitionOutcome},
    ledger_api::payment_event::ProviderStatus,
    traits::{LedgerDatabase, LedgerError},
};

const EXCHANGE_RATE_DECIMALS: u32 = 8;

/// Applies provider outcomes to pending transactions.
///
/// | Provider status       | Transaction becomes | Wallet                      |
/// |-----------------------|---------------------|-----------------------------|
/// | `Paid`                | `Completed`         | credited `expected_amount`  |
/// | `Error`, `Rejected`   | `Failed`            | untouched                   |
/// | `Processing`          | `Processing`        | untouched                   |
/// | `Expired`             | `Expired`           | untouched                   |
/// | `WaitingPayment`      | unchanged           | untouched                   |
///
/// Terminal transactions are never modified. The guard lives in the storage layer, in the same atomic statement as
/// the update.
#[derive(Clone)]
pub struct LedgerCreditor<B> {
    db: B,
}

impl<B: LedgerDatabase> LedgerCreditor<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn apply(
        &self,
        transaction: &PendingTransaction,
        status: ProviderStatus,
    ) -> Result<TransitionOutcome, LedgerError> {
        let Some(target) = status.target_status() else {
            trace!("🔄️ {status} for {} does not change any state", transaction.external_id);
            return Ok(TransitionOutcome::NoOp {
                transaction: transaction.clone(),
                reason: format!("{status} does not change the transaction status"),
            });
        };
        if target == TransactionStatus::Completed {
            let rate = effective_rate(transaction);
            self.db.complete_and_credit(transaction.id, rate).await
        } else {
            self.db.transition_status(transaction.id, target).await
        }
    }
}

/// Fiat paid per unit credited, if both amounts are known.
pub fn effective_rate(transaction: &PendingTransaction) -> Option<ExchangeRate> {
    if transaction.expected_fiat_amount.is_zero() {
        return None;
    }
    transaction
        .expected_fiat_amount
        .ratio(transaction.expected_amount)
        .map(|r: Decimal| ExchangeRate(r.round_dp(EXCHANGE_RATE_DECIMALS).normalize()))
}
