use log::*;

use crate::{
    db_types::PendingTransaction,
    traits::{LedgerDatabase, LedgerError},
};

/// Resolves provider notifications to the pending transactions they refer to.
#[derive(Clone)]
pub struct TransactionMatcher<B> {
    db: B,
}

impl<B: LedgerDatabase> TransactionMatcher<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Returns the pending transaction with the given external id, or `None` if there isn't one.
    ///
    /// External ids are unique, but data imported from older systems may contain duplicates. In that case the most
    /// recently created transaction wins.
    pub async fn find_match(&self, external_id: &str) -> Result<Option<PendingTransaction>, LedgerError> {
        let mut candidates = self.db.fetch_transactions_by_external_id(external_id).await?;
        match candidates.len() {
            0 => {
                warn!("🔄️ No pending transaction matches external id {external_id}");
                Ok(None)
            },
            1 => Ok(candidates.pop()),
            n => {
                warn!("🔄️ {n} pending transactions match external id {external_id}. Using the most recent one.");
                Ok(Some(candidates.swap_remove(0)))
            },
        }
    }
}
