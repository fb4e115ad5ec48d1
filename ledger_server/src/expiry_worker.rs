use chrono::Duration;
use ledger_engine::{db_types::PendingTransaction, events::EventProducers, ReconciliationApi, RiskPolicy, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

/// Starts the expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `interval`, pending and processing transactions older than `max_age` are moved to `Expired` through the
/// same guarded transition the webhook uses, so a transaction that completes mid-sweep is left alone.
pub fn start_expiry_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    policy: RiskPolicy,
    max_age: Duration,
    interval: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let api = ReconciliationApi::new(db, policy).with_producers(producers);
        info!("🕰️ Stale transaction expiry worker started");
        loop {
            timer.tick().await;
            debug!("🕰️ Running stale transaction expiry job");
            match api.expire_stale_transactions(max_age).await {
                Ok(expired) if expired.is_empty() => trace!("🕰️ No stale transactions"),
                Ok(expired) => {
                    info!("🕰️ {} transactions expired", expired.len());
                    debug!("🕰️ Expired transactions: {}", transaction_list(&expired));
                },
                Err(e) => {
                    error!("🕰️ Error running stale transaction expiry job: {e}");
                },
            }
        }
    })
}

fn transaction_list(transactions: &[PendingTransaction]) -> String {
    transactions
        .iter()
        .map(|t| format!("[{}] external_id: {} wallet: {}", t.id, t.external_id, t.wallet_id))
        .collect::<Vec<String>>()
        .join(", ")
}
