use std::{str::FromStr, time::Duration};

use chrono::Utc;
use cucumber::{given, then, when};
use ledger_engine::{
    db_types::{Amount, NewPendingTransaction, TransactionStatus, TransactionType},
    AuditStore,
};
use serde_json::json;

use crate::cucumber::LedgerWorld;

async fn create_pending(world: &mut LedgerWorld, tx: NewPendingTransaction) {
    world.api().create_pending_transaction(tx).await.expect("Error creating pending transaction");
}

#[given(expr = "a pending {word} transaction [{word}] for '{word}' of {int} units")]
async fn pending_transaction(world: &mut LedgerWorld, tx_type: String, external_id: String, user: String, units: i64) {
    let tx_type = TransactionType::from_str(&tx_type).expect("Not a valid transaction type");
    let tx = NewPendingTransaction::new(&external_id, &user, tx_type, Amount::from_units(units));
    create_pending(world, tx).await;
}

#[given(expr = "a pending {word} transaction [{word}] for '{word}' of {int} units created {int} hours ago")]
async fn old_pending_transaction(
    world: &mut LedgerWorld,
    tx_type: String,
    external_id: String,
    user: String,
    units: i64,
    hours: i64,
) {
    let tx_type = TransactionType::from_str(&tx_type).expect("Not a valid transaction type");
    let created_at = Utc::now() - chrono::Duration::hours(hours);
    let tx = NewPendingTransaction::new(&external_id, &user, tx_type, Amount::from_units(units))
        .with_created_at(created_at);
    create_pending(world, tx).await;
}

#[when(expr = "the provider sends {word} for [{word}]")]
async fn provider_sends(world: &mut LedgerWorld, status: String, external_id: String) {
    let body = json!({"id": external_id, "status": status}).to_string();
    let report = world.api().ingest(body.as_bytes(), &LedgerWorld::meta()).await;
    world.last_report = Some(report);
}

#[when(expr = "the provider sends {word} for [{word}] reporting {int} units")]
async fn provider_sends_with_amount(world: &mut LedgerWorld, status: String, external_id: String, units: i64) {
    let body = json!({"id": external_id, "status": status, "crypto_amount": units}).to_string();
    let report = world.api().ingest(body.as_bytes(), &LedgerWorld::meta()).await;
    world.last_report = Some(report);
}

#[when(expr = "the provider sends {word} for [{word}] {int} times")]
async fn provider_repeats(world: &mut LedgerWorld, status: String, external_id: String, n: usize) {
    for _ in 0..n {
        provider_sends(world, status.clone(), external_id.clone()).await;
    }
}

#[when(expr = "the provider sends the raw payload {string}")]
async fn provider_sends_raw(world: &mut LedgerWorld, payload: String) {
    let report = world.api().ingest(payload.as_bytes(), &LedgerWorld::meta()).await;
    world.last_report = Some(report);
}

#[when(expr = "the expiry sweep runs with a maximum age of {int} hours")]
async fn expiry_sweep(world: &mut LedgerWorld, hours: i64) {
    world.api().expire_stale_transactions(chrono::Duration::hours(hours)).await.expect("Error expiring transactions");
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut LedgerWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[then("the webhook is acknowledged")]
async fn acknowledged(world: &mut LedgerWorld) {
    let report = world.last_report.as_ref().expect("No webhook has been sent");
    assert!(report.success, "Webhook was not processed: {report:?}");
}

#[then("the webhook is rejected")]
async fn rejected(world: &mut LedgerWorld) {
    let report = world.last_report.as_ref().expect("No webhook has been sent");
    assert!(!report.success, "Webhook was unexpectedly processed: {report:?}");
    assert!(report.error.is_some());
}

#[then(expr = "the processed status is {word}")]
async fn processed_status(world: &mut LedgerWorld, status: String) {
    let report = world.last_report.as_ref().expect("No webhook has been sent");
    assert_eq!(report.processed_status.as_deref(), Some(status.as_str()));
}

#[then(expr = "transaction [{word}] is {word}")]
async fn transaction_status(world: &mut LedgerWorld, external_id: String, status: String) {
    let expected = TransactionStatus::from_str(&status).expect("Not a valid transaction status");
    let tx = world.api().fetch_transaction(&external_id).await.expect("Error fetching transaction");
    let tx = tx.unwrap_or_else(|| panic!("Transaction {external_id} does not exist"));
    assert_eq!(tx.status, expected);
}

#[then(expr = "the wallet for '{word}' has a balance of {int} units")]
async fn wallet_balance(world: &mut LedgerWorld, user: String, units: i64) {
    let wallet = world.api().fetch_wallet_for_user(&user).await.expect("Error fetching wallet");
    let wallet = wallet.unwrap_or_else(|| panic!("Wallet for {user} does not exist"));
    assert_eq!(wallet.balance, Amount::from_units(units), "Balance is incorrect");
}

#[then(expr = "the wallet for '{word}' has total deposits of {int} units")]
async fn wallet_deposits(world: &mut LedgerWorld, user: String, units: i64) {
    let wallet = world.api().fetch_wallet_for_user(&user).await.expect("Error fetching wallet");
    let wallet = wallet.unwrap_or_else(|| panic!("Wallet for {user} does not exist"));
    assert_eq!(wallet.total_deposited, Amount::from_units(units), "Total deposits are incorrect");
}

#[then(expr = "the audit log has {int} entries")]
async fn audit_log_size(world: &mut LedgerWorld, n: usize) {
    let entries = world.api().db().fetch_recent_entries(1_000).await.expect("Error fetching audit log");
    assert_eq!(entries.len(), n, "Audit log: {entries:#?}");
}

#[then(expr = "the audit log has {int} {word} entries for [{word}]")]
async fn audit_entries_for(world: &mut LedgerWorld, n: usize, action: String, external_id: String) {
    let entries = world
        .api()
        .db()
        .fetch_entries_for_resource("transaction", &external_id)
        .await
        .expect("Error fetching audit log");
    let count = entries.iter().filter(|e| e.action.as_str() == action).count();
    assert_eq!(count, n, "Audit log for {external_id}: {entries:#?}");
}

#[then(expr = "the latest audit entry is a failed {word} with severity {word}")]
async fn latest_audit_entry(world: &mut LedgerWorld, action: String, severity: String) {
    let entries = world.api().db().fetch_recent_entries(1).await.expect("Error fetching audit log");
    let entry = entries.first().expect("The audit log is empty");
    assert_eq!(entry.action.as_str(), action);
    assert_eq!(entry.severity.to_string(), severity);
    assert!(!entry.success);
}
