use actix_web::http::StatusCode;
use chrono::{Duration, Utc};
use ledger_engine::{
    db_types::{CycleType, TransactionStatus, TransitionOutcome},
    traits::CommissionError,
};
use serde_json::{json, Value};

use super::helpers::{get_request, post_request, transaction, untouched, wallet, TEST_API_KEY};

#[actix_web::test]
async fn missing_api_key_is_refused() {
    let (status, body) = get_request("", "/api/wallets/alice", untouched).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("API key"));
}

#[actix_web::test]
async fn wrong_api_key_is_refused() {
    let (status, _) = get_request("test-admin-kez", "/api/wallets/alice", untouched).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn fetch_wallet() {
    let (status, body) = get_request(TEST_API_KEY, "/api/wallets/alice", |b| {
        b.expect_fetch_wallet_for_user().returning(|_| Ok(Some(wallet())));
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let wallet: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(wallet["user_id"], json!("alice"));
    assert_eq!(wallet["balance"], json!(5_000_000));
}

#[actix_web::test]
async fn unknown_wallet_is_not_found() {
    let (status, body) = get_request(TEST_API_KEY, "/api/wallets/bob", |b| {
        b.expect_fetch_wallet_for_user().returning(|_| Ok(None));
    })
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("bob"));
}

#[actix_web::test]
async fn fetch_transaction() {
    let (status, body) = get_request(TEST_API_KEY, "/api/transactions/tx-100", |b| {
        b.expect_fetch_transactions_by_external_id().returning(|_| Ok(vec![transaction(TransactionStatus::Completed)]));
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let tx: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(tx["external_id"], json!("tx-100"));
    assert_eq!(tx["status"], json!("Completed"));
}

#[actix_web::test]
async fn cancelling_a_completed_transaction_conflicts() {
    let (status, body) = post_request(TEST_API_KEY, "/api/transactions/tx-100/cancel", json!({}), |b| {
        b.expect_fetch_transactions_by_external_id().returning(|_| Ok(vec![transaction(TransactionStatus::Completed)]));
        b.expect_transition_status().returning(|_, _| {
            Ok(TransitionOutcome::NoOp {
                transaction: transaction(TransactionStatus::Completed),
                reason: "Transaction is already Completed".into(),
            })
        });
    })
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("already Completed"));
}

#[actix_web::test]
async fn non_positive_amounts_are_rejected() {
    let body = json!({
        "external_id": "tx-101",
        "user_id": "alice",
        "transaction_type": "PixPayin",
        "expected_amount": 0
    });
    let (status, _) = post_request(TEST_API_KEY, "/api/transactions", body, untouched).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn overlapping_cycles_conflict() {
    let start = Utc::now();
    let body = json!({ "cycle_type": "Weekly", "start_date": start, "end_date": start + Duration::days(7) });
    let (status, body) = post_request(TEST_API_KEY, "/api/commissions/cycles", body, |b| {
        b.expect_insert_cycle().returning(|_| Err(CommissionError::OverlappingCycle(CycleType::Weekly)));
    })
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("Weekly"));
}

#[actix_web::test]
async fn earnings_for_unknown_cycle() {
    let (status, _) = get_request(TEST_API_KEY, "/api/commissions/cycles/42/earnings", |b| {
        b.expect_fetch_cycle().returning(|_| Ok(None));
    })
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn no_flagged_entries() {
    let (status, body) = get_request(TEST_API_KEY, "/api/audit/flagged?limit=10", |b| {
        b.expect_fetch_flagged_entries().returning(|_| Ok(vec![]));
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
}
