use actix_web::{http::StatusCode, test::TestRequest};
use chrono::{Duration, Utc};
use ledger_engine::{
    db_types::{
        AuditAction,
        CommissionCycle,
        CycleStatus,
        CycleType,
        SalesRepAssignment,
        Severity,
        TransactionStatus,
        TransitionOutcome,
    },
    traits::{CommissionError, LedgerError},
};
use serde_json::{json, Value};

use super::{
    helpers::{post_request, send, transaction, untouched, wallet},
    mocks::take_audit_trail,
};
use crate::routes::MAX_WEBHOOK_PAYLOAD;

fn completed() -> TransitionOutcome {
    let mut tx = transaction(TransactionStatus::Completed);
    tx.previous_status = Some(TransactionStatus::Pending);
    tx.processed_at = Some(Utc::now());
    TransitionOutcome::Applied { transaction: tx }
}

#[actix_web::test]
async fn health_check() {
    let (status, body) = send(TestRequest::get().uri("/health"), untouched).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn challenge_is_echoed() {
    let req = TestRequest::get().uri("/webhook/payment?challenge=c5a2f9e1");
    let (status, body) = send(req, untouched).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "c5a2f9e1");
}

#[actix_web::test]
async fn empty_payload_is_acknowledged_as_failed() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("", "/webhook/payment", json!({}), untouched).await;
    assert_eq!(status, StatusCode::OK);
    let ack: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(ack["success"], json!(false));
    assert!(ack["error"].as_str().is_some());
}

#[actix_web::test]
async fn garbage_is_acknowledged_as_failed() {
    let req = TestRequest::post()
        .uri("/webhook/payment")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json");
    let (status, body) = send(req, untouched).await;
    assert_eq!(status, StatusCode::OK);
    let ack: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(ack["success"], json!(false));
}

#[actix_web::test]
async fn unmatched_notification_is_acknowledged() {
    let (status, body) = post_request("", "/webhook/payment", json!({"id": "ghost-1", "status": "PAID"}), |b| {
        b.expect_fetch_transactions_by_external_id().returning(|_| Ok(vec![]));
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let ack: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(ack["success"], json!(true));
    assert_eq!(ack["received"], json!(true));
    assert_eq!(ack["transaction_id"], json!("ghost-1"));
    assert_eq!(ack["processed_status"], json!("Unmatched"));
}

#[actix_web::test]
async fn storage_failures_still_answer_ok() {
    take_audit_trail();
    let (status, body) = post_request("", "/webhook/payment", json!({"id": "tx-9", "status": "PAID"}), |b| {
        b.expect_fetch_transactions_by_external_id()
            .returning(|_| Err(LedgerError::DatabaseError("database is locked".into())));
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let ack: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(ack["success"], json!(false));
    assert!(ack["error"].as_str().unwrap().contains("database is locked"));
    let trail = take_audit_trail();
    let failure = trail.iter().find(|e| e.action == AuditAction::CreditFailed).expect("no CREDIT_FAILED entry");
    assert_eq!(failure.severity, Severity::Critical);
    assert!(!failure.success);
    assert_eq!(failure.resource_id.as_deref(), Some("tx-9"));
}

#[actix_web::test]
async fn oversized_payloads_are_acknowledged_as_failed() {
    take_audit_trail();
    let padding = "x".repeat(MAX_WEBHOOK_PAYLOAD);
    let req = TestRequest::post()
        .uri("/webhook/payment")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(json!({"id": "tx-big", "status": "PAID", "note": padding}).to_string());
    let (status, body) = send(req, untouched).await;
    assert_eq!(status, StatusCode::OK);
    let ack: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(ack["success"], json!(false));
    assert!(ack["error"].as_str().unwrap().contains("exceeds"));
    let trail = take_audit_trail();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].action, AuditAction::WebhookReceived);
    assert_eq!(trail[0].severity, Severity::Warning);
    assert!(!trail[0].success);
}

#[actix_web::test]
async fn failed_credit_is_audited_as_critical() {
    take_audit_trail();
    let (status, body) = post_request("", "/webhook/payment", json!({"id": "tx-100", "status": "PAID"}), |b| {
        b.expect_fetch_transactions_by_external_id().returning(|_| Ok(vec![transaction(TransactionStatus::Pending)]));
        b.expect_complete_and_credit().returning(|_, _| Err(LedgerError::DatabaseError("disk I/O error".into())));
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let ack: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(ack["success"], json!(false));
    assert_eq!(ack["transaction_id"], json!("tx-100"));
    let trail = take_audit_trail();
    let failure = trail.iter().find(|e| e.action == AuditAction::CreditFailed).expect("no CREDIT_FAILED entry");
    assert_eq!(failure.severity, Severity::Critical);
    assert!(failure.before_state.is_some());
    assert!(failure.amount.is_some());
    assert!(!trail.iter().any(|e| e.action == AuditAction::TransactionCompleted));
}

#[actix_web::test]
async fn failed_accrual_keeps_the_credit() {
    take_audit_trail();
    let (status, body) = post_request("", "/webhook/payment", json!({"id": "tx-100", "status": "PAID"}), |b| {
        b.expect_fetch_transactions_by_external_id().returning(|_| Ok(vec![transaction(TransactionStatus::Pending)]));
        b.expect_complete_and_credit().returning(|_, _| Ok(completed()));
        b.expect_fetch_wallet().returning(|_| Ok(Some(wallet())));
        b.expect_fetch_active_assignment().returning(|seller| {
            Ok(Some(SalesRepAssignment {
                id: 3,
                sales_rep_id: "rep-1".to_string(),
                seller_id: seller.to_string(),
                is_active: true,
                created_at: Utc::now(),
            }))
        });
        b.expect_fetch_active_cycles_at().returning(|at| {
            Ok(vec![CommissionCycle {
                id: 11,
                cycle_type: CycleType::Weekly,
                start_date: at - Duration::days(1),
                end_date: at + Duration::days(6),
                status: CycleStatus::Active,
                created_at: at,
                updated_at: at,
            }])
        });
        b.expect_increment_period_volume()
            .returning(|_, _, _, _| Err(CommissionError::DatabaseError("database is locked".into())));
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let ack: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(ack["success"], json!(true));
    assert_eq!(ack["processed_status"], json!("Completed"));
    let trail = take_audit_trail();
    assert!(trail.iter().any(|e| e.action == AuditAction::TransactionCompleted));
    let failure =
        trail.iter().find(|e| e.action == AuditAction::CommissionAccrualFailed).expect("no accrual failure entry");
    assert!(!failure.success);
    assert_eq!(failure.resource_id.as_deref(), Some("tx-100"));
    assert!(!trail.iter().any(|e| e.action == AuditAction::CreditFailed));
}
