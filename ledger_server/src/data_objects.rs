use std::fmt::Display;

use chrono::{DateTime, Utc};
use ledger_common::Amount;
use ledger_engine::{
    db_types::{CycleType, NewCommissionCycle, NewPendingTransaction, TransactionType},
    IngestReport,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The body returned to the payment provider for every webhook call. The status code is always 200.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WebhookAck {
    Received { success: bool, received: bool, transaction_id: String, processed_status: String },
    Rejected { success: bool, error: String },
}

impl From<IngestReport> for WebhookAck {
    fn from(report: IngestReport) -> Self {
        match (report.transaction_id, report.processed_status) {
            (Some(transaction_id), Some(processed_status)) if report.success => {
                Self::Received { success: true, received: true, transaction_id, processed_status }
            },
            _ => Self::Rejected {
                success: false,
                error: report.error.unwrap_or_else(|| "The notification could not be processed".to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeQuery {
    pub challenge: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenCycleRequest {
    pub cycle_type: CycleType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl From<OpenCycleRequest> for NewCommissionCycle {
    fn from(req: OpenCycleRequest) -> Self {
        NewCommissionCycle::new(req.cycle_type, req.start_date, req.end_date)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransactionRequest {
    pub external_id: String,
    pub user_id: String,
    pub transaction_type: TransactionType,
    pub expected_amount: Amount,
    #[serde(default)]
    pub expected_fiat_amount: Amount,
}

impl From<NewTransactionRequest> for NewPendingTransaction {
    fn from(req: NewTransactionRequest) -> Self {
        NewPendingTransaction::new(&req.external_id, &req.user_id, req.transaction_type, req.expected_amount)
            .with_fiat_amount(req.expected_fiat_amount)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlaggedQuery {
    pub limit: Option<i64>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ack_shapes() {
        let ok = IngestReport {
            success: true,
            transaction_id: Some("tx-1".into()),
            processed_status: Some("Completed".into()),
            error: None,
        };
        let json = serde_json::to_value(WebhookAck::from(ok)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": true, "received": true, "transaction_id": "tx-1", "processed_status": "Completed"})
        );
        let bad = IngestReport { success: false, error: Some("bad payload".into()), ..Default::default() };
        let json = serde_json::to_value(WebhookAck::from(bad)).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "error": "bad payload"}));
    }
}
