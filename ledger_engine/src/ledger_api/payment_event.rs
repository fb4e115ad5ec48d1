//! Provider payload normalisation.
//!
//! The payment provider has delivered notifications in two shapes over time:
//!
//! * the current shape, keyed by `status`: `{"id": "...", "status": "PAID", "amount": 100, "crypto_amount": 19.5}`
//! * the legacy shape, keyed by `eventType`: `{"eventType": "payment.confirmed", "orderId": "...", "data": {...}}`
//!
//! [`WebhookPayload::parse`] resolves the discriminant once, and [`WebhookPayload::into_event`] produces the single
//! canonical [`PaymentEvent`] that the rest of the engine works with.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use ledger_common::Amount;
use log::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::db_types::TransactionStatus;

//--------------------------------------    ProviderStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderStatus {
    Paid,
    Error,
    Processing,
    Rejected,
    WaitingPayment,
    Expired,
}

impl ProviderStatus {
    /// Maps a current-shape `status` string, case-insensitively.
    pub fn from_status(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PAID" => Some(Self::Paid),
            "ERROR" => Some(Self::Error),
            "PROCESSING" => Some(Self::Processing),
            "REJECTED" => Some(Self::Rejected),
            "WAITING_PAYMENT" => Some(Self::WaitingPayment),
            "EXPIRED" => Some(Self::Expired),
            _ => None,
        }
    }

    /// Maps a legacy-shape `eventType` string.
    pub fn from_event_type(s: &str) -> Option<Self> {
        match s.trim() {
            "payment.received" | "payment.confirmed" | "usdt.delivered" => Some(Self::Paid),
            "payment.failed" => Some(Self::Error),
            "payment.expired" => Some(Self::Expired),
            _ => None,
        }
    }

    /// The internal status this provider status drives a transaction towards. `WaitingPayment` never changes state.
    pub fn target_status(&self) -> Option<TransactionStatus> {
        match self {
            ProviderStatus::Paid => Some(TransactionStatus::Completed),
            ProviderStatus::Error | ProviderStatus::Rejected => Some(TransactionStatus::Failed),
            ProviderStatus::Processing => Some(TransactionStatus::Processing),
            ProviderStatus::Expired => Some(TransactionStatus::Expired),
            ProviderStatus::WaitingPayment => None,
        }
    }
}

impl Display for ProviderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProviderStatus::Paid => "PAID",
            ProviderStatus::Error => "ERROR",
            ProviderStatus::Processing => "PROCESSING",
            ProviderStatus::Rejected => "REJECTED",
            ProviderStatus::WaitingPayment => "WAITING_PAYMENT",
            ProviderStatus::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

//--------------------------------------     PaymentEvent      ---------------------------------------------------------
/// One normalised provider notification. Constructed once per inbound call and never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentEvent {
    /// The provider's transaction identifier, and the idempotency key.
    pub external_id: String,
    pub status: ProviderStatus,
    /// What the provider claims was paid. Advisory only.
    pub reported_amount: Option<Amount>,
    pub received_at: DateTime<Utc>,
}

impl PaymentEvent {
    pub fn new(external_id: &str, status: ProviderStatus) -> Self {
        Self { external_id: external_id.to_string(), status, reported_amount: None, received_at: Utc::now() }
    }

    pub fn with_reported_amount(mut self, amount: Amount) -> Self {
        self.reported_amount = Some(amount);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("The payload is not valid JSON. {0}")]
    MalformedJson(String),
    #[error("The payload is not a JSON object")]
    NotAnObject,
    #[error("The payload has neither a 'status' nor an 'eventType' field")]
    MissingDiscriminant,
    #[error("Unrecognised payment status: {0}")]
    UnknownStatus(String),
    #[error("The payload does not identify a transaction")]
    MissingExternalId,
}

//--------------------------------------    WebhookPayload     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CurrentPayload {
    #[serde(default)]
    pub id: Value,
    pub status: String,
    #[serde(default)]
    pub amount: Value,
    #[serde(default)]
    pub crypto_amount: Value,
    #[serde(default)]
    pub customer_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LegacyPayload {
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(rename = "orderId", default)]
    pub order_id: Value,
    #[serde(default)]
    pub data: LegacyData,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LegacyData {
    #[serde(default)]
    pub id: Value,
    #[serde(rename = "orderId", default)]
    pub order_id: Value,
    #[serde(default)]
    pub amount: Value,
}

/// A provider payload with its shape resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookPayload {
    Current(CurrentPayload),
    Legacy(LegacyPayload),
}

impl WebhookPayload {
    pub fn parse(raw: &[u8]) -> Result<Self, PayloadError> {
        let value: Value = serde_json::from_slice(raw).map_err(|e| PayloadError::MalformedJson(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, PayloadError> {
        let obj = value.as_object().ok_or(PayloadError::NotAnObject)?;
        if non_null(obj.get("status")) {
            let payload =
                serde_json::from_value(value).map_err(|e| PayloadError::MalformedJson(e.to_string()))?;
            Ok(Self::Current(payload))
        } else if non_null(obj.get("eventType")) {
            let payload =
                serde_json::from_value(value).map_err(|e| PayloadError::MalformedJson(e.to_string()))?;
            Ok(Self::Legacy(payload))
        } else {
            Err(PayloadError::MissingDiscriminant)
        }
    }

    pub fn into_event(self, received_at: DateTime<Utc>) -> Result<PaymentEvent, PayloadError> {
        let (external_id, status, amount) = match self {
            WebhookPayload::Current(p) => {
                let status = ProviderStatus::from_status(&p.status).ok_or(PayloadError::UnknownStatus(p.status))?;
                let amount = if p.crypto_amount.is_null() { p.amount } else { p.crypto_amount };
                (id_string(&p.id), status, amount)
            },
            WebhookPayload::Legacy(p) => {
                let status =
                    ProviderStatus::from_event_type(&p.event_type).ok_or(PayloadError::UnknownStatus(p.event_type))?;
                let id = id_string(&p.order_id).or_else(|| id_string(&p.data.id)).or_else(|| id_string(&p.data.order_id));
                (id, status, p.data.amount)
            },
        };
        let external_id = external_id.ok_or(PayloadError::MissingExternalId)?;
        let reported_amount = parse_amount(&amount);
        Ok(PaymentEvent { external_id, status, reported_amount, received_at })
    }
}

fn non_null(v: Option<&Value>) -> bool {
    v.map(|v| !v.is_null()).unwrap_or(false)
}

/// Provider ids arrive as strings or as bare numbers.
fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parses a reported amount. The value is advisory, so anything unparseable is logged and ignored.
fn parse_amount(v: &Value) -> Option<Amount> {
    let parsed = match v {
        Value::Null => return None,
        Value::Number(n) => {
            let s = n.to_string();
            Decimal::from_str(&s).or_else(|_| Decimal::from_scientific(&s)).ok().and_then(|d| Amount::try_from(d).ok())
        },
        Value::String(s) => Amount::from_str(s).ok(),
        _ => None,
    };
    if parsed.is_none() {
        warn!("🔄️ Ignoring unparseable reported amount: {v}");
    }
    parsed
}
