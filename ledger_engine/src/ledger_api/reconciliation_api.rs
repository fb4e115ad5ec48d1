//! The reconciliation flow.
//!
//! `ingest` → parse → match → apply → (commission accrual, notification), with the audit log written at ingestion
//! and at every outcome.
//!
//! Only the guarded state transition (and the wallet credit that accompanies a completion) is on the critical path.
//! Commission accrual and notification run after the commit, and their failures are logged and swallowed.
use chrono::{Duration, Utc};
use ledger_common::Amount;
use log::*;
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    db_types::{
        AuditAction,
        NewAuditEntry,
        NewPendingTransaction,
        PendingTransaction,
        RequestMetadata,
        Severity,
        TransactionStatus,
        TransitionOutcome,
        Wallet,
    },
    events::{EventProducers, TransactionStatusEvent},
    ledger_api::{
        audit_api::{AuditRecorder, RiskPolicy},
        commission_api::{AccrualResult, CommissionApi},
        creditor::LedgerCreditor,
        matcher::TransactionMatcher,
        payment_event::{PaymentEvent, WebhookPayload},
    },
    traits::{LedgerBackend, LedgerError},
};

const RESOURCE_WEBHOOK: &str = "webhook";
const RESOURCE_TRANSACTION: &str = "transaction";

/// The outcome of processing one matched or unmatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// The transaction changed status.
    Applied(PendingTransaction),
    /// The event was valid but did not change anything (duplicate delivery, already terminal, `WaitingPayment`).
    NoOp { transaction: PendingTransaction, reason: String },
    /// No pending transaction carries the event's external id.
    Unmatched,
}

impl ProcessingOutcome {
    pub fn status_label(&self) -> String {
        match self {
            ProcessingOutcome::Applied(tx) => tx.status.to_string(),
            ProcessingOutcome::NoOp { transaction, .. } => transaction.status.to_string(),
            ProcessingOutcome::Unmatched => "Unmatched".to_string(),
        }
    }
}

/// Summary of one inbound notification, suitable for returning to the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub success: bool,
    pub transaction_id: Option<String>,
    pub processed_status: Option<String>,
    pub error: Option<String>,
}

impl IngestReport {
    fn processed(external_id: &str, outcome: &ProcessingOutcome) -> Self {
        Self {
            success: true,
            transaction_id: Some(external_id.to_string()),
            processed_status: Some(outcome.status_label()),
            error: None,
        }
    }

    fn failed<S: Into<String>>(external_id: Option<&str>, error: S) -> Self {
        Self {
            success: false,
            transaction_id: external_id.map(String::from),
            processed_status: None,
            error: Some(error.into()),
        }
    }
}

pub struct ReconciliationApi<B> {
    db: B,
    matcher: TransactionMatcher<B>,
    creditor: LedgerCreditor<B>,
    commissions: CommissionApi<B>,
    auditor: AuditRecorder<B>,
    producers: EventProducers,
}

impl<B> std::fmt::Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B: LedgerBackend> ReconciliationApi<B> {
    pub fn new(db: B, policy: RiskPolicy) -> Self {
        let auditor = AuditRecorder::new(db.clone(), policy);
        Self {
            matcher: TransactionMatcher::new(db.clone()),
            creditor: LedgerCreditor::new(db.clone()),
            commissions: CommissionApi::new(db.clone(), auditor.clone()),
            auditor,
            producers: EventProducers::default(),
            db,
        }
    }

    pub fn with_producers(mut self, producers: EventProducers) -> Self {
        self.producers = producers;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    pub fn commissions(&self) -> &CommissionApi<B> {
        &self.commissions
    }

    pub fn auditor(&self) -> &AuditRecorder<B> {
        &self.auditor
    }

    /// Records a transaction for which payment is about to be requested from the provider.
    pub async fn create_pending_transaction(
        &self,
        tx: NewPendingTransaction,
    ) -> Result<PendingTransaction, LedgerError> {
        if !tx.expected_amount.is_positive() {
            return Err(LedgerError::InvalidAmount(format!("Expected amount must be positive, got {}", tx.expected_amount)));
        }
        self.db.insert_pending_transaction(tx).await
    }

    /// Handles one raw provider notification from start to finish. Never fails: every problem is audited and reported
    /// in the returned [`IngestReport`].
    pub async fn ingest(&self, raw: &[u8], meta: &RequestMetadata) -> IngestReport {
        let payload = raw_payload(raw);
        let parsed = WebhookPayload::parse(raw).and_then(|p| p.into_event(Utc::now()));
        let event = match parsed {
            Ok(event) => event,
            Err(e) => {
                warn!("🔄️ Webhook payload rejected. {e}");
                let entry = NewAuditEntry::new(AuditAction::WebhookReceived, RESOURCE_WEBHOOK)
                    .with_severity(Severity::Warning)
                    .with_after(&json!({ "payload": payload }))
                    .with_metadata(meta)
                    .failed(e.to_string());
                self.auditor.record(entry).await;
                return IngestReport::failed(None, e.to_string());
            },
        };
        let mut entry = NewAuditEntry::new(AuditAction::WebhookReceived, RESOURCE_WEBHOOK)
            .with_resource_id(&event.external_id)
            .with_after(&json!({ "payload": payload, "status": event.status }))
            .with_metadata(meta);
        if let Some(amount) = event.reported_amount {
            entry = entry.with_amount(amount);
        }
        self.auditor.record(entry).await;
        match self.process_event(&event, meta).await {
            Ok(outcome) => IngestReport::processed(&event.external_id, &outcome),
            Err(e) => IngestReport::failed(Some(&event.external_id), e.to_string()),
        }
    }

    /// Audits a notification whose body could not be read, because it was too large or the connection failed before
    /// it arrived in full. Nothing is parsed or matched.
    pub async fn reject_payload(&self, reason: &str, meta: &RequestMetadata) -> IngestReport {
        warn!("🔄️ Webhook payload rejected. {reason}");
        let entry = NewAuditEntry::new(AuditAction::WebhookReceived, RESOURCE_WEBHOOK)
            .with_severity(Severity::Warning)
            .with_metadata(meta)
            .failed(reason);
        self.auditor.record(entry).await;
        IngestReport::failed(None, reason)
    }

    /// Matches the event to its pending transaction and applies it.
    pub async fn process_event(
        &self,
        event: &PaymentEvent,
        meta: &RequestMetadata,
    ) -> Result<ProcessingOutcome, LedgerError> {
        let transaction = match self.matcher.find_match(&event.external_id).await {
            Ok(Some(tx)) => tx,
            Ok(None) => {
                let entry = NewAuditEntry::new(AuditAction::TransactionUnmatched, RESOURCE_TRANSACTION)
                    .with_resource_id(&event.external_id)
                    .with_severity(Severity::Warning)
                    .with_after(event)
                    .with_metadata(meta);
                self.auditor.record(entry).await;
                return Ok(ProcessingOutcome::Unmatched);
            },
            Err(e) => {
                self.audit_storage_failure(event, None, &e, meta).await;
                return Err(e);
            },
        };
        if let Some(reported) = event.reported_amount {
            if reported != transaction.expected_amount {
                warn!(
                    "🔄️ Provider reported {reported} for {}, but {} is expected. The expected amount is authoritative.",
                    transaction.external_id, transaction.expected_amount
                );
                let entry = NewAuditEntry::new(AuditAction::AmountMismatch, RESOURCE_TRANSACTION)
                    .with_resource_id(&transaction.external_id)
                    .with_severity(Severity::High)
                    .with_amount(transaction.expected_amount)
                    .with_before(&json!({ "expected_amount": transaction.expected_amount }))
                    .with_after(&json!({ "reported_amount": reported }))
                    .with_metadata(meta);
                self.auditor.record(entry).await;
            }
        }
        let outcome = match self.creditor.apply(&transaction, event.status).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.audit_storage_failure(event, Some(&transaction), &e, meta).await;
                return Err(e);
            },
        };
        match outcome {
            TransitionOutcome::Applied { transaction: updated } => {
                self.on_transition(&transaction, &updated, event.reported_amount, meta).await;
                Ok(ProcessingOutcome::Applied(updated))
            },
            TransitionOutcome::NoOp { transaction, reason } => {
                debug!("🔄️ {} for {} is a no-op. {reason}", event.status, transaction.external_id);
                let entry = NewAuditEntry::new(AuditAction::TransitionNoop, RESOURCE_TRANSACTION)
                    .with_resource_id(&transaction.external_id)
                    .with_before(&transaction)
                    .with_after(&json!({ "provider_status": event.status, "reason": reason }))
                    .with_metadata(meta);
                self.auditor.record(entry).await;
                Ok(ProcessingOutcome::NoOp { transaction, reason })
            },
        }
    }

    /// Moves every `Pending` or `Processing` transaction older than `max_age` to `Expired`. Returns the transactions
    /// that were expired by this sweep. An age too large to subtract from the current time expires nothing.
    pub async fn expire_stale_transactions(&self, max_age: Duration) -> Result<Vec<PendingTransaction>, LedgerError> {
        let Some(cutoff) = Utc::now().checked_sub_signed(max_age) else {
            warn!("🔄️ A maximum age of {max_age} reaches outside the supported date range. Nothing was expired.");
            return Ok(Vec::new());
        };
        let stale = self.db.fetch_stale_transactions(cutoff).await?;
        let mut expired = Vec::with_capacity(stale.len());
        let meta = RequestMetadata::default();
        for tx in stale {
            match self.db.transition_status(tx.id, TransactionStatus::Expired).await? {
                TransitionOutcome::Applied { transaction } => {
                    self.on_transition(&tx, &transaction, None, &meta).await;
                    expired.push(transaction);
                },
                TransitionOutcome::NoOp { reason, .. } => {
                    trace!("🔄️ {} was not expired. {reason}", tx.external_id);
                },
            }
        }
        Ok(expired)
    }

    /// Operator cancellation. Uses the same guard as every other transition, so terminal transactions are untouched.
    pub async fn cancel_transaction(
        &self,
        external_id: &str,
        meta: &RequestMetadata,
    ) -> Result<TransitionOutcome, LedgerError> {
        let tx = self
            .matcher
            .find_match(external_id)
            .await?
            .ok_or_else(|| LedgerError::TransactionNotFound(external_id.to_string()))?;
        let outcome = self.db.transition_status(tx.id, TransactionStatus::Cancelled).await?;
        match &outcome {
            TransitionOutcome::Applied { transaction } => self.on_transition(&tx, transaction, None, meta).await,
            TransitionOutcome::NoOp { transaction, reason } => {
                let entry = NewAuditEntry::new(AuditAction::TransitionNoop, RESOURCE_TRANSACTION)
                    .with_resource_id(external_id)
                    .with_before(transaction)
                    .with_after(&json!({ "requested": TransactionStatus::Cancelled, "reason": reason }))
                    .with_metadata(meta);
                self.auditor.record(entry).await;
            },
        }
        Ok(outcome)
    }

    pub async fn fetch_transaction(&self, external_id: &str) -> Result<Option<PendingTransaction>, LedgerError> {
        self.matcher.find_match(external_id).await
    }

    pub async fn fetch_wallet_for_user(&self, user_id: &str) -> Result<Option<Wallet>, LedgerError> {
        self.db.fetch_wallet_for_user(user_id).await
    }

    /// Post-commit side effects of an applied transition: the audit entry, the status-change event and, for
    /// completions, commission accrual.
    async fn on_transition(
        &self,
        before: &PendingTransaction,
        after: &PendingTransaction,
        reported_amount: Option<Amount>,
        meta: &RequestMetadata,
    ) {
        if let Some(action) = AuditAction::for_status(after.status) {
            let severity = match after.status {
                TransactionStatus::Failed | TransactionStatus::Expired => Severity::Warning,
                _ => Severity::Info,
            };
            let entry = NewAuditEntry::new(action, RESOURCE_TRANSACTION)
                .with_resource_id(&after.external_id)
                .with_severity(severity)
                .with_amount(after.expected_amount)
                .with_before(before)
                .with_after(after)
                .with_metadata(meta);
            self.auditor.record(entry).await;
        }
        info!(
            "🔄️ Transaction {} moved from {} to {}",
            after.external_id,
            after.previous_status.map(|s| s.to_string()).unwrap_or_else(|| "?".into()),
            after.status
        );
        // The handler runs on its own task, so this never waits on subscribers
        self.producers.publish_status_changed(TransactionStatusEvent::new(after, reported_amount));
        if after.status == TransactionStatus::Completed {
            self.accrue_commission(after).await;
        }
    }

    async fn accrue_commission(&self, transaction: &PendingTransaction) {
        match self.commissions.accrue(transaction).await {
            Ok(AccrualResult::Accrued { sales_rep_id, earnings }) => {
                let entry = NewAuditEntry::new(AuditAction::CommissionAccrued, RESOURCE_TRANSACTION)
                    .with_resource_id(&transaction.external_id)
                    .with_amount(transaction.expected_amount)
                    .with_after(&json!({ "sales_rep_id": sales_rep_id, "earnings": earnings }));
                self.auditor.record(entry).await;
            },
            Ok(AccrualResult::NoSalesRep) | Ok(AccrualResult::NoActiveCycle) => {},
            Err(e) => {
                error!("💰️ Commission accrual for {} failed. {e}", transaction.external_id);
                let entry = NewAuditEntry::new(AuditAction::CommissionAccrualFailed, RESOURCE_TRANSACTION)
                    .with_resource_id(&transaction.external_id)
                    .with_severity(Severity::Warning)
                    .with_amount(transaction.expected_amount)
                    .failed(e.to_string());
                self.auditor.record(entry).await;
            },
        }
    }

    async fn audit_storage_failure(
        &self,
        event: &PaymentEvent,
        transaction: Option<&PendingTransaction>,
        error: &LedgerError,
        meta: &RequestMetadata,
    ) {
        error!("🔄️ Storage failure while processing {}. {error}", event.external_id);
        let mut entry = NewAuditEntry::new(AuditAction::CreditFailed, RESOURCE_TRANSACTION)
            .with_resource_id(&event.external_id)
            .with_severity(Severity::Critical)
            .with_after(event)
            .with_metadata(meta)
            .failed(error.to_string());
        if let Some(tx) = transaction {
            entry = entry.with_before(tx).with_amount(tx.expected_amount);
        }
        self.auditor.record(entry).await;
    }
}

/// The raw payload as JSON if possible, otherwise as (lossy) text.
fn raw_payload(raw: &[u8]) -> Value {
    serde_json::from_slice(raw).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(raw).into_owned()))
}
