use chrono::Duration;
use ledger_common::Amount;
use log::*;

use crate::{
    db_types::{AuditLogEntry, NewAuditEntry, Severity},
    traits::AuditStore,
};

const FAILED_ACTION_RISK: i64 = 30;
const RECENT_FAILURE_RISK: i64 = 10;
const MAX_RECENT_FAILURE_RISK: i64 = 40;
const LARGE_AMOUNT_RISK: i64 = 20;
const FLAG_THRESHOLD: i64 = 75;

/// Tunables for the audit risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskPolicy {
    /// How far back failures from the same source IP count towards the risk score.
    pub failure_window: Duration,
    /// Amounts strictly above this are considered large.
    pub large_amount_threshold: Amount,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self { failure_window: Duration::minutes(15), large_amount_threshold: Amount::from_units(50_000) }
    }
}

/// Computes the 0-100 risk score for an audit entry.
pub fn risk_score(entry: &NewAuditEntry, recent_failures: i64, policy: &RiskPolicy) -> i64 {
    let mut score = 0;
    if !entry.success {
        score += FAILED_ACTION_RISK;
    }
    score += (recent_failures.max(0) * RECENT_FAILURE_RISK).min(MAX_RECENT_FAILURE_RISK);
    if entry.amount.map(|a| a > policy.large_amount_threshold).unwrap_or(false) {
        score += LARGE_AMOUNT_RISK;
    }
    score += match entry.severity {
        Severity::High => 10,
        Severity::Critical => 25,
        Severity::Info | Severity::Warning => 0,
    };
    score.clamp(0, 100)
}

pub fn should_flag(risk_score: i64, severity: Severity) -> bool {
    risk_score > FLAG_THRESHOLD || severity >= Severity::High
}

/// Durable, append-only record of every processing attempt.
///
/// Recording never fails from the caller's point of view. If the store rejects the write, the full entry is written to
/// the error log instead.
#[derive(Clone)]
pub struct AuditRecorder<A> {
    store: A,
    policy: RiskPolicy,
}

impl<A: AuditStore> AuditRecorder<A> {
    pub fn new(store: A, policy: RiskPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    pub async fn record(&self, mut entry: NewAuditEntry) -> Option<AuditLogEntry> {
        let recent_failures = match entry.ip_address.as_deref() {
            Some(ip) => {
                let since = entry.created_at - self.policy.failure_window;
                self.store.count_recent_failures(ip, since).await.unwrap_or_else(|e| {
                    warn!("📋️ Could not count recent failures for {ip}. {e}");
                    0
                })
            },
            None => 0,
        };
        entry.risk_score = risk_score(&entry, recent_failures, &self.policy);
        entry.flagged_for_review = should_flag(entry.risk_score, entry.severity);
        log!(
            entry.severity.log_level(),
            "📋️ {} {}/{} success={} risk={}{}{}",
            entry.action,
            entry.resource_type,
            entry.resource_id.as_deref().unwrap_or("-"),
            entry.success,
            entry.risk_score,
            if entry.flagged_for_review { " [flagged]" } else { "" },
            entry.error_message.as_ref().map(|e| format!(" {e}")).unwrap_or_default(),
        );
        let fallback = entry.clone();
        match self.store.insert_audit_entry(entry).await {
            Ok(stored) => Some(stored),
            Err(e) => {
                let json = serde_json::to_string(&fallback).unwrap_or_else(|je| format!("<unserializable: {je}>"));
                error!("📋️ Audit store write failed ({e}). Entry: {json}");
                None
            },
        }
    }

    pub async fn flagged_entries(&self, limit: i64) -> Vec<AuditLogEntry> {
        self.store.fetch_flagged_entries(limit).await.unwrap_or_else(|e| {
            error!("📋️ Could not fetch flagged audit entries. {e}");
            vec![]
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db_types::AuditAction;

    fn entry() -> NewAuditEntry {
        NewAuditEntry::new(AuditAction::WebhookReceived, "webhook")
    }

    #[test]
    fn quiet_success_scores_zero() {
        let policy = RiskPolicy::default();
        assert_eq!(risk_score(&entry(), 0, &policy), 0);
        assert!(!should_flag(0, Severity::Info));
    }

    #[test]
    fn failures_and_history_add_up() {
        let policy = RiskPolicy::default();
        let failed = entry().failed("boom");
        assert_eq!(risk_score(&failed, 0, &policy), 30);
        assert_eq!(risk_score(&failed, 2, &policy), 50);
        // recent failures are capped at +40
        assert_eq!(risk_score(&failed, 9, &policy), 70);
    }

    #[test]
    fn large_amounts_and_severity() {
        let policy = RiskPolicy::default();
        let at_threshold = entry().with_amount(Amount::from_units(50_000));
        assert_eq!(risk_score(&at_threshold, 0, &policy), 0);
        let large = entry().with_amount(Amount::from_units(50_001)).with_severity(Severity::High);
        assert_eq!(risk_score(&large, 0, &policy), 30);
        assert!(should_flag(30, Severity::High));
    }

    #[test]
    fn score_is_clamped() {
        let policy = RiskPolicy::default();
        let worst =
            entry().failed("boom").with_amount(Amount::from_units(1_000_000)).with_severity(Severity::Critical);
        // 30 + 40 + 20 + 25
        assert_eq!(risk_score(&worst, 10, &policy), 100);
        assert!(should_flag(100, Severity::Info));
        assert!(!should_flag(75, Severity::Warning));
    }
}
