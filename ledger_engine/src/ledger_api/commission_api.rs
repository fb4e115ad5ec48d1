use chrono::Utc;
use log::*;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    db_types::{
        AuditAction,
        CommissionBreakdown,
        CommissionCycle,
        CommissionRule,
        NewAuditEntry,
        NewCommissionCycle,
        NewCommissionRule,
        PendingTransaction,
        PeriodEarning,
        SalesRepAssignment,
        TransactionType,
        VolumeDelta,
    },
    ledger_api::audit_api::AuditRecorder,
    traits::{CommissionError, LedgerBackend},
};

/// What happened when a completed transaction was offered for commission accrual.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccrualResult {
    /// The volume was added to one earning row per active cycle.
    Accrued { sales_rep_id: String, earnings: Vec<PeriodEarning> },
    /// The seller has no active sales rep.
    NoSalesRep,
    /// No commission cycle is active right now.
    NoActiveCycle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleCalculation {
    pub cycle: CommissionCycle,
    pub earnings: Vec<PeriodEarning>,
}

/// Commission accrual and the cycle close workflow.
#[derive(Clone)]
pub struct CommissionApi<B> {
    db: B,
    auditor: AuditRecorder<B>,
}

impl<B: LedgerBackend> CommissionApi<B> {
    pub fn new(db: B, auditor: AuditRecorder<B>) -> Self {
        Self { db, auditor }
    }

    /// Attributes the volume of a completed transaction to the seller's sales rep, in every active cycle.
    ///
    /// Only volume is accrued here. Commission amounts are calculated when the cycle is closed.
    pub async fn accrue(&self, transaction: &PendingTransaction) -> Result<AccrualResult, CommissionError> {
        let wallet = self
            .db
            .fetch_wallet(transaction.wallet_id)
            .await
            .map_err(|e| CommissionError::DatabaseError(e.to_string()))?
            .ok_or_else(|| {
                CommissionError::DatabaseError(format!("Wallet #{} does not exist", transaction.wallet_id))
            })?;
        let seller_id = wallet.user_id;
        let Some(assignment) = self.db.fetch_active_assignment(&seller_id).await? else {
            debug!("💰️ Seller {seller_id} has no sales rep. No commission accrues for {}", transaction.external_id);
            return Ok(AccrualResult::NoSalesRep);
        };
        let cycles = self.db.fetch_active_cycles_at(Utc::now()).await?;
        if cycles.is_empty() {
            debug!("💰️ No active commission cycle. No commission accrues for {}", transaction.external_id);
            return Ok(AccrualResult::NoActiveCycle);
        }
        let delta = VolumeDelta::for_transaction(transaction.transaction_type, transaction.expected_amount);
        let mut earnings = Vec::with_capacity(cycles.len());
        for cycle in cycles {
            let earning =
                self.db.increment_period_volume(cycle.id, &assignment.sales_rep_id, &seller_id, delta).await?;
            debug!(
                "💰️ {} {} volume added to {} cycle #{} for rep {}",
                transaction.expected_amount, transaction.transaction_type, cycle.cycle_type, cycle.id,
                assignment.sales_rep_id
            );
            earnings.push(earning);
        }
        Ok(AccrualResult::Accrued { sales_rep_id: assignment.sales_rep_id, earnings })
    }

    pub async fn open_cycle(&self, cycle: NewCommissionCycle) -> Result<CommissionCycle, CommissionError> {
        let cycle = self.db.insert_cycle(cycle).await?;
        let entry =
            NewAuditEntry::new(AuditAction::CycleOpened, "commission_cycle").with_resource_id(cycle.id).with_after(&cycle);
        self.auditor.record(entry).await;
        Ok(cycle)
    }

    /// Moves the cycle to `Processing` (if it is still `Active`) and (re)computes every earning's commission from its
    /// volume and the active rules.
    pub async fn calculate_cycle(&self, cycle_id: i64) -> Result<CycleCalculation, CommissionError> {
        let cycle = self.db.begin_cycle_calculation(cycle_id).await?;
        let rules = self.db.fetch_active_rules().await?;
        let earnings = self.db.fetch_earnings_for_cycle(cycle_id).await?;
        let breakdowns = earnings
            .iter()
            .map(|e| calculate_commission(e, &rules).map(|b| (e.id, b)))
            .collect::<Result<Vec<_>, _>>()?;
        let earnings = self.db.write_commissions(cycle_id, breakdowns).await?;
        let total = earnings.iter().map(|e| e.total_commission).sum::<ledger_common::Amount>();
        info!("💰️ Commission cycle #{cycle_id} calculated. {} earnings, {total} total commission", earnings.len());
        let entry = NewAuditEntry::new(AuditAction::CycleCalculated, "commission_cycle")
            .with_resource_id(cycle_id)
            .with_amount(total)
            .with_after(&earnings);
        self.auditor.record(entry).await;
        Ok(CycleCalculation { cycle, earnings })
    }

    pub async fn complete_cycle(&self, cycle_id: i64) -> Result<CommissionCycle, CommissionError> {
        let cycle = self.db.complete_cycle(cycle_id).await?;
        info!("💰️ Commission cycle #{cycle_id} completed");
        let entry =
            NewAuditEntry::new(AuditAction::CycleCompleted, "commission_cycle").with_resource_id(cycle_id).with_after(&cycle);
        self.auditor.record(entry).await;
        Ok(cycle)
    }

    pub async fn mark_earning_paid(&self, earning_id: i64) -> Result<PeriodEarning, CommissionError> {
        let earning = self.db.mark_earning_paid(earning_id).await?;
        let entry = NewAuditEntry::new(AuditAction::EarningPaid, "period_earning")
            .with_resource_id(earning_id)
            .with_amount(earning.total_commission)
            .with_after(&earning);
        self.auditor.record(entry).await;
        Ok(earning)
    }

    pub async fn fetch_cycle(&self, cycle_id: i64) -> Result<CommissionCycle, CommissionError> {
        self.db.fetch_cycle(cycle_id).await?.ok_or(CommissionError::CycleNotFound(cycle_id))
    }

    pub async fn earnings_for_cycle(&self, cycle_id: i64) -> Result<Vec<PeriodEarning>, CommissionError> {
        // Distinguish "no earnings" from "no such cycle"
        self.fetch_cycle(cycle_id).await?;
        self.db.fetch_earnings_for_cycle(cycle_id).await
    }

    pub async fn assign_sales_rep(
        &self,
        sales_rep_id: &str,
        seller_id: &str,
    ) -> Result<SalesRepAssignment, CommissionError> {
        self.db.assign_sales_rep(sales_rep_id, seller_id).await
    }

    /// Stores a new active rule. The percentage must lie between 0 and 100 inclusive.
    pub async fn set_rule(&self, rule: NewCommissionRule) -> Result<CommissionRule, CommissionError> {
        let percentage = rule.percentage.value();
        if !(Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(&percentage) {
            warn!("💰️ Rejected {} commission rule with a percentage of {percentage}", rule.transaction_type);
            return Err(CommissionError::InvalidPercentage(format!("{percentage} is not between 0 and 100")));
        }
        self.db.insert_commission_rule(rule).await
    }
}

/// The percentage that applies to `sales_rep_id` for `transaction_type`. A rep-specific rule beats the global rule;
/// with neither, the rate is zero.
pub fn applicable_percentage(rules: &[CommissionRule], sales_rep_id: &str, transaction_type: TransactionType) -> Decimal {
    let active = rules.iter().filter(|r| r.is_active && r.transaction_type == transaction_type);
    let mut global = None;
    for rule in active {
        match rule.sales_rep_id.as_deref() {
            Some(rep) if rep == sales_rep_id => return rule.percentage.value(),
            None => global = Some(rule.percentage.value()),
            Some(_) => {},
        }
    }
    global.unwrap_or(Decimal::ZERO)
}

/// Commission = volume × percentage / 100, per transaction type.
pub fn calculate_commission(
    earning: &PeriodEarning,
    rules: &[CommissionRule],
) -> Result<CommissionBreakdown, CommissionError> {
    let mut breakdown = CommissionBreakdown::default();
    for transaction_type in TransactionType::ALL {
        let pct = applicable_percentage(rules, &earning.sales_rep_id, transaction_type);
        let commission = earning
            .volume_for(transaction_type)
            .percent(pct)
            .map_err(|e| CommissionError::CalculationError(e.to_string()))?;
        breakdown.set(transaction_type, commission);
    }
    Ok(breakdown)
}
