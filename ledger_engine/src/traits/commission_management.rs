use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{
    CommissionBreakdown,
    CommissionCycle,
    CommissionRule,
    CycleStatus,
    CycleType,
    NewCommissionCycle,
    NewCommissionRule,
    PeriodEarning,
    SalesRepAssignment,
    VolumeDelta,
};

/// Storage behaviour for commission accrual and the cycle close workflow.
///
/// Cycle lifecycle: `Active` → `Processing` → `Completed`. Volume accrues against `Active` cycles. Commission amounts
/// are only ever written while a cycle is `Processing`.
#[allow(async_fn_in_trait)]
pub trait CommissionManagement: Clone {
    /// The sales rep currently responsible for `seller_id`, if any.
    async fn fetch_active_assignment(&self, seller_id: &str) -> Result<Option<SalesRepAssignment>, CommissionError>;

    /// Assigns `seller_id` to `sales_rep_id`, deactivating any previous active assignment for the seller.
    async fn assign_sales_rep(&self, sales_rep_id: &str, seller_id: &str)
        -> Result<SalesRepAssignment, CommissionError>;

    /// Stores a new active rule, deactivating any previous active rule for the same rep and transaction type.
    async fn insert_commission_rule(&self, rule: NewCommissionRule) -> Result<CommissionRule, CommissionError>;

    async fn fetch_active_rules(&self) -> Result<Vec<CommissionRule>, CommissionError>;

    /// Creates a new `Active` cycle. Fails with [`CommissionError::OverlappingCycle`] if an active cycle of the same
    /// type overlaps the requested period.
    async fn insert_cycle(&self, cycle: NewCommissionCycle) -> Result<CommissionCycle, CommissionError>;

    async fn fetch_cycle(&self, cycle_id: i64) -> Result<Option<CommissionCycle>, CommissionError>;

    async fn fetch_cycles(&self, cycle_type: Option<CycleType>) -> Result<Vec<CommissionCycle>, CommissionError>;

    /// All `Active` cycles whose period contains `at`.
    async fn fetch_active_cycles_at(&self, at: DateTime<Utc>) -> Result<Vec<CommissionCycle>, CommissionError>;

    /// Atomically adds `delta` to the volume counters (and total volume) of the earning row for
    /// (cycle, rep, seller), creating the row if necessary.
    async fn increment_period_volume(
        &self,
        cycle_id: i64,
        sales_rep_id: &str,
        seller_id: &str,
        delta: VolumeDelta,
    ) -> Result<PeriodEarning, CommissionError>;

    /// Moves the cycle from `Active` to `Processing`. Calling this on a cycle that is already `Processing` is allowed
    /// so that the calculation can be re-run.
    async fn begin_cycle_calculation(&self, cycle_id: i64) -> Result<CommissionCycle, CommissionError>;

    async fn fetch_earnings_for_cycle(&self, cycle_id: i64) -> Result<Vec<PeriodEarning>, CommissionError>;

    async fn fetch_earning(&self, earning_id: i64) -> Result<Option<PeriodEarning>, CommissionError>;

    /// Writes the calculated commission amounts for the given earnings in a single atomic transaction. The cycle must
    /// be `Processing`.
    async fn write_commissions(
        &self,
        cycle_id: i64,
        commissions: Vec<(i64, CommissionBreakdown)>,
    ) -> Result<Vec<PeriodEarning>, CommissionError>;

    /// Moves the cycle from `Processing` to `Completed`.
    async fn complete_cycle(&self, cycle_id: i64) -> Result<CommissionCycle, CommissionError>;

    /// Marks an earning of a `Completed` cycle as paid.
    async fn mark_earning_paid(&self, earning_id: i64) -> Result<PeriodEarning, CommissionError>;
}

#[derive(Debug, Clone, Error)]
pub enum CommissionError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Commission cycle {0} does not exist")]
    CycleNotFound(i64),
    #[error("Commission cycle {id} is {actual}, but the operation requires {expected}")]
    InvalidCycleState { id: i64, expected: CycleStatus, actual: CycleStatus },
    #[error("An active {0} cycle already covers part of the requested period")]
    OverlappingCycle(CycleType),
    #[error("Invalid cycle period. {0}")]
    InvalidCyclePeriod(String),
    #[error("Period earning {0} does not exist")]
    EarningNotFound(i64),
    #[error("Period earning {0} cannot be marked as paid. {1}")]
    EarningNotPayable(i64, String),
    #[error("Commission calculation failed. {0}")]
    CalculationError(String),
    #[error("Invalid commission percentage. {0}")]
    InvalidPercentage(String),
}

impl From<sqlx::Error> for CommissionError {
    fn from(e: sqlx::Error) -> Self {
        CommissionError::DatabaseError(e.to_string())
    }
}
