use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{
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
    },
    traits::CommissionError,
};

//--------------------------------------   Sales reps & rules  ---------------------------------------------------------

pub async fn fetch_active_assignment(
    seller_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<SalesRepAssignment>, sqlx::Error> {
    let assignment = sqlx::query_as("SELECT * FROM sales_rep_assignments WHERE seller_id = $1 AND is_active = 1")
        .bind(seller_id)
        .fetch_optional(conn)
        .await?;
    Ok(assignment)
}

/// Deactivates the seller's current assignment (if any) and inserts the new one. Run inside a transaction.
pub async fn replace_assignment(
    sales_rep_id: &str,
    seller_id: &str,
    conn: &mut SqliteConnection,
) -> Result<SalesRepAssignment, sqlx::Error> {
    sqlx::query("UPDATE sales_rep_assignments SET is_active = 0 WHERE seller_id = $1 AND is_active = 1")
        .bind(seller_id)
        .execute(&mut *conn)
        .await?;
    let assignment = sqlx::query_as(
        r#"
            INSERT INTO sales_rep_assignments (sales_rep_id, seller_id, is_active, created_at)
            VALUES ($1, $2, 1, $3)
            RETURNING *
        "#,
    )
    .bind(sales_rep_id)
    .bind(seller_id)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(assignment)
}

/// Deactivates any active rule for the same rep and transaction type, and inserts the new one. Run inside a
/// transaction.
pub async fn replace_rule(rule: NewCommissionRule, conn: &mut SqliteConnection) -> Result<CommissionRule, sqlx::Error> {
    sqlx::query(
        r#"
            UPDATE commission_rules SET is_active = 0
            WHERE sales_rep_id IS $1 AND transaction_type = $2 AND is_active = 1
        "#,
    )
    .bind(rule.sales_rep_id.as_deref())
    .bind(rule.transaction_type.to_string())
    .execute(&mut *conn)
    .await?;
    let rule = sqlx::query_as(
        r#"
            INSERT INTO commission_rules (sales_rep_id, transaction_type, percentage, is_active, created_at)
            VALUES ($1, $2, $3, 1, $4)
            RETURNING *
        "#,
    )
    .bind(rule.sales_rep_id)
    .bind(rule.transaction_type.to_string())
    .bind(rule.percentage)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(rule)
}

pub async fn fetch_active_rules(conn: &mut SqliteConnection) -> Result<Vec<CommissionRule>, sqlx::Error> {
    let rules = sqlx::query_as("SELECT * FROM commission_rules WHERE is_active = 1 ORDER BY id")
        .fetch_all(conn)
        .await?;
    Ok(rules)
}

//--------------------------------------        Cycles         ---------------------------------------------------------

/// Inserts a new active cycle, unless an active cycle of the same type overlaps the period. The overlap check and the
/// insert are a single statement.
pub async fn insert_cycle(
    cycle: NewCommissionCycle,
    conn: &mut SqliteConnection,
) -> Result<CommissionCycle, CommissionError> {
    if cycle.start_date >= cycle.end_date {
        return Err(CommissionError::InvalidCyclePeriod(format!(
            "The cycle must end after it starts ({} >= {})",
            cycle.start_date, cycle.end_date
        )));
    }
    let cycle_type = cycle.cycle_type;
    let inserted: Option<CommissionCycle> = sqlx::query_as(
        r#"
            INSERT INTO commission_cycles (cycle_type, start_date, end_date, status, created_at, updated_at)
            SELECT $1, $2, $3, 'Active', $4, $4
            WHERE NOT EXISTS (
                SELECT 1 FROM commission_cycles
                WHERE cycle_type = $1 AND status = 'Active' AND start_date < $3 AND end_date > $2
            )
            RETURNING *
        "#,
    )
    .bind(cycle.cycle_type.to_string())
    .bind(cycle.start_date)
    .bind(cycle.end_date)
    .bind(Utc::now())
    .fetch_optional(conn)
    .await?;
    let cycle = inserted.ok_or(CommissionError::OverlappingCycle(cycle_type))?;
    debug!("🗃️ Opened {} commission cycle #{} ({} to {})", cycle.cycle_type, cycle.id, cycle.start_date, cycle.end_date);
    Ok(cycle)
}

pub async fn fetch_cycle(id: i64, conn: &mut SqliteConnection) -> Result<Option<CommissionCycle>, sqlx::Error> {
    let cycle = sqlx::query_as("SELECT * FROM commission_cycles WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(cycle)
}

pub async fn fetch_cycles(
    cycle_type: Option<CycleType>,
    conn: &mut SqliteConnection,
) -> Result<Vec<CommissionCycle>, sqlx::Error> {
    let cycles = sqlx::query_as(
        "SELECT * FROM commission_cycles WHERE $1 IS NULL OR cycle_type = $1 ORDER BY start_date DESC, id DESC",
    )
    .bind(cycle_type.map(|t| t.to_string()))
    .fetch_all(conn)
    .await?;
    Ok(cycles)
}

pub async fn fetch_active_cycles_at(
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<CommissionCycle>, sqlx::Error> {
    let cycles = sqlx::query_as(
        r#"
            SELECT * FROM commission_cycles
            WHERE status = 'Active' AND start_date <= $1 AND end_date > $1
            ORDER BY id
        "#,
    )
    .bind(at)
    .fetch_all(conn)
    .await?;
    Ok(cycles)
}

/// Sets the status of the cycle to `new_status`, provided its current status is one of `from`. Returns `None` if the
/// guard rejected the update.
pub async fn update_cycle_status(
    id: i64,
    from: &[CycleStatus],
    new_status: CycleStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<CommissionCycle>, sqlx::Error> {
    if from.is_empty() {
        return Ok(None);
    }
    let placeholders = (0..from.len()).map(|i| format!("${}", i + 4)).collect::<Vec<_>>().join(", ");
    let sql = format!(
        "UPDATE commission_cycles SET status = $1, updated_at = $2 WHERE id = $3 AND status IN ({placeholders}) \
         RETURNING *"
    );
    let mut query = sqlx::query_as(&sql).bind(new_status.to_string()).bind(Utc::now()).bind(id);
    for status in from {
        query = query.bind(status.to_string());
    }
    let cycle: Option<CommissionCycle> = query.fetch_optional(conn).await?;
    Ok(cycle)
}

//--------------------------------------    Period earnings    ---------------------------------------------------------

/// Adds the volume delta to the (cycle, rep, seller) earning row, creating it if it does not exist. Every counter is
/// incremented in the database, so concurrent calls never lose updates.
pub async fn increment_volume(
    cycle_id: i64,
    sales_rep_id: &str,
    seller_id: &str,
    delta: VolumeDelta,
    conn: &mut SqliteConnection,
) -> Result<PeriodEarning, sqlx::Error> {
    let earning: PeriodEarning = sqlx::query_as(
        r#"
            INSERT INTO period_earnings (
                cycle_id,
                sales_rep_id,
                seller_id,
                pix_payin_volume,
                pix_payout_volume,
                usdt_purchase_volume,
                usdt_investment_volume,
                total_volume,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            ON CONFLICT (cycle_id, sales_rep_id, seller_id) DO UPDATE SET
                pix_payin_volume = pix_payin_volume + excluded.pix_payin_volume,
                pix_payout_volume = pix_payout_volume + excluded.pix_payout_volume,
                usdt_purchase_volume = usdt_purchase_volume + excluded.usdt_purchase_volume,
                usdt_investment_volume = usdt_investment_volume + excluded.usdt_investment_volume,
                total_volume = total_volume + excluded.total_volume,
                updated_at = excluded.updated_at
            RETURNING *
        "#,
    )
    .bind(cycle_id)
    .bind(sales_rep_id)
    .bind(seller_id)
    .bind(delta.pix_payin)
    .bind(delta.pix_payout)
    .bind(delta.usdt_purchase)
    .bind(delta.usdt_investment)
    .bind(delta.total())
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Earning #{} for rep {sales_rep_id} now has total volume {}", earning.id, earning.total_volume);
    Ok(earning)
}

pub async fn fetch_earnings_for_cycle(
    cycle_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<PeriodEarning>, sqlx::Error> {
    let earnings = sqlx::query_as("SELECT * FROM period_earnings WHERE cycle_id = $1 ORDER BY id")
        .bind(cycle_id)
        .fetch_all(conn)
        .await?;
    Ok(earnings)
}

pub async fn fetch_earning(id: i64, conn: &mut SqliteConnection) -> Result<Option<PeriodEarning>, sqlx::Error> {
    let earning = sqlx::query_as("SELECT * FROM period_earnings WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(earning)
}

/// Overwrites the commission amounts for one earning row. The row must belong to `cycle_id`, and that cycle must be
/// `Processing`; otherwise `None` is returned.
pub async fn write_commission(
    cycle_id: i64,
    earning_id: i64,
    commission: &CommissionBreakdown,
    conn: &mut SqliteConnection,
) -> Result<Option<PeriodEarning>, sqlx::Error> {
    let earning = sqlx::query_as(
        r#"
            UPDATE period_earnings SET
                pix_payin_commission = $1,
                pix_payout_commission = $2,
                usdt_purchase_commission = $3,
                usdt_investment_commission = $4,
                total_commission = $5,
                updated_at = $6
            WHERE id = $7 AND cycle_id = $8
              AND EXISTS (SELECT 1 FROM commission_cycles WHERE id = $8 AND status = 'Processing')
            RETURNING *
        "#,
    )
    .bind(commission.pix_payin)
    .bind(commission.pix_payout)
    .bind(commission.usdt_purchase)
    .bind(commission.usdt_investment)
    .bind(commission.total())
    .bind(Utc::now())
    .bind(earning_id)
    .bind(cycle_id)
    .fetch_optional(conn)
    .await?;
    Ok(earning)
}

/// Marks an unpaid earning of a completed cycle as paid. Returns `None` if the guard rejected the update.
pub async fn mark_paid(id: i64, conn: &mut SqliteConnection) -> Result<Option<PeriodEarning>, sqlx::Error> {
    let earning = sqlx::query_as(
        r#"
            UPDATE period_earnings SET is_paid = 1, paid_at = $1, updated_at = $1
            WHERE id = $2 AND is_paid = 0
              AND cycle_id IN (SELECT id FROM commission_cycles WHERE status = 'Completed')
            RETURNING *
        "#,
    )
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(earning)
}
