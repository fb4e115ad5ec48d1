use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use ledger_common::Amount;
use log::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(String);

//--------------------------------------   TransactionStatus   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// The transaction has been created and payment has been requested from the provider.
    Pending,
    /// The provider has reported that the payment is in progress.
    Processing,
    /// The payment succeeded and the wallet has been credited.
    Completed,
    /// The provider reported an error or rejected the payment.
    Failed,
    /// The payment window lapsed without a successful payment.
    Expired,
    /// The transaction was cancelled by an operator.
    Cancelled,
}

impl TransactionStatus {
    pub const TERMINAL: [TransactionStatus; 4] = [Self::Completed, Self::Failed, Self::Expired, Self::Cancelled];

    /// Terminal states are absorbing. Once a transaction reaches one, its status never changes again.
    pub fn is_terminal(&self) -> bool {
        Self::TERMINAL.contains(self)
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "Pending"),
            TransactionStatus::Processing => write!(f, "Processing"),
            TransactionStatus::Completed => write!(f, "Completed"),
            TransactionStatus::Failed => write!(f, "Failed"),
            TransactionStatus::Expired => write!(f, "Expired"),
            TransactionStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            "Expired" => Ok(Self::Expired),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid transaction status: {s}"))),
        }
    }
}

//--------------------------------------    TransactionType    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum TransactionType {
    PixPayin,
    PixPayout,
    UsdtPurchase,
    UsdtInvestment,
}

impl TransactionType {
    pub const ALL: [TransactionType; 4] = [Self::PixPayin, Self::PixPayout, Self::UsdtPurchase, Self::UsdtInvestment];
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::PixPayin => write!(f, "PixPayin"),
            TransactionType::PixPayout => write!(f, "PixPayout"),
            TransactionType::UsdtPurchase => write!(f, "UsdtPurchase"),
            TransactionType::UsdtInvestment => write!(f, "UsdtInvestment"),
        }
    }
}

impl FromStr for TransactionType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PixPayin" => Ok(Self::PixPayin),
            "PixPayout" => Ok(Self::PixPayout),
            "UsdtPurchase" => Ok(Self::UsdtPurchase),
            "UsdtInvestment" => Ok(Self::UsdtInvestment),
            s => Err(ConversionError(format!("Invalid transaction type: {s}"))),
        }
    }
}

//--------------------------------------   Decimal columns     ---------------------------------------------------------
// SQLite has no decimal type, so these are stored as TEXT and parsed on the way out.
macro_rules! decimal_text_column {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Decimal);

        impl $name {
            pub fn value(&self) -> Decimal {
                self.0
            }
        }

        impl From<Decimal> for $name {
            fn from(value: Decimal) -> Self {
                Self(value)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0.normalize())
            }
        }

        #[cfg(feature = "sqlite")]
        impl Type<sqlx::Sqlite> for $name {
            fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                <String as Type<sqlx::Sqlite>>::type_info()
            }

            fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
                <String as Type<sqlx::Sqlite>>::compatible(ty)
            }
        }

        #[cfg(feature = "sqlite")]
        impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
            ) -> sqlx::encode::IsNull {
                <String as sqlx::Encode<'q, sqlx::Sqlite>>::encode(self.0.normalize().to_string(), buf)
            }
        }

        #[cfg(feature = "sqlite")]
        impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for $name {
            fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
                Ok(Self(Decimal::from_str(s)?))
            }
        }
    };
}

decimal_text_column!(ExchangeRate);
decimal_text_column!(Percentage);

//--------------------------------------  PendingTransaction   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct PendingTransaction {
    pub id: i64,
    /// The payment provider's identifier for this transaction. Unique.
    pub external_id: String,
    pub wallet_id: i64,
    pub transaction_type: TransactionType,
    /// The amount that will be credited on completion. Provider-reported amounts never override this value.
    pub expected_amount: Amount,
    pub expected_fiat_amount: Amount,
    /// The effective rate (fiat per unit), recorded on completion.
    pub exchange_rate: Option<ExchangeRate>,
    pub status: TransactionStatus,
    /// The status this transaction held before its most recent transition.
    pub previous_status: Option<TransactionStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPendingTransaction {
    pub external_id: String,
    /// The owner of the wallet that will be credited. The wallet is created if it does not exist yet.
    pub user_id: String,
    pub transaction_type: TransactionType,
    pub expected_amount: Amount,
    pub expected_fiat_amount: Amount,
    pub created_at: DateTime<Utc>,
}

impl NewPendingTransaction {
    pub fn new(external_id: &str, user_id: &str, transaction_type: TransactionType, expected_amount: Amount) -> Self {
        Self {
            external_id: external_id.to_string(),
            user_id: user_id.to_string(),
            transaction_type,
            expected_amount,
            expected_fiat_amount: Amount::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_fiat_amount(mut self, amount: Amount) -> Self {
        self.expected_fiat_amount = amount;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// The result of a guarded status transition on a pending transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The transition was applied. `transaction.previous_status` holds the status the row had before the update.
    Applied { transaction: PendingTransaction },
    /// Nothing changed, typically because the transaction was already terminal.
    NoOp { transaction: PendingTransaction, reason: String },
}

impl TransitionOutcome {
    pub fn transaction(&self) -> &PendingTransaction {
        match self {
            TransitionOutcome::Applied { transaction, .. } => transaction,
            TransitionOutcome::NoOp { transaction, .. } => transaction,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied { .. })
    }
}

//--------------------------------------        Wallet         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Wallet {
    pub id: i64,
    pub user_id: String,
    pub balance: Amount,
    pub frozen_balance: Amount,
    pub total_deposited: Amount,
    pub total_withdrawn: Amount,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    CommissionCycle    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum CycleType {
    Weekly,
    Monthly,
}

impl Display for CycleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleType::Weekly => write!(f, "Weekly"),
            CycleType::Monthly => write!(f, "Monthly"),
        }
    }
}

impl FromStr for CycleType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            s => Err(ConversionError(format!("Invalid cycle type: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum CycleStatus {
    Active,
    Processing,
    Completed,
}

impl Display for CycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleStatus::Active => write!(f, "Active"),
            CycleStatus::Processing => write!(f, "Processing"),
            CycleStatus::Completed => write!(f, "Completed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct CommissionCycle {
    pub id: i64,
    pub cycle_type: CycleType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: CycleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommissionCycle {
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.start_date <= at && at < self.end_date
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCommissionCycle {
    pub cycle_type: CycleType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl NewCommissionCycle {
    pub fn new(cycle_type: CycleType, start_date: DateTime<Utc>, end_date: DateTime<Utc>) -> Self {
        Self { cycle_type, start_date, end_date }
    }
}

//--------------------------------------     PeriodEarning     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct PeriodEarning {
    pub id: i64,
    pub cycle_id: i64,
    pub sales_rep_id: String,
    pub seller_id: String,
    pub pix_payin_volume: Amount,
    pub pix_payout_volume: Amount,
    pub usdt_purchase_volume: Amount,
    pub usdt_investment_volume: Amount,
    pub pix_payin_commission: Amount,
    pub pix_payout_commission: Amount,
    pub usdt_purchase_commission: Amount,
    pub usdt_investment_commission: Amount,
    pub total_volume: Amount,
    pub total_commission: Amount,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PeriodEarning {
    pub fn volume_for(&self, transaction_type: TransactionType) -> Amount {
        match transaction_type {
            TransactionType::PixPayin => self.pix_payin_volume,
            TransactionType::PixPayout => self.pix_payout_volume,
            TransactionType::UsdtPurchase => self.usdt_purchase_volume,
            TransactionType::UsdtInvestment => self.usdt_investment_volume,
        }
    }
}

/// Volume increments for a single period earning row. Exactly one counter is non-zero when built from a
/// transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VolumeDelta {
    pub pix_payin: Amount,
    pub pix_payout: Amount,
    pub usdt_purchase: Amount,
    pub usdt_investment: Amount,
}

impl VolumeDelta {
    pub fn for_transaction(transaction_type: TransactionType, amount: Amount) -> Self {
        let mut delta = Self::default();
        match transaction_type {
            TransactionType::PixPayin => delta.pix_payin = amount,
            TransactionType::PixPayout => delta.pix_payout = amount,
            TransactionType::UsdtPurchase => delta.usdt_purchase = amount,
            TransactionType::UsdtInvestment => delta.usdt_investment = amount,
        }
        delta
    }

    pub fn total(&self) -> Amount {
        self.pix_payin + self.pix_payout + self.usdt_purchase + self.usdt_investment
    }
}

/// Commission amounts derived from the volumes of one [`PeriodEarning`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommissionBreakdown {
    pub pix_payin: Amount,
    pub pix_payout: Amount,
    pub usdt_purchase: Amount,
    pub usdt_investment: Amount,
}

impl CommissionBreakdown {
    pub fn set(&mut self, transaction_type: TransactionType, amount: Amount) {
        match transaction_type {
            TransactionType::PixPayin => self.pix_payin = amount,
            TransactionType::PixPayout => self.pix_payout = amount,
            TransactionType::UsdtPurchase => self.usdt_purchase = amount,
            TransactionType::UsdtInvestment => self.usdt_investment = amount,
        }
    }

    pub fn total(&self) -> Amount {
        self.pix_payin + self.pix_payout + self.usdt_purchase + self.usdt_investment
    }
}

//--------------------------------------   Sales reps & rules  ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct SalesRepAssignment {
    pub id: i64,
    pub sales_rep_id: String,
    pub seller_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct CommissionRule {
    pub id: i64,
    /// `None` for a global rule. A rep-specific rule takes precedence over the global one.
    pub sales_rep_id: Option<String>,
    pub transaction_type: TransactionType,
    pub percentage: Percentage,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCommissionRule {
    pub sales_rep_id: Option<String>,
    pub transaction_type: TransactionType,
    pub percentage: Percentage,
}

impl NewCommissionRule {
    pub fn global(transaction_type: TransactionType, percentage: Decimal) -> Self {
        Self { sales_rep_id: None, transaction_type, percentage: Percentage(percentage) }
    }

    pub fn for_rep(sales_rep_id: &str, transaction_type: TransactionType, percentage: Decimal) -> Self {
        Self { sales_rep_id: Some(sales_rep_id.to_string()), transaction_type, percentage: Percentage(percentage) }
    }
}

//--------------------------------------         Audit         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Type, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    High,
    Critical,
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "Info"),
            Severity::Warning => write!(f, "Warning"),
            Severity::High => write!(f, "High"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

impl Severity {
    pub fn log_level(&self) -> Level {
        match self {
            Severity::Info => Level::Info,
            Severity::Warning => Level::Warn,
            Severity::High | Severity::Critical => Level::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    WebhookReceived,
    TransactionUnmatched,
    TransactionCompleted,
    TransactionFailed,
    TransactionProcessing,
    TransactionExpired,
    TransactionCancelled,
    TransitionNoop,
    AmountMismatch,
    CreditFailed,
    CommissionAccrued,
    CommissionAccrualFailed,
    CycleOpened,
    CycleCalculated,
    CycleCompleted,
    EarningPaid,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::WebhookReceived => "WEBHOOK_RECEIVED",
            AuditAction::TransactionUnmatched => "TRANSACTION_UNMATCHED",
            AuditAction::TransactionCompleted => "TRANSACTION_COMPLETED",
            AuditAction::TransactionFailed => "TRANSACTION_FAILED",
            AuditAction::TransactionProcessing => "TRANSACTION_PROCESSING",
            AuditAction::TransactionExpired => "TRANSACTION_EXPIRED",
            AuditAction::TransactionCancelled => "TRANSACTION_CANCELLED",
            AuditAction::TransitionNoop => "TRANSITION_NOOP",
            AuditAction::AmountMismatch => "AMOUNT_MISMATCH",
            AuditAction::CreditFailed => "CREDIT_FAILED",
            AuditAction::CommissionAccrued => "COMMISSION_ACCRUED",
            AuditAction::CommissionAccrualFailed => "COMMISSION_ACCRUAL_FAILED",
            AuditAction::CycleOpened => "CYCLE_OPENED",
            AuditAction::CycleCalculated => "CYCLE_CALCULATED",
            AuditAction::CycleCompleted => "CYCLE_COMPLETED",
            AuditAction::EarningPaid => "EARNING_PAID",
        }
    }

    /// The audit action recorded when a transaction enters `status`.
    pub fn for_status(status: TransactionStatus) -> Option<Self> {
        match status {
            TransactionStatus::Pending => None,
            TransactionStatus::Processing => Some(Self::TransactionProcessing),
            TransactionStatus::Completed => Some(Self::TransactionCompleted),
            TransactionStatus::Failed => Some(Self::TransactionFailed),
            TransactionStatus::Expired => Some(Self::TransactionExpired),
            TransactionStatus::Cancelled => Some(Self::TransactionCancelled),
        }
    }
}

impl Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source metadata for an inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMetadata {
    pub fn new<S: Into<String>>(ip_address: Option<S>, user_agent: Option<S>) -> Self {
        Self { ip_address: ip_address.map(Into::into), user_agent: user_agent.map(Into::into) }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub success: bool,
    pub severity: Severity,
    pub risk_score: i64,
    pub amount: Option<Amount>,
    pub before_state: Option<Json<Value>>,
    pub after_state: Option<Json<Value>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub error_message: Option<String>,
    pub flagged_for_review: bool,
    pub created_at: DateTime<Utc>,
}

/// An audit entry waiting to be written. `risk_score` and `flagged_for_review` are filled in by the recorder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAuditEntry {
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub success: bool,
    pub severity: Severity,
    pub risk_score: i64,
    pub amount: Option<Amount>,
    pub before_state: Option<Value>,
    pub after_state: Option<Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub error_message: Option<String>,
    pub flagged_for_review: bool,
    pub created_at: DateTime<Utc>,
}

impl NewAuditEntry {
    pub fn new(action: AuditAction, resource_type: &str) -> Self {
        Self {
            action,
            resource_type: resource_type.to_string(),
            resource_id: None,
            success: true,
            severity: Severity::Info,
            risk_score: 0,
            amount: None,
            before_state: None,
            after_state: None,
            ip_address: None,
            user_agent: None,
            error_message: None,
            flagged_for_review: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_resource_id<S: Display>(mut self, id: S) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn failed<S: Into<String>>(mut self, error: S) -> Self {
        self.success = false;
        self.error_message = Some(error.into());
        self
    }

    pub fn with_amount(mut self, amount: Amount) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_before<T: Serialize>(mut self, state: &T) -> Self {
        self.before_state = serde_json::to_value(state).ok();
        self
    }

    pub fn with_after<T: Serialize>(mut self, state: &T) -> Self {
        self.after_state = serde_json::to_value(state).ok();
        self
    }

    pub fn with_metadata(mut self, meta: &RequestMetadata) -> Self {
        self.ip_address = meta.ip_address.clone();
        self.user_agent = meta.user_agent.clone();
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(!TransactionStatus::Processing.is_terminal());
        for status in TransactionStatus::TERMINAL {
            assert!(status.is_terminal(), "{status} should be terminal");
        }
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [TransactionStatus::Pending, TransactionStatus::Processing, TransactionStatus::Cancelled] {
            assert_eq!(TransactionStatus::from_str(&status.to_string()).unwrap(), status);
        }
        assert!(TransactionStatus::from_str("Paid").is_err());
    }

    #[test]
    fn volume_delta_only_touches_one_counter() {
        let delta = VolumeDelta::for_transaction(TransactionType::UsdtPurchase, Amount::from_units(25));
        assert_eq!(delta.usdt_purchase, Amount::from_units(25));
        assert!(delta.pix_payin.is_zero() && delta.pix_payout.is_zero() && delta.usdt_investment.is_zero());
        assert_eq!(delta.total(), Amount::from_units(25));
    }

    #[test]
    fn audit_builder() {
        let meta = RequestMetadata::new(Some("10.0.0.1"), Some("curl/8.0"));
        let entry = NewAuditEntry::new(AuditAction::CreditFailed, "transaction")
            .with_resource_id("tx-1")
            .with_severity(Severity::Critical)
            .with_metadata(&meta)
            .failed("disk full");
        assert!(!entry.success);
        assert_eq!(entry.resource_id.as_deref(), Some("tx-1"));
        assert_eq!(entry.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(entry.error_message.as_deref(), Some("disk full"));
        assert_eq!(entry.action.to_string(), "CREDIT_FAILED");
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Warning);
        assert_eq!(Severity::Warning.log_level(), Level::Warn);
    }
}
