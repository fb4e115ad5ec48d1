pub mod audit_api;
pub mod commission_api;
pub mod creditor;
pub mod matcher;
pub mod notifications;
pub mod payment_event;
pub mod reconciliation_api;
