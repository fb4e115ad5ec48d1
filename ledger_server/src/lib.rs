//! # Ledger Payment Gateway server
//! This crate hosts the HTTP front end of the ledger engine. It is responsible for:
//! * Receiving payment notifications from the provider and handing them to the reconciliation flow.
//! * Answering the provider's webhook verification challenge.
//! * Pushing live transaction status changes to websocket subscribers.
//! * Exposing a small admin API, guarded by a shared API key, for transactions, wallets, the audit log and the
//!   commission cycle workflow.
//! * Expiring stale transactions in the background.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/webhook/payment`: Provider notifications (POST) and the verification challenge (GET).
//! * `/ws/transactions/{external_id}`: Live status updates for one transaction.
//! * `/api/...`: The admin API. See [routes](routes/index.html).

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod helpers;
pub mod live_updates;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
