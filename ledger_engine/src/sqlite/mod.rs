//! SQLite backend for the ledger engine.
//!
//! Migrations live in `migrations/` and are embedded at compile time.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
