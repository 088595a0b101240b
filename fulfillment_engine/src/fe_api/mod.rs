//! # Fulfillment engine public API
//!
//! The `fe_api` module exposes the programmatic API for the fulfillment engine. The API is
//! modular, so clients can pick the functionality they need, or host different parts on
//! different machines.
//!
//! * [`order_flow_api`] is the purchase saga orchestrator: debit, fulfil, settle-or-compensate,
//!   plus the administrative order transition path.
//! * [`settlement_api`] reconciles asynchronous payment-gateway notifications against pending
//!   wallet top-ups.
//! * [`accounts_api`] answers questions: accounts, orders, ledgers and audit history.
//!
//! # API usage
//!
//! The pattern for all the APIs is the same. An API instance is created by supplying a database
//! backend that implements the specific backend traits required by the API.
//!
//! For example, to query accounts on the database:
//!
//! ```rust,ignore
//! use fulfillment_engine::{AccountApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements AccountManagement
//! let api = AccountApi::new(db);
//! let account = api.account_by_id(42).await?;
//! ```

pub mod accounts_api;
pub mod errors;
pub mod order_flow_api;
pub mod settlement_api;
