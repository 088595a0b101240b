//! # Database interface contracts.
//!
//! This module defines the interface contracts that fulfillment engine database *backends* must
//! implement.
//!
//! ## Accounts and money
//! An account is a prepaid balance. Every change to a balance is paired with a ledger entry in the
//! same transaction, so the ledger is a complete, replayable history of the account.
//!
//! The [`FulfillmentGatewayDatabase`] trait carries the state-changing flows: the atomic
//! debit-and-create-order step of a purchase, settlement and compensation, top-up crediting and
//! manual order transitions.
//!
//! The [`AccountManagement`] trait provides the read side: accounts, orders, ledgers, top-ups and
//! audit history.

mod account_management;
mod fulfillment_database;

pub use account_management::{AccountApiError, AccountManagement};
pub use fulfillment_database::{FulfillmentGatewayDatabase, FulfillmentGatewayError};
