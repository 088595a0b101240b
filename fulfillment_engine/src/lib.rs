//! Storefront Fulfillment Gateway engine
//!
//! The fulfillment engine is the core of a prepaid-balance storefront: customers hold a credit
//! balance and spend it on digital goods that are delivered by external vendors. The engine owns
//! the money side of that arrangement. It debits a balance exactly once per purchase, places the
//! order with an upstream vendor, and guarantees the customer is made whole again if delivery
//! fails.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@sqlite`] and the [`mod@traits`] contracts). SQLite is
//!    the supported backend. You should never need to access the database directly; use the public
//!    APIs instead. The exception is the data types used in the database, which are defined in the
//!    [`db_types`] module and are public.
//! 2. The engine public API ([`mod@fe_api`]): the purchase saga ([`OrderFlowApi`]), webhook
//!    settlement ([`SettlementApi`]) and account queries ([`AccountApi`]). Backends implement the
//!    traits in [`mod@traits`] to power these APIs.
//! 3. The vendor layer ([`mod@providers`]): one adapter per upstream vendor translating that
//!    vendor's API into the engine's [`providers::ProviderResult`] vocabulary, and the registry
//!    that picks between them.
//!
//! The engine also emits events when purchases settle or fail and when top-ups are credited. A
//! simple hook framework ([`mod@events`]) lets outer layers subscribe to these without being
//! coupled to the orchestrator.
mod fe_api;
#[cfg(feature = "sqlite")]
mod sqlite;

pub mod audit;
pub mod config;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod order_objects;
pub mod providers;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use fe_api::{
    accounts_api::AccountApi,
    errors::{PurchaseApiError, SettlementApiError},
    order_flow_api::OrderFlowApi,
    settlement_api::{SettlementApi, TopupNotification, WebhookAck, WebhookOutcome},
};
