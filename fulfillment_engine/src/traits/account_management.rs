use thiserror::Error;

use crate::{
    db_types::{Account, AuditEvent, LedgerEntry, Order, OrderId, WalletTopup},
    order_objects::OrderQueryFilter,
};

#[derive(Debug, Clone, Error)]
pub enum AccountApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User error constructing query: {0}")]
    QueryError(String),
}

impl From<sqlx::Error> for AccountApiError {
    fn from(e: sqlx::Error) -> Self {
        AccountApiError::DatabaseError(e.to_string())
    }
}

/// The `AccountManagement` trait defines the read side of the engine's storage.
///
/// The [`FulfillmentGatewayDatabase`](crate::traits::FulfillmentGatewayDatabase) trait handles the
/// flows that move money and change order state. `AccountManagement` only answers questions about
/// what those flows have done.
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    /// Fetches the account with the given id. If no account exists, `None` is returned.
    async fn fetch_account(&self, account_id: i64) -> Result<Option<Account>, AccountApiError>;

    /// Fetches the order with the given public order id, or `None` if it does not exist.
    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, AccountApiError>;

    /// Fetches every order placed by the account, newest first.
    async fn fetch_orders_for_account(&self, account_id: i64) -> Result<Vec<Order>, AccountApiError>;

    /// Fetches the account's ledger, oldest first. Replaying the amounts from a zero balance
    /// reproduces the current balance.
    async fn fetch_ledger_for_account(&self, account_id: i64) -> Result<Vec<LedgerEntry>, AccountApiError>;

    /// Fetches the wallet top-up with the given gateway reference, if any.
    async fn fetch_topup(&self, external_ref: &str) -> Result<Option<WalletTopup>, AccountApiError>;

    /// Searches orders according to the given filter. An empty filter returns every order.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, AccountApiError>;

    /// Fetches the audit trail for a single order, oldest first.
    async fn fetch_audit_events_for_order(&self, order_id: &OrderId) -> Result<Vec<AuditEvent>, AccountApiError>;
}
