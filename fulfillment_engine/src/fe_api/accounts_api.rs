//! Unified read-only API for accounts, orders and ledgers.

use std::fmt::Debug;

use crate::{
    db_types::{Account, AuditEvent, LedgerEntry, Order, OrderId, WalletTopup},
    order_objects::{AccountStatement, OrderQueryFilter},
    traits::{AccountApiError, AccountManagement},
};

/// The `AccountApi` answers questions about what the money-moving flows have done. It never
/// mutates anything.
pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B>
where B: AccountManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Fetches the account with the given id. If no account exists, `None` is returned.
    pub async fn account_by_id(&self, account_id: i64) -> Result<Option<Account>, AccountApiError> {
        self.db.fetch_account(account_id).await
    }

    pub async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, AccountApiError> {
        self.db.fetch_order_by_order_id(order_id).await
    }

    /// Every order the account has placed, newest first.
    pub async fn orders_for_account(&self, account_id: i64) -> Result<Vec<Order>, AccountApiError> {
        self.db.fetch_orders_for_account(account_id).await
    }

    /// The account's full ledger, oldest first. Summing the amounts from zero reproduces the
    /// current balance.
    pub async fn history_for_account(&self, account_id: i64) -> Result<Vec<LedgerEntry>, AccountApiError> {
        self.db.fetch_ledger_for_account(account_id).await
    }

    /// The account's balance together with its complete order and ledger history, or `None` if
    /// the account does not exist.
    pub async fn statement_for_account(&self, account_id: i64) -> Result<Option<AccountStatement>, AccountApiError> {
        let Some(account) = self.db.fetch_account(account_id).await? else {
            return Ok(None);
        };
        let orders = self.db.fetch_orders_for_account(account_id).await?;
        let ledger = self.db.fetch_ledger_for_account(account_id).await?;
        Ok(Some(AccountStatement::new(account, orders, ledger)))
    }

    pub async fn fetch_topup(&self, external_ref: &str) -> Result<Option<WalletTopup>, AccountApiError> {
        self.db.fetch_topup(external_ref).await
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, AccountApiError> {
        self.db.search_orders(query).await
    }

    /// The audit trail for one order, oldest first.
    pub async fn audit_events_for_order(&self, order_id: &OrderId) -> Result<Vec<AuditEvent>, AccountApiError> {
        self.db.fetch_audit_events_for_order(order_id).await
    }
}
