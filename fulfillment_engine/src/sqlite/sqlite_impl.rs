//! `SqliteDatabase` is a concrete implementation of a fulfillment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the
//! [`crate::traits`] module.
//!
//! Money transactions here follow one pattern: the first statement is always a conditional
//! `UPDATE`. Under WAL that takes the write lock before the transaction reads anything, so
//! concurrent debits, refunds and settlements queue up behind each other instead of failing with
//! busy-snapshot errors at commit time.
use std::fmt::Debug;

use log::*;
use serde_json::Value;
use sfg_common::Credits;
use sqlx::SqlitePool;

use super::db::{accounts, audit, db_url, ledger, new_pool, orders, topups};
use crate::{
    db_types::{
        Account,
        AuditEvent,
        LedgerEntry,
        NewAuditEvent,
        NewLedgerEntry,
        NewOrder,
        NewWalletTopup,
        Order,
        OrderId,
        OrderState,
        TopupSettlement,
        WalletTopup,
    },
    order_objects::OrderQueryFilter,
    traits::{AccountApiError, AccountManagement, FulfillmentGatewayDatabase, FulfillmentGatewayError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl FulfillmentGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_account(&self) -> Result<Account, FulfillmentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        accounts::create_account(&mut conn).await
    }

    async fn begin_purchase(&self, order: NewOrder) -> Result<(Order, Account, bool), FulfillmentGatewayError> {
        if !order.price.is_positive() {
            return Err(FulfillmentGatewayError::NonPositiveAmount);
        }
        // Cheap idempotency check before any money moves. A retried order must come back
        // unchanged even if the account can no longer cover its price.
        if let Some(existing) = self.fetch_order_by_order_id(&order.order_id).await? {
            let account = self
                .fetch_account(existing.account_id)
                .await?
                .ok_or(FulfillmentGatewayError::AccountNotFound(existing.account_id))?;
            debug!("🗃️ Order [{}] already exists. Returning it without debiting.", existing.order_id);
            return Ok((existing, account, false));
        }
        let mut tx = self.pool.begin().await?;
        let account = accounts::debit_account(order.account_id, order.price, &mut tx).await?;
        let (order, inserted) = orders::idempotent_insert(order, &mut tx).await?;
        if !inserted {
            // A concurrent call inserted the same order after our pre-check. It owns the debit;
            // roll ours back and hand back what is in the store.
            tx.rollback().await?;
            let account = self
                .fetch_account(order.account_id)
                .await?
                .ok_or(FulfillmentGatewayError::AccountNotFound(order.account_id))?;
            return Ok((order, account, false));
        }
        let entry = NewLedgerEntry::purchase(account.id, order.order_id.clone(), order.price);
        ledger::insert_entry(entry, account.balance, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Order [{}] opened for account {}. {} debited, balance now {}",
            order.order_id, account.id, order.price, account.balance
        );
        Ok((order, account, true))
    }

    async fn settle_order_completed(
        &self,
        order_id: &OrderId,
        external_ref: Option<&str>,
        payload: Option<&Value>,
    ) -> Result<Order, FulfillmentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let payload_json = payload.map(|v| v.to_string());
        match orders::settle_order(order_id, external_ref, payload_json, &mut conn).await? {
            Some(order) => {
                debug!("🗃️ Order [{order_id}] completed. Vendor ref: {}", external_ref.unwrap_or("none"));
                Ok(order)
            },
            None => match orders::fetch_order_by_order_id(order_id, &mut conn).await? {
                Some(order) => Err(FulfillmentGatewayError::InvalidStateTransition {
                    order_id: order_id.clone(),
                    from: order.state,
                    to: OrderState::Completed,
                }),
                None => Err(FulfillmentGatewayError::OrderNotFound(order_id.clone())),
            },
        }
    }

    async fn compensate_purchase(
        &self,
        order_id: &OrderId,
        reason: &str,
    ) -> Result<(Order, Account), FulfillmentGatewayError> {
        let mut tx = self.pool.begin().await?;
        // Claiming the order is the write that leads the transaction. Only one compensation can
        // win this update, so the refund below cannot be applied twice.
        let order = orders::mark_order_failed(order_id, &mut tx).await?;
        let order = match order {
            Some(order) => order,
            None => {
                tx.rollback().await?;
                return match self.fetch_order_by_order_id(order_id).await? {
                    Some(order) => Err(FulfillmentGatewayError::InvalidStateTransition {
                        order_id: order_id.clone(),
                        from: order.state,
                        to: OrderState::Failed,
                    }),
                    None => Err(FulfillmentGatewayError::OrderNotFound(order_id.clone())),
                };
            },
        };
        let account = accounts::credit_account(order.account_id, order.price, &mut tx).await?;
        let entry = NewLedgerEntry::refund(account.id, order.order_id.clone(), order.price, reason);
        ledger::insert_entry(entry, account.balance, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Order [{order_id}] compensated: {} returned to account {}, balance now {}",
            order.price, account.id, account.balance
        );
        Ok((order, account))
    }

    async fn transition_order(
        &self,
        order_id: &OrderId,
        new_state: OrderState,
    ) -> Result<Order, FulfillmentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        orders::transition_order_checked(order_id, new_state, &mut conn).await
    }

    async fn create_topup(&self, topup: NewWalletTopup) -> Result<WalletTopup, FulfillmentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        topups::idempotent_insert(topup, &mut conn).await
    }

    async fn settle_topup(
        &self,
        external_ref: &str,
        amount: Credits,
        claimed_account_id: Option<i64>,
    ) -> Result<TopupSettlement, FulfillmentGatewayError> {
        if !amount.is_positive() {
            return Err(FulfillmentGatewayError::NonPositiveAmount);
        }
        let mut tx = self.pool.begin().await?;
        // Claim first. Exactly one of any number of concurrent notifications for this reference
        // gets the row; everyone else lands in the AlreadySettled arm.
        let topup = match topups::claim_topup(external_ref, &mut tx).await? {
            Some(topup) => topup,
            None => {
                tx.rollback().await?;
                return match self.fetch_topup(external_ref).await? {
                    Some(topup) => {
                        debug!("💳️ Top-up {external_ref} was already settled. Nothing to do.");
                        Ok(TopupSettlement::AlreadySettled(topup))
                    },
                    None => Ok(TopupSettlement::Unknown),
                };
            },
        };
        if let Some(claimed_id) = claimed_account_id {
            if claimed_id != topup.account_id {
                warn!(
                    "💳️ Top-up {external_ref} notification names account {claimed_id}, but the top-up belongs to \
                     account {}. Discarding the claim.",
                    topup.account_id
                );
                tx.rollback().await?;
                let stored = self
                    .fetch_topup(external_ref)
                    .await?
                    .ok_or_else(|| FulfillmentGatewayError::TopupNotFound(external_ref.to_string()))?;
                return Ok(TopupSettlement::AccountMismatch { topup: stored, claimed_account_id: claimed_id });
            }
        }
        if amount != topup.amount {
            warn!(
                "💳️ Top-up {external_ref} was registered for {} but the gateway settled {amount}. Crediting the \
                 settled amount.",
                topup.amount
            );
        }
        let account = accounts::credit_account(topup.account_id, amount, &mut tx).await?;
        let entry = NewLedgerEntry::topup(topup.account_id, amount, external_ref.to_string());
        let entry = ledger::insert_entry(entry, account.balance, &mut tx).await?;
        tx.commit().await?;
        debug!("💳️ Top-up {external_ref} settled. {amount} credited to account {}", account.id);
        Ok(TopupSettlement::Credited { topup, account, entry })
    }

    async fn fail_topup(&self, external_ref: &str) -> Result<Option<WalletTopup>, FulfillmentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let topup = topups::fail_topup(external_ref, &mut conn).await?;
        if let Some(t) = &topup {
            debug!("💳️ Top-up {} marked as failed", t.external_ref);
        }
        Ok(topup)
    }

    async fn record_audit_event(&self, event: NewAuditEvent) -> Result<i64, FulfillmentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let id = audit::insert_event(event, &mut conn).await?;
        Ok(id)
    }

    async fn close(&mut self) -> Result<(), FulfillmentGatewayError> {
        self.pool.close().await;
        Ok(())
    }
}

impl AccountManagement for SqliteDatabase {
    async fn fetch_account(&self, account_id: i64) -> Result<Option<Account>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        accounts::fetch_account(account_id, &mut conn).await
    }

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_account(&self, account_id: i64) -> Result<Vec<Order>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_account(account_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_ledger_for_account(&self, account_id: i64) -> Result<Vec<LedgerEntry>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        ledger::ledger_for_account(account_id, &mut conn).await
    }

    async fn fetch_topup(&self, external_ref: &str) -> Result<Option<WalletTopup>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let topup = topups::fetch_topup_by_ref(external_ref, &mut conn).await?;
        Ok(topup)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_audit_events_for_order(&self, order_id: &OrderId) -> Result<Vec<AuditEvent>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let events = audit::events_for_order(order_id, &mut conn).await?;
        Ok(events)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
