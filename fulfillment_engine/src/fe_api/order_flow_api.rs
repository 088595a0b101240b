use std::{fmt::Debug, sync::Arc};

use log::*;
use serde_json::json;
use tokio::time::timeout;

use crate::{
    audit,
    config::FulfilmentPolicy,
    db_types::{AuditEventType, NewAuditEvent, NewOrder, Order, OrderId, OrderState},
    events::{EventProducers, OrderCompletedEvent, OrderFailedEvent},
    fe_api::errors::PurchaseApiError,
    helpers::new_order_ref,
    order_objects::{PurchaseOutcome, PurchaseRequest},
    providers::{FulfilmentRequest, ProviderAdapter, ProviderRegistry, ProviderResult},
    traits::{FulfillmentGatewayDatabase, FulfillmentGatewayError},
};

/// `OrderFlowApi` is the purchase saga orchestrator.
///
/// A purchase runs in two phases. Phase 1 is local and atomic: the account is debited and the
/// order stored as `pending` in one database transaction. Phase 2 is the external vendor call,
/// made strictly outside any lock and bounded by the configured deadline. Every Phase-2 outcome
/// is then settled: a confirmed delivery completes the order, anything else compensates the
/// debit and fails it. The debit is durable before the vendor is contacted, so no outcome of the
/// vendor call can lose money silently; the worst a crash can do is strand an order in `pending`
/// with its debit on the ledger.
pub struct OrderFlowApi<B> {
    db: B,
    registry: ProviderRegistry,
    policy: FulfilmentPolicy,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, registry: ProviderRegistry, policy: FulfilmentPolicy, producers: EventProducers) -> Self {
        Self { db, registry, policy, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: FulfillmentGatewayDatabase
{
    /// Runs one purchase end to end and returns the order together with the account balance as
    /// it stands afterwards.
    ///
    /// Failure modes, in the order they can occur:
    /// * [`PurchaseApiError::ProductNotFound`] / [`PurchaseApiError::InvalidPrice`] — resolution
    ///   failed; no side effects at all.
    /// * [`PurchaseApiError::InsufficientBalance`] — the debit was refused; no order exists.
    /// * [`PurchaseApiError::ProviderError`] — the vendor call failed or timed out; the debit has
    ///   been compensated and the order is `failed`.
    /// * [`PurchaseApiError::CompensationFailed`] — the vendor call failed and so did the refund.
    ///   Logged and audit-recorded for manual intervention; never retried automatically.
    ///
    /// When the request carries an idempotency reference that already names an order, that order
    /// and the current balance are returned without debiting again, whatever state the order is
    /// in.
    pub async fn purchase(&self, request: PurchaseRequest) -> Result<PurchaseOutcome, PurchaseApiError> {
        let account_id = request.account_id;
        if let Some(order_ref) = &request.order_ref {
            if let Some(existing) = self.db.fetch_order_by_order_id(order_ref).await? {
                debug!("🔄️ Purchase replay for order [{order_ref}]. Returning the stored order.");
                return self.replayed_outcome(existing).await;
            }
        }
        let order_ref = request.order_ref.clone().unwrap_or_else(new_order_ref);
        let resolved = match self.registry.resolve(request.category, &request.product_id, request.vendor).await {
            Some(resolved) => resolved,
            None => {
                let err = PurchaseApiError::ProductNotFound {
                    category: request.category,
                    product_id: request.product_id.clone(),
                };
                self.audit_rejection(account_id, &order_ref, &err).await;
                return Err(err);
            },
        };
        let price = resolved.info.price;
        if !price.is_positive() {
            let err = PurchaseApiError::InvalidPrice { product_id: request.product_id.clone(), price };
            self.audit_rejection(account_id, &order_ref, &err).await;
            return Err(err);
        }
        let vendor = resolved.info.vendor;
        trace!("🔄️ {vendor} resolved {}/{} at {price}", request.category, request.product_id);

        // Phase 1: debit and create the order in one transaction. After this point every failure
        // path must compensate.
        let new_order =
            NewOrder::new(order_ref, account_id, request.product_id.clone(), request.category, vendor, price);
        let (order, account, inserted) = match self.db.begin_purchase(new_order).await {
            Ok(result) => result,
            Err(FulfillmentGatewayError::InsufficientBalance { available, required, .. }) => {
                let err = PurchaseApiError::InsufficientBalance { available, required };
                info!("🔄️ Purchase by account {account_id} rejected: {err}");
                audit::record(
                    &self.db,
                    NewAuditEvent::new(AuditEventType::PurchaseRejected)
                        .for_account(account_id)
                        .failed(err.to_string())
                        .with_details(json!({"product_id": request.product_id, "price": price})),
                )
                .await;
                return Err(err);
            },
            Err(e) => return Err(e.into()),
        };
        if !inserted {
            // A concurrent request with the same reference won the insert. Its saga owns the
            // vendor call; this one just reports what exists.
            debug!("🔄️ Order [{}] was inserted concurrently. Returning it without fulfilling.", order.order_id);
            return Ok(PurchaseOutcome { order, balance: account.balance });
        }

        // Phase 2: the vendor call, outside any lock.
        let fulfilment = FulfilmentRequest {
            order_ref: order.order_id.clone(),
            product_id: request.product_id,
            category: request.category,
            options: request.options,
        };
        match self.attempt_fulfilment(&resolved.adapter, &fulfilment).await {
            ProviderResult::Success { external_ref, payload } => {
                let order = self.db.settle_order_completed(&order.order_id, Some(&external_ref), Some(&payload)).await?;
                info!("🔄️ Order [{}] completed by {vendor}. Ref: {external_ref}", order.order_id);
                audit::record(
                    &self.db,
                    NewAuditEvent::new(AuditEventType::PurchaseCompleted)
                        .for_account(account_id)
                        .for_order(order.order_id.clone())
                        .with_details(json!({"vendor": vendor, "price": price, "external_ref": external_ref})),
                )
                .await;
                self.producers.publish_order_completed(OrderCompletedEvent::new(order.clone())).await;
                Ok(PurchaseOutcome { order, balance: account.balance })
            },
            failure => {
                let reason = match failure {
                    ProviderResult::Timeout => {
                        format!("{vendor} did not answer within {}s", self.policy.timeout.as_secs())
                    },
                    ProviderResult::Failure { message } => message,
                    ProviderResult::Success { .. } => unreachable!("success is handled above"),
                };
                self.compensate(order, reason).await
            },
        }
    }

    /// Calls the vendor, folding an elapsed deadline into [`ProviderResult::Timeout`].
    ///
    /// Definitive `Failure` outcomes are retried up to the configured attempt count; the vendor
    /// has said nothing was delivered, so a second call cannot double-deliver. A `Timeout` is
    /// never retried: the delivery state is unknown and retrying could deliver twice.
    async fn attempt_fulfilment(&self, adapter: &Arc<dyn ProviderAdapter>, request: &FulfilmentRequest) -> ProviderResult {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last = ProviderResult::Failure { message: "No fulfilment attempts were made".to_string() };
        for attempt in 1..=max_attempts {
            last = match timeout(self.policy.timeout, adapter.fulfil(request)).await {
                Ok(result) => result,
                Err(_) => ProviderResult::Timeout,
            };
            match &last {
                ProviderResult::Success { .. } | ProviderResult::Timeout => return last,
                ProviderResult::Failure { message } => {
                    warn!("🔄️ Fulfilment attempt {attempt}/{max_attempts} for [{}] failed: {message}", request.order_ref);
                },
            }
        }
        last
    }

    /// The compensation branch: credit the price back and fail the order.
    async fn compensate(&self, order: Order, reason: String) -> Result<PurchaseOutcome, PurchaseApiError> {
        let order_id = order.order_id.clone();
        match self.db.compensate_purchase(&order_id, &reason).await {
            Ok((order, account)) => {
                info!("🔄️ Order [{order_id}] failed and {} was refunded to account {}: {reason}", order.price, account.id);
                audit::record(
                    &self.db,
                    NewAuditEvent::new(AuditEventType::PurchaseFailed)
                        .for_account(account.id)
                        .for_order(order_id.clone())
                        .failed(reason.clone())
                        .with_details(json!({"vendor": order.provider, "refund": order.price})),
                )
                .await;
                self.producers.publish_order_failed(OrderFailedEvent::new(order.clone(), reason.clone())).await;
                Err(PurchaseApiError::ProviderError { order_id, reason, refund: order.price })
            },
            Err(e) => {
                // The debit stands and the order could not be failed, or the credit could not be
                // written. Automation stops here; an operator has to reconcile the ledger.
                error!(
                    "🚨️ Compensation for order [{order_id}] failed: {e}. The account has been debited for an order \
                     that was not delivered. Manual reconciliation is required."
                );
                audit::record(
                    &self.db,
                    NewAuditEvent::new(AuditEventType::CompensationFailed)
                        .for_account(order.account_id)
                        .for_order(order_id.clone())
                        .failed(e.to_string())
                        .with_details(json!({"fulfilment_error": reason, "price": order.price})),
                )
                .await;
                Err(PurchaseApiError::CompensationFailed { order_id, reason })
            },
        }
    }

    async fn replayed_outcome(&self, order: Order) -> Result<PurchaseOutcome, PurchaseApiError> {
        let account = self
            .db
            .fetch_account(order.account_id)
            .await?
            .ok_or(FulfillmentGatewayError::AccountNotFound(order.account_id))?;
        Ok(PurchaseOutcome { balance: account.balance, order })
    }

    /// The administrative order transition path. The move is validated against the same
    /// transition table the saga uses; illegal moves are rejected without touching the row.
    ///
    /// This never moves money. In particular, `failed → refunded` only records that an operator
    /// has closed out a compensated order; the refund itself was written by the saga.
    pub async fn transition_order(
        &self,
        order_id: &OrderId,
        target: OrderState,
    ) -> Result<Order, FulfillmentGatewayError> {
        let order = self.db.transition_order(order_id, target).await?;
        audit::record(
            &self.db,
            NewAuditEvent::new(AuditEventType::OrderTransition)
                .for_account(order.account_id)
                .for_order(order_id.clone())
                .with_details(json!({"to": target})),
        )
        .await;
        Ok(order)
    }

    async fn audit_rejection(&self, account_id: i64, order_ref: &OrderId, err: &PurchaseApiError) {
        info!("🔄️ Purchase {order_ref} by account {account_id} rejected: {err}");
        audit::record(
            &self.db,
            NewAuditEvent::new(AuditEventType::PurchaseRejected).for_account(account_id).failed(err.to_string()),
        )
        .await;
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
