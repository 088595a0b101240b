use serde_json::Value;
use sfg_common::Credits;
use thiserror::Error;

use crate::{
    db_types::{
        Account,
        NewAuditEvent,
        NewOrder,
        NewWalletTopup,
        Order,
        OrderId,
        OrderState,
        TopupSettlement,
        WalletTopup,
    },
    traits::{AccountApiError, AccountManagement},
};

/// This trait defines the state-changing behaviour for backends supporting the fulfillment engine.
///
/// This behaviour includes:
/// * Creating accounts and the atomic debit step of a purchase.
/// * Settling and compensating purchases after the vendor call has resolved.
/// * Creating and settling wallet top-ups from gateway notifications.
/// * Manual order state transitions.
///
/// Backends must keep one rule absolute: a balance never changes without a ledger entry written in
/// the same database transaction, and vice versa.
#[allow(async_fn_in_trait)]
pub trait FulfillmentGatewayDatabase: Clone + AccountManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Creates a new account with a zero balance.
    async fn create_account(&self) -> Result<Account, FulfillmentGatewayError>;

    /// Takes a new order and, in a single atomic transaction:
    /// * debits the account by the order price, failing if the balance would go negative,
    /// * stores the order in `pending` state,
    /// * writes a `purchase` ledger entry for the debit.
    ///
    /// This call is idempotent on the order id. If an order with the same id already exists, it is
    /// returned as-is, nothing is debited, and the `bool` in the result is `false`.
    ///
    /// Returns the order, the account as it stands after the debit, and whether the order was
    /// inserted by this call.
    async fn begin_purchase(&self, order: NewOrder) -> Result<(Order, Account, bool), FulfillmentGatewayError>;

    /// Marks a live order as `completed`, recording the vendor's reference and raw response.
    ///
    /// The order must currently be `pending` or `processing`; any other state returns
    /// [`FulfillmentGatewayError::InvalidStateTransition`] and changes nothing. The ledger is not
    /// touched, the purchase debit stands.
    async fn settle_order_completed(
        &self,
        order_id: &OrderId,
        external_ref: Option<&str>,
        payload: Option<&Value>,
    ) -> Result<Order, FulfillmentGatewayError>;

    /// Compensates a purchase whose delivery failed. In a single atomic transaction:
    /// * credits the order price back to the account,
    /// * writes a `refund` ledger entry referencing the order,
    /// * moves the order to `failed`.
    ///
    /// The order must currently be `pending` or `processing`. Compensating an order twice is
    /// rejected by the state check, so the refund cannot be applied more than once.
    async fn compensate_purchase(
        &self,
        order_id: &OrderId,
        reason: &str,
    ) -> Result<(Order, Account), FulfillmentGatewayError>;

    /// A manual order state transition, driven by an operator.
    ///
    /// The move must be legal according to [`OrderState::can_transition_to`]. Illegal moves return
    /// [`FulfillmentGatewayError::InvalidStateTransition`] and leave the row untouched, including
    /// its `updated_at` timestamp.
    ///
    /// This method only ever rewrites the state column. Money movements belong to
    /// [`Self::compensate_purchase`] and the settlement flow; an operator moving an order to
    /// `failed` by hand does not trigger a refund.
    async fn transition_order(&self, order_id: &OrderId, new_state: OrderState)
        -> Result<Order, FulfillmentGatewayError>;

    /// Registers an expected wallet top-up with the gateway's payment reference.
    ///
    /// The reference must be unique; re-registering an existing one returns the stored row
    /// unchanged.
    async fn create_topup(&self, topup: NewWalletTopup) -> Result<WalletTopup, FulfillmentGatewayError>;

    /// Settles a top-up against a successful gateway notification. In a single atomic transaction:
    /// * claims the top-up by flipping its status to `completed`, but only if no earlier
    ///   notification has done so,
    /// * credits `amount` to the owning account,
    /// * writes a `topup` ledger entry tagged with the reference.
    ///
    /// When `claimed_account_id` is given and does not match the top-up's account, nothing is
    /// written and [`TopupSettlement::AccountMismatch`] is returned. A reference that was already
    /// settled returns [`TopupSettlement::AlreadySettled`] without touching the balance, which is
    /// what makes redelivered webhooks harmless.
    async fn settle_topup(
        &self,
        external_ref: &str,
        amount: Credits,
        claimed_account_id: Option<i64>,
    ) -> Result<TopupSettlement, FulfillmentGatewayError>;

    /// Marks a pending top-up as `failed`. Settled top-ups are left alone. Returns the updated
    /// row, or `None` if the reference is unknown or the top-up had already completed.
    async fn fail_topup(&self, external_ref: &str) -> Result<Option<WalletTopup>, FulfillmentGatewayError>;

    /// Appends an event to the audit trail and returns its row id.
    async fn record_audit_event(&self, event: NewAuditEvent) -> Result<i64, FulfillmentGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), FulfillmentGatewayError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum FulfillmentGatewayError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("{0}")]
    AccountError(#[from] AccountApiError),
    #[error("The requested account id {0} does not exist")]
    AccountNotFound(i64),
    #[error("Account {account_id} holds {available}, but {required} is needed")]
    InsufficientBalance { account_id: i64, available: Credits, required: Credits },
    #[error("Amounts must be strictly positive")]
    NonPositiveAmount,
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidStateTransition { order_id: OrderId, from: OrderState, to: OrderState },
    #[error("No wallet top-up is registered under reference {0}")]
    TopupNotFound(String),
    #[error("The ledger already contains an entry for reference {0}")]
    DuplicateSettlement(String),
}

impl From<sqlx::Error> for FulfillmentGatewayError {
    fn from(e: sqlx::Error) -> Self {
        FulfillmentGatewayError::DatabaseError(e.to_string())
    }
}
