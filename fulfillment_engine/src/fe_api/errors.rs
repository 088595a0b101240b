//! Error types for the public API surfaces.
//!
//! Vendor errors never escape raw. By the time a purchase error reaches a caller, the engine has
//! either made no side effects at all, or has already compensated the debit; the variant says
//! which.

use sfg_common::Credits;
use thiserror::Error;

use crate::{
    db_types::{OrderId, ProductCategory},
    traits::{AccountApiError, FulfillmentGatewayError},
};

#[derive(Debug, Clone, Error)]
pub enum PurchaseApiError {
    /// The balance cannot cover the price. Nothing was debited and no order exists.
    #[error("This purchase needs {required}, but the account only holds {available}")]
    InsufficientBalance { available: Credits, required: Credits },
    /// No enabled vendor resolves the product. No side effects.
    #[error("No enabled vendor carries {category}/{product_id}")]
    ProductNotFound { category: ProductCategory, product_id: String },
    /// The vendor quoted a non-positive price. No side effects.
    #[error("Product {product_id} has an invalid price of {price} and cannot be sold")]
    InvalidPrice { product_id: String, price: Credits },
    /// Delivery failed after the debit. The debit has been compensated; the order is `failed`.
    #[error("Fulfillment of order {order_id} failed and {refund} has been returned to the account: {reason}")]
    ProviderError { order_id: OrderId, reason: String, refund: Credits },
    /// Delivery failed *and* the compensating credit could not be written. The ledger is now
    /// inconsistent with the order and needs manual reconciliation.
    #[error("Fulfillment of order {order_id} failed and the automatic refund could not be issued: {reason}")]
    CompensationFailed { order_id: OrderId, reason: String },
    #[error(transparent)]
    BackendError(#[from] FulfillmentGatewayError),
}

impl From<AccountApiError> for PurchaseApiError {
    fn from(e: AccountApiError) -> Self {
        Self::BackendError(e.into())
    }
}

#[derive(Debug, Clone, Error)]
pub enum SettlementApiError {
    #[error("Top-up amounts must be strictly positive")]
    NonPositiveAmount,
    #[error(transparent)]
    BackendError(#[from] FulfillmentGatewayError),
}

impl From<AccountApiError> for SettlementApiError {
    fn from(e: AccountApiError) -> Self {
        Self::BackendError(e.into())
    }
}
