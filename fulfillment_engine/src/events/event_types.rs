use crate::db_types::{Account, Order, WalletTopup};

/// Raised after a purchase settles: the order is `completed` and the vendor reference is on
/// record. The outer product uses this to notify the customer of delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCompletedEvent {
    pub order: Order,
}

impl OrderCompletedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Raised after a purchase was compensated. The refund has already been issued by the time the
/// event fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFailedEvent {
    pub order: Order,
    pub reason: String,
}

impl OrderFailedEvent {
    pub fn new(order: Order, reason: impl Into<String>) -> Self {
        Self { order, reason: reason.into() }
    }
}

/// Raised after a wallet top-up was credited to an account. Carries the post-credit account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopupCreditedEvent {
    pub topup: WalletTopup,
    pub account: Account,
}

impl TopupCreditedEvent {
    pub fn new(topup: WalletTopup, account: Account) -> Self {
        Self { topup, account }
    }
}
