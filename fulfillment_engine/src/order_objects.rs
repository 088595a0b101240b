use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sfg_common::Credits;

use crate::db_types::{Account, LedgerEntry, Order, OrderId, OrderState, ProductCategory, Vendor};

//--------------------------------------    FulfilmentOptions   --------------------------------------------------------

/// Free-form delivery details supplied by the customer.
///
/// What each field means depends on the category: `customer_ref` is a game uid, an app username
/// or a phone number; `target` is a profile link for boosts or a region hint for OTP rentals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FulfilmentOptions {
    pub customer_ref: Option<String>,
    pub target: Option<String>,
}

impl FulfilmentOptions {
    pub fn customer_ref(&self) -> &str {
        self.customer_ref.as_deref().unwrap_or_default()
    }

    pub fn target(&self) -> &str {
        self.target.as_deref().unwrap_or_default()
    }
}

//--------------------------------------    PurchaseRequest     --------------------------------------------------------

/// A customer's request to buy one product against their balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub account_id: i64,
    pub product_id: String,
    pub category: ProductCategory,
    /// Optional vendor hint. When it names an enabled vendor serving the category, only that
    /// vendor is consulted; otherwise the registry walks vendors in priority order.
    pub vendor: Option<Vendor>,
    /// Caller-supplied idempotency reference. Becomes the public order id; replaying a request
    /// with the same reference returns the original order without debiting again.
    pub order_ref: Option<OrderId>,
    #[serde(default)]
    pub options: FulfilmentOptions,
}

impl PurchaseRequest {
    pub fn new<S: Into<String>>(account_id: i64, category: ProductCategory, product_id: S) -> Self {
        Self {
            account_id,
            product_id: product_id.into(),
            category,
            vendor: None,
            order_ref: None,
            options: FulfilmentOptions::default(),
        }
    }

    pub fn with_vendor(mut self, vendor: Vendor) -> Self {
        self.vendor = Some(vendor);
        self
    }

    pub fn with_order_ref(mut self, order_ref: OrderId) -> Self {
        self.order_ref = Some(order_ref);
        self
    }

    pub fn with_customer_ref<S: Into<String>>(mut self, customer_ref: S) -> Self {
        self.options.customer_ref = Some(customer_ref.into());
        self
    }

    pub fn with_target<S: Into<String>>(mut self, target: S) -> Self {
        self.options.target = Some(target.into());
        self
    }
}

//--------------------------------------    PurchaseOutcome     --------------------------------------------------------

/// What the customer gets back from a purchase: the order and their balance after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOutcome {
    pub order: Order,
    pub balance: Credits,
}

//--------------------------------------    OrderQueryFilter    --------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub order_id: Option<OrderId>,
    pub account_id: Option<i64>,
    pub category: Option<ProductCategory>,
    pub provider: Option<Vendor>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub state: Option<Vec<OrderState>>,
}

impl OrderQueryFilter {
    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_account_id(mut self, account_id: i64) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn with_category(mut self, category: ProductCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_provider(mut self, provider: Vendor) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_state(mut self, state: OrderState) -> Self {
        self.state.get_or_insert_with(Vec::new).push(state);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.order_id.is_none() &&
            self.account_id.is_none() &&
            self.category.is_none() &&
            self.provider.is_none() &&
            self.since.is_none() &&
            self.until.is_none() &&
            self.state.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "No filters.")?;
            return Ok(());
        }
        if let Some(order_id) = &self.order_id {
            write!(f, "order_id: {order_id}. ")?;
        }
        if let Some(account_id) = &self.account_id {
            write!(f, "account_id: {account_id}. ")?;
        }
        if let Some(category) = &self.category {
            write!(f, "category: {category}. ")?;
        }
        if let Some(provider) = &self.provider {
            write!(f, "provider: {provider}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until {until}. ")?;
        }
        if let Some(states) = &self.state {
            let states = states.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "states: [{states}]. ")?;
        }
        Ok(())
    }
}

//--------------------------------------    AccountStatement    --------------------------------------------------------

/// An account's balance together with its full order and ledger history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountStatement {
    pub account: Account,
    pub total_spent: Credits,
    pub orders: Vec<Order>,
    pub ledger: Vec<LedgerEntry>,
}

impl AccountStatement {
    pub fn new(account: Account, orders: Vec<Order>, ledger: Vec<LedgerEntry>) -> Self {
        let total_spent = orders
            .iter()
            .filter(|o| matches!(o.state, OrderState::Completed))
            .map(|o| o.price)
            .sum::<Credits>();
        Self { account, total_spent, orders, ledger }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn filter_display_mentions_every_set_field() {
        let q = OrderQueryFilter::default()
            .with_account_id(42)
            .with_state(OrderState::Pending)
            .with_state(OrderState::Failed)
            .with_provider(Vendor::OrbitShop);
        let s = q.to_string();
        assert!(s.contains("account_id: 42"));
        assert!(s.contains("states: [pending,failed]"));
        assert!(s.contains("provider: orbit-shop"));
        assert!(!s.contains("order_id"));
        assert!(OrderQueryFilter::default().to_string().contains("No filters"));
    }

    #[test]
    fn purchase_request_builder() {
        let req = PurchaseRequest::new(7, ProductCategory::TopupGame, "mlbb/diamond-86")
            .with_vendor(Vendor::GameVault)
            .with_customer_ref("uid-1001")
            .with_target("2001");
        assert_eq!(req.category, ProductCategory::TopupGame);
        assert_eq!(req.vendor, Some(Vendor::GameVault));
        assert_eq!(req.options.customer_ref(), "uid-1001");
        assert_eq!(req.options.target(), "2001");
    }
}
