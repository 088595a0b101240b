//! The set of database types used by the fulfillment engine.
//!
//! Rows map 1:1 onto the SQLite schema. `New*` variants carry the caller-supplied fields for
//! inserts, with the engine filling in ids, balances and timestamps.

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sfg_common::Credits;
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------        OrderId        ---------------------------------------------------------

/// The public identifier of an order, e.g. `ord-x7k2m9q4w1zp`. Distinct from the numeric row id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ConversionError("Order ids cannot be empty".to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------      OrderState       ---------------------------------------------------------

/// The lifecycle state of an order.
///
/// Every mutation of an order's state goes through [`OrderState::can_transition_to`]. The walk
/// through the lifecycle is strictly forward; terminal states have no exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum OrderState {
    /// The order has been created and the account debited, but no delivery has been confirmed.
    Pending,
    /// An operator has parked the order for manual handling.
    Processing,
    /// The vendor confirmed delivery. Terminal.
    Completed,
    /// Delivery failed and the debit has been compensated.
    Failed,
    /// The order was called off before delivery. Terminal.
    Cancelled,
    /// A failed order whose refund has been acknowledged by an operator. Terminal.
    Refunded,
}

impl OrderState {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderState::Completed | OrderState::Cancelled | OrderState::Refunded)
    }

    /// The transition table for order states. Anything not listed here is illegal.
    pub fn can_transition_to(self, next: OrderState) -> bool {
        use OrderState::*;
        matches!(
            (self, next),
            (Pending, Processing) |
                (Pending, Completed) |
                (Pending, Failed) |
                (Pending, Cancelled) |
                (Processing, Completed) |
                (Processing, Failed) |
                (Processing, Cancelled) |
                (Failed, Refunded)
        )
    }
}

impl Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderState::Pending => write!(f, "pending"),
            OrderState::Processing => write!(f, "processing"),
            OrderState::Completed => write!(f, "completed"),
            OrderState::Failed => write!(f, "failed"),
            OrderState::Cancelled => write!(f, "cancelled"),
            OrderState::Refunded => write!(f, "refunded"),
        }
    }
}

impl FromStr for OrderState {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid order state: {s}"))),
        }
    }
}

//--------------------------------------    ProductCategory    ---------------------------------------------------------

/// The catalogue shelf a product sits on. Each vendor serves one or more categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum ProductCategory {
    TopupGame,
    PremiumApp,
    SocialBoost,
    Otp,
    Preorder,
}

impl Display for ProductCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductCategory::TopupGame => write!(f, "topup-game"),
            ProductCategory::PremiumApp => write!(f, "premium-app"),
            ProductCategory::SocialBoost => write!(f, "social-boost"),
            ProductCategory::Otp => write!(f, "otp"),
            ProductCategory::Preorder => write!(f, "preorder"),
        }
    }
}

impl FromStr for ProductCategory {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "topup-game" => Ok(Self::TopupGame),
            "premium-app" => Ok(Self::PremiumApp),
            "social-boost" => Ok(Self::SocialBoost),
            "otp" => Ok(Self::Otp),
            "preorder" => Ok(Self::Preorder),
            s => Err(ConversionError(format!("Invalid product category: {s}"))),
        }
    }
}

//--------------------------------------        Vendor         ---------------------------------------------------------

/// The upstream vendors the engine can place orders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum Vendor {
    GameVault,
    OrbitShop,
    SubHub,
    BoostPanel,
}

impl Vendor {
    /// Every known vendor, in the default failover priority order.
    pub fn all() -> &'static [Vendor] {
        &[Vendor::GameVault, Vendor::OrbitShop, Vendor::SubHub, Vendor::BoostPanel]
    }
}

impl Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Vendor::GameVault => write!(f, "game-vault"),
            Vendor::OrbitShop => write!(f, "orbit-shop"),
            Vendor::SubHub => write!(f, "sub-hub"),
            Vendor::BoostPanel => write!(f, "boost-panel"),
        }
    }
}

impl FromStr for Vendor {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "game-vault" => Ok(Self::GameVault),
            "orbit-shop" => Ok(Self::OrbitShop),
            "sub-hub" => Ok(Self::SubHub),
            "boost-panel" => Ok(Self::BoostPanel),
            s => Err(ConversionError(format!("Invalid vendor: {s}"))),
        }
    }
}

//--------------------------------------        Account        ---------------------------------------------------------

/// A customer account holding a prepaid credit balance.
///
/// The balance is the single authoritative figure. Ledger entries describe every change to it,
/// so that replaying the ledger from zero reproduces the balance exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct Account {
    pub id: i64,
    pub balance: Credits,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------         Order         ---------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub account_id: i64,
    pub product_id: String,
    pub category: ProductCategory,
    pub provider: Vendor,
    pub price: Credits,
    pub state: OrderState,
    /// The vendor's own reference for the delivery, set when the order completes.
    pub external_ref: Option<String>,
    /// Raw vendor response, JSON-encoded. Kept verbatim for support queries.
    pub provider_payload: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder        ---------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub account_id: i64,
    pub product_id: String,
    pub category: ProductCategory,
    pub provider: Vendor,
    pub price: Credits,
}

impl NewOrder {
    pub fn new(
        order_id: OrderId,
        account_id: i64,
        product_id: String,
        category: ProductCategory,
        provider: Vendor,
        price: Credits,
    ) -> Self {
        Self { order_id, account_id, product_id, category, provider, price }
    }
}

//--------------------------------------    LedgerEntryKind    ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum LedgerEntryKind {
    /// A debit taken when an order is placed. Negative amount.
    Purchase,
    /// A credit returned when a purchase is compensated. Positive amount.
    Refund,
    /// A credit from a settled wallet top-up. Positive amount.
    Topup,
}

impl Display for LedgerEntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerEntryKind::Purchase => write!(f, "purchase"),
            LedgerEntryKind::Refund => write!(f, "refund"),
            LedgerEntryKind::Topup => write!(f, "topup"),
        }
    }
}

impl FromStr for LedgerEntryKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(Self::Purchase),
            "refund" => Ok(Self::Refund),
            "topup" => Ok(Self::Topup),
            s => Err(ConversionError(format!("Invalid ledger entry kind: {s}"))),
        }
    }
}

//--------------------------------------      LedgerEntry      ---------------------------------------------------------

/// One immutable line in an account's money history.
///
/// `amount` is the signed delta applied to the balance. `balance_before` and `balance_after`
/// snapshot the account around the write, inside the same transaction that applied it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct LedgerEntry {
    pub id: i64,
    pub account_id: i64,
    pub order_id: Option<OrderId>,
    pub kind: LedgerEntryKind,
    pub amount: Credits,
    pub balance_before: Credits,
    pub balance_after: Credits,
    pub description: String,
    /// Optional JSON blob with context for the entry.
    pub metadata: Option<String>,
    /// For top-ups, the gateway's payment reference. Unique across the ledger.
    pub external_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------    NewLedgerEntry     ---------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub account_id: i64,
    pub order_id: Option<OrderId>,
    pub kind: LedgerEntryKind,
    pub amount: Credits,
    pub description: String,
    pub metadata: Option<String>,
    pub external_ref: Option<String>,
}

impl NewLedgerEntry {
    pub fn purchase(account_id: i64, order_id: OrderId, price: Credits) -> Self {
        Self {
            account_id,
            order_id: Some(order_id.clone()),
            kind: LedgerEntryKind::Purchase,
            amount: -price,
            description: format!("Purchase for order {order_id}"),
            metadata: None,
            external_ref: None,
        }
    }

    pub fn refund(account_id: i64, order_id: OrderId, price: Credits, reason: &str) -> Self {
        Self {
            account_id,
            order_id: Some(order_id.clone()),
            kind: LedgerEntryKind::Refund,
            amount: price,
            description: format!("Refund for order {order_id}: {reason}"),
            metadata: None,
            external_ref: None,
        }
    }

    pub fn topup(account_id: i64, amount: Credits, external_ref: String) -> Self {
        Self {
            account_id,
            order_id: None,
            kind: LedgerEntryKind::Topup,
            amount,
            description: format!("Wallet top-up {external_ref}"),
            metadata: None,
            external_ref: Some(external_ref),
        }
    }

    pub fn with_metadata(mut self, metadata: String) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

//--------------------------------------      TopupStatus      ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TopupStatus {
    Pending,
    Completed,
    Failed,
}

impl Display for TopupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopupStatus::Pending => write!(f, "pending"),
            TopupStatus::Completed => write!(f, "completed"),
            TopupStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for TopupStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid top-up status: {s}"))),
        }
    }
}

//--------------------------------------      WalletTopup      ---------------------------------------------------------

/// A pending or settled wallet top-up, keyed by the payment gateway's `external_ref`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct WalletTopup {
    pub id: i64,
    pub account_id: i64,
    pub amount: Credits,
    pub external_ref: String,
    pub status: TopupStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     NewWalletTopup    ---------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewWalletTopup {
    pub account_id: i64,
    pub amount: Credits,
    pub external_ref: String,
}

impl NewWalletTopup {
    pub fn new(account_id: i64, amount: Credits, external_ref: String) -> Self {
        Self { account_id, amount, external_ref }
    }
}

//--------------------------------------    TopupSettlement    ---------------------------------------------------------

/// The outcome of trying to settle a top-up against a gateway notification.
#[derive(Debug, Clone)]
pub enum TopupSettlement {
    /// The top-up was claimed and the account credited in this call.
    Credited { topup: WalletTopup, account: Account, entry: LedgerEntry },
    /// The top-up had already been settled by an earlier notification.
    AlreadySettled(WalletTopup),
    /// The notification names an account that does not own the top-up. Nothing was written.
    AccountMismatch { topup: WalletTopup, claimed_account_id: i64 },
    /// No top-up with this reference exists.
    Unknown,
}

//--------------------------------------    AuditEventType     ---------------------------------------------------------

/// The kinds of events the audit trail records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum AuditEventType {
    PurchaseCompleted,
    PurchaseFailed,
    PurchaseRejected,
    CompensationFailed,
    TopupSettled,
    WebhookDiscarded,
    OrderTransition,
}

impl Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditEventType::PurchaseCompleted => write!(f, "purchase-completed"),
            AuditEventType::PurchaseFailed => write!(f, "purchase-failed"),
            AuditEventType::PurchaseRejected => write!(f, "purchase-rejected"),
            AuditEventType::CompensationFailed => write!(f, "compensation-failed"),
            AuditEventType::TopupSettled => write!(f, "topup-settled"),
            AuditEventType::WebhookDiscarded => write!(f, "webhook-discarded"),
            AuditEventType::OrderTransition => write!(f, "order-transition"),
        }
    }
}

//--------------------------------------      AuditEvent       ---------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct AuditEvent {
    pub id: i64,
    pub event: AuditEventType,
    pub account_id: Option<i64>,
    pub order_id: Option<OrderId>,
    pub success: bool,
    pub error: Option<String>,
    /// JSON blob with event-specific context.
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------     NewAuditEvent     ---------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct NewAuditEvent {
    pub event: AuditEventType,
    pub account_id: Option<i64>,
    pub order_id: Option<OrderId>,
    pub success: bool,
    pub error: Option<String>,
    pub details: Option<String>,
}

impl NewAuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self { event, account_id: None, order_id: None, success: true, error: None, details: None }
    }

    pub fn for_account(mut self, account_id: i64) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn for_order(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn failed(mut self, error: String) -> Self {
        self.success = false;
        self.error = Some(error);
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details.to_string());
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn order_state_transition_table() {
        use OrderState::*;
        let all = [Pending, Processing, Completed, Failed, Cancelled, Refunded];
        let legal =
            [(Pending, Processing), (Pending, Completed), (Pending, Failed), (Pending, Cancelled), (Processing,
                Completed), (Processing, Failed), (Processing, Cancelled), (Failed, Refunded)];
        for from in all {
            for to in all {
                let expect = legal.contains(&(from, to));
                assert_eq!(from.can_transition_to(to), expect, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        use OrderState::*;
        let all = [Pending, Processing, Completed, Failed, Cancelled, Refunded];
        for state in [Completed, Cancelled, Refunded] {
            assert!(state.is_terminal());
            for to in all {
                assert!(!state.can_transition_to(to), "{state} -> {to} must be illegal");
            }
        }
        assert!(!Pending.is_terminal());
        assert!(!Processing.is_terminal());
        assert!(!Failed.is_terminal());
    }

    #[test]
    fn enums_round_trip_through_strings() {
        for v in [Vendor::GameVault, Vendor::OrbitShop, Vendor::SubHub, Vendor::BoostPanel] {
            assert_eq!(v.to_string().parse::<Vendor>().unwrap(), v);
        }
        for c in [
            ProductCategory::TopupGame,
            ProductCategory::PremiumApp,
            ProductCategory::SocialBoost,
            ProductCategory::Otp,
            ProductCategory::Preorder,
        ] {
            assert_eq!(c.to_string().parse::<ProductCategory>().unwrap(), c);
        }
        assert!("sideways".parse::<OrderState>().is_err());
    }

    #[test]
    fn order_ids_parse_like_the_other_identifiers() {
        let id: OrderId = "ord-x7k2m9q4w1zp".parse().unwrap();
        assert_eq!(id.as_str(), "ord-x7k2m9q4w1zp");
        let err = "   ".parse::<OrderId>().unwrap_err();
        assert!(matches!(err, ConversionError(_)));
    }

    #[test]
    fn ledger_entry_constructors_sign_amounts() {
        let debit = NewLedgerEntry::purchase(1, OrderId("ord-1".into()), Credits::from_credits(5));
        assert_eq!(debit.amount, -Credits::from_credits(5));
        assert_eq!(debit.kind, LedgerEntryKind::Purchase);
        let refund = NewLedgerEntry::refund(1, OrderId("ord-1".into()), Credits::from_credits(5), "vendor failure");
        assert!(refund.amount.is_positive());
        let topup = NewLedgerEntry::topup(1, Credits::from_credits(10), "pay_123".into());
        assert_eq!(topup.external_ref.as_deref(), Some("pay_123"));
        assert!(topup.order_id.is_none());
    }
}
