use async_trait::async_trait;
use serde_json::Value;
use sfg_common::Credits;

use crate::{
    db_types::{OrderId, ProductCategory, Vendor},
    order_objects::FulfilmentOptions,
};

//--------------------------------------      ProductInfo      ---------------------------------------------------------

/// A product as resolved from a vendor's live catalogue.
#[derive(Debug, Clone)]
pub struct ProductInfo {
    pub product_id: String,
    pub name: String,
    pub category: ProductCategory,
    pub vendor: Vendor,
    /// The price in credits. May be zero when the vendor quoted something undecodable; callers
    /// must treat a non-positive price as unsellable.
    pub price: Credits,
}

//--------------------------------------   FulfilmentRequest   ---------------------------------------------------------

/// Everything an adapter needs to place one order with its vendor.
#[derive(Debug, Clone)]
pub struct FulfilmentRequest {
    /// Our public order id. Passed to vendors that accept a caller reference.
    pub order_ref: OrderId,
    pub product_id: String,
    pub category: ProductCategory,
    pub options: FulfilmentOptions,
}

//--------------------------------------    ProviderResult     ---------------------------------------------------------

/// The three ways a fulfilment attempt can end.
///
/// Adapters only ever construct `Success` and `Failure`; `Timeout` is folded in by the purchase
/// orchestrator when the configured deadline elapses, so that matching on this enum is the
/// complete story of what happened to the vendor call.
#[derive(Debug, Clone)]
pub enum ProviderResult {
    /// The vendor confirmed delivery.
    Success {
        /// The vendor's reference for the delivery.
        external_ref: String,
        /// The vendor's response, verbatim. Stored on the order for support queries.
        payload: Value,
    },
    /// The vendor definitively reported non-delivery, or the call itself failed.
    Failure { message: String },
    /// The deadline elapsed with the delivery state unknown.
    Timeout,
}

//--------------------------------------    ProviderAdapter    ---------------------------------------------------------

/// One vendor's capability surface, normalised.
///
/// Adapters are translation layers: they own a `provider_clients` API client and turn its
/// vendor-specific response shapes into [`ProductInfo`] and [`ProviderResult`]. All knowledge of
/// a vendor's status vocabulary lives here, never in callers.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn vendor(&self) -> Vendor;

    /// The categories this vendor can deliver.
    fn categories(&self) -> &[ProductCategory];

    fn serves(&self, category: ProductCategory) -> bool {
        self.categories().contains(&category)
    }

    /// Looks the product up in the vendor's catalogue. Returns `None` when the vendor does not
    /// carry it. Transport failures are logged and also folded into `None`, so an unreachable
    /// vendor simply drops out of the running and the registry can fail over.
    async fn find_product(&self, category: ProductCategory, product_id: &str) -> Option<ProductInfo>;

    /// Places the order with the vendor. This never returns a Rust error: every outcome,
    /// including transport failures, is expressed as a [`ProviderResult`].
    async fn fulfil(&self, request: &FulfilmentRequest) -> ProviderResult;
}
