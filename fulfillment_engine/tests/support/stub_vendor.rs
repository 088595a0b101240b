//! A scripted in-process vendor, standing in for the network clients in integration tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use fulfillment_engine::{
    db_types::{ProductCategory, Vendor},
    providers::{FulfilmentRequest, ProductInfo, ProviderAdapter, ProviderResult},
};
use serde_json::json;
use sfg_common::Credits;

/// A fake vendor with a fixed catalogue and a scripted sequence of fulfilment outcomes.
///
/// Outcomes are consumed front-first, one per `fulfil` call. When the script runs dry the stub
/// keeps confirming deliveries, so tests that only care about the happy path need no script at
/// all. An optional delay before answering lets tests exercise the orchestrator's deadline.
pub struct StubVendor {
    vendor: Vendor,
    categories: Vec<ProductCategory>,
    catalog: HashMap<String, Credits>,
    script: Mutex<VecDeque<ProviderResult>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubVendor {
    pub fn new(vendor: Vendor, categories: &[ProductCategory]) -> Self {
        Self {
            vendor,
            categories: categories.to_vec(),
            catalog: HashMap::new(),
            script: Mutex::new(VecDeque::new()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_product(mut self, product_id: &str, price: Credits) -> Self {
        self.catalog.insert(product_id.to_string(), price);
        self
    }

    pub fn with_outcomes<I: IntoIterator<Item = ProviderResult>>(self, outcomes: I) -> Self {
        self.script.lock().unwrap().extend(outcomes);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many times `fulfil` has been entered.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for StubVendor {
    fn vendor(&self) -> Vendor {
        self.vendor
    }

    fn categories(&self) -> &[ProductCategory] {
        &self.categories
    }

    async fn find_product(&self, category: ProductCategory, product_id: &str) -> Option<ProductInfo> {
        if !self.serves(category) {
            return None;
        }
        let price = *self.catalog.get(product_id)?;
        Some(ProductInfo {
            product_id: product_id.to_string(),
            name: format!("stub {product_id}"),
            category,
            vendor: self.vendor,
            price,
        })
    }

    async fn fulfil(&self, request: &FulfilmentRequest) -> ProviderResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| ProviderResult::Success {
            external_ref: format!("stub-{}", request.order_ref.as_str()),
            payload: json!({"stub": true, "product_id": request.product_id}),
        })
    }
}
