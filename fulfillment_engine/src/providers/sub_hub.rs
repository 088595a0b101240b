use async_trait::async_trait;
use log::warn;
use provider_clients::{SubCatalog, SubHubApi, SubOrderResponse};
use sfg_common::Credits;

use crate::{
    db_types::{ProductCategory, Vendor},
    providers::adapter::{FulfilmentRequest, ProductInfo, ProviderAdapter, ProviderResult},
};

const CATEGORIES: [ProductCategory; 2] = [ProductCategory::PremiumApp, ProductCategory::Preorder];

/// Premium apps and pre-orders through SubHub.
///
/// SubHub keeps a separate catalogue per category, so the requested category picks both the
/// catalogue to price from and the endpoint to order through. Our order id is passed as the
/// `reference`, which is also what SubHub echoes in webhook notifications.
pub struct SubHubAdapter {
    api: SubHubApi,
}

impl SubHubAdapter {
    pub fn new(api: SubHubApi) -> Self {
        Self { api }
    }

    async fn catalog_for(&self, category: ProductCategory) -> Result<SubCatalog, provider_clients::ProviderApiError> {
        match category {
            ProductCategory::Preorder => self.api.preorder_catalog().await,
            _ => self.api.premium_catalog().await,
        }
    }
}

#[async_trait]
impl ProviderAdapter for SubHubAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::SubHub
    }

    fn categories(&self) -> &[ProductCategory] {
        &CATEGORIES
    }

    async fn find_product(&self, category: ProductCategory, product_id: &str) -> Option<ProductInfo> {
        let catalog = match self.catalog_for(category).await {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("🛒️ SubHub catalogue unavailable: {e}");
                return None;
            },
        };
        if catalog.status_code != 200 {
            warn!("🛒️ SubHub catalogue call returned status {}", catalog.status_code);
            return None;
        }
        let product = catalog.data.into_iter().find(|p| p.id == product_id)?;
        let price = match product.effective_price() {
            Ok(price) => price,
            Err(e) => {
                warn!("🛒️ SubHub quoted an undecodable price for {product_id}: {e}");
                Credits::from(0)
            },
        };
        Some(ProductInfo {
            product_id: product_id.to_string(),
            name: product.name,
            category,
            vendor: Vendor::SubHub,
            price,
        })
    }

    async fn fulfil(&self, request: &FulfilmentRequest) -> ProviderResult {
        let reference = request.order_ref.as_str();
        let result: Result<SubOrderResponse, _> = match request.category {
            ProductCategory::Preorder => self.api.place_preorder(&request.product_id, reference).await,
            _ => self.api.buy_premium(&request.product_id, reference).await,
        };
        match result {
            Ok(resp) => {
                if resp.status_code == 200 {
                    let payload = resp.data.unwrap_or_default();
                    ProviderResult::Success { external_ref: reference.to_string(), payload }
                } else {
                    let message = resp
                        .message
                        .unwrap_or_else(|| format!("SubHub rejected the order with status {}", resp.status_code));
                    ProviderResult::Failure { message }
                }
            },
            Err(e) => ProviderResult::Failure { message: e.to_string() },
        }
    }
}
