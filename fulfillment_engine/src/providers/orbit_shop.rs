use async_trait::async_trait;
use log::warn;
use provider_clients::OrbitShopApi;
use serde_json::json;
use sfg_common::Credits;

use crate::{
    db_types::{ProductCategory, Vendor},
    providers::adapter::{FulfilmentRequest, ProductInfo, ProviderAdapter, ProviderResult},
};

const CATEGORIES: [ProductCategory; 2] = [ProductCategory::PremiumApp, ProductCategory::Otp];

/// Premium app accounts and OTP rentals through OrbitShop.
///
/// Both categories price off the same `api_product` catalogue, keyed by `type_id`. Only the order
/// endpoint differs: premium purchases deliver an account, OTP purchases rent a number.
pub struct OrbitShopAdapter {
    api: OrbitShopApi,
}

impl OrbitShopAdapter {
    pub fn new(api: OrbitShopApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ProviderAdapter for OrbitShopAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::OrbitShop
    }

    fn categories(&self) -> &[ProductCategory] {
        &CATEGORIES
    }

    async fn find_product(&self, category: ProductCategory, product_id: &str) -> Option<ProductInfo> {
        let list = match self.api.product_list().await {
            Ok(list) => list,
            Err(e) => {
                warn!("🛒️ OrbitShop catalogue unavailable: {e}");
                return None;
            },
        };
        if !list.ok {
            warn!("🛒️ OrbitShop catalogue call came back not-ok");
            return None;
        }
        let product = list.data.into_iter().find(|p| p.type_id == product_id)?;
        let price = match product.effective_price() {
            Ok(price) => price,
            Err(e) => {
                warn!("🛒️ OrbitShop quoted an undecodable price for {product_id}: {e}");
                Credits::from(0)
            },
        };
        Some(ProductInfo {
            product_id: product_id.to_string(),
            name: product.name,
            category,
            vendor: Vendor::OrbitShop,
            price,
        })
    }

    async fn fulfil(&self, request: &FulfilmentRequest) -> ProviderResult {
        match request.category {
            ProductCategory::Otp => self.fulfil_otp(request).await,
            _ => self.fulfil_premium(request).await,
        }
    }
}

impl OrbitShopAdapter {
    async fn fulfil_premium(&self, request: &FulfilmentRequest) -> ProviderResult {
        let username = request.options.customer_ref.as_deref();
        match self.api.buy(&request.product_id, username).await {
            Ok(resp) => {
                let succeeded = resp.ok && resp.status.as_deref() == Some("success");
                if succeeded {
                    let external_ref = resp
                        .data
                        .as_ref()
                        .and_then(|d| d.uid.clone())
                        .unwrap_or_else(|| request.order_ref.as_str().to_string());
                    let payload = serde_json::to_value(&resp.data).unwrap_or_default();
                    ProviderResult::Success { external_ref, payload }
                } else {
                    let message = resp
                        .message
                        .or(resp.status)
                        .unwrap_or_else(|| "OrbitShop rejected the order without a message".to_string());
                    ProviderResult::Failure { message }
                }
            },
            Err(e) => ProviderResult::Failure { message: e.to_string() },
        }
    }

    async fn fulfil_otp(&self, request: &FulfilmentRequest) -> ProviderResult {
        match self.api.buy_otp(&request.product_id, request.options.target()).await {
            Ok(resp) => {
                if resp.status.as_deref() == Some("success") {
                    let external_ref = match &resp.order {
                        Some(serde_json::Value::String(s)) => s.clone(),
                        Some(v) => v.to_string(),
                        None => request.order_ref.as_str().to_string(),
                    };
                    let payload = json!({ "msg": resp.msg, "order": resp.order });
                    ProviderResult::Success { external_ref, payload }
                } else {
                    let message =
                        resp.msg.unwrap_or_else(|| "OrbitShop rejected the OTP order without a message".to_string());
                    ProviderResult::Failure { message }
                }
            },
            Err(e) => ProviderResult::Failure { message: e.to_string() },
        }
    }
}
