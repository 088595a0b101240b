use async_trait::async_trait;
use log::warn;
use provider_clients::{GameVaultApi, NewGameOrder};
use serde_json::json;
use sfg_common::Credits;

use crate::{
    db_types::{ProductCategory, Vendor},
    providers::adapter::{FulfilmentRequest, ProductInfo, ProviderAdapter, ProviderResult},
};

const CATEGORIES: [ProductCategory; 1] = [ProductCategory::TopupGame];

/// Game top-ups through GameVault's agent API.
///
/// Products are addressed as `game_key/item_sku`, the two halves of GameVault's nested catalogue.
pub struct GameVaultAdapter {
    api: GameVaultApi,
}

impl GameVaultAdapter {
    pub fn new(api: GameVaultApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ProviderAdapter for GameVaultAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::GameVault
    }

    fn categories(&self) -> &[ProductCategory] {
        &CATEGORIES
    }

    async fn find_product(&self, category: ProductCategory, product_id: &str) -> Option<ProductInfo> {
        let (game_key, sku) = product_id.split_once('/')?;
        let catalog = match self.api.product_list().await {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("🛒️ GameVault catalogue unavailable: {e}");
                return None;
            },
        };
        let product = catalog.into_iter().find(|p| p.key == game_key)?;
        let item = product.items.into_iter().find(|i| i.sku == sku)?;
        let price = match item.price.to_credits() {
            Ok(price) => price,
            Err(e) => {
                warn!("🛒️ GameVault quoted an undecodable price for {product_id}: {e}");
                Credits::from(0)
            },
        };
        Some(ProductInfo {
            product_id: product_id.to_string(),
            name: format!("{} / {}", product.name, item.name),
            category,
            vendor: Vendor::GameVault,
            price,
        })
    }

    async fn fulfil(&self, request: &FulfilmentRequest) -> ProviderResult {
        let Some((game_key, sku)) = request.product_id.split_once('/') else {
            return ProviderResult::Failure { message: format!("Malformed game product id: {}", request.product_id) };
        };
        let mut input = json!({ "uid": request.options.customer_ref() });
        if !request.options.target().is_empty() {
            input["server"] = json!(request.options.target());
        }
        let order =
            NewGameOrder { product_key: game_key.to_string(), item_sku: sku.to_string(), input, webhook_url: None };
        match self.api.create_order(&order).await {
            Ok(resp) => match resp.order {
                Some(receipt) => {
                    let external_ref =
                        receipt.transaction_id.clone().unwrap_or_else(|| request.order_ref.as_str().to_string());
                    let payload = serde_json::to_value(&receipt).unwrap_or_default();
                    ProviderResult::Success { external_ref, payload }
                },
                None => {
                    ProviderResult::Failure { message: "GameVault accepted the call but returned no order".to_string() }
                },
            },
            Err(e) => ProviderResult::Failure { message: e.to_string() },
        }
    }
}
