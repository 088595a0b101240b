//! Client for the GameVault game top-up vendor.
//!
//! GameVault exposes a JSON REST API authenticated with an `X-API-Key` header. The catalog is
//! grouped per game, with the purchasable denominations nested as items under each game; orders
//! are placed through the agent endpoint and return the delivery details for the credited top-up.

use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::{Deserialize, Serialize};
use sfg_common::Secret;

use crate::{helpers::read_json_response, ProviderApiError, RawPrice};

#[derive(Debug, Clone, Default)]
pub struct GameVaultConfig {
    pub api_url: String,
    pub api_key: Secret<String>,
}

impl GameVaultConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("SFG_GAMEVAULT_API_URL").unwrap_or_else(|_| {
            warn!("SFG_GAMEVAULT_API_URL not set, using (probably useless) default");
            "https://api.gamevault.example".to_string()
        });
        let api_key = Secret::new(std::env::var("SFG_GAMEVAULT_API_KEY").unwrap_or_else(|_| {
            warn!("SFG_GAMEVAULT_API_KEY not set, using (probably useless) default");
            "gv_00000000000000".to_string()
        }));
        Self { api_url, api_key }
    }
}

//--------------------------------------   Data objects     ---------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameProduct {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub items: Vec<GameItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameItem {
    pub sku: String,
    pub name: String,
    pub price: RawPrice,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewGameOrder {
    pub product_key: String,
    pub item_sku: String,
    pub input: serde_json::Value,
    #[serde(rename = "webhookURL", skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameOrderResponse {
    pub order: Option<GameOrderReceipt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameOrderReceipt {
    #[serde(rename = "transactionId")]
    pub transaction_id: Option<String>,
    pub state: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

//--------------------------------------      Client        ---------------------------------------------------------

#[derive(Clone)]
pub struct GameVaultApi {
    config: GameVaultConfig,
    client: Arc<Client>,
}

impl GameVaultApi {
    pub fn new(config: GameVaultConfig) -> Result<Self, ProviderApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(config.api_key.reveal().as_str())
            .map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        headers.insert("X-API-Key", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Fetches the full game catalog, one entry per game with its purchasable denominations.
    pub async fn product_list(&self) -> Result<Vec<GameProduct>, ProviderApiError> {
        let url = format!("{}/api/v1/products/list", self.config.api_url);
        trace!("Fetching GameVault catalog: {url}");
        let response = self.client.get(url).send().await.map_err(|e| ProviderApiError::ResponseError(e.to_string()))?;
        read_json_response(response).await
    }

    /// Places a top-up order for the given game/denomination pair.
    pub async fn create_order(&self, order: &NewGameOrder) -> Result<GameOrderResponse, ProviderApiError> {
        let url = format!("{}/api/v1/agent/orders/create", self.config.api_url);
        trace!("Creating GameVault order at {url} for {}:{}", order.product_key, order.item_sku);
        let response = self
            .client
            .post(url)
            .json(order)
            .send()
            .await
            .map_err(|e| ProviderApiError::ResponseError(e.to_string()))?;
        read_json_response(response).await
    }
}
