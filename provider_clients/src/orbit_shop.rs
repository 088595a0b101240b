//! Client for the OrbitShop vendor (premium app unlocks and one-time OTP numbers).
//!
//! OrbitShop authenticates by echoing the API key back as a `keyapi` field in every request body.
//! Its response envelope is loose: list and buy calls answer `{ok, status, message, data}`, the
//! OTP endpoint answers `{status, msg, order}`. A delivered purchase is the combination
//! `ok == true && status == "success"` — interpreting that is left to the caller.

use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::{Deserialize, Serialize};
use sfg_common::Secret;

use crate::{
    helpers::{opt_string_or_number, read_json_response, string_or_number},
    ProviderApiError,
    RawPrice,
};

#[derive(Debug, Clone, Default)]
pub struct OrbitShopConfig {
    pub api_url: String,
    pub api_key: Secret<String>,
}

impl OrbitShopConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("SFG_ORBITSHOP_API_URL").unwrap_or_else(|_| {
            warn!("SFG_ORBITSHOP_API_URL not set, using (probably useless) default");
            "https://orbitshop.example".to_string()
        });
        let api_key = Secret::new(std::env::var("SFG_ORBITSHOP_API_KEY").unwrap_or_else(|_| {
            warn!("SFG_ORBITSHOP_API_KEY not set, using (probably useless) default");
            "os_00000000000000".to_string()
        }));
        Self { api_url, api_key }
    }
}

//--------------------------------------   Data objects     ---------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopProductList {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub data: Vec<ShopProduct>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopProduct {
    #[serde(deserialize_with = "string_or_number")]
    pub type_id: String,
    pub name: String,
    pub price: RawPrice,
    #[serde(default)]
    pub pricevip: Option<RawPrice>,
}

impl ShopProduct {
    /// The price a reseller account actually pays: the VIP rate when one is quoted, else the list price.
    pub fn effective_price(&self) -> Result<sfg_common::Credits, ProviderApiError> {
        if let Some(vip) = &self.pricevip {
            let vip = vip.to_credits()?;
            if vip.is_positive() {
                return Ok(vip);
            }
        }
        self.price.to_credits()
    }
}

#[derive(Debug, Serialize)]
struct ShopBuyRequest<'a> {
    keyapi: &'a str,
    type_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username_buy: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopBuyResponse {
    #[serde(default)]
    pub ok: bool,
    pub status: Option<String>,
    pub message: Option<String>,
    pub data: Option<ShopDelivery>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopDelivery {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub uid: Option<String>,
    pub name: Option<String>,
    pub textdb: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct OtpBuyRequest<'a> {
    keyapi: &'a str,
    product: &'a str,
    location: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpBuyResponse {
    pub status: Option<String>,
    pub msg: Option<String>,
    #[serde(default)]
    pub order: Option<serde_json::Value>,
}

//--------------------------------------      Client        ---------------------------------------------------------

#[derive(Clone)]
pub struct OrbitShopApi {
    config: OrbitShopConfig,
    client: Arc<Client>,
}

impl OrbitShopApi {
    pub fn new(config: OrbitShopConfig) -> Result<Self, ProviderApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub async fn product_list(&self) -> Result<ShopProductList, ProviderApiError> {
        let url = format!("{}/api_product", self.config.api_url);
        trace!("Fetching OrbitShop catalog: {url}");
        let response = self.client.get(url).send().await.map_err(|e| ProviderApiError::ResponseError(e.to_string()))?;
        read_json_response(response).await
    }

    pub async fn buy(&self, type_id: &str, username: Option<&str>) -> Result<ShopBuyResponse, ProviderApiError> {
        let url = format!("{}/api_buy", self.config.api_url);
        trace!("Placing OrbitShop order at {url} for product {type_id}");
        let body = ShopBuyRequest { keyapi: self.config.api_key.reveal(), type_id, username_buy: username };
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderApiError::ResponseError(e.to_string()))?;
        read_json_response(response).await
    }

    pub async fn buy_otp(&self, product: &str, location: &str) -> Result<OtpBuyResponse, ProviderApiError> {
        let url = format!("{}/otp_buy", self.config.api_url);
        trace!("Requesting OrbitShop OTP number at {url} for {product} ({location})");
        let body = OtpBuyRequest { keyapi: self.config.api_key.reveal(), product, location };
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderApiError::ResponseError(e.to_string()))?;
        read_json_response(response).await
    }
}
