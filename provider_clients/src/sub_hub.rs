//! Client for the SubHub vendor (premium app unlocks and preorder goods).
//!
//! SubHub uses HTTP Basic auth built directly from the API key and a `{statusCode, data}`
//! envelope on every endpoint; `statusCode == 200` inside the body, not the HTTP status, is the
//! vendor's word on whether the call succeeded.

use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::{Deserialize, Serialize};
use sfg_common::Secret;

use crate::{
    helpers::{read_json_response, string_or_number},
    ProviderApiError,
    RawPrice,
};

#[derive(Debug, Clone, Default)]
pub struct SubHubConfig {
    pub api_url: String,
    pub api_key: Secret<String>,
}

impl SubHubConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("SFG_SUBHUB_API_URL").unwrap_or_else(|_| {
            warn!("SFG_SUBHUB_API_URL not set, using (probably useless) default");
            "https://api.subhub.example".to_string()
        });
        let api_key = Secret::new(std::env::var("SFG_SUBHUB_API_KEY").unwrap_or_else(|_| {
            warn!("SFG_SUBHUB_API_KEY not set, using (probably useless) default");
            "sh_00000000000000".to_string()
        }));
        Self { api_url, api_key }
    }
}

//--------------------------------------   Data objects     ---------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubCatalog {
    #[serde(rename = "statusCode")]
    pub status_code: i64,
    #[serde(default)]
    pub data: Vec<SubProduct>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubProduct {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    pub price: RawPrice,
    #[serde(default)]
    pub pricevip: Option<RawPrice>,
}

impl SubProduct {
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
struct SubOrderRequest<'a> {
    id: &'a str,
    reference: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubOrderResponse {
    #[serde(rename = "statusCode")]
    pub status_code: i64,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    pub message: Option<String>,
}

//--------------------------------------      Client        ---------------------------------------------------------

#[derive(Clone)]
pub struct SubHubApi {
    config: SubHubConfig,
    client: Arc<Client>,
}

impl SubHubApi {
    pub fn new(config: SubHubConfig) -> Result<Self, ProviderApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let auth = format!("Basic {}", base64::encode(config.api_key.reveal()));
        let val = HeaderValue::from_str(&auth).map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub async fn premium_catalog(&self) -> Result<SubCatalog, ProviderApiError> {
        self.catalog("app-premium").await
    }

    pub async fn preorder_catalog(&self) -> Result<SubCatalog, ProviderApiError> {
        self.catalog("preorder").await
    }

    async fn catalog(&self, path: &str) -> Result<SubCatalog, ProviderApiError> {
        let url = format!("{}/{path}", self.config.api_url);
        trace!("Fetching SubHub catalog: {url}");
        let response = self.client.get(url).send().await.map_err(|e| ProviderApiError::ResponseError(e.to_string()))?;
        read_json_response(response).await
    }

    pub async fn buy_premium(&self, id: &str, reference: &str) -> Result<SubOrderResponse, ProviderApiError> {
        self.place_order("app-premium", id, reference).await
    }

    pub async fn place_preorder(&self, id: &str, reference: &str) -> Result<SubOrderResponse, ProviderApiError> {
        self.place_order("preorder", id, reference).await
    }

    async fn place_order(&self, path: &str, id: &str, reference: &str) -> Result<SubOrderResponse, ProviderApiError> {
        let url = format!("{}/{path}", self.config.api_url);
        trace!("Placing SubHub order at {url} for product {id}");
        let body = SubOrderRequest { id, reference };
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
