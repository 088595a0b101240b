//! Client for the BoostPanel social-engagement vendor.
//!
//! BoostPanel speaks the common SMM-panel dialect: every call is a GET against a single endpoint,
//! authenticated and dispatched with query parameters (`key`, `action=services|add`). Service
//! rates are quoted per 1000 delivered units, and a placed order answers with a bare numeric id.

use std::sync::Arc;

use log::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sfg_common::Secret;

use crate::{
    helpers::{read_json_response, string_or_number},
    ProviderApiError,
    RawPrice,
};

#[derive(Debug, Clone, Default)]
pub struct BoostPanelConfig {
    pub api_url: String,
    pub api_key: Secret<String>,
}

impl BoostPanelConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("SFG_BOOSTPANEL_API_URL").unwrap_or_else(|_| {
            warn!("SFG_BOOSTPANEL_API_URL not set, using (probably useless) default");
            "https://boostpanel.example/api/v2".to_string()
        });
        let api_key = Secret::new(std::env::var("SFG_BOOSTPANEL_API_KEY").unwrap_or_else(|_| {
            warn!("SFG_BOOSTPANEL_API_KEY not set, using (probably useless) default");
            "bp_00000000000000".to_string()
        }));
        Self { api_url, api_key }
    }
}

//--------------------------------------   Data objects     ---------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelService {
    #[serde(deserialize_with = "string_or_number")]
    pub service: String,
    pub name: String,
    pub rate: RawPrice,
}

#[derive(Debug, Clone)]
pub struct NewPanelOrder {
    pub service: String,
    pub link: String,
    pub quantity: i64,
    pub runs: Option<i64>,
    pub interval: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelOrderResponse {
    pub order: Option<i64>,
    pub error: Option<String>,
}

//--------------------------------------      Client        ---------------------------------------------------------

#[derive(Clone)]
pub struct BoostPanelApi {
    config: BoostPanelConfig,
    client: Arc<Client>,
}

impl BoostPanelApi {
    pub fn new(config: BoostPanelConfig) -> Result<Self, ProviderApiError> {
        let client = Client::builder().build().map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub async fn services(&self) -> Result<Vec<PanelService>, ProviderApiError> {
        let params = [("key", self.config.api_key.reveal().as_str()), ("action", "services")];
        trace!("Fetching BoostPanel service list");
        let response = self
            .client
            .get(&self.config.api_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| ProviderApiError::ResponseError(e.to_string()))?;
        read_json_response(response).await
    }

    pub async fn add_order(&self, order: &NewPanelOrder) -> Result<PanelOrderResponse, ProviderApiError> {
        let mut params = vec![
            ("key", self.config.api_key.reveal().clone()),
            ("action", "add".to_string()),
            ("service", order.service.clone()),
            ("link", order.link.clone()),
            ("quantity", order.quantity.to_string()),
        ];
        if let Some(runs) = order.runs {
            params.push(("runs", runs.to_string()));
        }
        if let Some(interval) = order.interval {
            params.push(("interval", interval.to_string()));
        }
        trace!("Placing BoostPanel order for service {} x{}", order.service, order.quantity);
        let response = self
            .client
            .get(&self.config.api_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| ProviderApiError::ResponseError(e.to_string()))?;
        read_json_response(response).await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn service_list_decodes() {
        let body = serde_json::json!([
            {"service": 2001, "name": "Followers (HQ)", "rate": "120.00"},
            {"service": "2002", "name": "Likes", "rate": 45.5}
        ]);
        let services: Vec<PanelService> = serde_json::from_value(body).unwrap();
        assert_eq!(services[0].service, "2001");
        assert_eq!(services[1].rate.to_credits().unwrap().value(), 4550);
    }

    #[test]
    fn order_response_decodes() {
        let ok: PanelOrderResponse = serde_json::from_value(serde_json::json!({"order": 7710})).unwrap();
        assert_eq!(ok.order, Some(7710));
        let err: PanelOrderResponse =
            serde_json::from_value(serde_json::json!({"error": "not enough funds"})).unwrap();
        assert_eq!(err.error.as_deref(), Some("not enough funds"));
        assert!(err.order.is_none());
    }
}
