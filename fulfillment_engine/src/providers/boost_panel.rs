use async_trait::async_trait;
use log::warn;
use provider_clients::{BoostPanelApi, NewPanelOrder};
use sfg_common::Credits;

use crate::{
    db_types::{ProductCategory, Vendor},
    providers::adapter::{FulfilmentRequest, ProductInfo, ProviderAdapter, ProviderResult},
};

const CATEGORIES: [ProductCategory; 1] = [ProductCategory::SocialBoost];

/// Social boosts through an SMM-panel style API.
///
/// Panel services are priced per 1000 units, so a sellable product is the pair of a service and a
/// quantity, addressed as `service:quantity`. The profile link to boost travels in the request's
/// `target` option.
pub struct BoostPanelAdapter {
    api: BoostPanelApi,
}

impl BoostPanelAdapter {
    pub fn new(api: BoostPanelApi) -> Self {
        Self { api }
    }
}

/// Splits `service:quantity` into its parts. Quantities must be positive integers.
fn parse_boost_id(product_id: &str) -> Option<(&str, i64)> {
    let (service, quantity) = product_id.split_once(':')?;
    let quantity: i64 = quantity.parse().ok()?;
    if quantity <= 0 {
        return None;
    }
    Some((service, quantity))
}

#[async_trait]
impl ProviderAdapter for BoostPanelAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::BoostPanel
    }

    fn categories(&self) -> &[ProductCategory] {
        &CATEGORIES
    }

    async fn find_product(&self, category: ProductCategory, product_id: &str) -> Option<ProductInfo> {
        let (service_id, quantity) = parse_boost_id(product_id)?;
        let services = match self.api.services().await {
            Ok(services) => services,
            Err(e) => {
                warn!("🛒️ BoostPanel service list unavailable: {e}");
                return None;
            },
        };
        let service = services.into_iter().find(|s| s.service == service_id)?;
        let price = match service.rate.to_credits() {
            // The rate is per 1000 units; scale to the requested quantity, rounding half up.
            Ok(rate) => Credits::from((rate.value() * quantity + 500) / 1000),
            Err(e) => {
                warn!("🛒️ BoostPanel quoted an undecodable rate for service {service_id}: {e}");
                Credits::from(0)
            },
        };
        Some(ProductInfo {
            product_id: product_id.to_string(),
            name: format!("{} x{quantity}", service.name),
            category,
            vendor: Vendor::BoostPanel,
            price,
        })
    }

    async fn fulfil(&self, request: &FulfilmentRequest) -> ProviderResult {
        let Some((service, quantity)) = parse_boost_id(&request.product_id) else {
            return ProviderResult::Failure { message: format!("Malformed boost product id: {}", request.product_id) };
        };
        let order = NewPanelOrder {
            service: service.to_string(),
            link: request.options.target().to_string(),
            quantity,
            runs: None,
            interval: None,
        };
        match self.api.add_order(&order).await {
            Ok(resp) => match resp.order {
                Some(order_id) => {
                    let payload = serde_json::to_value(&resp).unwrap_or_default();
                    ProviderResult::Success { external_ref: order_id.to_string(), payload }
                },
                None => {
                    let message =
                        resp.error.unwrap_or_else(|| "BoostPanel returned no order id and no error".to_string());
                    ProviderResult::Failure { message }
                },
            },
            Err(e) => ProviderResult::Failure { message: e.to_string() },
        }
    }
}
