//! Vendor adapters and the registry that picks between them.
//!
//! Each adapter pairs a `provider_clients` API client with the translation into the engine's
//! [`ProviderResult`] vocabulary. The registry owns the enabled adapters in failover priority
//! order and is the only component that decides *which* vendor fulfils a purchase.

mod adapter;
mod boost_panel;
mod game_vault;
mod orbit_shop;
mod registry;
mod sub_hub;

use std::sync::Arc;

use log::{error, info, warn};
use provider_clients::{BoostPanelApi, GameVaultApi, OrbitShopApi, SubHubApi};

pub use adapter::{FulfilmentRequest, ProductInfo, ProviderAdapter, ProviderResult};
pub use boost_panel::BoostPanelAdapter;
pub use game_vault::GameVaultAdapter;
pub use orbit_shop::OrbitShopAdapter;
pub use registry::{ProviderRegistry, ResolvedProduct};
pub use sub_hub::SubHubAdapter;

use crate::{config::FulfillmentConfig, db_types::Vendor};

/// Builds the adapter registry from configuration.
///
/// Vendors appear in the registry in the configured priority order. A vendor that is disabled, or
/// whose client cannot be initialised, is skipped with a log line rather than taking the engine
/// down; purchases simply cannot resolve against it.
pub fn build_registry(config: &FulfillmentConfig) -> ProviderRegistry {
    let mut adapters: Vec<Arc<dyn ProviderAdapter>> = Vec::new();
    for vendor in &config.vendor_priority {
        if config.disabled_vendors.contains(vendor) {
            info!("🛒️ {vendor} is disabled by configuration. Skipping.");
            continue;
        }
        let adapter: Option<Arc<dyn ProviderAdapter>> = match vendor {
            Vendor::GameVault => match GameVaultApi::new(config.game_vault.clone()) {
                Ok(api) => Some(Arc::new(GameVaultAdapter::new(api))),
                Err(e) => {
                    error!("🛒️ Could not initialise the GameVault client: {e}");
                    None
                },
            },
            Vendor::OrbitShop => match OrbitShopApi::new(config.orbit_shop.clone()) {
                Ok(api) => Some(Arc::new(OrbitShopAdapter::new(api))),
                Err(e) => {
                    error!("🛒️ Could not initialise the OrbitShop client: {e}");
                    None
                },
            },
            Vendor::SubHub => match SubHubApi::new(config.sub_hub.clone()) {
                Ok(api) => Some(Arc::new(SubHubAdapter::new(api))),
                Err(e) => {
                    error!("🛒️ Could not initialise the SubHub client: {e}");
                    None
                },
            },
            Vendor::BoostPanel => match BoostPanelApi::new(config.boost_panel.clone()) {
                Ok(api) => Some(Arc::new(BoostPanelAdapter::new(api))),
                Err(e) => {
                    error!("🛒️ Could not initialise the BoostPanel client: {e}");
                    None
                },
            },
        };
        if let Some(adapter) = adapter {
            adapters.push(adapter);
        }
    }
    if adapters.is_empty() {
        warn!("🛒️ No vendor adapters are enabled. Purchases will not be able to resolve any product.");
    }
    ProviderRegistry::new(adapters)
}
