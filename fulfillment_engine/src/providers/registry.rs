use std::sync::Arc;

use log::{debug, trace, warn};

use crate::{
    db_types::{ProductCategory, Vendor},
    providers::adapter::{ProductInfo, ProviderAdapter},
};

/// A product that has been located with a specific vendor, ready to fulfil.
#[derive(Clone)]
pub struct ResolvedProduct {
    pub adapter: Arc<dyn ProviderAdapter>,
    pub info: ProductInfo,
}

/// The set of enabled vendor adapters, held in failover priority order.
///
/// Disabled vendors are simply never added, so the registry does not need to know about
/// configuration. Order of the `adapters` vector is the order vendors are tried.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new(adapters: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        Self { adapters }
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn vendors(&self) -> Vec<Vendor> {
        self.adapters.iter().map(|a| a.vendor()).collect()
    }

    pub fn adapter_for(&self, vendor: Vendor) -> Option<&Arc<dyn ProviderAdapter>> {
        self.adapters.iter().find(|a| a.vendor() == vendor)
    }

    /// Finds a vendor that carries the product.
    ///
    /// When `vendor_hint` names an enabled vendor serving the category, only that vendor is
    /// consulted and a miss is final. A hint for a vendor that is disabled or does not serve the
    /// category is logged and ignored. Without a usable hint, enabled vendors serving the
    /// category are tried in priority order and the first catalogue hit wins, which is what lets
    /// an operator fail over silently when one vendor's catalogue goes dark.
    pub async fn resolve(
        &self,
        category: ProductCategory,
        product_id: &str,
        vendor_hint: Option<Vendor>,
    ) -> Option<ResolvedProduct> {
        if let Some(hint) = vendor_hint {
            match self.adapters.iter().find(|a| a.vendor() == hint && a.serves(category)) {
                Some(adapter) => {
                    debug!("🛒️ Vendor hint {hint} accepted for {category}/{product_id}. Consulting only {hint}.");
                    let info = adapter.find_product(category, product_id).await?;
                    return Some(ResolvedProduct { adapter: Arc::clone(adapter), info });
                },
                None => {
                    warn!("🛒️ Vendor hint {hint} is not enabled for {category}. Falling back to priority order.");
                },
            }
        }
        for adapter in self.adapters.iter().filter(|a| a.serves(category)) {
            if let Some(info) = adapter.find_product(category, product_id).await {
                debug!("🛒️ {} resolved {category}/{product_id} at {}", adapter.vendor(), info.price);
                return Some(ResolvedProduct { adapter: Arc::clone(adapter), info });
            }
            trace!("🛒️ {} does not carry {category}/{product_id}. Trying the next vendor.", adapter.vendor());
        }
        None
    }
}
