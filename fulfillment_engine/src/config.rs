//! Engine configuration.
//!
//! One immutable [`FulfillmentConfig`] is built at process start from `SFG_*` environment
//! variables and handed to the registry, the orchestrator and the settlement API. Missing
//! variables fall back to logged defaults so a bare development environment still starts.

use std::{collections::HashMap, env, time::Duration};

use log::*;
use provider_clients::{BoostPanelConfig, GameVaultConfig, OrbitShopConfig, SubHubConfig};
use sfg_common::{parse_boolean_flag, Secret};

use crate::db_types::Vendor;

const DEFAULT_FULFILMENT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_FULFILMENT_ATTEMPTS: u32 = 1;

#[derive(Clone, Debug)]
pub struct FulfillmentConfig {
    pub database_url: String,
    pub fulfilment: FulfilmentPolicy,
    /// Vendors in failover order. A vendor missing from this list is never consulted.
    pub vendor_priority: Vec<Vendor>,
    /// Vendors excluded from the registry even if they appear in the priority list.
    pub disabled_vendors: Vec<Vendor>,
    pub webhook: WebhookConfig,
    pub game_vault: GameVaultConfig,
    pub orbit_shop: OrbitShopConfig,
    pub sub_hub: SubHubConfig,
    pub boost_panel: BoostPanelConfig,
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            database_url: String::default(),
            fulfilment: FulfilmentPolicy::default(),
            vendor_priority: Vendor::all().to_vec(),
            disabled_vendors: Vec::new(),
            webhook: WebhookConfig::default(),
            game_vault: GameVaultConfig::default(),
            orbit_shop: OrbitShopConfig::default(),
            sub_hub: SubHubConfig::default(),
            boost_panel: BoostPanelConfig::default(),
        }
    }
}

impl FulfillmentConfig {
    pub fn from_env_or_default() -> Self {
        let database_url = env::var("SFG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ SFG_DATABASE_URL is not set. Please set it to the URL for the fulfillment database.");
            String::default()
        });
        let fulfilment = FulfilmentPolicy::from_env_or_default();
        let vendor_priority = vendor_list_from_env("SFG_VENDOR_PRIORITY").unwrap_or_else(|| {
            info!("🪛️ SFG_VENDOR_PRIORITY is not set. Using the default vendor order.");
            Vendor::all().to_vec()
        });
        let disabled_vendors = vendor_list_from_env("SFG_DISABLED_VENDORS").unwrap_or_default();
        let webhook = WebhookConfig::from_env_or_default();
        Self {
            database_url,
            fulfilment,
            vendor_priority,
            disabled_vendors,
            webhook,
            game_vault: GameVaultConfig::new_from_env_or_default(),
            orbit_shop: OrbitShopConfig::new_from_env_or_default(),
            sub_hub: SubHubConfig::new_from_env_or_default(),
            boost_panel: BoostPanelConfig::new_from_env_or_default(),
        }
    }
}

/// Knobs for the external fulfillment call in the purchase saga.
#[derive(Clone, Copy, Debug)]
pub struct FulfilmentPolicy {
    /// Deadline for a single vendor fulfillment call. An elapsed deadline compensates the
    /// purchase; it is never retried.
    pub timeout: Duration,
    /// Total attempts per purchase. Only definitive vendor failures consume additional attempts.
    pub max_attempts: u32,
}

impl Default for FulfilmentPolicy {
    fn default() -> Self {
        Self { timeout: DEFAULT_FULFILMENT_TIMEOUT, max_attempts: DEFAULT_MAX_FULFILMENT_ATTEMPTS }
    }
}

impl FulfilmentPolicy {
    pub fn from_env_or_default() -> Self {
        let timeout = env::var("SFG_FULFILMENT_TIMEOUT")
            .map_err(|_| {
                info!(
                    "🪛️ SFG_FULFILMENT_TIMEOUT is not set. Using the default value of {}s.",
                    DEFAULT_FULFILMENT_TIMEOUT.as_secs()
                )
            })
            .and_then(|s| {
                s.parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|e| warn!("🪛️ Invalid configuration value for SFG_FULFILMENT_TIMEOUT. {e}"))
            })
            .ok()
            .unwrap_or(DEFAULT_FULFILMENT_TIMEOUT);
        let max_attempts = env::var("SFG_MAX_FULFILMENT_ATTEMPTS")
            .map(|s| {
                s.parse::<u32>().unwrap_or_else(|e| {
                    warn!(
                        "🪛️ {s} is not a valid value for SFG_MAX_FULFILMENT_ATTEMPTS. {e} Using the default, \
                         {DEFAULT_MAX_FULFILMENT_ATTEMPTS}, instead."
                    );
                    DEFAULT_MAX_FULFILMENT_ATTEMPTS
                })
            })
            .ok()
            .unwrap_or(DEFAULT_MAX_FULFILMENT_ATTEMPTS)
            .max(1);
        Self { timeout, max_attempts }
    }
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    /// Key for the HMAC-SHA256 signature over the raw webhook body.
    pub secret: Secret<String>,
    /// When false, webhook signatures are not checked. Local development only.
    pub signature_checks: bool,
    pub default_vocabulary: StatusVocabulary,
    /// Overrides keyed by lowercase gateway name, for gateways whose status strings do not fit
    /// the default keyword sets.
    pub gateway_vocabularies: HashMap<String, StatusVocabulary>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret: Secret::new(String::default()),
            signature_checks: true,
            default_vocabulary: StatusVocabulary::default(),
            gateway_vocabularies: HashMap::new(),
        }
    }
}

impl WebhookConfig {
    pub fn from_env_or_default() -> Self {
        let secret = env::var("SFG_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ SFG_WEBHOOK_SECRET is not set. Please set it to the signing key your payment gateway uses for \
                 webhook calls."
            );
            String::default()
        });
        let secret = Secret::new(secret);
        let signature_checks = parse_boolean_flag(env::var("SFG_WEBHOOK_SIGNATURE_CHECKS").ok(), true);
        if !signature_checks {
            warn!(
                "🚨️ Webhook signature checks are disabled. Anyone who can reach the webhook endpoint can credit \
                 wallets. Do not run production like this."
            );
        }
        let default_vocabulary = StatusVocabulary::from_env_or_default();
        Self { secret, signature_checks, default_vocabulary, gateway_vocabularies: HashMap::new() }
    }

    /// Registers a status vocabulary for the named gateway.
    pub fn with_gateway_vocabulary(mut self, gateway: &str, vocabulary: StatusVocabulary) -> Self {
        self.gateway_vocabularies.insert(gateway.to_lowercase(), vocabulary);
        self
    }

    /// The vocabulary to use for a notification, falling back to the default when the gateway is
    /// unnamed or has no override.
    pub fn vocabulary_for(&self, gateway: Option<&str>) -> &StatusVocabulary {
        gateway
            .and_then(|g| self.gateway_vocabularies.get(&g.to_lowercase()))
            .unwrap_or(&self.default_vocabulary)
    }
}

/// Canonical meaning of a vendor status string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettlementStatus {
    Success,
    Pending,
    Failed,
}

/// Keyword sets used to canonicalize a gateway's status strings.
///
/// Matching is case-insensitive and substring-wise, so a gateway reporting `PAYMENT_PAID` matches
/// the `paid` keyword. Statuses matching neither set are treated as still pending.
#[derive(Clone, Debug)]
pub struct StatusVocabulary {
    pub success: Vec<String>,
    pub failure: Vec<String>,
}

impl Default for StatusVocabulary {
    fn default() -> Self {
        let success = ["success", "completed", "paid", "confirmed", "succeeded"];
        let failure = ["failed", "cancelled", "canceled", "rejected", "expired"];
        Self {
            success: success.iter().map(|s| s.to_string()).collect(),
            failure: failure.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl StatusVocabulary {
    pub fn new<S: Into<String>>(success: Vec<S>, failure: Vec<S>) -> Self {
        Self {
            success: success.into_iter().map(|s| s.into().to_lowercase()).collect(),
            failure: failure.into_iter().map(|s| s.into().to_lowercase()).collect(),
        }
    }

    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let success = keyword_list_from_env("SFG_WEBHOOK_SUCCESS_STATUSES").unwrap_or(defaults.success);
        let failure = keyword_list_from_env("SFG_WEBHOOK_FAILURE_STATUSES").unwrap_or(defaults.failure);
        Self { success, failure }
    }

    pub fn classify(&self, status: &str) -> SettlementStatus {
        let status = status.trim().to_lowercase();
        if self.success.iter().any(|kw| status.contains(kw.as_str())) {
            SettlementStatus::Success
        } else if self.failure.iter().any(|kw| status.contains(kw.as_str())) {
            SettlementStatus::Failed
        } else {
            SettlementStatus::Pending
        }
    }
}

fn vendor_list_from_env(var: &str) -> Option<Vec<Vendor>> {
    let raw = env::var(var).ok()?;
    let vendors = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            s.parse::<Vendor>()
                .map_err(|e| warn!("🪛️ Ignoring invalid vendor name ({s}) in {var}: {e}"))
                .ok()
        })
        .collect::<Vec<Vendor>>();
    Some(vendors)
}

fn keyword_list_from_env(var: &str) -> Option<Vec<String>> {
    let raw = env::var(var).ok()?;
    let keywords = raw
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect::<Vec<String>>();
    if keywords.is_empty() {
        warn!("🪛️ {var} is set but contains no usable keywords. Using the defaults instead.");
        return None;
    }
    Some(keywords)
}
