//! Typed REST clients for the upstream fulfillment vendors.
//!
//! Each module wraps one vendor's HTTP API in a small typed client: a config struct carrying the
//! base URL and credential, serde data objects for the wire format, and async methods over a shared
//! [`reqwest::Client`]. The clients are transport only: they decode what the vendor sent and
//! nothing more. Deciding whether a response means "delivered" belongs to the engine's adapters.

mod boost_panel;
mod error;
mod game_vault;
mod helpers;
mod orbit_shop;
mod sub_hub;

pub use boost_panel::{BoostPanelApi, BoostPanelConfig, NewPanelOrder, PanelOrderResponse, PanelService};
pub use error::ProviderApiError;
pub use game_vault::{
    GameItem,
    GameOrderReceipt,
    GameOrderResponse,
    GameProduct,
    GameVaultApi,
    GameVaultConfig,
    NewGameOrder,
};
pub use helpers::{parse_vendor_price, RawPrice};
pub use orbit_shop::{
    OrbitShopApi,
    OrbitShopConfig,
    OtpBuyResponse,
    ShopBuyResponse,
    ShopDelivery,
    ShopProduct,
    ShopProductList,
};
pub use sub_hub::{SubCatalog, SubHubApi, SubHubConfig, SubOrderResponse, SubProduct};
