#![allow(dead_code)]

pub mod prepare_env;
pub mod stub_vendor;

use std::sync::Arc;

use fulfillment_engine::{
    config::WebhookConfig,
    db_types::Account,
    events::EventProducers,
    providers::{ProviderAdapter, ProviderRegistry},
    traits::{AccountManagement, FulfillmentGatewayDatabase},
    SettlementApi,
    SqliteDatabase,
    TopupNotification,
    WebhookOutcome,
};
use log::error;
use sfg_common::Credits;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use stub_vendor::StubVendor;

use crate::support::prepare_env::{prepare_test_env, random_db_path};

pub async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 10).await.expect("Error creating database")
}

pub async fn tear_down(mut db: SqliteDatabase) {
    let url = db.url().to_string();
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    Sqlite::drop_database(&url).await.expect("Error dropping test database");
}

pub fn registry_of(stubs: Vec<StubVendor>) -> ProviderRegistry {
    let adapters = stubs.into_iter().map(|s| Arc::new(s) as Arc<dyn ProviderAdapter>).collect();
    ProviderRegistry::new(adapters)
}

/// Creates an account and funds it through the settlement flow, exactly as production money
/// arrives: a registered top-up settled by a successful gateway notification.
pub async fn funded_account(db: &SqliteDatabase, amount: Credits) -> Account {
    let account = db.create_account().await.expect("Error creating account");
    let api = SettlementApi::new(db.clone(), WebhookConfig::default(), EventProducers::default());
    let external_ref = format!("fund-{}", account.id);
    api.begin_topup(account.id, amount, &external_ref).await.expect("Error registering top-up");
    let notice = TopupNotification {
        external_ref,
        status: "success".to_string(),
        amount,
        account_id: account.id,
        gateway: None,
    };
    let ack = api.reconcile_webhook(notice).await.expect("Error settling top-up");
    assert_eq!(ack.outcome, WebhookOutcome::Credited);
    db.fetch_account(account.id).await.expect("Error fetching account").expect("Account must exist")
}
