//! Races the engine against itself: concurrent debits and concurrent webhook deliveries.
//!
//! Correctness here comes from the database transaction discipline, not from in-process locks,
//! so these tests run real SQLite transactions from parallel tokio tasks.

use std::{sync::Arc, time::Duration};

use fulfillment_engine::{
    config::{FulfilmentPolicy, WebhookConfig},
    db_types::{ProductCategory, Vendor},
    events::EventProducers,
    order_objects::PurchaseRequest,
    traits::{AccountManagement, FulfillmentGatewayDatabase},
    OrderFlowApi,
    PurchaseApiError,
    SettlementApi,
    TopupNotification,
    WebhookOutcome,
};
use sfg_common::Credits;
use support::{funded_account, new_db, registry_of, stub_vendor::StubVendor, tear_down};

mod support;

#[tokio::test]
async fn concurrent_purchases_cannot_double_spend() {
    let db = new_db().await;
    let account = funded_account(&db, Credits::from_credits(100)).await;
    let stub = StubVendor::new(Vendor::GameVault, &[ProductCategory::TopupGame])
        .with_product("mlbb/diamond-86", Credits::from_credits(60));
    let policy = FulfilmentPolicy { timeout: Duration::from_secs(5), max_attempts: 1 };
    let api = Arc::new(OrderFlowApi::new(db.clone(), registry_of(vec![stub]), policy, EventProducers::default()));

    let mut handles = Vec::new();
    for _ in 0..2 {
        let api = Arc::clone(&api);
        let account_id = account.id;
        handles.push(tokio::spawn(async move {
            let request = PurchaseRequest::new(account_id, ProductCategory::TopupGame, "mlbb/diamond-86");
            api.purchase(request).await
        }));
    }
    let mut successes = 0;
    let mut rejections = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(outcome) => {
                assert!(outcome.balance == Credits::from_credits(40));
                successes += 1;
            },
            Err(PurchaseApiError::InsufficientBalance { available, required }) => {
                assert_eq!(required, Credits::from_credits(60));
                assert!(available < required);
                rejections += 1;
            },
            Err(other) => panic!("Unexpected purchase error: {other}"),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(rejections, 1);
    assert_eq!(db.fetch_account(account.id).await.unwrap().unwrap().balance, Credits::from_credits(40));
    tear_down(db).await;
}

#[tokio::test]
async fn successful_debits_never_exceed_the_floor() {
    let db = new_db().await;
    // Balance 100, price 30: exactly three of five concurrent purchases can be funded.
    let account = funded_account(&db, Credits::from_credits(100)).await;
    let stub = StubVendor::new(Vendor::GameVault, &[ProductCategory::TopupGame])
        .with_product("mlbb/diamond-43", Credits::from_credits(30));
    let policy = FulfilmentPolicy { timeout: Duration::from_secs(5), max_attempts: 1 };
    let api = Arc::new(OrderFlowApi::new(db.clone(), registry_of(vec![stub]), policy, EventProducers::default()));

    let mut handles = Vec::new();
    for _ in 0..5 {
        let api = Arc::clone(&api);
        let account_id = account.id;
        handles.push(tokio::spawn(async move {
            let request = PurchaseRequest::new(account_id, ProductCategory::TopupGame, "mlbb/diamond-43");
            api.purchase(request).await
        }));
    }
    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(PurchaseApiError::InsufficientBalance { .. }) => {},
            Err(other) => panic!("Unexpected purchase error: {other}"),
        }
    }
    assert_eq!(successes, 3);
    let account = db.fetch_account(account.id).await.unwrap().unwrap();
    assert_eq!(account.balance, Credits::from_credits(10));
    assert!(account.balance >= Credits::from(0));
    tear_down(db).await;
}

#[tokio::test]
async fn concurrent_webhook_deliveries_credit_exactly_once() {
    let db = new_db().await;
    let account = db.create_account().await.unwrap();
    let setup = SettlementApi::new(db.clone(), WebhookConfig::default(), EventProducers::default());
    setup.begin_topup(account.id, Credits::from_credits(50), "pay-racing").await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let db = db.clone();
        let account_id = account.id;
        handles.push(tokio::spawn(async move {
            let api = SettlementApi::new(db, WebhookConfig::default(), EventProducers::default());
            let notice = TopupNotification {
                external_ref: "pay-racing".to_string(),
                status: "paid".to_string(),
                amount: Credits::from_credits(50),
                account_id,
                gateway: None,
            };
            api.reconcile_webhook(notice).await
        }));
    }
    let mut credited = 0;
    let mut duplicates = 0;
    for handle in handles {
        let ack = handle.await.unwrap().expect("Webhook reconciliation should not error");
        assert!(ack.acknowledged);
        match ack.outcome {
            WebhookOutcome::Credited => credited += 1,
            WebhookOutcome::Duplicate => duplicates += 1,
            other => panic!("Unexpected webhook outcome: {other}"),
        }
    }
    assert_eq!(credited, 1);
    assert_eq!(duplicates, 3);
    assert_eq!(db.fetch_account(account.id).await.unwrap().unwrap().balance, Credits::from_credits(50));
    let ledger = db.fetch_ledger_for_account(account.id).await.unwrap();
    assert_eq!(ledger.len(), 1);
    tear_down(db).await;
}
