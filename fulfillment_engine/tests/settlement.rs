//! Webhook reconciliation tests: idempotency, status vocabularies and the discard paths.

use fulfillment_engine::{
    config::{StatusVocabulary, WebhookConfig},
    db_types::TopupStatus,
    events::EventProducers,
    traits::{AccountManagement, FulfillmentGatewayDatabase},
    SettlementApi,
    SqliteDatabase,
    TopupNotification,
    WebhookOutcome,
};
use sfg_common::Credits;
use support::{new_db, tear_down};

mod support;

fn settlement_api(db: &SqliteDatabase) -> SettlementApi<SqliteDatabase> {
    SettlementApi::new(db.clone(), WebhookConfig::default(), EventProducers::default())
}

fn notice(external_ref: &str, status: &str, amount: Credits, account_id: i64) -> TopupNotification {
    TopupNotification {
        external_ref: external_ref.to_string(),
        status: status.to_string(),
        amount,
        account_id,
        gateway: None,
    }
}

#[tokio::test]
async fn successful_notification_credits_once() {
    let db = new_db().await;
    let account = db.create_account().await.unwrap();
    let api = settlement_api(&db);
    api.begin_topup(account.id, Credits::from_credits(50), "pay-1001").await.unwrap();

    let ack = api.reconcile_webhook(notice("pay-1001", "PAYMENT_PAID", Credits::from_credits(50), account.id))
        .await
        .unwrap();
    assert!(ack.acknowledged);
    assert_eq!(ack.outcome, WebhookOutcome::Credited);
    assert_eq!(db.fetch_account(account.id).await.unwrap().unwrap().balance, Credits::from_credits(50));
    assert_eq!(db.fetch_topup("pay-1001").await.unwrap().unwrap().status, TopupStatus::Completed);

    // Redelivery. Acknowledged, no second credit.
    let ack = api.reconcile_webhook(notice("pay-1001", "success", Credits::from_credits(50), account.id))
        .await
        .unwrap();
    assert!(ack.acknowledged);
    assert_eq!(ack.outcome, WebhookOutcome::Duplicate);
    assert_eq!(db.fetch_account(account.id).await.unwrap().unwrap().balance, Credits::from_credits(50));
    // The ledger carries exactly one entry for the reference.
    let ledger = db.fetch_ledger_for_account(account.id).await.unwrap();
    assert_eq!(ledger.iter().filter(|e| e.external_ref.as_deref() == Some("pay-1001")).count(), 1);
    tear_down(db).await;
}

#[tokio::test]
async fn failed_notification_marks_failed_without_credit() {
    let db = new_db().await;
    let account = db.create_account().await.unwrap();
    let api = settlement_api(&db);
    api.begin_topup(account.id, Credits::from_credits(50), "pay-1002").await.unwrap();

    let ack = api.reconcile_webhook(notice("pay-1002", "EXPIRED", Credits::from_credits(50), account.id))
        .await
        .unwrap();
    assert_eq!(ack.outcome, WebhookOutcome::MarkedFailed);
    assert_eq!(db.fetch_topup("pay-1002").await.unwrap().unwrap().status, TopupStatus::Failed);
    assert_eq!(db.fetch_account(account.id).await.unwrap().unwrap().balance, Credits::from(0));
    assert!(db.fetch_ledger_for_account(account.id).await.unwrap().is_empty());
    tear_down(db).await;
}

#[tokio::test]
async fn pending_notification_is_acknowledged_only() {
    let db = new_db().await;
    let account = db.create_account().await.unwrap();
    let api = settlement_api(&db);
    api.begin_topup(account.id, Credits::from_credits(50), "pay-1003").await.unwrap();

    let ack = api.reconcile_webhook(notice("pay-1003", "awaiting_transfer", Credits::from_credits(50), account.id))
        .await
        .unwrap();
    assert_eq!(ack.outcome, WebhookOutcome::Pending);
    assert_eq!(db.fetch_topup("pay-1003").await.unwrap().unwrap().status, TopupStatus::Pending);
    // A later success still settles normally.
    let ack = api.reconcile_webhook(notice("pay-1003", "paid", Credits::from_credits(50), account.id))
        .await
        .unwrap();
    assert_eq!(ack.outcome, WebhookOutcome::Credited);
    tear_down(db).await;
}

#[tokio::test]
async fn unknown_reference_is_acknowledged_and_discarded() {
    let db = new_db().await;
    let account = db.create_account().await.unwrap();
    let api = settlement_api(&db);

    let ack = api.reconcile_webhook(notice("pay-nobody-asked-for", "paid", Credits::from_credits(50), account.id))
        .await
        .unwrap();
    assert!(ack.acknowledged);
    assert_eq!(ack.outcome, WebhookOutcome::Unknown);
    assert_eq!(db.fetch_account(account.id).await.unwrap().unwrap().balance, Credits::from(0));
    tear_down(db).await;
}

#[tokio::test]
async fn account_mismatch_is_discarded_but_does_not_burn_the_topup() {
    let db = new_db().await;
    let owner = db.create_account().await.unwrap();
    let intruder = db.create_account().await.unwrap();
    let api = settlement_api(&db);
    api.begin_topup(owner.id, Credits::from_credits(50), "pay-1004").await.unwrap();

    let ack = api.reconcile_webhook(notice("pay-1004", "paid", Credits::from_credits(50), intruder.id))
        .await
        .unwrap();
    assert_eq!(ack.outcome, WebhookOutcome::Discarded);
    assert_eq!(db.fetch_account(owner.id).await.unwrap().unwrap().balance, Credits::from(0));
    assert_eq!(db.fetch_account(intruder.id).await.unwrap().unwrap().balance, Credits::from(0));
    // The claim was rolled back, so the genuine notification still settles.
    assert_eq!(db.fetch_topup("pay-1004").await.unwrap().unwrap().status, TopupStatus::Pending);
    let ack =
        api.reconcile_webhook(notice("pay-1004", "paid", Credits::from_credits(50), owner.id)).await.unwrap();
    assert_eq!(ack.outcome, WebhookOutcome::Credited);
    assert_eq!(db.fetch_account(owner.id).await.unwrap().unwrap().balance, Credits::from_credits(50));
    tear_down(db).await;
}

#[tokio::test]
async fn settled_amount_wins_over_registered_amount() {
    let db = new_db().await;
    let account = db.create_account().await.unwrap();
    let api = settlement_api(&db);
    api.begin_topup(account.id, Credits::from_credits(50), "pay-1005").await.unwrap();

    // The gateway settled less than was registered. The money that actually arrived is credited.
    let ack = api.reconcile_webhook(notice("pay-1005", "paid", Credits::from_credits(45), account.id))
        .await
        .unwrap();
    assert_eq!(ack.outcome, WebhookOutcome::Credited);
    assert_eq!(db.fetch_account(account.id).await.unwrap().unwrap().balance, Credits::from_credits(45));
    tear_down(db).await;
}

#[tokio::test]
async fn failure_after_settlement_keeps_the_credit() {
    let db = new_db().await;
    let account = db.create_account().await.unwrap();
    let api = settlement_api(&db);
    api.begin_topup(account.id, Credits::from_credits(50), "pay-1006").await.unwrap();
    api.reconcile_webhook(notice("pay-1006", "paid", Credits::from_credits(50), account.id)).await.unwrap();

    let ack = api.reconcile_webhook(notice("pay-1006", "cancelled", Credits::from_credits(50), account.id))
        .await
        .unwrap();
    assert_eq!(ack.outcome, WebhookOutcome::Duplicate);
    assert_eq!(db.fetch_topup("pay-1006").await.unwrap().unwrap().status, TopupStatus::Completed);
    assert_eq!(db.fetch_account(account.id).await.unwrap().unwrap().balance, Credits::from_credits(50));
    tear_down(db).await;
}

#[tokio::test]
async fn gateway_vocabulary_override_applies() {
    let db = new_db().await;
    let account = db.create_account().await.unwrap();
    let config = WebhookConfig::default()
        .with_gateway_vocabulary("legacybank", StatusVocabulary::new(vec!["00"], vec!["99"]));
    let api = SettlementApi::new(db.clone(), config, EventProducers::default());
    api.begin_topup(account.id, Credits::from_credits(50), "pay-1007").await.unwrap();

    let mut n = notice("pay-1007", "00", Credits::from_credits(50), account.id);
    n.gateway = Some("LegacyBank".to_string());
    let ack = api.reconcile_webhook(n).await.unwrap();
    assert_eq!(ack.outcome, WebhookOutcome::Credited);
    tear_down(db).await;
}

#[tokio::test]
async fn registering_a_topup_is_idempotent() {
    let db = new_db().await;
    let account = db.create_account().await.unwrap();
    let api = settlement_api(&db);
    let first = api.begin_topup(account.id, Credits::from_credits(50), "pay-1008").await.unwrap();
    let second = api.begin_topup(account.id, Credits::from_credits(50), "pay-1008").await.unwrap();
    assert_eq!(first.id, second.id);
    tear_down(db).await;
}
