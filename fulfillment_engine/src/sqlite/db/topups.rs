use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewWalletTopup, WalletTopup},
    traits::FulfillmentGatewayError,
};

/// Registers an expected top-up. If the reference is already registered, the stored row is
/// returned unchanged.
pub async fn idempotent_insert(
    topup: NewWalletTopup,
    conn: &mut SqliteConnection,
) -> Result<WalletTopup, FulfillmentGatewayError> {
    if !topup.amount.is_positive() {
        return Err(FulfillmentGatewayError::NonPositiveAmount);
    }
    if let Some(existing) = fetch_topup_by_ref(&topup.external_ref, &mut *conn).await? {
        trace!("💳️ Top-up {} already registered, returning as-is", existing.external_ref);
        return Ok(existing);
    }
    let topup: WalletTopup = sqlx::query_as(
        "INSERT INTO wallet_topups (account_id, amount, external_ref) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(topup.account_id)
    .bind(topup.amount)
    .bind(topup.external_ref)
    .fetch_one(conn)
    .await?;
    debug!("💳️ Registered top-up {} of {} for account {}", topup.external_ref, topup.amount, topup.account_id);
    Ok(topup)
}

pub async fn fetch_topup_by_ref(
    external_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<WalletTopup>, sqlx::Error> {
    let topup = sqlx::query_as("SELECT * FROM wallet_topups WHERE external_ref = $1")
        .bind(external_ref)
        .fetch_optional(conn)
        .await?;
    Ok(topup)
}

/// Claims a top-up for settlement by flipping its status to `completed`.
///
/// The update is conditional on the status not already being `completed`, so exactly one of any
/// number of concurrent notifications for the same reference gets the row back; the rest see
/// `None`. Run this as the first statement of the settlement transaction.
pub(crate) async fn claim_topup(
    external_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<WalletTopup>, sqlx::Error> {
    let topup = sqlx::query_as(
        "UPDATE wallet_topups SET status = 'completed', updated_at = CURRENT_TIMESTAMP WHERE external_ref = $1 AND \
         status <> 'completed' RETURNING *",
    )
    .bind(external_ref)
    .fetch_optional(conn)
    .await?;
    Ok(topup)
}

/// Marks a pending top-up as failed. Completed top-ups are left alone.
pub(crate) async fn fail_topup(
    external_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<WalletTopup>, sqlx::Error> {
    let topup = sqlx::query_as(
        "UPDATE wallet_topups SET status = 'failed', updated_at = CURRENT_TIMESTAMP WHERE external_ref = $1 AND \
         status = 'pending' RETURNING *",
    )
    .bind(external_ref)
    .fetch_optional(conn)
    .await?;
    Ok(topup)
}
