use log::trace;
use sfg_common::Credits;
use sqlx::SqliteConnection;

use crate::{
    db_types::{LedgerEntry, NewLedgerEntry},
    traits::{AccountApiError, FulfillmentGatewayError},
};

/// Writes one ledger entry. `balance_after` is the account balance as it stands after the matching
/// balance update in the same transaction; the entry's `balance_before` is derived from it.
///
/// The ledger carries a unique index over `external_ref`, so a second entry for the same top-up
/// reference is refused by the database itself and surfaces as
/// [`FulfillmentGatewayError::DuplicateSettlement`].
pub async fn insert_entry(
    entry: NewLedgerEntry,
    balance_after: Credits,
    conn: &mut SqliteConnection,
) -> Result<LedgerEntry, FulfillmentGatewayError> {
    let balance_before = balance_after - entry.amount;
    trace!("🧾️ Recording {} of {} for account {}", entry.kind, entry.amount, entry.account_id);
    let result = sqlx::query_as(
        r#"
            INSERT INTO ledger_entries (
                account_id,
                order_id,
                kind,
                amount,
                balance_before,
                balance_after,
                description,
                metadata,
                external_ref
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(entry.account_id)
    .bind(entry.order_id)
    .bind(entry.kind)
    .bind(entry.amount)
    .bind(balance_before)
    .bind(balance_after)
    .bind(entry.description)
    .bind(entry.metadata)
    .bind(entry.external_ref.clone())
    .fetch_one(conn)
    .await;
    match result {
        Ok(row) => Ok(row),
        Err(sqlx::Error::Database(de)) if de.is_unique_violation() => {
            Err(FulfillmentGatewayError::DuplicateSettlement(entry.external_ref.unwrap_or_default()))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn ledger_for_account(
    account_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<LedgerEntry>, AccountApiError> {
    let entries = sqlx::query_as("SELECT * FROM ledger_entries WHERE account_id = $1 ORDER BY id ASC")
        .bind(account_id)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}
