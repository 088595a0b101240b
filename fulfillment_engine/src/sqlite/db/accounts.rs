use log::{debug, trace};
use sqlx::SqliteConnection;
use sfg_common::Credits;

use crate::{
    db_types::Account,
    traits::{AccountApiError, FulfillmentGatewayError},
};

pub async fn create_account(conn: &mut SqliteConnection) -> Result<Account, FulfillmentGatewayError> {
    let account: Account =
        sqlx::query_as("INSERT INTO accounts (balance) VALUES (0) RETURNING *").fetch_one(conn).await?;
    debug!("🧑️ Created account {} with zero balance", account.id);
    Ok(account)
}

pub async fn fetch_account(account_id: i64, conn: &mut SqliteConnection) -> Result<Option<Account>, AccountApiError> {
    let account =
        sqlx::query_as("SELECT * FROM accounts WHERE id = $1").bind(account_id).fetch_optional(conn).await?;
    Ok(account)
}

/// Subtracts `amount` from the account balance, failing if the balance would go negative.
///
/// The update is conditional on `balance >= amount`, so the insufficient-funds check and the debit
/// are a single statement. Run this as the first statement of a money transaction: it takes
/// SQLite's write lock immediately, which serialises concurrent debits against the same store.
pub async fn debit_account(
    account_id: i64,
    amount: Credits,
    conn: &mut SqliteConnection,
) -> Result<Account, FulfillmentGatewayError> {
    if !amount.is_positive() {
        return Err(FulfillmentGatewayError::NonPositiveAmount);
    }
    trace!("🧑️ Debiting account {account_id} by {amount}");
    let account: Option<Account> = sqlx::query_as(
        "UPDATE accounts SET balance = balance - $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND balance >= $1 \
         RETURNING *",
    )
    .bind(amount)
    .bind(account_id)
    .fetch_optional(&mut *conn)
    .await?;
    match account {
        Some(account) => Ok(account),
        // The guard refused. Work out whether the account is missing or just short of funds.
        None => match fetch_account(account_id, conn).await? {
            Some(account) => Err(FulfillmentGatewayError::InsufficientBalance {
                account_id,
                available: account.balance,
                required: amount,
            }),
            None => Err(FulfillmentGatewayError::AccountNotFound(account_id)),
        },
    }
}

/// Adds `amount` to the account balance. Like [`debit_account`], the update runs as a single
/// conditional statement and should lead any transaction that uses it.
pub async fn credit_account(
    account_id: i64,
    amount: Credits,
    conn: &mut SqliteConnection,
) -> Result<Account, FulfillmentGatewayError> {
    if !amount.is_positive() {
        return Err(FulfillmentGatewayError::NonPositiveAmount);
    }
    trace!("🧑️ Crediting account {account_id} with {amount}");
    let account: Option<Account> = sqlx::query_as(
        "UPDATE accounts SET balance = balance + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(amount)
    .bind(account_id)
    .fetch_optional(conn)
    .await?;
    account.ok_or(FulfillmentGatewayError::AccountNotFound(account_id))
}
