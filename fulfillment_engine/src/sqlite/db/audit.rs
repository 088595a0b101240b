use sqlx::SqliteConnection;

use crate::db_types::{AuditEvent, NewAuditEvent, OrderId};

pub async fn insert_event(event: NewAuditEvent, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let id = sqlx::query_scalar(
        "INSERT INTO audit_events (event, account_id, order_id, success, error, details) VALUES ($1, $2, $3, $4, $5, \
         $6) RETURNING id",
    )
    .bind(event.event)
    .bind(event.account_id)
    .bind(event.order_id)
    .bind(event.success)
    .bind(event.error)
    .bind(event.details)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn events_for_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<AuditEvent>, sqlx::Error> {
    let events = sqlx::query_as("SELECT * FROM audit_events WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(events)
}
