use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderState},
    order_objects::OrderQueryFilter,
    traits::FulfillmentGatewayError,
};

/// Inserts the order into the database, returning `false` in the second parameter if the order
/// already exists.
pub async fn idempotent_insert(
    order: NewOrder,
    conn: &mut SqliteConnection,
) -> Result<(Order, bool), FulfillmentGatewayError> {
    let inserted = match fetch_order_by_order_id(&order.order_id, conn).await? {
        Some(order) => (order, false),
        None => {
            let order = insert_order(order, conn).await?;
            debug!("📝️ Order [{}] inserted with id {}", order.order_id, order.id);
            (order, true)
        },
    };
    Ok(inserted)
}

/// Inserts a new order in `pending` state. This is not atomic. You can embed this call inside a
/// transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, FulfillmentGatewayError> {
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                account_id,
                product_id,
                category,
                provider,
                price
            ) VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(order.order_id)
    .bind(order.account_id)
    .bind(order.product_id)
    .bind(order.category)
    .bind(order.provider)
    .bind(order.price)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_orders_for_account(
    account_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE account_id = $1 ORDER BY id DESC")
        .bind(account_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        r#"
    SELECT * FROM orders
    "#,
    );
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_id) = query.order_id {
        where_clause.push("order_id = ");
        where_clause.push_bind_unseparated(order_id.as_str().to_string());
    }
    if let Some(account_id) = query.account_id {
        where_clause.push("account_id = ");
        where_clause.push_bind_unseparated(account_id);
    }
    if let Some(category) = query.category {
        where_clause.push("category = ");
        where_clause.push_bind_unseparated(category.to_string());
    }
    if let Some(provider) = query.provider {
        where_clause.push("provider = ");
        where_clause.push_bind_unseparated(provider.to_string());
    }
    if query.state.as_ref().map(|s| !s.is_empty()).unwrap_or(false) {
        let states =
            query.state.as_ref().unwrap().iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(",");
        where_clause.push(format!("state IN ({states})"));
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at ASC");

    trace!("📝️ Executing query: {}", builder.sql());
    let query = builder.build_query_as::<Order>();
    let orders = query.fetch_all(conn).await?;
    trace!("📝️ Result of search_orders: {} rows", orders.len());
    Ok(orders)
}

/// Claims a live order as completed, recording what the vendor sent back. The update is
/// conditional on the order still being `pending` or `processing`; `None` means the order is
/// missing or cannot complete from its current state, and nothing was written.
pub(crate) async fn settle_order(
    order_id: &OrderId,
    external_ref: Option<&str>,
    payload_json: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        "UPDATE orders SET state = 'completed', external_ref = $2, provider_payload = $3, updated_at = \
         CURRENT_TIMESTAMP WHERE order_id = $1 AND state IN ('pending', 'processing') RETURNING *",
    )
    .bind(order_id.as_str())
    .bind(external_ref)
    .bind(payload_json)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Moves a live order to `failed` so its debit can be compensated. Conditional in the same way as
/// [`settle_order`]; run it as the first statement of the compensation transaction.
pub(crate) async fn mark_order_failed(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        "UPDATE orders SET state = 'failed', updated_at = CURRENT_TIMESTAMP WHERE order_id = $1 AND state IN \
         ('pending', 'processing') RETURNING *",
    )
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// An operator-driven state change, validated against the transition table.
///
/// Illegal moves return [`FulfillmentGatewayError::InvalidStateTransition`] without executing any
/// update, so the row's `updated_at` is left exactly as it was. The update itself is conditional
/// on the state we just read, which protects against a concurrent transition racing this one.
pub(crate) async fn transition_order_checked(
    order_id: &OrderId,
    new_state: OrderState,
    conn: &mut SqliteConnection,
) -> Result<Order, FulfillmentGatewayError> {
    let current = fetch_order_by_order_id(order_id, &mut *conn)
        .await?
        .ok_or_else(|| FulfillmentGatewayError::OrderNotFound(order_id.clone()))?;
    if !current.state.can_transition_to(new_state) {
        return Err(FulfillmentGatewayError::InvalidStateTransition {
            order_id: order_id.clone(),
            from: current.state,
            to: new_state,
        });
    }
    let updated: Option<Order> = sqlx::query_as(
        "UPDATE orders SET state = $1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $2 AND state = $3 RETURNING *",
    )
    .bind(new_state)
    .bind(order_id.as_str())
    .bind(current.state)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(order) => {
            debug!("📝️ Order [{order_id}] moved from {} to {new_state}", current.state);
            Ok(order)
        },
        // Someone else moved the order between our read and our write.
        None => {
            let now = fetch_order_by_order_id(order_id, conn)
                .await?
                .ok_or_else(|| FulfillmentGatewayError::OrderNotFound(order_id.clone()))?;
            Err(FulfillmentGatewayError::InvalidStateTransition {
                order_id: order_id.clone(),
                from: now.state,
                to: new_state,
            })
        },
    }
}
