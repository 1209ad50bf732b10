use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db::traits::{InsertOrderResult, StoreError},
    db_types::{NewOrder, Order, OrderNumber, OrderStatusType, UserOrder},
};

const ORDER_COLUMNS: &str = "id, user_id, number, status, uploaded_at, updated_at";

/// Inserts the order unless the number is already taken, in which case the existing order is returned.
///
/// The insert is attempted first, so that the statement takes the write lock before anything is read. Two
/// concurrent submissions of the same number are therefore serialised, and only one of them inserts.
pub async fn idempotent_insert(
    order: NewOrder,
    conn: &mut SqliteConnection,
) -> Result<InsertOrderResult, StoreError> {
    let inserted = sqlx::query_as::<_, Order>(
        r#"
            INSERT INTO orders (user_id, number, status, uploaded_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (number) DO NOTHING
            RETURNING id, user_id, number, status, uploaded_at, updated_at;
        "#,
    )
    .bind(order.user_id)
    .bind(&order.number)
    .bind(OrderStatusType::New)
    .bind(order.uploaded_at)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(order) = inserted {
        debug!("🗃️ Order {} has been saved in the DB with id {}", order.number, order.id);
        return Ok(InsertOrderResult::Inserted(order));
    }
    let existing = fetch_order_by_number(&order.number, conn).await?.ok_or_else(|| {
        StoreError::MissingRecord(format!("Order {} conflicted on insert, but cannot be found", order.number))
    })?;
    trace!("🗃️ Order {} already exists with id {}", existing.number, existing.id);
    Ok(InsertOrderResult::AlreadyExists(existing))
}

pub async fn fetch_order_by_number(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StoreError> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE number = $1"))
        .bind(number)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Locks the order for the rest of the transaction. The no-op update is what takes the lock.
pub async fn lock_order_by_number(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StoreError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "UPDATE orders SET status = status WHERE number = $1 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(number)
    .fetch_optional(conn)
    .await?;
    trace!("🗃️ Lock on order {number}: {}", if order.is_some() { "acquired" } else { "no such order" });
    Ok(order)
}

pub async fn update_order_status(
    order_id: i64,
    status: OrderStatusType,
    updated_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Order, StoreError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(status)
    .bind(updated_at)
    .bind(order_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| StoreError::MissingRecord(format!("Order with id {order_id}")))?;
    trace!("🗃️ Order {} is now {}", order.number, order.status);
    Ok(order)
}

/// Fetches orders with any of the given statuses. Orders that have never been polled come first, followed by the
/// least recently polled ones.
pub async fn fetch_orders_by_statuses(
    statuses: &[OrderStatusType],
    limit: u32,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, StoreError> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE status IN ("));
    let mut in_clause = builder.separated(", ");
    for status in statuses {
        in_clause.push_bind(*status);
    }
    // NULLs sort first
    builder.push(") ORDER BY last_polled_at ASC, id ASC LIMIT ");
    builder.push_bind(i64::from(limit));
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of fetch_orders_by_statuses: {}", orders.len());
    Ok(orders)
}

/// Stamps `last_polled_at` on the given orders. Returns the number of orders updated.
pub async fn mark_orders_polled(
    order_ids: &[i64],
    polled_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<u64, StoreError> {
    if order_ids.is_empty() {
        return Ok(0);
    }
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE orders SET last_polled_at = ");
    builder.push_bind(polled_at);
    builder.push(" WHERE id IN (");
    let mut in_clause = builder.separated(", ");
    for id in order_ids {
        in_clause.push_bind(*id);
    }
    builder.push(")");
    trace!("🗃️ Executing query: {}", builder.sql());
    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn fetch_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<UserOrder>, StoreError> {
    let orders = sqlx::query_as::<_, UserOrder>(
        r#"
            SELECT
                o.id,
                o.user_id,
                o.number,
                o.status,
                o.uploaded_at,
                o.updated_at,
                op.amount AS accrual
            FROM orders o
            LEFT JOIN operations op ON op.order_id = o.id AND op.operation_type = 'CREDIT'
            WHERE o.user_id = $1
            ORDER BY o.uploaded_at ASC, o.id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}
