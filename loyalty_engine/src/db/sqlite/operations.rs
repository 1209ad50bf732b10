use log::debug;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db::traits::StoreError,
    db_types::{NewOperation, Operation, OperationType},
};

pub async fn insert_operation(operation: NewOperation, conn: &mut SqliteConnection) -> Result<Operation, StoreError> {
    let op = sqlx::query_as::<_, Operation>(
        r#"
            INSERT INTO operations (account_id, order_id, order_number, operation_type, amount, processed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, account_id, order_id, order_number, operation_type, amount, processed_at
        "#,
    )
    .bind(operation.account_id)
    .bind(operation.order_id)
    .bind(&operation.order_number)
    .bind(operation.operation_type)
    .bind(operation.amount)
    .bind(operation.processed_at)
    .fetch_one(conn)
    .await?;
    debug!(
        "🗃️ {} of {} for order {} recorded against account #{}",
        op.operation_type, op.amount, op.order_number, op.account_id
    );
    Ok(op)
}

pub async fn operations_for_user(
    user_id: i64,
    operation_type: Option<OperationType>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Operation>, StoreError> {
    let mut builder = QueryBuilder::new(
        r#"
        SELECT op.id, op.account_id, op.order_id, op.order_number, op.operation_type, op.amount, op.processed_at
        FROM operations op INNER JOIN accounts a ON a.id = op.account_id
        WHERE a.user_id = "#,
    );
    builder.push_bind(user_id);
    if let Some(operation_type) = operation_type {
        builder.push(" AND op.operation_type = ");
        builder.push_bind(operation_type);
    }
    builder.push(" ORDER BY op.processed_at ASC, op.id ASC");
    let operations = builder.build_query_as::<Operation>().fetch_all(conn).await?;
    Ok(operations)
}
