use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::orders::{OrderList, OrderWithItems},
    error::{AppError, AppResult},
    middleware::auth::AuthCustomer,
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
};

pub async fn list_orders(
    pool: &DbPool,
    user: &AuthCustomer,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut builder = QueryBuilder::new("SELECT * FROM orders WHERE customer_id = ");
    builder.push_bind(user.customer_id);
    let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM orders WHERE customer_id = ");
    count_builder.push_bind(user.customer_id);

    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        builder.push(" AND status = ").push_bind(status.clone());
        count_builder.push(" AND status = ").push_bind(status.clone());
    }

    builder.push(format!(" ORDER BY created_at {}", sort_order.as_sql()));
    builder.push(" LIMIT ").push_bind(limit);
    builder.push(" OFFSET ").push_bind(offset);

    let items: Vec<Order> = builder.build_query_as().fetch_all(pool).await?;
    let total: (i64,) = count_builder.build_query_as().fetch_one(pool).await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub async fn get_order(
    pool: &DbPool,
    user: &AuthCustomer,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order: Option<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE customer_id = $1 AND id = $2")
            .bind(user.customer_id)
            .bind(id)
            .fetch_optional(pool)
            .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let items: Vec<OrderItem> = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1")
        .bind(order.id)
        .fetch_all(pool)
        .await?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems { order, items },
        Some(Meta::empty()),
    ))
}
