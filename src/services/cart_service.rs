use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::cart::{AddToCartRequest, CartItemDto, CartView, ProductSnapshot, SetQuantityRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthCustomer,
    models::CartItem,
    response::{ApiResponse, Meta},
};

#[derive(FromRow)]
struct CartItemWithProductRow {
    id: Uuid,
    quantity: i32,
    product_id: Uuid,
    name: String,
    price: f64,
    image_url: Option<String>,
}

async fn find_cart_id(pool: &DbPool, customer_id: Uuid) -> AppResult<Option<Uuid>> {
    let cart: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM carts WHERE customer_id = $1")
        .bind(customer_id)
        .fetch_optional(pool)
        .await?;
    Ok(cart.map(|(id,)| id))
}

/// A customer without a cart (nothing outside signup creates one) just sees
/// an empty cart.
pub async fn get_cart(pool: &DbPool, user: &AuthCustomer) -> AppResult<ApiResponse<CartView>> {
    let cart_id = match find_cart_id(pool, user.customer_id).await? {
        Some(id) => id,
        None => {
            return Ok(ApiResponse::success(
                "OK",
                CartView {
                    cart_id: None,
                    items: Vec::new(),
                },
                Some(Meta::empty()),
            ));
        }
    };

    let rows: Vec<CartItemWithProductRow> = sqlx::query_as(
        r#"
        SELECT ci.id, ci.quantity, p.id AS product_id, p.name, p.price, p.image_url
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.cart_id = $1
        ORDER BY ci.created_at
        "#,
    )
    .bind(cart_id)
    .fetch_all(pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| CartItemDto {
            id: row.id,
            quantity: row.quantity,
            product: ProductSnapshot {
                id: row.product_id,
                name: row.name,
                price: row.price,
                image_url: row.image_url,
            },
        })
        .collect();

    Ok(ApiResponse::success(
        "OK",
        CartView {
            cart_id: Some(cart_id),
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Insert-or-increment keyed by the (cart_id, product_id) unique constraint.
/// Two concurrent adds of the same product end up as one row with the summed
/// quantity; the store resolves the conflict, not a read-then-write.
pub async fn add_to_cart(
    pool: &DbPool,
    user: &AuthCustomer,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    let quantity = payload.quantity.unwrap_or(1);
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let product_exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(payload.product_id)
        .fetch_optional(pool)
        .await?;
    if product_exist.is_none() {
        return Err(AppError::BadRequest("product not found".to_string()));
    }

    let cart_id = match find_cart_id(pool, user.customer_id).await? {
        Some(id) => id,
        None => return Err(AppError::NotFound),
    };

    let cart_item: CartItem = sqlx::query_as(
        r#"
        INSERT INTO cart_items (id, cart_id, product_id, quantity)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (cart_id, product_id)
        DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
        RETURNING id, cart_id, product_id, quantity, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(cart_id)
    .bind(payload.product_id)
    .bind(quantity)
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.customer_id),
        "cart_add",
        Some("cart_items"),
        Some(serde_json::json!({ "product_id": payload.product_id, "quantity": quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("OK", cart_item, None))
}

/// Quantity is clamped to a minimum of 1; there is no upper bound or stock
/// check at this point.
pub async fn set_quantity(
    pool: &DbPool,
    user: &AuthCustomer,
    item_id: Uuid,
    payload: SetQuantityRequest,
) -> AppResult<ApiResponse<CartItem>> {
    let quantity = clamp_quantity(payload.quantity);

    let cart_item: Option<CartItem> = sqlx::query_as(
        r#"
        UPDATE cart_items ci
        SET quantity = $3
        FROM carts c
        WHERE ci.id = $1 AND ci.cart_id = c.id AND c.customer_id = $2
        RETURNING ci.id, ci.cart_id, ci.product_id, ci.quantity, ci.created_at
        "#,
    )
    .bind(item_id)
    .bind(user.customer_id)
    .bind(quantity)
    .fetch_optional(pool)
    .await?;

    let cart_item = match cart_item {
        Some(item) => item,
        None => return Err(AppError::NotFound),
    };

    if let Err(err) = log_audit(
        pool,
        Some(user.customer_id),
        "cart_set_quantity",
        Some("cart_items"),
        Some(serde_json::json!({ "item_id": item_id, "quantity": quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Quantity updated", cart_item, None))
}

pub async fn remove_item(
    pool: &DbPool,
    user: &AuthCustomer,
    item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query(
        r#"
        DELETE FROM cart_items ci
        USING carts c
        WHERE ci.id = $1 AND ci.cart_id = c.id AND c.customer_id = $2
        "#,
    )
    .bind(item_id)
    .bind(user.customer_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        pool,
        Some(user.customer_id),
        "cart_remove",
        Some("cart_items"),
        Some(serde_json::json!({ "item_id": item_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub(crate) fn clamp_quantity(quantity: i32) -> i32 {
    quantity.max(1)
}

#[cfg(test)]
mod tests {
    use super::clamp_quantity;

    #[test]
    fn quantity_clamps_to_minimum_of_one() {
        assert_eq!(clamp_quantity(0), 1);
        assert_eq!(clamp_quantity(-5), 1);
        assert_eq!(clamp_quantity(1), 1);
        assert_eq!(clamp_quantity(7), 7);
    }
}
