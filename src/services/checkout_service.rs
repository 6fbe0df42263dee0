//! Cart-to-order checkout. The whole sequence (address resolution, billing,
//! order row, order items, cart clear) runs inside one database transaction,
//! so a failure at any step leaves no partial artifact: no orphaned order, no
//! half-cleared cart.

use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::{
        account::{NewAddressRequest, NewBillingRequest},
        orders::{CheckoutRequest, CheckoutReceipt},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthCustomer,
    models::{Address, Order, OrderItem},
    response::{ApiResponse, Meta},
};

#[derive(Debug, FromRow)]
struct CartLine {
    cart_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    price: f64,
}

pub async fn checkout(
    pool: &DbPool,
    user: &AuthCustomer,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutReceipt>> {
    validate_choices(&payload)?;

    let mut txn = pool.begin().await?;

    // Lock the cart lines and the prices they will be charged at. The price
    // snapshot is taken here, at checkout time, not at add-to-cart time.
    let lines: Vec<CartLine> = sqlx::query_as(
        r#"
        SELECT ci.cart_id, ci.product_id, ci.quantity, p.price
        FROM cart_items ci
        JOIN carts c ON c.id = ci.cart_id
        JOIN products p ON p.id = ci.product_id
        WHERE c.customer_id = $1
        ORDER BY ci.created_at
        FOR UPDATE OF ci, p
        "#,
    )
    .bind(user.customer_id)
    .fetch_all(&mut *txn)
    .await?;

    if lines.is_empty() {
        return Err(AppError::EmptyCart);
    }
    let cart_id = lines[0].cart_id;

    let address = resolve_address(&mut txn, user.customer_id, &payload).await?;
    let shipping_address = render_shipping_snapshot(&address);

    resolve_billing(&mut txn, user.customer_id, &payload).await?;

    let total = compute_total(lines.iter().map(|l| (l.price, l.quantity)));

    // Status is left to the column default ('pending').
    let order: Order = sqlx::query_as(
        r#"
        INSERT INTO orders (id, customer_id, total, address_id, shipping_address, notes)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, customer_id, total, status, address_id, shipping_address, notes, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.customer_id)
    .bind(total)
    .bind(address.id)
    .bind(shipping_address.as_str())
    .bind(payload.notes.as_deref())
    .fetch_one(&mut *txn)
    .await?;

    let mut items: Vec<OrderItem> = Vec::with_capacity(lines.len());
    for line in &lines {
        let item: OrderItem = sqlx::query_as(
            r#"
            INSERT INTO order_items (id, order_id, product_id, quantity, price_at_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, order_id, product_id, quantity, price_at_time, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order.id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.price)
        .fetch_one(&mut *txn)
        .await?;
        items.push(item);
    }

    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(cart_id)
        .execute(&mut *txn)
        .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.customer_id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "total": order.total })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let display_total = format!("{:.2}", total);
    Ok(ApiResponse::success(
        format!("Order #{} placed! Total: {}", order.id, display_total),
        CheckoutReceipt {
            order,
            items,
            display_total,
        },
        Some(Meta::empty()),
    ))
}

fn validate_choices(payload: &CheckoutRequest) -> Result<(), AppError> {
    match (payload.address_id.is_some(), payload.new_address.is_some()) {
        (true, true) | (false, false) => {
            return Err(AppError::BadRequest(
                "provide exactly one of address_id or new_address".into(),
            ));
        }
        _ => {}
    }
    match (payload.billing_id.is_some(), payload.new_billing.is_some()) {
        (true, true) | (false, false) => {
            return Err(AppError::BadRequest(
                "provide exactly one of billing_id or new_billing".into(),
            ));
        }
        _ => {}
    }
    Ok(())
}

async fn resolve_address(
    txn: &mut Transaction<'_, Postgres>,
    customer_id: Uuid,
    payload: &CheckoutRequest,
) -> AppResult<Address> {
    if let Some(address_id) = payload.address_id {
        let address: Option<Address> = sqlx::query_as(
            "SELECT * FROM addresses WHERE id = $1 AND customer_id = $2",
        )
        .bind(address_id)
        .bind(customer_id)
        .fetch_optional(&mut **txn)
        .await?;
        return address.ok_or(AppError::NotFound);
    }

    // Validated in validate_choices.
    let new_address = payload.new_address.as_ref().ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("checkout reached without an address"))
    })?;
    insert_address(txn, customer_id, new_address).await
}

async fn insert_address(
    txn: &mut Transaction<'_, Postgres>,
    customer_id: Uuid,
    new_address: &NewAddressRequest,
) -> AppResult<Address> {
    let address: Address = sqlx::query_as(
        r#"
        INSERT INTO addresses (id, customer_id, address_line1, address_line2, city, state, postal_code, country)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(customer_id)
    .bind(new_address.address_line1.as_str())
    .bind(new_address.address_line2.as_deref())
    .bind(new_address.city.as_str())
    .bind(new_address.state.as_str())
    .bind(new_address.postal_code.as_str())
    .bind(new_address.country.as_str())
    .fetch_one(&mut **txn)
    .await?;
    Ok(address)
}

async fn resolve_billing(
    txn: &mut Transaction<'_, Postgres>,
    customer_id: Uuid,
    payload: &CheckoutRequest,
) -> AppResult<()> {
    if let Some(billing_id) = payload.billing_id {
        let exists: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM billing_info WHERE id = $1 AND customer_id = $2",
        )
        .bind(billing_id)
        .bind(customer_id)
        .fetch_optional(&mut **txn)
        .await?;
        if exists.is_none() {
            return Err(AppError::NotFound);
        }
        return Ok(());
    }

    let new_billing = payload.new_billing.as_ref().ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("checkout reached without billing info"))
    })?;
    insert_billing(txn, customer_id, new_billing).await
}

/// The customer's first billing record becomes their default.
async fn insert_billing(
    txn: &mut Transaction<'_, Postgres>,
    customer_id: Uuid,
    new_billing: &NewBillingRequest,
) -> AppResult<()> {
    let existing: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM billing_info WHERE customer_id = $1")
            .bind(customer_id)
            .fetch_one(&mut **txn)
            .await?;

    sqlx::query(
        r#"
        INSERT INTO billing_info (id, customer_id, card_number, expiry_date, cardholder_name, is_default)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(customer_id)
    .bind(new_billing.card_number.as_str())
    .bind(new_billing.expiry_date.as_str())
    .bind(new_billing.cardholder_name.as_str())
    .bind(existing.0 == 0)
    .execute(&mut **txn)
    .await?;

    Ok(())
}

/// Renders `line1, line2, city, state, postal, country`. A missing line2
/// still gets its empty segment, matching what the order history shows.
fn render_shipping_snapshot(address: &Address) -> String {
    format!(
        "{}, {}, {}, {}, {}, {}",
        address.address_line1,
        address.address_line2.as_deref().unwrap_or(""),
        address.city,
        address.state,
        address.postal_code,
        address.country,
    )
}

fn compute_total(lines: impl Iterator<Item = (f64, i32)>) -> f64 {
    lines.map(|(price, quantity)| price * quantity as f64).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn address(line2: Option<&str>) -> Address {
        Address {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            address_line1: "1 Main St".into(),
            address_line2: line2.map(String::from),
            city: "Manama".into(),
            state: "Capital".into(),
            postal_code: "317".into(),
            country: "BH".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn total_matches_example_scenario() {
        // Product A: 10.00 x 2, Product B: 5.50 x 1.
        let total = compute_total([(10.00, 2), (5.50, 1)].into_iter());
        assert_eq!(total, 25.50);
        assert_eq!(format!("{:.2}", total), "25.50");
    }

    #[test]
    fn empty_line2_still_renders_its_segment() {
        assert_eq!(
            render_shipping_snapshot(&address(None)),
            "1 Main St, , Manama, Capital, 317, BH"
        );
        assert_eq!(
            render_shipping_snapshot(&address(Some("Flat 2"))),
            "1 Main St, Flat 2, Manama, Capital, 317, BH"
        );
    }

    #[test]
    fn checkout_requires_exactly_one_address_and_billing_source() {
        let both_addresses = CheckoutRequest {
            address_id: Some(Uuid::new_v4()),
            new_address: Some(NewAddressRequest {
                address_line1: "1 Main St".into(),
                address_line2: None,
                city: "Manama".into(),
                state: "Capital".into(),
                postal_code: "317".into(),
                country: "BH".into(),
            }),
            billing_id: Some(Uuid::new_v4()),
            new_billing: None,
            notes: None,
        };
        assert!(validate_choices(&both_addresses).is_err());

        let no_billing = CheckoutRequest {
            address_id: Some(Uuid::new_v4()),
            new_address: None,
            billing_id: None,
            new_billing: None,
            notes: None,
        };
        assert!(validate_choices(&no_billing).is_err());

        let valid = CheckoutRequest {
            address_id: Some(Uuid::new_v4()),
            new_address: None,
            billing_id: Some(Uuid::new_v4()),
            new_billing: None,
            notes: None,
        };
        assert!(validate_choices(&valid).is_ok());
    }
}
