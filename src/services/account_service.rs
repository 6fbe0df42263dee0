use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::account::{
        AddressList, BillingInfoDto, BillingList, NewAddressRequest, NewBillingRequest,
        UpdateProfileRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthCustomer,
    models::{Address, Customer},
    response::{ApiResponse, Meta},
    services::auth_service::hash_password,
};

const CUSTOMER_COLUMNS: &str = "id, name, email, default_address_id, created_at";

pub async fn get_profile(pool: &DbPool, user: &AuthCustomer) -> AppResult<ApiResponse<Customer>> {
    let customer: Option<Customer> = sqlx::query_as(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1"
    ))
    .bind(user.customer_id)
    .fetch_optional(pool)
    .await?;

    match customer {
        Some(c) => Ok(ApiResponse::success("OK", c, None)),
        None => Err(AppError::NotFound),
    }
}

pub async fn update_profile(
    pool: &DbPool,
    user: &AuthCustomer,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<Customer>> {
    let existing: Option<Customer> = sqlx::query_as(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1"
    ))
    .bind(user.customer_id)
    .fetch_optional(pool)
    .await?;
    let existing = match existing {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    let name = payload.name.unwrap_or(existing.name);
    let email = payload.email.unwrap_or(existing.email);
    let password_hash = match payload.password.as_deref() {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };

    let customer: Customer = sqlx::query_as(&format!(
        r#"
        UPDATE customers
        SET name = $2, email = $3, password_hash = COALESCE($4, password_hash)
        WHERE id = $1
        RETURNING {CUSTOMER_COLUMNS}
        "#
    ))
    .bind(user.customer_id)
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.customer_id),
        "profile_update",
        Some("customers"),
        Some(serde_json::json!({ "customer_id": user.customer_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Info updated", customer, None))
}

pub async fn list_addresses(
    pool: &DbPool,
    user: &AuthCustomer,
) -> AppResult<ApiResponse<AddressList>> {
    let items: Vec<Address> = sqlx::query_as(
        "SELECT * FROM addresses WHERE customer_id = $1 ORDER BY created_at DESC",
    )
    .bind(user.customer_id)
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::success(
        "OK",
        AddressList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_address(
    pool: &DbPool,
    user: &AuthCustomer,
    payload: NewAddressRequest,
) -> AppResult<ApiResponse<Address>> {
    if payload.address_line1.trim().is_empty() {
        return Err(AppError::BadRequest("address_line1 is required".into()));
    }

    let address: Address = sqlx::query_as(
        r#"
        INSERT INTO addresses (id, customer_id, address_line1, address_line2, city, state, postal_code, country)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.customer_id)
    .bind(payload.address_line1)
    .bind(payload.address_line2)
    .bind(payload.city)
    .bind(payload.state)
    .bind(payload.postal_code)
    .bind(payload.country)
    .fetch_one(pool)
    .await?;

    Ok(ApiResponse::success("Address saved", address, None))
}

pub async fn delete_address(
    pool: &DbPool,
    user: &AuthCustomer,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND customer_id = $2")
        .bind(id)
        .bind(user.customer_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Address deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn set_default_address(
    pool: &DbPool,
    user: &AuthCustomer,
    id: Uuid,
) -> AppResult<ApiResponse<Customer>> {
    let owned: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM addresses WHERE id = $1 AND customer_id = $2")
            .bind(id)
            .bind(user.customer_id)
            .fetch_optional(pool)
            .await?;
    if owned.is_none() {
        return Err(AppError::NotFound);
    }

    let customer: Customer = sqlx::query_as(&format!(
        "UPDATE customers SET default_address_id = $2 WHERE id = $1 RETURNING {CUSTOMER_COLUMNS}"
    ))
    .bind(user.customer_id)
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(ApiResponse::success("Default address set", customer, None))
}

#[derive(FromRow)]
struct BillingRow {
    id: Uuid,
    cardholder_name: String,
    card_number: String,
    expiry_date: String,
    is_default: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl BillingRow {
    fn into_dto(self) -> BillingInfoDto {
        let digits: String = self.card_number.chars().filter(|c| c.is_ascii_digit()).collect();
        let card_last4 = if digits.len() >= 4 {
            digits[digits.len() - 4..].to_string()
        } else {
            digits
        };
        BillingInfoDto {
            id: self.id,
            cardholder_name: self.cardholder_name,
            card_last4,
            expiry_date: self.expiry_date,
            is_default: self.is_default,
            created_at: self.created_at,
        }
    }
}

pub async fn list_billing(
    pool: &DbPool,
    user: &AuthCustomer,
) -> AppResult<ApiResponse<BillingList>> {
    let rows: Vec<BillingRow> = sqlx::query_as(
        r#"
        SELECT id, cardholder_name, card_number, expiry_date, is_default, created_at
        FROM billing_info
        WHERE customer_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user.customer_id)
    .fetch_all(pool)
    .await?;

    let items = rows.into_iter().map(BillingRow::into_dto).collect();
    Ok(ApiResponse::success(
        "OK",
        BillingList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_billing(
    pool: &DbPool,
    user: &AuthCustomer,
    payload: NewBillingRequest,
) -> AppResult<ApiResponse<BillingInfoDto>> {
    if payload.card_number.trim().is_empty() || payload.cardholder_name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "card_number and cardholder_name are required".into(),
        ));
    }

    let existing: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM billing_info WHERE customer_id = $1")
            .bind(user.customer_id)
            .fetch_one(pool)
            .await?;

    let row: BillingRow = sqlx::query_as(
        r#"
        INSERT INTO billing_info (id, customer_id, card_number, expiry_date, cardholder_name, is_default)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, cardholder_name, card_number, expiry_date, is_default, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.customer_id)
    .bind(payload.card_number)
    .bind(payload.expiry_date)
    .bind(payload.cardholder_name)
    .bind(existing.0 == 0)
    .fetch_one(pool)
    .await?;

    Ok(ApiResponse::success(
        "Billing info saved",
        row.into_dto(),
        None,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(card_number: &str) -> BillingRow {
        BillingRow {
            id: Uuid::new_v4(),
            cardholder_name: "A Customer".into(),
            card_number: card_number.into(),
            expiry_date: "12/30".into(),
            is_default: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn card_number_is_reduced_to_last_four() {
        assert_eq!(row("4111 1111 1111 1234").into_dto().card_last4, "1234");
        assert_eq!(row("12").into_dto().card_last4, "12");
    }
}
