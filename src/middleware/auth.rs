use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{dto::auth::Claims, error::AppError, state::AppState};

pub const SCOPE_CUSTOMER: &str = "customer";
pub const SCOPE_ADMIN: &str = "admin";

/// A logged-in storefront customer. Customers and admins are separate
/// identity spaces; a token carries exactly one scope.
#[derive(Debug, Clone)]
pub struct AuthCustomer {
    pub customer_id: Uuid,
}

/// A logged-in console admin.
#[derive(Debug, Clone)]
pub struct AuthAdmin {
    pub admin_id: Uuid,
}

fn decode_bearer(parts: &axum::http::request::Parts, secret: &str) -> Result<Claims, AppError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(AppError::Unauthenticated)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthenticated)?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthenticated)?
        .trim();

    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthenticated)?;

    Ok(decoded.claims)
}

impl FromRequestParts<AppState> for AuthCustomer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = decode_bearer(parts, &state.jwt_secret)?;
        if claims.scope != SCOPE_CUSTOMER {
            return Err(AppError::Forbidden);
        }
        let customer_id =
            Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthenticated)?;
        Ok(AuthCustomer { customer_id })
    }
}

impl FromRequestParts<AppState> for AuthAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = decode_bearer(parts, &state.jwt_secret)?;
        if claims.scope != SCOPE_ADMIN {
            return Err(AppError::Forbidden);
        }
        let admin_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthenticated)?;
        Ok(AuthAdmin { admin_id })
    }
}
