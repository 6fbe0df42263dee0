use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, patch, put},
};
use uuid::Uuid;

use crate::{
    dto::account::{
        AddressList, BillingInfoDto, BillingList, NewAddressRequest, NewBillingRequest,
        UpdateProfileRequest,
    },
    error::AppResult,
    middleware::auth::AuthCustomer,
    models::{Address, Customer},
    response::ApiResponse,
    services::account_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_profile))
        .route("/", patch(update_profile))
        .route("/addresses", get(list_addresses).post(create_address))
        .route("/addresses/{id}", delete(delete_address))
        .route("/addresses/{id}/default", put(set_default_address))
        .route("/billing", get(list_billing).post(create_billing))
}

#[utoipa::path(
    get,
    path = "/api/account",
    responses(
        (status = 200, description = "The customer's profile", body = ApiResponse<Customer>)
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthCustomer,
) -> AppResult<Json<ApiResponse<Customer>>> {
    let resp = account_service::get_profile(&state.pool, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/account",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Update name, email, or password", body = ApiResponse<Customer>)
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthCustomer,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<Customer>>> {
    let resp = account_service::update_profile(&state.pool, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/account/addresses",
    responses(
        (status = 200, description = "The customer's saved addresses", body = ApiResponse<AddressList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn list_addresses(
    State(state): State<AppState>,
    user: AuthCustomer,
) -> AppResult<Json<ApiResponse<AddressList>>> {
    let resp = account_service::list_addresses(&state.pool, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/account/addresses",
    request_body = NewAddressRequest,
    responses(
        (status = 200, description = "Save a new address", body = ApiResponse<Address>)
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn create_address(
    State(state): State<AppState>,
    user: AuthCustomer,
    Json(payload): Json<NewAddressRequest>,
) -> AppResult<Json<ApiResponse<Address>>> {
    let resp = account_service::create_address(&state.pool, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/account/addresses/{id}",
    params(
        ("id" = Uuid, Path, description = "Address ID")
    ),
    responses(
        (status = 200, description = "Address deleted"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn delete_address(
    State(state): State<AppState>,
    user: AuthCustomer,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = account_service::delete_address(&state.pool, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/account/addresses/{id}/default",
    params(
        ("id" = Uuid, Path, description = "Address ID")
    ),
    responses(
        (status = 200, description = "Set the default shipping address", body = ApiResponse<Customer>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn set_default_address(
    State(state): State<AppState>,
    user: AuthCustomer,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Customer>>> {
    let resp = account_service::set_default_address(&state.pool, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/account/billing",
    responses(
        (status = 200, description = "Saved billing records, card numbers masked", body = ApiResponse<BillingList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn list_billing(
    State(state): State<AppState>,
    user: AuthCustomer,
) -> AppResult<Json<ApiResponse<BillingList>>> {
    let resp = account_service::list_billing(&state.pool, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/account/billing",
    request_body = NewBillingRequest,
    responses(
        (status = 200, description = "Save a new billing record", body = ApiResponse<BillingInfoDto>)
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn create_billing(
    State(state): State<AppState>,
    user: AuthCustomer,
    Json(payload): Json<NewBillingRequest>,
) -> AppResult<Json<ApiResponse<BillingInfoDto>>> {
    let resp = account_service::create_billing(&state.pool, &user, payload).await?;
    Ok(Json(resp))
}
