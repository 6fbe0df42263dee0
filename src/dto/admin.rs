use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Customer;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    pub status: Option<String>,
    pub address_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct CustomerList {
    #[schema(value_type = Vec<Customer>)]
    pub items: Vec<Customer>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportRowError {
    pub line: usize,
    pub message: String,
}

/// Outcome of a bulk product upload: how many rows landed, and which lines
/// were rejected.
#[derive(Debug, Serialize, ToSchema)]
pub struct ImportReport {
    pub imported: usize,
    pub errors: Vec<ImportRowError>,
}

/// One order flagged by the reconciliation query: zero items, or an item sum
/// that disagrees with the stored total.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct ReconciliationRow {
    pub order_id: Uuid,
    pub total: f64,
    pub items_total: f64,
    pub item_count: i64,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ReconciliationReport {
    #[schema(value_type = Vec<ReconciliationRow>)]
    pub items: Vec<ReconciliationRow>,
}
