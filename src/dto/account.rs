use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Address;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    /// When present, replaces the stored password hash.
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, ToSchema)]
pub struct NewAddressRequest {
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Deserialize, Clone, ToSchema)]
pub struct NewBillingRequest {
    pub card_number: String,
    pub expiry_date: String,
    pub cardholder_name: String,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct AddressList {
    #[schema(value_type = Vec<Address>)]
    pub items: Vec<Address>,
}

/// Billing record as exposed over the API: card number reduced to its last
/// four digits.
#[derive(Debug, Serialize, ToSchema)]
pub struct BillingInfoDto {
    pub id: Uuid,
    pub cardholder_name: String,
    pub card_last4: String,
    pub expiry_date: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct BillingList {
    #[schema(value_type = Vec<BillingInfoDto>)]
    pub items: Vec<BillingInfoDto>,
}
