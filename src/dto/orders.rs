use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::account::{NewAddressRequest, NewBillingRequest};
use crate::models::{Order, OrderItem};

/// Checkout input. Exactly one of `address_id` / `new_address` must be set,
/// and exactly one of `billing_id` / `new_billing`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub address_id: Option<Uuid>,
    pub new_address: Option<NewAddressRequest>,
    pub billing_id: Option<Uuid>,
    pub new_billing: Option<NewBillingRequest>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Checkout confirmation: the persisted order plus the 2-decimal total the
/// storefront shows in its toast.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutReceipt {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub display_total: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
