use tokio::sync::broadcast;

use crate::{db::DbPool, events::OrderNotice};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub order_feed: broadcast::Sender<OrderNotice>,
    pub jwt_secret: String,
}

impl AppState {
    pub fn new(
        pool: DbPool,
        order_feed: broadcast::Sender<OrderNotice>,
        jwt_secret: String,
    ) -> Self {
        Self {
            pool,
            order_feed,
            jwt_secret,
        }
    }
}
