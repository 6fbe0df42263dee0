use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgListener;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use utoipa::ToSchema;
use uuid::Uuid;

/// Channel the `orders` insert trigger notifies on (see migrations).
pub const ORDER_CHANNEL: &str = "order_created";

const FEED_CAPACITY: usize = 256;
const BACKOFF_MIN: Duration = Duration::from_secs(1);
const BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Payload of one `order_created` notification.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderNotice {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub total: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub enum FeedScope {
    All,
    Customer(Uuid),
}

impl FeedScope {
    fn matches(self, notice: &OrderNotice) -> bool {
        match self {
            FeedScope::All => true,
            FeedScope::Customer(id) => notice.customer_id == id,
        }
    }
}

pub fn order_feed() -> broadcast::Sender<OrderNotice> {
    broadcast::channel(FEED_CAPACITY).0
}

/// Background consumer of the `order_created` channel. Holds one LISTEN
/// connection and fans payloads out to SSE subscribers through the broadcast
/// sender. Reconnects with capped exponential backoff when the connection
/// drops; a successful subscribe resets the delay to the minimum, so a blip
/// after hours of healthy connection does not pay for old outages.
/// Notifications emitted while disconnected are lost at the transport.
pub fn spawn_order_listener(
    database_url: String,
    feed: broadcast::Sender<OrderNotice>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut backoff = BACKOFF_MIN;
        loop {
            match subscribe(&database_url).await {
                Ok(mut listener) => {
                    tracing::info!(channel = ORDER_CHANNEL, "order feed listening");
                    backoff = BACKOFF_MIN;
                    let err = forward_notices(&mut listener, &feed).await;
                    tracing::warn!(error = %err, delay_ms = %backoff.as_millis(), "order feed disconnected");
                }
                Err(err) => {
                    tracing::warn!(error = %err, delay_ms = %backoff.as_millis(), "order feed connect failed");
                }
            }
            tokio::time::sleep(backoff).await;
            backoff = next_backoff(backoff);
        }
    })
}

async fn subscribe(database_url: &str) -> Result<PgListener, sqlx::Error> {
    let mut listener = PgListener::connect(database_url).await?;
    listener.listen(ORDER_CHANNEL).await?;
    Ok(listener)
}

/// Runs until the connection drops and returns the error that ended it.
async fn forward_notices(
    listener: &mut PgListener,
    feed: &broadcast::Sender<OrderNotice>,
) -> sqlx::Error {
    loop {
        let notification = match listener.recv().await {
            Ok(n) => n,
            Err(err) => return err,
        };
        match serde_json::from_str::<OrderNotice>(notification.payload()) {
            Ok(notice) => {
                // Errors only mean no subscriber is currently connected.
                let _ = feed.send(notice);
            }
            Err(err) => {
                tracing::warn!(error = %err, "unparseable order notice payload");
            }
        }
    }
}

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(BACKOFF_MAX)
}

/// Turn a broadcast receiver into an SSE response, filtered by scope.
/// A subscriber that falls behind the buffer gets a `lagged` event telling it
/// how many notices were dropped, then resumes with live data.
pub fn order_stream(
    rx: broadcast::Receiver<OrderNotice>,
    scope: FeedScope,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(rx).filter_map(move |msg| {
        let event = match msg {
            Ok(notice) if scope.matches(&notice) => serde_json::to_string(&notice)
                .ok()
                .map(|data| Event::default().event("order_created").data(data)),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                Some(Event::default().event("lagged").data(missed.to_string()))
            }
        };
        futures::future::ready(event.map(Ok))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(customer: Uuid) -> OrderNotice {
        OrderNotice {
            id: Uuid::new_v4(),
            customer_id: customer,
            total: 25.5,
            status: "pending".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn customer_scope_filters_other_customers() {
        let mine = Uuid::new_v4();
        let theirs = Uuid::new_v4();
        let scope = FeedScope::Customer(mine);
        assert!(scope.matches(&notice(mine)));
        assert!(!scope.matches(&notice(theirs)));
        assert!(FeedScope::All.matches(&notice(theirs)));
    }

    #[test]
    fn reconnect_delay_doubles_to_a_cap() {
        let mut delay = BACKOFF_MIN;
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(delay.as_secs());
            delay = next_backoff(delay);
        }
        assert_eq!(seen, [1, 2, 4, 8, 16, 30]);
        assert_eq!(next_backoff(delay), BACKOFF_MAX);
    }

    #[test]
    fn notice_round_trips_trigger_payload() {
        let payload = r#"{
            "id": "6f2c64a4-41a7-4a44-9bb2-7f2f7ac14e0b",
            "customer_id": "0cb80386-7a1a-44a5-a6a7-1a9f2fd9c4a2",
            "total": 25.5,
            "status": "pending",
            "created_at": "2025-01-05T10:00:00Z"
        }"#;
        let notice: OrderNotice = serde_json::from_str(payload).expect("payload parses");
        assert_eq!(notice.status, "pending");
        assert_eq!(notice.total, 25.5);
    }
}
