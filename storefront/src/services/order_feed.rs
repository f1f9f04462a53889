// vitrine/src/services/order_feed.rs

//! In-process broadcast of order status changes.

use crate::models::OrderStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

const FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderEvent {
  pub order_id: Uuid,
  pub buyer_id: Uuid,
  /// `None` when the order was just created.
  pub from: Option<OrderStatus>,
  pub to: OrderStatus,
  pub at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct OrderFeed {
  sender: broadcast::Sender<OrderEvent>,
}

impl Default for OrderFeed {
  fn default() -> Self {
    Self::new()
  }
}

impl OrderFeed {
  pub fn new() -> Self {
    let (sender, _) = broadcast::channel(FEED_CAPACITY);
    Self { sender }
  }

  /// Publishing with no subscribers is not an error.
  pub fn publish(&self, event: OrderEvent) {
    match self.sender.send(event) {
      Ok(receivers) => debug!(receivers, "Order event published."),
      Err(_) => debug!("Order event published with no subscribers."),
    }
  }

  pub fn subscribe(&self) -> OrderSubscription {
    OrderSubscription {
      receiver: self.sender.subscribe(),
    }
  }

  pub fn subscriber_count(&self) -> usize {
    self.sender.receiver_count()
  }
}

/// A live subscription. Dropping it unsubscribes.
pub struct OrderSubscription {
  receiver: broadcast::Receiver<OrderEvent>,
}

impl OrderSubscription {
  /// Next event, or `None` once the feed is gone. Lagged events are skipped.
  pub async fn recv(&mut self) -> Option<OrderEvent> {
    loop {
      match self.receiver.recv().await {
        Ok(event) => return Some(event),
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
          warn!(skipped, "Order feed subscriber lagged, events skipped.");
        }
        Err(broadcast::error::RecvError::Closed) => return None,
      }
    }
  }
}
