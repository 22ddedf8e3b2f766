//! Realtime notification hub
//!
//! Services collect [`Event`]s while their transaction is open and hand them
//! to [`NotificationService::publish_all`] after commit. Every connected
//! WebSocket client holds a receiver on the same broadcast channel.

use tokio::sync::broadcast;

use shared::{Event, LowStockAlert, StockUpdate};

/// Broadcast hub shared by all request handlers and WebSocket sessions
#[derive(Debug, Clone)]
pub struct NotificationService {
    sender: broadcast::Sender<Event>,
}

impl NotificationService {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Number of connected listeners
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publish one event. Having no listeners is not an error.
    pub fn publish(&self, event: Event) {
        match self.sender.send(event) {
            Ok(receivers) => tracing::debug!(receivers, "Event broadcast"),
            Err(broadcast::error::SendError(event)) => {
                tracing::debug!(?event, "No listeners for event")
            }
        }
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.publish(event);
        }
    }
}

/// Events for a changed stock row: always a `stock_update`, plus a
/// `low_stock_alert` when the new quantity is at or below the threshold.
pub fn stock_events(row: &StockChange) -> Vec<Event> {
    let mut events = vec![Event::StockUpdate(StockUpdate {
        stock_id: row.stock_id,
        product_id: row.product_id,
        branch_id: row.branch_id,
        quantity: row.quantity,
    })];

    if shared::is_low_stock(row.quantity, row.low_stock_threshold) {
        events.push(Event::LowStockAlert(LowStockAlert {
            product_name: row.product_name.clone(),
            branch_name: row.branch_name.clone(),
            quantity: row.quantity,
        }));
    }

    events
}

/// A stock row after a change, with the names needed for alerts
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StockChange {
    pub stock_id: uuid::Uuid,
    pub product_id: uuid::Uuid,
    pub branch_id: uuid::Uuid,
    pub quantity: i32,
    pub low_stock_threshold: i32,
    pub product_name: String,
    pub branch_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn change(quantity: i32, threshold: i32) -> StockChange {
        StockChange {
            stock_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            quantity,
            low_stock_threshold: threshold,
            product_name: "Cement".to_string(),
            branch_name: "Main Branch".to_string(),
        }
    }

    #[test]
    fn test_stock_events_include_low_stock_alert() {
        assert_eq!(stock_events(&change(50, 10)).len(), 1);

        let events = stock_events(&change(10, 10));
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Event::LowStockAlert(ref a) if a.quantity == 10));
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let hub = NotificationService::new(8);
        let mut rx = hub.subscribe();

        hub.publish_all(stock_events(&change(3, 10)));

        assert!(matches!(rx.recv().await.unwrap(), Event::StockUpdate(_)));
        assert!(matches!(rx.recv().await.unwrap(), Event::LowStockAlert(_)));
    }

    #[test]
    fn test_publish_without_listeners_is_ignored() {
        let hub = NotificationService::new(1);
        hub.publish_all(stock_events(&change(0, 10)));
        assert_eq!(hub.receiver_count(), 0);
    }
}
