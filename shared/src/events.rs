//! Realtime events pushed to WebSocket clients
//!
//! Serialized as `{"type": "...", "data": {...}}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ActivityKind, SaleStatus};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Event {
    StockUpdate(StockUpdate),
    LowStockAlert(LowStockAlert),
    SalesNotification(SalesNotification),
    ActivityUpdate(ActivityUpdate),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockUpdate {
    pub stock_id: Uuid,
    pub product_id: Uuid,
    pub branch_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LowStockAlert {
    pub product_name: String,
    pub branch_name: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SalesNotification {
    pub title: String,
    pub body: String,
    pub sale_id: Uuid,
    pub status: SaleStatus,
    /// Wall clock time as `HH:MM:SS`
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityUpdate {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub description: String,
    pub icon: String,
    pub user: String,
    pub time: String,
}

impl SalesNotification {
    pub fn created(sale_id: Uuid, invoice_number: &str, username: &str, at: DateTime<Utc>) -> Self {
        Self {
            title: "New Sale".to_string(),
            body: format!("New Sale Created: #{} by {}", invoice_number, username),
            sale_id,
            status: SaleStatus::Pending,
            timestamp: at.format("%H:%M:%S").to_string(),
        }
    }

    pub fn updated(sale_id: Uuid, invoice_number: &str, status: SaleStatus, at: DateTime<Utc>) -> Self {
        Self {
            title: "Order Update".to_string(),
            body: format!("Sale #{} updated to {}", invoice_number, status),
            sale_id,
            status,
            timestamp: at.format("%H:%M:%S").to_string(),
        }
    }
}

impl ActivityUpdate {
    pub fn new(id: Uuid, kind: ActivityKind, description: String, user: Option<&str>) -> Self {
        Self {
            id,
            kind,
            description,
            icon: kind.icon_class().to_string(),
            user: user.unwrap_or("System").to_string(),
            time: "Just now".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stock_update_wire_format() {
        let event = Event::StockUpdate(StockUpdate {
            stock_id: Uuid::nil(),
            product_id: Uuid::nil(),
            branch_id: Uuid::nil(),
            quantity: 90,
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "stock_update");
        assert_eq!(json["data"]["quantity"], 90);
    }

    #[test]
    fn test_sales_notification_text() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 14, 5, 9).unwrap();
        let created = SalesNotification::created(Uuid::nil(), "AB12CD34", "asha", at);
        assert_eq!(created.body, "New Sale Created: #AB12CD34 by asha");
        assert_eq!(created.timestamp, "14:05:09");

        let updated = SalesNotification::updated(Uuid::nil(), "AB12CD34", SaleStatus::Dispatched, at);
        assert_eq!(updated.title, "Order Update");
        assert_eq!(updated.body, "Sale #AB12CD34 updated to dispatched");
    }

    #[test]
    fn test_activity_update_defaults() {
        let update = ActivityUpdate::new(Uuid::nil(), ActivityKind::Transfer, "moved".into(), None);
        let json = serde_json::to_value(Event::ActivityUpdate(update)).unwrap();
        assert_eq!(json["type"], "activity_update");
        assert_eq!(json["data"]["type"], "transfer");
        assert_eq!(json["data"]["user"], "System");
        assert_eq!(json["data"]["icon"], "bi-arrow-left-right");
    }
}
