//! Reporting service for on-demand analytics
//! Provides ABC analysis, inventory aging, sales commissions and dashboard metrics

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::activity::{ActivityService, SystemActivity};
use shared::{classify_abc, month_bounds, AbcEntry, AgingStatus, ProductRevenue, SaleStatus, VehicleStatus};

/// Number of recently approved orders shown on the dashboard
const RECENT_APPROVED_LIMIT: i64 = 5;
/// Days covered by the dashboard sales chart
const SALES_CHART_DAYS: i32 = 7;

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

/// Inventory aging row, one per stock row
#[derive(Debug, Serialize)]
pub struct AgingEntry {
    pub stock_id: Uuid,
    pub product_name: String,
    pub branch_name: String,
    pub quantity: i32,
    pub last_date: DateTime<Utc>,
    pub days: i64,
    pub status: AgingStatus,
}

#[derive(Debug, sqlx::FromRow)]
struct AgingRow {
    stock_id: Uuid,
    product_name: String,
    branch_name: String,
    quantity: i32,
    last_date: DateTime<Utc>,
    days: i64,
}

/// Commission totals for one salesperson
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CommissionEntry {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub total_sales: Decimal,
    pub total_commission: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CommissionReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub sales_data: Vec<CommissionEntry>,
}

/// Commission report filter. Missing bounds default to the current month.
#[derive(Debug, Default, Deserialize)]
pub struct CommissionFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RecentApproval {
    pub id: Uuid,
    pub invoice_number: String,
    pub customer_name: String,
    pub total_amount: Decimal,
    pub approved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DailySales {
    pub date: NaiveDate,
    pub total: Decimal,
}

/// Which dashboard panels the caller may see
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardScope {
    pub dispatch: bool,
    pub sales: bool,
}

/// Dashboard metrics
#[derive(Debug, Default, Serialize)]
pub struct DashboardMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_to_dispatch: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_vehicles: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_stock_alert: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_approved: Option<Vec<RecentApproval>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_approvals: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub todays_sales_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub todays_revenue: Option<Decimal>,
    pub sales_chart: Vec<DailySales>,
    pub recent_activities: Vec<SystemActivity>,
}

impl ReportingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Products ranked by revenue with their ABC class
    pub async fn abc_analysis(&self) -> AppResult<Vec<AbcEntry>> {
        let revenues = sqlx::query_as::<_, (Uuid, String, Decimal)>(
            r#"
            SELECT p.id, p.name, COALESCE(SUM(si.quantity * si.price_at_sale), 0)
            FROM sale_items si
            JOIN products p ON p.id = si.product_id
            GROUP BY p.id, p.name
            "#,
        )
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|(product_id, product_name, revenue)| ProductRevenue {
            product_id,
            product_name,
            revenue,
        })
        .collect();

        Ok(classify_abc(revenues))
    }

    /// Days since each stock row was last replenished by a purchase,
    /// falling back to the product's creation date. Oldest first.
    pub async fn inventory_aging(&self) -> AppResult<Vec<AgingEntry>> {
        let rows = sqlx::query_as::<_, AgingRow>(
            r#"
            WITH aged AS (
                SELECT s.id AS stock_id, p.name AS product_name, b.name AS branch_name, s.quantity,
                       COALESCE(
                           (SELECT MAX(pu.date_purchased) FROM purchases pu
                            WHERE pu.product_id = s.product_id AND pu.branch_id = s.branch_id),
                           p.created_at
                       ) AS last_date
                FROM stocks s
                JOIN products p ON p.id = s.product_id
                JOIN branches b ON b.id = s.branch_id
            )
            SELECT stock_id, product_name, branch_name, quantity, last_date,
                   FLOOR(EXTRACT(EPOCH FROM (NOW() - last_date)) / 86400)::bigint AS days
            FROM aged
            ORDER BY days DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| AgingEntry {
                stock_id: row.stock_id,
                product_name: row.product_name,
                branch_name: row.branch_name,
                quantity: row.quantity,
                last_date: row.last_date,
                days: row.days,
                status: AgingStatus::from_days(row.days),
            })
            .collect())
    }

    /// Sales and commission totals per salesperson, highest commission first
    pub async fn commissions(&self, filter: &CommissionFilter, today: NaiveDate) -> AppResult<CommissionReport> {
        let (month_start, month_end) = month_bounds(today);
        let start_date = filter.start_date.unwrap_or(month_start);
        let end_date = filter.end_date.unwrap_or(month_end);

        let sales_data = sqlx::query_as::<_, CommissionEntry>(
            r#"
            SELECT u.username, u.first_name, u.last_name,
                   COALESCE(SUM(si.subtotal), 0) AS total_sales,
                   COALESCE(SUM(si.commission_amount), 0) AS total_commission
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            JOIN users u ON u.id = s.user_id
            WHERE s.created_at::date BETWEEN $1 AND $2
            GROUP BY u.username, u.first_name, u.last_name
            ORDER BY total_commission DESC
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.db)
        .await?;

        Ok(CommissionReport {
            start_date,
            end_date,
            sales_data,
        })
    }

    pub async fn dashboard(&self, scope: DashboardScope) -> AppResult<DashboardMetrics> {
        let mut metrics = DashboardMetrics::default();

        if scope.dispatch {
            let ready: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE status = $1")
                .bind(SaleStatus::Approved)
                .fetch_one(&self.db)
                .await?;
            let vehicles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vehicles WHERE status = $1")
                .bind(VehicleStatus::Active)
                .fetch_one(&self.db)
                .await?;
            let low_stock: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM stocks WHERE quantity <= low_stock_threshold")
                    .fetch_one(&self.db)
                    .await?;
            let recent = sqlx::query_as::<_, RecentApproval>(
                r#"
                SELECT id, invoice_number, customer_name, total_amount, approved_at
                FROM sales
                WHERE status = $1
                ORDER BY approved_at DESC NULLS LAST
                LIMIT $2
                "#,
            )
            .bind(SaleStatus::Approved)
            .bind(RECENT_APPROVED_LIMIT)
            .fetch_all(&self.db)
            .await?;

            metrics.ready_to_dispatch = Some(ready);
            metrics.active_vehicles = Some(vehicles);
            metrics.low_stock_alert = Some(low_stock);
            metrics.recent_approved = Some(recent);
        }

        if scope.sales {
            let pending: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE status = $1")
                .bind(SaleStatus::Pending)
                .fetch_one(&self.db)
                .await?;
            let (count, revenue) = sqlx::query_as::<_, (i64, Decimal)>(
                "SELECT COUNT(*), COALESCE(SUM(total_amount), 0) FROM sales WHERE created_at::date = CURRENT_DATE",
            )
            .fetch_one(&self.db)
            .await?;

            metrics.pending_approvals = Some(pending);
            metrics.todays_sales_count = Some(count);
            metrics.todays_revenue = Some(revenue);
        }

        metrics.sales_chart = sqlx::query_as::<_, DailySales>(
            r#"
            SELECT created_at::date AS date, COALESCE(SUM(total_amount), 0) AS total
            FROM sales
            WHERE created_at >= NOW() - make_interval(days => $1)
            GROUP BY created_at::date
            ORDER BY date
            "#,
        )
        .bind(SALES_CHART_DAYS)
        .fetch_all(&self.db)
        .await?;

        metrics.recent_activities = ActivityService::new(self.db.clone()).recent().await?;

        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_panels_are_omitted() {
        let json = serde_json::to_value(DashboardMetrics::default()).unwrap();
        assert!(json.get("ready_to_dispatch").is_none());
        assert!(json.get("todays_revenue").is_none());
        assert!(json["sales_chart"].as_array().unwrap().is_empty());
    }
}
