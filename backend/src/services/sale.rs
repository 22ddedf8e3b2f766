//! Sales order lifecycle
//!
//! pending -> approved -> dispatched, or pending -> cancelled. Stock only
//! leaves a branch on dispatch and comes back when a dispatched sale is deleted.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::activity::{self, Actor};
use crate::services::finance::Transaction;
use crate::services::ledger::{self, LockedStock, MovementContext};
use crate::services::notification::stock_events;
use crate::services::vehicle::Vehicle;
use shared::{
    generate_invoice_number, order_total, plan_dispatch, price_line, sale_activity,
    validate_amount, ActivityKind, DispatchLine, DispatchTransport, Event, MovementReason,
    PaginatedResponse, Pagination, PaymentMethod, PaymentSummary, PricedLine, SaleLineRequest,
    SaleStatus, SalesNotification, StockLevel, TransactionType, VehicleStatus, WALK_IN_CUSTOMER,
};

/// Attempts at drawing an unused invoice number before giving up
const INVOICE_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct SaleService {
    db: PgPool,
}

/// Sale row with the names of related records
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SaleRecord {
    pub id: Uuid,
    pub invoice_number: String,
    pub status: SaleStatus,
    pub branch_id: Uuid,
    pub branch_name: String,
    pub user_id: Option<Uuid>,
    pub created_by_name: Option<String>,
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub total_amount: Decimal,
    #[serde(skip_serializing)]
    pub amount_paid: Decimal,
    pub approved_by: Option<Uuid>,
    pub approved_by_name: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub dispatch_manager_id: Option<Uuid>,
    pub dispatch_manager_name: Option<String>,
    pub store_keeper_id: Option<Uuid>,
    pub store_keeper_name: Option<String>,
    pub vehicle_id: Option<Uuid>,
    pub lorry_info: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A sale with its derived payment fields
#[derive(Debug, Clone, Serialize)]
pub struct Sale {
    #[serde(flatten)]
    pub record: SaleRecord,
    #[serde(flatten)]
    pub payment: PaymentSummary,
}

impl From<SaleRecord> for Sale {
    fn from(record: SaleRecord) -> Self {
        let payment = PaymentSummary::compute(record.total_amount, record.amount_paid);
        Self { record, payment }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SaleItem {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub quantity: i32,
    pub price_at_sale: Decimal,
    pub subtotal: Decimal,
    pub commission_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub transactions: Vec<Transaction>,
    pub vehicle_details: Option<Vehicle>,
}

/// `status` accepts a sale status or `credit` (sales not yet fully paid)
#[derive(Debug, Default, Deserialize)]
pub struct SaleFilter {
    pub status: Option<String>,
    pub branch_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSaleInput {
    pub branch_id: Uuid,
    pub customer_id: Option<Uuid>,
    #[validate(length(max = 100, message = "Customer name is too long"))]
    pub customer_name: Option<String>,
    #[validate(length(min = 1, message = "A sale needs at least one item"))]
    pub items: Vec<SaleLineRequest>,
    pub payment_details: Option<PaymentInput>,
}

/// Payment taken when the sale is created
#[derive(Debug, Deserialize)]
pub struct PaymentInput {
    pub amount: Decimal,
    #[serde(default, alias = "method")]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub reference: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DispatchInput {
    #[serde(alias = "store_keeper_id")]
    pub store_keeper: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub lorry_info: Option<String>,
}

/// Response body of the lifecycle actions
#[derive(Debug, Clone, Serialize)]
pub struct SaleActionResponse {
    pub message: String,
    pub status: SaleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_note_url: Option<String>,
}

/// Printable receipt
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub title: &'static str,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub sale: SaleDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryNoteLine {
    pub product_name: String,
    pub sku: String,
    pub quantity: i32,
}

/// Printable delivery note; carries quantities but no prices
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryNote {
    pub title: &'static str,
    pub generated_at: DateTime<Utc>,
    pub sale_id: Uuid,
    pub invoice_number: String,
    pub status: SaleStatus,
    pub branch_name: String,
    pub customer_name: String,
    pub store_keeper_name: Option<String>,
    pub lorry_info: String,
    pub vehicle_details: Option<Vehicle>,
    pub items: Vec<DeliveryNoteLine>,
}

enum StatusFilter {
    Any,
    Status(SaleStatus),
    Credit,
}

impl StatusFilter {
    fn parse(raw: Option<&str>) -> AppResult<Self> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(StatusFilter::Any),
            Some("credit") => Ok(StatusFilter::Credit),
            Some(other) => Ok(StatusFilter::Status(other.parse()?)),
        }
    }

    fn status(&self) -> Option<SaleStatus> {
        match self {
            StatusFilter::Status(status) => Some(*status),
            _ => None,
        }
    }

    fn credit_only(&self) -> bool {
        matches!(self, StatusFilter::Credit)
    }
}

const PAYMENTS_JOIN: &str = r#"
    LEFT JOIN (
        SELECT sale_id, SUM(amount) AS amount_paid FROM transactions GROUP BY sale_id
    ) paid ON paid.sale_id = s.id
"#;

const SALE_FILTER: &str = r#"
    WHERE ($1::sale_status IS NULL OR s.status = $1)
      AND ($2::uuid IS NULL OR s.branch_id = $2)
      AND (NOT $3 OR COALESCE(paid.amount_paid, 0) < s.total_amount)
"#;

fn sale_select() -> String {
    format!(
        r#"
        SELECT s.id, s.invoice_number, s.status, s.branch_id, b.name AS branch_name,
               s.user_id, cu.username AS created_by_name, s.customer_id, s.customer_name,
               s.total_amount, COALESCE(paid.amount_paid, 0) AS amount_paid,
               s.approved_by, ab.username AS approved_by_name, s.approved_at,
               s.dispatch_manager_id, dm.username AS dispatch_manager_name,
               s.store_keeper_id, sk.username AS store_keeper_name,
               s.vehicle_id, s.lorry_info, s.created_at, s.updated_at
        FROM sales s
        JOIN branches b ON b.id = s.branch_id
        LEFT JOIN users cu ON cu.id = s.user_id
        LEFT JOIN users ab ON ab.id = s.approved_by
        LEFT JOIN users dm ON dm.id = s.dispatch_manager_id
        LEFT JOIN users sk ON sk.id = s.store_keeper_id
        {PAYMENTS_JOIN}
        "#
    )
}

/// The locked head of a sale while a lifecycle action runs
#[derive(Debug, FromRow)]
struct LockedSale {
    invoice_number: String,
    status: SaleStatus,
    branch_id: Uuid,
}

/// Catalogue price and category commission rate of a product
#[derive(Debug, FromRow)]
struct ProductPricing {
    id: Uuid,
    price: Decimal,
    commission_percentage: Decimal,
}

impl SaleService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_sales(
        &self,
        filter: &SaleFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<Sale>> {
        let status = StatusFilter::parse(filter.status.as_deref())?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM sales s {PAYMENTS_JOIN} {SALE_FILTER}"
        ))
        .bind(status.status())
        .bind(filter.branch_id)
        .bind(status.credit_only())
        .fetch_one(&self.db)
        .await?;

        let records = sqlx::query_as::<_, SaleRecord>(&format!(
            "{} {SALE_FILTER} ORDER BY s.created_at DESC LIMIT $4 OFFSET $5",
            sale_select()
        ))
        .bind(status.status())
        .bind(filter.branch_id)
        .bind(status.credit_only())
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(
            records.into_iter().map(Sale::from).collect(),
            pagination,
            total.max(0) as u64,
        ))
    }

    pub async fn get_sale(&self, sale_id: Uuid) -> AppResult<SaleDetail> {
        let mut conn = self.db.acquire().await?;
        load_detail(&mut conn, sale_id).await
    }

    /// Items of one sale, or of every sale when no sale is given
    pub async fn list_items(&self, sale_id: Option<Uuid>) -> AppResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(&format!(
            "{ITEM_SELECT} WHERE ($1::uuid IS NULL OR si.sale_id = $1) ORDER BY si.sale_id, si.id"
        ))
        .bind(sale_id)
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    /// Create a pending sale. Prices are snapshotted from the catalogue unless
    /// overridden; no stock moves until dispatch.
    pub async fn create_sale(
        &self,
        actor: Actor<'_>,
        input: CreateSaleInput,
    ) -> AppResult<(SaleDetail, Vec<Event>)> {
        input.validate()?;
        if let Some(payment) = &input.payment_details {
            validate_amount(payment.amount)
                .map_err(|msg| AppError::validation("payment_details.amount", msg))?;
        }

        let mut tx = self.db.begin().await?;

        let customer_name = resolve_customer_name(&mut tx, &input).await?;
        let lines = price_lines(&mut tx, &input.items).await?;
        let total_amount = order_total(&lines);
        let invoice_number = unused_invoice_number(&mut tx).await?;

        let sale_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO sales (invoice_number, branch_id, status, user_id, customer_id, customer_name, total_amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&invoice_number)
        .bind(input.branch_id)
        .bind(SaleStatus::Pending)
        .bind(actor.user_id)
        .bind(input.customer_id)
        .bind(&customer_name)
        .bind(total_amount)
        .fetch_one(&mut *tx)
        .await?;

        for line in &lines {
            sqlx::query(
                r#"
                INSERT INTO sale_items (sale_id, product_id, quantity, price_at_sale, subtotal, commission_amount)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(sale_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.price_at_sale)
            .bind(line.subtotal)
            .bind(line.commission_amount)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(payment) = input.payment_details.as_ref().filter(|p| !p.amount.is_zero()) {
            sqlx::query(
                r#"
                INSERT INTO transactions (sale_id, amount, payment_method, reference, transaction_type)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(sale_id)
            .bind(payment.amount)
            .bind(payment.payment_method)
            .bind(payment.reference.trim())
            .bind(TransactionType::Income)
            .execute(&mut *tx)
            .await?;
        }

        let mut events = vec![Event::SalesNotification(SalesNotification::created(
            sale_id,
            &invoice_number,
            actor.username,
            Utc::now(),
        ))];
        if total_amount > Decimal::ZERO {
            events.push(
                activity::record(
                    &mut *tx,
                    ActivityKind::Sale,
                    sale_activity(&invoice_number, total_amount),
                    Some(actor),
                )
                .await?,
            );
        }

        let detail = load_detail(&mut tx, sale_id).await?;
        tx.commit().await?;

        tracing::info!(
            %sale_id,
            invoice_number = %invoice_number,
            lines = lines.len(),
            total = %total_amount,
            "Sale created"
        );

        Ok((detail, events))
    }

    /// pending -> approved. The sale goes to the shared dispatch pool, so any
    /// previously set dispatch manager is cleared.
    pub async fn approve(
        &self,
        actor: Actor<'_>,
        sale_id: Uuid,
    ) -> AppResult<(SaleActionResponse, Vec<Event>)> {
        let mut tx = self.db.begin().await?;
        let sale = lock_sale(&mut tx, sale_id).await?;
        let status = sale.status.approve()?;

        sqlx::query(
            r#"
            UPDATE sales
            SET status = $2, approved_by = $3, approved_at = NOW(), dispatch_manager_id = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(sale_id)
        .bind(status)
        .bind(actor.user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(%sale_id, approved_by = %actor.user_id, "Sale approved");

        Ok((
            SaleActionResponse {
                message: format!("Order #{} approved and sent to Dispatch.", sale.invoice_number),
                status,
                invoice_url: None,
                delivery_note_url: None,
            },
            vec![status_event(sale_id, &sale.invoice_number, status)],
        ))
    }

    /// pending -> cancelled
    pub async fn decline(&self, sale_id: Uuid) -> AppResult<(SaleActionResponse, Vec<Event>)> {
        let mut tx = self.db.begin().await?;
        let sale = lock_sale(&mut tx, sale_id).await?;
        let status = sale.status.decline()?;

        sqlx::query("UPDATE sales SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(sale_id)
            .bind(status)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(%sale_id, "Sale declined");

        Ok((
            SaleActionResponse {
                message: "Order declined successfully".to_string(),
                status,
                invoice_url: None,
                delivery_note_url: None,
            },
            vec![status_event(sale_id, &sale.invoice_number, status)],
        ))
    }

    /// approved -> dispatched.
    ///
    /// Every stock row the sale draws on is locked and checked first. Rows
    /// are only decremented when every line fits, so a failed dispatch
    /// leaves stock untouched.
    pub async fn dispatch(
        &self,
        actor: Actor<'_>,
        sale_id: Uuid,
        input: DispatchInput,
    ) -> AppResult<(SaleActionResponse, Vec<Event>)> {
        let mut tx = self.db.begin().await?;
        let sale = lock_sale(&mut tx, sale_id).await?;
        let status = sale.status.dispatch()?;

        let transport = DispatchTransport {
            store_keeper_id: input.store_keeper,
            vehicle_id: input.vehicle_id,
            lorry_info: input.lorry_info.as_deref(),
        };
        let store_keeper_id = transport.validate()?;

        let store_keeper_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(store_keeper_id)
                .fetch_one(&mut *tx)
                .await?;
        if !store_keeper_exists {
            return Err(AppError::validation("store_keeper", "Invalid store keeper"));
        }

        let vehicle = match input.vehicle_id {
            Some(vehicle_id) => Some(
                sqlx::query_as::<_, (String, String)>(
                    "SELECT registration_number, driver_name FROM vehicles WHERE id = $1 FOR UPDATE",
                )
                .bind(vehicle_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::validation("vehicle_id", "Invalid vehicle"))?,
            ),
            None => None,
        };

        let lines: Vec<DispatchLine> = sqlx::query_as::<_, (Uuid, String, i32)>(
            r#"
            SELECT si.product_id, p.name, si.quantity
            FROM sale_items si
            JOIN products p ON p.id = si.product_id
            WHERE si.sale_id = $1
            ORDER BY si.id
            "#,
        )
        .bind(sale_id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|(product_id, product_name, quantity)| DispatchLine {
            product_id,
            product_name,
            quantity,
        })
        .collect();

        let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        let locked = ledger::lock_existing(&mut tx, sale.branch_id, &product_ids).await?;
        let levels: HashMap<Uuid, StockLevel> = locked
            .iter()
            .map(|row| {
                (
                    row.product_id,
                    StockLevel {
                        stock_id: row.id,
                        quantity: row.quantity,
                    },
                )
            })
            .collect();

        let deductions = plan_dispatch(&lines, &levels)?;

        // Several lines may draw on one row; the last deduction holds its final level.
        let by_id: HashMap<Uuid, &LockedStock> = locked.iter().map(|row| (row.id, row)).collect();
        let mut final_levels: BTreeMap<Uuid, i32> = BTreeMap::new();
        for deduction in &deductions {
            final_levels.insert(deduction.stock_id, deduction.remaining);
        }

        let ctx = MovementContext::new(MovementReason::Dispatch, Some(sale_id), Some(actor.user_id));
        let mut events = Vec::new();
        for (stock_id, remaining) in final_levels {
            if let Some(row) = by_id.get(&stock_id) {
                let change = ledger::set_quantity(&mut tx, row, remaining, ctx).await?;
                events.extend(stock_events(&change));
            }
        }

        if let Some(vehicle_id) = input.vehicle_id {
            sqlx::query("UPDATE vehicles SET status = $2 WHERE id = $1")
                .bind(vehicle_id)
                .bind(VehicleStatus::Busy)
                .execute(&mut *tx)
                .await?;
        }

        let lorry_info = transport
            .resolve_lorry_info(vehicle.as_ref().map(|(reg, driver)| (reg.as_str(), driver.as_str())))
            .unwrap_or_default();

        sqlx::query(
            r#"
            UPDATE sales
            SET status = $2, store_keeper_id = $3, vehicle_id = $4, lorry_info = $5,
                dispatch_manager_id = $6, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(sale_id)
        .bind(status)
        .bind(store_keeper_id)
        .bind(input.vehicle_id)
        .bind(&lorry_info)
        .bind(actor.user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        events.push(status_event(sale_id, &sale.invoice_number, status));

        tracing::info!(
            %sale_id,
            rows = deductions.len(),
            lorry_info = %lorry_info,
            "Sale dispatched"
        );

        Ok((
            SaleActionResponse {
                message: "Order dispatched successfully and stock deducted".to_string(),
                status,
                invoice_url: Some(format!("/api/sales/{}/receipt", sale_id)),
                delivery_note_url: Some(format!("/api/sales/{}/delivery_note", sale_id)),
            },
            events,
        ))
    }

    /// Delete a sale. A dispatched sale first returns its goods to the
    /// branch; rows that no longer exist are skipped.
    pub async fn delete_sale(&self, actor: Actor<'_>, sale_id: Uuid) -> AppResult<Vec<Event>> {
        let mut tx = self.db.begin().await?;
        let sale = lock_sale(&mut tx, sale_id).await?;
        let mut events = Vec::new();

        if sale.status.restores_stock_on_delete() {
            let returned: HashMap<Uuid, i64> = sqlx::query_as::<_, (Uuid, i64)>(
                "SELECT product_id, SUM(quantity)::BIGINT FROM sale_items WHERE sale_id = $1 GROUP BY product_id",
            )
            .bind(sale_id)
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .collect();

            let product_ids: Vec<Uuid> = returned.keys().copied().collect();
            let rows = ledger::lock_existing(&mut tx, sale.branch_id, &product_ids).await?;
            if rows.len() < product_ids.len() {
                tracing::warn!(
                    %sale_id,
                    missing = product_ids.len() - rows.len(),
                    "Stock rows missing while restoring a deleted sale"
                );
            }

            let ctx = MovementContext::new(MovementReason::SaleReversal, Some(sale_id), Some(actor.user_id));
            for row in &rows {
                let quantity = returned.get(&row.product_id).copied().unwrap_or(0);
                let restored = i32::try_from(i64::from(row.quantity) + quantity)
                    .map_err(|_| AppError::Internal("Stock quantity overflow".to_string()))?;
                let change = ledger::set_quantity(&mut tx, row, restored, ctx).await?;
                events.extend(stock_events(&change));
            }
        }

        sqlx::query("DELETE FROM sales WHERE id = $1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            %sale_id,
            invoice_number = %sale.invoice_number,
            status = %sale.status,
            "Sale deleted"
        );

        Ok(events)
    }

    pub async fn receipt(&self, sale_id: Uuid) -> AppResult<Receipt> {
        Ok(Receipt {
            title: "Sales Receipt",
            generated_at: Utc::now(),
            sale: self.get_sale(sale_id).await?,
        })
    }

    pub async fn delivery_note(&self, sale_id: Uuid) -> AppResult<DeliveryNote> {
        let detail = self.get_sale(sale_id).await?;
        let record = detail.sale.record;

        Ok(DeliveryNote {
            title: "Delivery Note",
            generated_at: Utc::now(),
            sale_id: record.id,
            invoice_number: record.invoice_number,
            status: record.status,
            branch_name: record.branch_name,
            customer_name: record.customer_name,
            store_keeper_name: record.store_keeper_name,
            lorry_info: record.lorry_info,
            vehicle_details: detail.vehicle_details,
            items: detail
                .items
                .into_iter()
                .map(|item| DeliveryNoteLine {
                    product_name: item.product_name,
                    sku: item.sku,
                    quantity: item.quantity,
                })
                .collect(),
        })
    }
}

const ITEM_SELECT: &str = r#"
    SELECT si.id, si.sale_id, si.product_id, p.name AS product_name, p.sku, si.quantity,
           si.price_at_sale, si.subtotal, si.commission_amount
    FROM sale_items si
    JOIN products p ON p.id = si.product_id
"#;

fn status_event(sale_id: Uuid, invoice_number: &str, status: SaleStatus) -> Event {
    Event::SalesNotification(SalesNotification::updated(
        sale_id,
        invoice_number,
        status,
        Utc::now(),
    ))
}

async fn lock_sale(conn: &mut PgConnection, sale_id: Uuid) -> AppResult<LockedSale> {
    sqlx::query_as::<_, LockedSale>(
        "SELECT invoice_number, status, branch_id FROM sales WHERE id = $1 FOR UPDATE",
    )
    .bind(sale_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Sale".to_string()))
}

async fn load_detail(conn: &mut PgConnection, sale_id: Uuid) -> AppResult<SaleDetail> {
    let record = sqlx::query_as::<_, SaleRecord>(&format!("{} WHERE s.id = $1", sale_select()))
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

    let items = sqlx::query_as::<_, SaleItem>(&format!("{ITEM_SELECT} WHERE si.sale_id = $1 ORDER BY si.id"))
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;

    let transactions = sqlx::query_as::<_, Transaction>(
        r#"
        SELECT id, sale_id, amount, payment_method, reference, transaction_type, created_at
        FROM transactions
        WHERE sale_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    let vehicle_details = match record.vehicle_id {
        Some(vehicle_id) => sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT id, registration_number, driver_name, vehicle_type, status, current_mileage, last_condition, created_at
            FROM vehicles
            WHERE id = $1
            "#,
        )
        .bind(vehicle_id)
        .fetch_optional(&mut *conn)
        .await?,
        None => None,
    };

    Ok(SaleDetail {
        sale: Sale::from(record),
        items,
        transactions,
        vehicle_details,
    })
}

/// The typed name wins, then the linked customer's name, then the walk-in default.
async fn resolve_customer_name(conn: &mut PgConnection, input: &CreateSaleInput) -> AppResult<String> {
    if let Some(name) = input.customer_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        return Ok(name.to_string());
    }

    match input.customer_id {
        Some(customer_id) => sqlx::query_scalar::<_, String>("SELECT name FROM customers WHERE id = $1")
            .bind(customer_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::validation("customer_id", "Invalid customer")),
        None => Ok(WALK_IN_CUSTOMER.to_string()),
    }
}

async fn price_lines(conn: &mut PgConnection, items: &[SaleLineRequest]) -> AppResult<Vec<PricedLine>> {
    let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();

    let pricing: HashMap<Uuid, ProductPricing> = sqlx::query_as::<_, ProductPricing>(
        r#"
        SELECT p.id, p.price, c.commission_percentage
        FROM products p
        JOIN categories c ON c.id = p.category_id
        WHERE p.id = ANY($1)
        "#,
    )
    .bind(&product_ids)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|p| (p.id, p))
    .collect();

    items
        .iter()
        .map(|item| {
            let product = pricing.get(&item.product_id).ok_or_else(|| {
                AppError::validation("items", format!("Product {} does not exist", item.product_id))
            })?;
            Ok(price_line(item, product.price, product.commission_percentage)?)
        })
        .collect()
}

async fn unused_invoice_number(conn: &mut PgConnection) -> AppResult<String> {
    for _ in 0..INVOICE_ATTEMPTS {
        let candidate = generate_invoice_number();
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sales WHERE invoice_number = $1)")
            .bind(&candidate)
            .fetch_one(&mut *conn)
            .await?;
        if !taken {
            return Ok(candidate);
        }
        tracing::debug!(invoice_number = %candidate, "Invoice number collision");
    }

    Err(AppError::Internal("Could not allocate an invoice number".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_filter_parsing() {
        assert!(matches!(StatusFilter::parse(None).unwrap(), StatusFilter::Any));
        assert!(matches!(StatusFilter::parse(Some(" ")).unwrap(), StatusFilter::Any));
        assert!(StatusFilter::parse(Some("credit")).unwrap().credit_only());
        assert_eq!(
            StatusFilter::parse(Some("approved")).unwrap().status(),
            Some(SaleStatus::Approved)
        );
        assert!(StatusFilter::parse(Some("shipped")).is_err());
    }

    #[test]
    fn test_dispatch_input_accepts_both_store_keeper_keys() {
        let id = Uuid::new_v4();
        let a: DispatchInput =
            serde_json::from_value(serde_json::json!({ "store_keeper": id, "lorry_info": "T 1" })).unwrap();
        let b: DispatchInput =
            serde_json::from_value(serde_json::json!({ "store_keeper_id": id })).unwrap();
        assert_eq!(a.store_keeper, Some(id));
        assert_eq!(b.store_keeper, Some(id));
    }

    #[test]
    fn test_payment_method_alias() {
        let payment: PaymentInput =
            serde_json::from_value(serde_json::json!({ "amount": "50", "method": "mobile" })).unwrap();
        assert_eq!(payment.payment_method, PaymentMethod::Mobile);
        assert!(payment.reference.is_empty());
    }
}
