//! Suppliers, direct purchases, purchase orders and goods received notes
//!
//! Purchases and GRN items add to branch stock through the ledger. A GRN
//! linked to a purchase order marks that order as received.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::activity::Actor;
use crate::services::ledger::{self, MovementContext};
use crate::services::notification::stock_events;
use shared::{
    line_cost, validate_amount, validate_movement_quantity, validate_optional_email,
    validate_phone, Event, MovementReason, PurchaseOrderStatus, DEFAULT_LOW_STOCK_THRESHOLD,
};

#[derive(Clone)]
pub struct ProcurementService {
    db: PgPool,
}

// ============================================================================
// Suppliers
// ============================================================================

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub contact_name: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SupplierInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    pub contact_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

impl SupplierInput {
    fn check(&self) -> AppResult<()> {
        self.validate()?;
        validate_phone(self.phone.trim()).map_err(|msg| AppError::validation("phone", msg))?;
        validate_optional_email(self.email.trim()).map_err(|msg| AppError::validation("email", msg))?;
        Ok(())
    }
}

// ============================================================================
// Purchases
// ============================================================================

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Purchase {
    pub id: Uuid,
    pub supplier_id: Option<Uuid>,
    pub supplier_name: Option<String>,
    pub branch_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
    pub created_by: Option<Uuid>,
    pub date_purchased: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseInput {
    pub supplier_id: Option<Uuid>,
    pub branch_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_cost: Decimal,
}

// ============================================================================
// Purchase orders
// ============================================================================

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub branch_id: Uuid,
    pub branch_name: String,
    pub status: PurchaseOrderStatus,
    pub total_amount: Decimal,
    pub notes: String,
    pub created_by: Option<Uuid>,
    pub created_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PurchaseOrderItem {
    pub id: Uuid,
    pub purchase_order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseOrderDetail {
    #[serde(flatten)]
    pub order: PurchaseOrder,
    pub items: Vec<PurchaseOrderItem>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseOrderInput {
    pub supplier_id: Uuid,
    pub branch_id: Uuid,
    #[serde(default)]
    pub status: PurchaseOrderStatus,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePurchaseOrderInput {
    pub supplier_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub status: Option<PurchaseOrderStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddPurchaseOrderItemInput {
    #[serde(alias = "product")]
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(default)]
    pub unit_cost: Decimal,
}

// ============================================================================
// Goods received notes
// ============================================================================

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GoodsReceivedNote {
    pub id: Uuid,
    pub purchase_order_id: Option<Uuid>,
    pub branch_id: Uuid,
    pub branch_name: String,
    pub delivery_reference: String,
    pub remarks: String,
    pub received_date: NaiveDate,
    pub created_by: Option<Uuid>,
    pub created_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GrnItem {
    pub id: Uuid,
    pub grn_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity_received: i32,
    pub remarks: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrnDetail {
    #[serde(flatten)]
    pub grn: GoodsReceivedNote,
    pub items: Vec<GrnItem>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGrnInput {
    pub purchase_order_id: Option<Uuid>,
    pub branch_id: Uuid,
    #[serde(default)]
    pub delivery_reference: String,
    #[serde(default)]
    pub remarks: String,
}

#[derive(Debug, Deserialize)]
pub struct AddGrnItemInput {
    #[serde(alias = "product")]
    pub product_id: Uuid,
    pub quantity_received: i32,
    #[serde(default)]
    pub remarks: String,
}

const SUPPLIER_COLUMNS: &str = "id, name, contact_name, email, phone, created_at";

const PURCHASE_SELECT: &str = r#"
    SELECT pu.id, pu.supplier_id, s.name AS supplier_name, pu.branch_id, pu.product_id,
           p.name AS product_name, pu.quantity, pu.unit_cost, pu.total_cost, pu.created_by, pu.date_purchased
    FROM purchases pu
    JOIN products p ON p.id = pu.product_id
    LEFT JOIN suppliers s ON s.id = pu.supplier_id
"#;

const ORDER_SELECT: &str = r#"
    SELECT po.id, po.supplier_id, s.name AS supplier_name, po.branch_id, b.name AS branch_name,
           po.status, po.total_amount, po.notes, po.created_by, u.username AS created_by_name,
           po.created_at, po.updated_at
    FROM purchase_orders po
    JOIN suppliers s ON s.id = po.supplier_id
    JOIN branches b ON b.id = po.branch_id
    LEFT JOIN users u ON u.id = po.created_by
"#;

const ORDER_ITEM_SELECT: &str = r#"
    SELECT i.id, i.purchase_order_id, i.product_id, p.name AS product_name, i.quantity, i.unit_cost, i.total_cost
    FROM purchase_order_items i
    JOIN products p ON p.id = i.product_id
"#;

const GRN_SELECT: &str = r#"
    SELECT g.id, g.purchase_order_id, g.branch_id, b.name AS branch_name, g.delivery_reference,
           g.remarks, g.received_date, g.created_by, u.username AS created_by_name, g.created_at
    FROM goods_received_notes g
    JOIN branches b ON b.id = g.branch_id
    LEFT JOIN users u ON u.id = g.created_by
"#;

const GRN_ITEM_SELECT: &str = r#"
    SELECT i.id, i.grn_id, i.product_id, p.name AS product_name, i.quantity_received, i.remarks
    FROM grn_items i
    JOIN products p ON p.id = i.product_id
"#;

fn check_unit_cost(unit_cost: Decimal) -> AppResult<()> {
    validate_amount(unit_cost).map_err(|msg| AppError::validation("unit_cost", msg))
}

impl ProcurementService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ========================================================================
    // Suppliers
    // ========================================================================

    pub async fn list_suppliers(&self) -> AppResult<Vec<Supplier>> {
        let rows = sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers ORDER BY name"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    pub async fn get_supplier(&self, supplier_id: Uuid) -> AppResult<Supplier> {
        sqlx::query_as::<_, Supplier>(&format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = $1"))
            .bind(supplier_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Supplier".to_string()))
    }

    pub async fn create_supplier(&self, input: SupplierInput) -> AppResult<Supplier> {
        input.check()?;

        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            "INSERT INTO suppliers (name, contact_name, email, phone) VALUES ($1, $2, $3, $4) RETURNING {SUPPLIER_COLUMNS}"
        ))
        .bind(input.name.trim())
        .bind(input.contact_name.trim())
        .bind(input.email.trim())
        .bind(input.phone.trim())
        .fetch_one(&self.db)
        .await?;

        Ok(supplier)
    }

    pub async fn update_supplier(&self, supplier_id: Uuid, input: SupplierInput) -> AppResult<Supplier> {
        input.check()?;

        sqlx::query_as::<_, Supplier>(&format!(
            "UPDATE suppliers SET name = $2, contact_name = $3, email = $4, phone = $5 WHERE id = $1 RETURNING {SUPPLIER_COLUMNS}"
        ))
        .bind(supplier_id)
        .bind(input.name.trim())
        .bind(input.contact_name.trim())
        .bind(input.email.trim())
        .bind(input.phone.trim())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))
    }

    pub async fn delete_supplier(&self, supplier_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = $1")
            .bind(supplier_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Supplier".to_string()));
        }
        Ok(())
    }

    // ========================================================================
    // Purchases
    // ========================================================================

    pub async fn list_purchases(&self) -> AppResult<Vec<Purchase>> {
        let rows = sqlx::query_as::<_, Purchase>(&format!("{PURCHASE_SELECT} ORDER BY pu.date_purchased DESC"))
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    /// Record a direct purchase and add the goods to the branch
    pub async fn create_purchase(
        &self,
        actor: Actor<'_>,
        input: CreatePurchaseInput,
    ) -> AppResult<(Purchase, Vec<Event>)> {
        validate_movement_quantity(input.quantity)?;
        check_unit_cost(input.unit_cost)?;

        let mut tx = self.db.begin().await?;

        let purchase_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO purchases (supplier_id, branch_id, product_id, quantity, unit_cost, total_cost, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(input.supplier_id)
        .bind(input.branch_id)
        .bind(input.product_id)
        .bind(input.quantity)
        .bind(input.unit_cost)
        .bind(line_cost(input.quantity, input.unit_cost))
        .bind(actor.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let change = ledger::increment(
            &mut tx,
            input.product_id,
            input.branch_id,
            input.quantity,
            DEFAULT_LOW_STOCK_THRESHOLD,
            MovementContext::new(MovementReason::Purchase, Some(purchase_id), Some(actor.user_id)),
        )
        .await?;

        let purchase = sqlx::query_as::<_, Purchase>(&format!("{PURCHASE_SELECT} WHERE pu.id = $1"))
            .bind(purchase_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(%purchase_id, quantity = input.quantity, "Purchase recorded");

        Ok((purchase, stock_events(&change)))
    }

    // ========================================================================
    // Purchase orders
    // ========================================================================

    pub async fn list_purchase_orders(&self) -> AppResult<Vec<PurchaseOrder>> {
        let rows = sqlx::query_as::<_, PurchaseOrder>(&format!("{ORDER_SELECT} ORDER BY po.created_at DESC"))
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    pub async fn get_purchase_order(&self, order_id: Uuid) -> AppResult<PurchaseOrderDetail> {
        let mut conn = self.db.acquire().await?;
        load_order(&mut conn, order_id).await
    }

    pub async fn create_purchase_order(
        &self,
        actor: Actor<'_>,
        input: CreatePurchaseOrderInput,
    ) -> AppResult<PurchaseOrderDetail> {
        let mut tx = self.db.begin().await?;

        let order_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO purchase_orders (supplier_id, branch_id, status, notes, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(input.supplier_id)
        .bind(input.branch_id)
        .bind(input.status)
        .bind(input.notes.trim())
        .bind(actor.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let detail = load_order(&mut tx, order_id).await?;
        tx.commit().await?;

        tracing::info!(%order_id, "Purchase order created");
        Ok(detail)
    }

    pub async fn update_purchase_order(
        &self,
        order_id: Uuid,
        input: UpdatePurchaseOrderInput,
    ) -> AppResult<PurchaseOrderDetail> {
        let mut tx = self.db.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE purchase_orders SET
                supplier_id = COALESCE($2, supplier_id),
                branch_id = COALESCE($3, branch_id),
                status = COALESCE($4, status),
                notes = COALESCE($5, notes),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .bind(input.supplier_id)
        .bind(input.branch_id)
        .bind(input.status)
        .bind(input.notes.as_deref().map(str::trim))
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Purchase order".to_string()));
        }

        let detail = load_order(&mut tx, order_id).await?;
        tx.commit().await?;
        Ok(detail)
    }

    pub async fn delete_purchase_order(&self, order_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM purchase_orders WHERE id = $1")
            .bind(order_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Purchase order".to_string()));
        }
        Ok(())
    }

    /// Append a line and recompute the order total from all its lines
    pub async fn add_order_item(
        &self,
        order_id: Uuid,
        input: AddPurchaseOrderItemInput,
    ) -> AppResult<PurchaseOrderItem> {
        validate_movement_quantity(input.quantity)?;
        check_unit_cost(input.unit_cost)?;

        let mut tx = self.db.begin().await?;

        sqlx::query_scalar::<_, Uuid>("SELECT id FROM purchase_orders WHERE id = $1 FOR UPDATE")
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        let item_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO purchase_order_items (purchase_order_id, product_id, quantity, unit_cost, total_cost)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(order_id)
        .bind(input.product_id)
        .bind(input.quantity)
        .bind(input.unit_cost)
        .bind(line_cost(input.quantity, input.unit_cost))
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE purchase_orders
            SET total_amount = (SELECT COALESCE(SUM(total_cost), 0) FROM purchase_order_items WHERE purchase_order_id = $1),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        let item = sqlx::query_as::<_, PurchaseOrderItem>(&format!("{ORDER_ITEM_SELECT} WHERE i.id = $1"))
            .bind(item_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(item)
    }

    // ========================================================================
    // Goods received notes
    // ========================================================================

    pub async fn list_grns(&self) -> AppResult<Vec<GoodsReceivedNote>> {
        let rows = sqlx::query_as::<_, GoodsReceivedNote>(&format!("{GRN_SELECT} ORDER BY g.created_at DESC"))
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    pub async fn get_grn(&self, grn_id: Uuid) -> AppResult<GrnDetail> {
        let mut conn = self.db.acquire().await?;
        load_grn(&mut conn, grn_id).await
    }

    /// Create a GRN. A linked purchase order becomes `received`.
    pub async fn create_grn(&self, actor: Actor<'_>, input: CreateGrnInput) -> AppResult<GrnDetail> {
        let mut tx = self.db.begin().await?;

        let grn_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO goods_received_notes (purchase_order_id, branch_id, delivery_reference, remarks, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(input.purchase_order_id)
        .bind(input.branch_id)
        .bind(input.delivery_reference.trim())
        .bind(input.remarks.trim())
        .bind(actor.user_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(order_id) = input.purchase_order_id {
            sqlx::query("UPDATE purchase_orders SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(order_id)
                .bind(PurchaseOrderStatus::Received)
                .execute(&mut *tx)
                .await?;
            tracing::info!(%order_id, %grn_id, "Purchase order received");
        }

        let detail = load_grn(&mut tx, grn_id).await?;
        tx.commit().await?;
        Ok(detail)
    }

    /// Record a received line and add it to the GRN's branch stock
    pub async fn add_grn_item(
        &self,
        actor: Actor<'_>,
        grn_id: Uuid,
        input: AddGrnItemInput,
    ) -> AppResult<(GrnItem, Vec<Event>)> {
        validate_movement_quantity(input.quantity_received)?;

        let mut tx = self.db.begin().await?;

        let branch_id = sqlx::query_scalar::<_, Uuid>("SELECT branch_id FROM goods_received_notes WHERE id = $1")
            .bind(grn_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Goods received note".to_string()))?;

        let item_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO grn_items (grn_id, product_id, quantity_received, remarks)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(grn_id)
        .bind(input.product_id)
        .bind(input.quantity_received)
        .bind(input.remarks.trim())
        .fetch_one(&mut *tx)
        .await?;

        let change = ledger::increment(
            &mut tx,
            input.product_id,
            branch_id,
            input.quantity_received,
            DEFAULT_LOW_STOCK_THRESHOLD,
            MovementContext::new(MovementReason::GoodsReceived, Some(grn_id), Some(actor.user_id)),
        )
        .await?;

        let item = sqlx::query_as::<_, GrnItem>(&format!("{GRN_ITEM_SELECT} WHERE i.id = $1"))
            .bind(item_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(%grn_id, product_id = %input.product_id, quantity = input.quantity_received, "Goods received");

        Ok((item, stock_events(&change)))
    }
}

async fn load_order(conn: &mut PgConnection, order_id: Uuid) -> AppResult<PurchaseOrderDetail> {
    let order = sqlx::query_as::<_, PurchaseOrder>(&format!("{ORDER_SELECT} WHERE po.id = $1"))
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

    let items = sqlx::query_as::<_, PurchaseOrderItem>(&format!(
        "{ORDER_ITEM_SELECT} WHERE i.purchase_order_id = $1 ORDER BY i.id"
    ))
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(PurchaseOrderDetail { order, items })
}

async fn load_grn(conn: &mut PgConnection, grn_id: Uuid) -> AppResult<GrnDetail> {
    let grn = sqlx::query_as::<_, GoodsReceivedNote>(&format!("{GRN_SELECT} WHERE g.id = $1"))
        .bind(grn_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Goods received note".to_string()))?;

    let items = sqlx::query_as::<_, GrnItem>(&format!("{GRN_ITEM_SELECT} WHERE i.grn_id = $1 ORDER BY i.id"))
        .bind(grn_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(GrnDetail { grn, items })
}
