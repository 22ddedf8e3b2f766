//! Stock levels, adjustments and inter-branch transfers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::activity::{self, Actor};
use crate::services::ledger::{self, MovementContext};
use crate::services::notification::{stock_events, StockChange};
use shared::{
    stock_activity, transfer_activity, validate_movement_quantity, validate_transfer_branches,
    ActivityKind, AdjustmentType, Event, MovementReason, Pagination,
};

#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// Stock row with product and branch names
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockLevelView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub branch_id: Uuid,
    pub branch_name: String,
    pub quantity: i32,
    pub low_stock_threshold: i32,
    pub is_low: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StockFilter {
    pub branch_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub low_only: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStockInput {
    #[validate(range(min = 0, message = "Low stock threshold cannot be negative"))]
    pub low_stock_threshold: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAdjustmentInput {
    pub product_id: Uuid,
    pub branch_id: Uuid,
    pub adjustment_type: AdjustmentType,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockAdjustment {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub branch_id: Uuid,
    pub branch_name: String,
    pub adjustment_type: AdjustmentType,
    pub quantity: i32,
    pub reason: String,
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransferInput {
    pub product_id: Uuid,
    pub from_branch_id: Uuid,
    pub to_branch_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockTransfer {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub from_branch_id: Uuid,
    pub from_branch_name: String,
    pub to_branch_id: Uuid,
    pub to_branch_name: String,
    pub quantity: i32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// One entry of the stock ledger
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockMovement {
    pub id: Uuid,
    pub stock_id: Uuid,
    pub quantity_change: i32,
    pub quantity_after: i32,
    pub reason: MovementReason,
    pub reference_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

const STOCK_SELECT: &str = r#"
    SELECT s.id, s.product_id, p.name AS product_name, p.sku, s.branch_id, b.name AS branch_name,
           s.quantity, s.low_stock_threshold, s.quantity <= s.low_stock_threshold AS is_low, s.updated_at
    FROM stocks s
    JOIN products p ON p.id = s.product_id
    JOIN branches b ON b.id = s.branch_id
"#;

impl StockService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_stock(&self, filter: &StockFilter) -> AppResult<Vec<StockLevelView>> {
        let sql = format!(
            r#"{STOCK_SELECT}
            WHERE ($1::uuid IS NULL OR s.branch_id = $1)
              AND ($2::uuid IS NULL OR s.product_id = $2)
              AND (NOT $3 OR s.quantity <= s.low_stock_threshold)
            ORDER BY p.name, b.name
            "#
        );

        let rows = sqlx::query_as::<_, StockLevelView>(&sql)
            .bind(filter.branch_id)
            .bind(filter.product_id)
            .bind(filter.low_only)
            .fetch_all(&self.db)
            .await?;

        Ok(rows)
    }

    pub async fn get_stock(&self, stock_id: Uuid) -> AppResult<StockLevelView> {
        let sql = format!("{STOCK_SELECT} WHERE s.id = $1");

        sqlx::query_as::<_, StockLevelView>(&sql)
            .bind(stock_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock".to_string()))
    }

    /// Only the alert threshold is editable; quantities move through the ledger.
    pub async fn update_threshold(
        &self,
        stock_id: Uuid,
        input: UpdateStockInput,
    ) -> AppResult<StockLevelView> {
        input.validate()?;

        let updated = sqlx::query("UPDATE stocks SET low_stock_threshold = $2, updated_at = NOW() WHERE id = $1")
            .bind(stock_id)
            .bind(input.low_stock_threshold)
            .execute(&self.db)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Stock".to_string()));
        }

        self.get_stock(stock_id).await
    }

    /// Record an adjustment and apply it to the stock row.
    ///
    /// The audit record is written first; the row is locked (created at zero
    /// when missing) and set to the adjusted quantity in the same transaction.
    pub async fn adjust(
        &self,
        actor: Actor<'_>,
        input: CreateAdjustmentInput,
    ) -> AppResult<(StockAdjustment, Vec<Event>)> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let adjustment_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO stock_adjustments (product_id, branch_id, adjustment_type, quantity, reason, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(input.product_id)
        .bind(input.branch_id)
        .bind(input.adjustment_type)
        .bind(input.quantity)
        .bind(input.reason.trim())
        .bind(actor.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let locked = ledger::lock_or_create(
            &mut *tx,
            input.product_id,
            input.branch_id,
            shared::DEFAULT_LOW_STOCK_THRESHOLD,
        )
        .await?;
        let new_quantity = input.adjustment_type.apply(locked.quantity, input.quantity)?;

        let change = ledger::set_quantity(
            &mut *tx,
            &locked,
            new_quantity,
            MovementContext::new(MovementReason::Adjustment, Some(adjustment_id), Some(actor.user_id)),
        )
        .await?;

        let mut events = stock_events(&change);
        events.push(
            activity::record(
                &mut *tx,
                ActivityKind::Stock,
                stock_activity(&change.product_name, &change.branch_name),
                Some(actor),
            )
            .await?,
        );

        let adjustment = fetch_adjustment(&mut *tx, adjustment_id).await?;
        tx.commit().await?;

        tracing::info!(
            adjustment_id = %adjustment_id,
            kind = input.adjustment_type.as_str(),
            from = locked.quantity,
            to = new_quantity,
            "Stock adjusted"
        );

        Ok((adjustment, events))
    }

    pub async fn list_adjustments(&self, pagination: Pagination) -> AppResult<Vec<StockAdjustment>> {
        let rows = sqlx::query_as::<_, StockAdjustment>(&format!(
            "{ADJUSTMENT_SELECT} ORDER BY a.created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Move goods between branches. The source may go negative; that is
    /// logged by the ledger and not refused.
    pub async fn transfer(
        &self,
        actor: Actor<'_>,
        input: CreateTransferInput,
    ) -> AppResult<(StockTransfer, Vec<Event>)> {
        validate_movement_quantity(input.quantity)?;
        validate_transfer_branches(input.from_branch_id, input.to_branch_id)
            .map_err(|msg| AppError::validation("to_branch_id", msg))?;

        let mut tx = self.db.begin().await?;

        let transfer_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO stock_transfers (product_id, from_branch_id, to_branch_id, quantity, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(input.product_id)
        .bind(input.from_branch_id)
        .bind(input.to_branch_id)
        .bind(input.quantity)
        .bind(actor.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let out_leg = TransferLeg {
            branch_id: input.from_branch_id,
            delta: -input.quantity,
            ctx: MovementContext::new(MovementReason::TransferOut, Some(transfer_id), Some(actor.user_id)),
        };
        let in_leg = TransferLeg {
            branch_id: input.to_branch_id,
            delta: input.quantity,
            ctx: MovementContext::new(MovementReason::TransferIn, Some(transfer_id), Some(actor.user_id)),
        };

        // Rows are touched in branch id order so opposite transfers cannot deadlock.
        let source_first = transfer_leg_order(input.from_branch_id, input.to_branch_id);
        let (first, second) = if source_first {
            (out_leg, in_leg)
        } else {
            (in_leg, out_leg)
        };
        let first = apply_leg(&mut *tx, input.product_id, first).await?;
        let second = apply_leg(&mut *tx, input.product_id, second).await?;
        let (source, destination) = if source_first {
            (first, second)
        } else {
            (second, first)
        };

        let mut events = stock_events(&source);
        events.extend(stock_events(&destination));
        events.push(
            activity::record(
                &mut *tx,
                ActivityKind::Transfer,
                transfer_activity(&source.product_name, &source.branch_name, &destination.branch_name),
                Some(actor),
            )
            .await?,
        );

        let transfer = fetch_transfer(&mut *tx, transfer_id).await?;
        tx.commit().await?;

        tracing::info!(%transfer_id, quantity = input.quantity, "Stock transferred");

        Ok((transfer, events))
    }

    pub async fn list_transfers(&self, pagination: Pagination) -> AppResult<Vec<StockTransfer>> {
        let rows = sqlx::query_as::<_, StockTransfer>(&format!(
            "{TRANSFER_SELECT} ORDER BY t.created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Ledger entries for one stock row, newest first
    pub async fn list_movements(
        &self,
        stock_id: Uuid,
        pagination: Pagination,
    ) -> AppResult<Vec<StockMovement>> {
        let rows = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, stock_id, quantity_change, quantity_after, reason, reference_id, user_id, created_at
            FROM stock_movements
            WHERE stock_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(stock_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }
}

const ADJUSTMENT_SELECT: &str = r#"
    SELECT a.id, a.product_id, p.name AS product_name, a.branch_id, b.name AS branch_name,
           a.adjustment_type, a.quantity, a.reason, a.user_id, u.username, a.created_at
    FROM stock_adjustments a
    JOIN products p ON p.id = a.product_id
    JOIN branches b ON b.id = a.branch_id
    LEFT JOIN users u ON u.id = a.user_id
"#;

const TRANSFER_SELECT: &str = r#"
    SELECT t.id, t.product_id, p.name AS product_name,
           t.from_branch_id, fb.name AS from_branch_name,
           t.to_branch_id, tb.name AS to_branch_name,
           t.quantity, t.created_by, t.created_at
    FROM stock_transfers t
    JOIN products p ON p.id = t.product_id
    JOIN branches fb ON fb.id = t.from_branch_id
    JOIN branches tb ON tb.id = t.to_branch_id
"#;

async fn fetch_adjustment(conn: &mut sqlx::PgConnection, id: Uuid) -> AppResult<StockAdjustment> {
    let row = sqlx::query_as::<_, StockAdjustment>(&format!("{ADJUSTMENT_SELECT} WHERE a.id = $1"))
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row)
}

async fn fetch_transfer(conn: &mut sqlx::PgConnection, id: Uuid) -> AppResult<StockTransfer> {
    let row = sqlx::query_as::<_, StockTransfer>(&format!("{TRANSFER_SELECT} WHERE t.id = $1"))
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row)
}

/// One side of a transfer
struct TransferLeg {
    branch_id: Uuid,
    delta: i32,
    ctx: MovementContext,
}

/// True when the source row should be written before the destination row.
/// Both transfer directions between two branches agree on the order.
fn transfer_leg_order(from_branch_id: Uuid, to_branch_id: Uuid) -> bool {
    from_branch_id < to_branch_id
}

async fn apply_leg(
    conn: &mut sqlx::PgConnection,
    product_id: Uuid,
    leg: TransferLeg,
) -> AppResult<StockChange> {
    ledger::increment(
        conn,
        product_id,
        leg.branch_id,
        leg.delta,
        shared::DEFAULT_LOW_STOCK_THRESHOLD,
        leg.ctx,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_transfers_share_row_order() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);

        // A -> B writes A first; B -> A also writes A first
        assert!(transfer_leg_order(a, b));
        assert!(!transfer_leg_order(b, a));
    }

    #[test]
    fn test_row_order_is_total_for_random_branches() {
        for _ in 0..32 {
            let from = Uuid::new_v4();
            let to = Uuid::new_v4();
            assert_ne!(transfer_leg_order(from, to), transfer_leg_order(to, from));
        }
    }
}
