//! Stock row mutations shared by every workflow that moves goods
//!
//! All functions run on a caller-owned transaction. Pure increments are a
//! single upsert; read-then-write paths lock the row with `FOR UPDATE` first.
//! Every change is appended to `stock_movements`.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::notification::StockChange;
use shared::MovementReason;

/// Who and what caused a stock movement
#[derive(Debug, Clone, Copy)]
pub struct MovementContext {
    pub reason: MovementReason,
    pub reference_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

impl MovementContext {
    pub fn new(reason: MovementReason, reference_id: Option<Uuid>, user_id: Option<Uuid>) -> Self {
        Self {
            reason,
            reference_id,
            user_id,
        }
    }
}

/// A stock row held under `FOR UPDATE`
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct LockedStock {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Adds `delta` (may be negative) to the (product, branch) row, creating it
/// with `low_stock_threshold` when missing.
pub async fn increment(
    conn: &mut PgConnection,
    product_id: Uuid,
    branch_id: Uuid,
    delta: i32,
    low_stock_threshold: i32,
    ctx: MovementContext,
) -> AppResult<StockChange> {
    let (stock_id, quantity) = sqlx::query_as::<_, (Uuid, i32)>(
        r#"
        INSERT INTO stocks (product_id, branch_id, quantity, low_stock_threshold)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (product_id, branch_id)
        DO UPDATE SET quantity = stocks.quantity + EXCLUDED.quantity, updated_at = NOW()
        RETURNING id, quantity
        "#,
    )
    .bind(product_id)
    .bind(branch_id)
    .bind(delta)
    .bind(low_stock_threshold)
    .fetch_one(&mut *conn)
    .await?;

    record_movement(conn, stock_id, delta, quantity, ctx).await?;

    if quantity < 0 {
        tracing::warn!(%stock_id, %product_id, %branch_id, quantity, "Stock went negative");
    }

    load_change(conn, stock_id).await
}

/// Locks the (product, branch) row, creating it at zero when missing.
pub async fn lock_or_create(
    conn: &mut PgConnection,
    product_id: Uuid,
    branch_id: Uuid,
    low_stock_threshold: i32,
) -> AppResult<LockedStock> {
    sqlx::query(
        r#"
        INSERT INTO stocks (product_id, branch_id, quantity, low_stock_threshold)
        VALUES ($1, $2, 0, $3)
        ON CONFLICT (product_id, branch_id) DO NOTHING
        "#,
    )
    .bind(product_id)
    .bind(branch_id)
    .bind(low_stock_threshold)
    .execute(&mut *conn)
    .await?;

    let locked = sqlx::query_as::<_, LockedStock>(
        "SELECT id, product_id, quantity FROM stocks WHERE product_id = $1 AND branch_id = $2 FOR UPDATE",
    )
    .bind(product_id)
    .bind(branch_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(locked)
}

/// Locks the existing rows for `product_ids` at a branch. Missing rows are absent
/// from the result. Rows are locked in id order so concurrent dispatches cannot deadlock.
pub async fn lock_existing(
    conn: &mut PgConnection,
    branch_id: Uuid,
    product_ids: &[Uuid],
) -> AppResult<Vec<LockedStock>> {
    let rows = sqlx::query_as::<_, LockedStock>(
        r#"
        SELECT id, product_id, quantity
        FROM stocks
        WHERE branch_id = $1 AND product_id = ANY($2)
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(branch_id)
    .bind(product_ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Writes the new quantity of a locked row and records the movement
pub async fn set_quantity(
    conn: &mut PgConnection,
    locked: &LockedStock,
    new_quantity: i32,
    ctx: MovementContext,
) -> AppResult<StockChange> {
    sqlx::query("UPDATE stocks SET quantity = $2, updated_at = NOW() WHERE id = $1")
        .bind(locked.id)
        .bind(new_quantity)
        .execute(&mut *conn)
        .await?;

    record_movement(conn, locked.id, new_quantity - locked.quantity, new_quantity, ctx).await?;

    if new_quantity < 0 {
        tracing::warn!(stock_id = %locked.id, quantity = new_quantity, "Stock went negative");
    }

    load_change(conn, locked.id).await
}

async fn record_movement(
    conn: &mut PgConnection,
    stock_id: Uuid,
    quantity_change: i32,
    quantity_after: i32,
    ctx: MovementContext,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements (stock_id, quantity_change, quantity_after, reason, reference_id, user_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(stock_id)
    .bind(quantity_change)
    .bind(quantity_after)
    .bind(ctx.reason)
    .bind(ctx.reference_id)
    .bind(ctx.user_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Current state of a stock row with product and branch names
pub async fn load_change(conn: &mut PgConnection, stock_id: Uuid) -> AppResult<StockChange> {
    let change = sqlx::query_as::<_, StockChange>(
        r#"
        SELECT s.id AS stock_id, s.product_id, s.branch_id, s.quantity, s.low_stock_threshold,
               p.name AS product_name, b.name AS branch_name
        FROM stocks s
        JOIN products p ON p.id = s.product_id
        JOIN branches b ON b.id = s.branch_id
        WHERE s.id = $1
        "#,
    )
    .bind(stock_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(change)
}
