//! Branches, product categories and the product catalogue

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::ledger::{self, MovementContext};
use crate::services::notification::{stock_events, StockChange};
use shared::{
    generate_sku, validate_amount, validate_commission_percentage, Event, MovementReason,
    ProductType, DEFAULT_LOW_STOCK_THRESHOLD,
};

/// Attempts at drawing an unused SKU before giving up
const SKU_ATTEMPTS: usize = 10;

#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Branch {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BranchInput {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub commission_percentage: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub commission_percentage: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub product_type: ProductType,
    pub category_id: Uuid,
    pub category_name: String,
    pub price: Decimal,
    pub cost: Decimal,
    pub weight: Decimal,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub product_type: Option<ProductType>,
    /// Case-insensitive match on name or SKU
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    /// Generated from the product type when absent
    pub sku: Option<String>,
    #[serde(default)]
    pub product_type: ProductType,
    pub category_id: Uuid,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub cost: Decimal,
    #[serde(default)]
    pub weight: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "Opening stock cannot be negative"))]
    pub opening_stock: i32,
    #[serde(default = "default_threshold")]
    #[validate(range(min = 0, message = "Low stock threshold cannot be negative"))]
    pub low_stock_threshold: i32,
}

fn default_threshold() -> i32 {
    DEFAULT_LOW_STOCK_THRESHOLD
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50, message = "SKU cannot be empty"))]
    pub sku: Option<String>,
    pub product_type: Option<ProductType>,
    pub category_id: Option<Uuid>,
    pub price: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub weight: Option<Decimal>,
    pub description: Option<String>,
}

/// Fields of a product to insert; shared by the API and the bulk import
#[derive(Debug, Clone)]
pub struct NewProduct<'a> {
    pub name: &'a str,
    pub sku: Option<&'a str>,
    pub product_type: ProductType,
    pub category_id: Uuid,
    pub price: Decimal,
    pub cost: Decimal,
    pub weight: Decimal,
    pub description: &'a str,
}

const PRODUCT_SELECT: &str = r#"
    SELECT p.id, p.name, p.sku, p.product_type, p.category_id, c.name AS category_name,
           p.price, p.cost, p.weight, p.description, p.created_at, p.updated_at
    FROM products p
    JOIN categories c ON c.id = p.category_id
"#;

fn check_money(field: &'static str, value: Decimal) -> AppResult<()> {
    validate_amount(value).map_err(|msg| AppError::validation(field, msg))
}

impl CatalogService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ========================================================================
    // Branches
    // ========================================================================

    pub async fn list_branches(&self) -> AppResult<Vec<Branch>> {
        let rows = sqlx::query_as::<_, Branch>("SELECT id, name, address, created_at FROM branches ORDER BY name")
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    pub async fn get_branch(&self, branch_id: Uuid) -> AppResult<Branch> {
        sqlx::query_as::<_, Branch>("SELECT id, name, address, created_at FROM branches WHERE id = $1")
            .bind(branch_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Branch".to_string()))
    }

    pub async fn create_branch(&self, input: BranchInput) -> AppResult<Branch> {
        input.validate()?;

        let branch = sqlx::query_as::<_, Branch>(
            "INSERT INTO branches (name, address) VALUES ($1, $2) RETURNING id, name, address, created_at",
        )
        .bind(input.name.trim())
        .bind(input.address.trim())
        .fetch_one(&self.db)
        .await?;

        tracing::info!(branch_id = %branch.id, name = %branch.name, "Branch created");
        Ok(branch)
    }

    pub async fn update_branch(&self, branch_id: Uuid, input: BranchInput) -> AppResult<Branch> {
        input.validate()?;

        sqlx::query_as::<_, Branch>(
            "UPDATE branches SET name = $2, address = $3 WHERE id = $1 RETURNING id, name, address, created_at",
        )
        .bind(branch_id)
        .bind(input.name.trim())
        .bind(input.address.trim())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Branch".to_string()))
    }

    pub async fn delete_branch(&self, branch_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM branches WHERE id = $1")
            .bind(branch_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Branch".to_string()));
        }
        Ok(())
    }

    // ========================================================================
    // Categories
    // ========================================================================

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, commission_percentage, created_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    pub async fn get_category(&self, category_id: Uuid) -> AppResult<Category> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, description, commission_percentage, created_at FROM categories WHERE id = $1",
        )
        .bind(category_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category".to_string()))
    }

    pub async fn create_category(&self, input: CategoryInput) -> AppResult<Category> {
        input.validate()?;
        validate_commission_percentage(input.commission_percentage)?;

        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, description, commission_percentage)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, commission_percentage, created_at
            "#,
        )
        .bind(input.name.trim())
        .bind(input.description.trim())
        .bind(input.commission_percentage)
        .fetch_one(&self.db)
        .await?;

        Ok(category)
    }

    pub async fn update_category(&self, category_id: Uuid, input: CategoryInput) -> AppResult<Category> {
        input.validate()?;
        validate_commission_percentage(input.commission_percentage)?;

        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories SET name = $2, description = $3, commission_percentage = $4
            WHERE id = $1
            RETURNING id, name, description, commission_percentage, created_at
            "#,
        )
        .bind(category_id)
        .bind(input.name.trim())
        .bind(input.description.trim())
        .bind(input.commission_percentage)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category".to_string()))
    }

    pub async fn delete_category(&self, category_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(category_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Category".to_string()));
        }
        Ok(())
    }

    // ========================================================================
    // Products
    // ========================================================================

    pub async fn list_products(&self, filter: &ProductFilter) -> AppResult<Vec<Product>> {
        let pattern = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let rows = sqlx::query_as::<_, Product>(&format!(
            r#"{PRODUCT_SELECT}
            WHERE ($1::uuid IS NULL OR p.category_id = $1)
              AND ($2::product_type IS NULL OR p.product_type = $2)
              AND ($3::text IS NULL OR p.name ILIKE $3 OR p.sku ILIKE $3)
            ORDER BY p.name
            "#
        ))
        .bind(filter.category_id)
        .bind(filter.product_type)
        .bind(pattern)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        let mut conn = self.db.acquire().await?;
        fetch_product(&mut conn, product_id).await
    }

    /// Create a product. Stock-tracked products also get a row at the default
    /// branch holding the opening stock.
    pub async fn create_product(
        &self,
        input: CreateProductInput,
        default_branch: &str,
    ) -> AppResult<(Product, Vec<Event>)> {
        input.validate()?;
        check_money("price", input.price)?;
        check_money("cost", input.cost)?;
        check_money("weight", input.weight)?;

        let mut tx = self.db.begin().await?;

        let product_id = insert_product(
            &mut tx,
            &NewProduct {
                name: input.name.trim(),
                sku: input.sku.as_deref(),
                product_type: input.product_type,
                category_id: input.category_id,
                price: input.price,
                cost: input.cost,
                weight: input.weight,
                description: input.description.trim(),
            },
        )
        .await?;

        let mut events = Vec::new();
        if input.product_type.tracks_stock() {
            let branch_id = ensure_branch(&mut tx, default_branch).await?;
            let change = open_stock(
                &mut tx,
                product_id,
                branch_id,
                input.opening_stock,
                input.low_stock_threshold,
                MovementReason::OpeningStock,
            )
            .await?;
            events.extend(stock_events(&change));
        }

        let product = fetch_product(&mut tx, product_id).await?;
        tx.commit().await?;

        tracing::info!(%product_id, sku = %product.sku, "Product created");

        Ok((product, events))
    }

    pub async fn update_product(&self, product_id: Uuid, input: UpdateProductInput) -> AppResult<Product> {
        input.validate()?;
        for (field, value) in [("price", input.price), ("cost", input.cost), ("weight", input.weight)] {
            if let Some(value) = value {
                check_money(field, value)?;
            }
        }

        let mut tx = self.db.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                sku = COALESCE($3, sku),
                product_type = COALESCE($4, product_type),
                category_id = COALESCE($5, category_id),
                price = COALESCE($6, price),
                cost = COALESCE($7, cost),
                weight = COALESCE($8, weight),
                description = COALESCE($9, description),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.sku.as_deref().map(str::trim))
        .bind(input.product_type)
        .bind(input.category_id)
        .bind(input.price)
        .bind(input.cost)
        .bind(input.weight)
        .bind(input.description.as_deref().map(str::trim))
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }

        let product = fetch_product(&mut tx, product_id).await?;
        tx.commit().await?;
        Ok(product)
    }

    pub async fn delete_product(&self, product_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }
        Ok(())
    }
}

pub async fn fetch_product(conn: &mut PgConnection, product_id: Uuid) -> AppResult<Product> {
    sqlx::query_as::<_, Product>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

/// Get-or-create a branch by name
pub async fn ensure_branch(conn: &mut PgConnection, name: &str) -> AppResult<Uuid> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO branches (name) VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Get-or-create a category by name
pub async fn ensure_category(conn: &mut PgConnection, name: &str) -> AppResult<Uuid> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO categories (name) VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Insert a product, generating a unique SKU when none is given
pub async fn insert_product(conn: &mut PgConnection, product: &NewProduct<'_>) -> AppResult<Uuid> {
    let sku = match product.sku.map(str::trim).filter(|s| !s.is_empty()) {
        Some(sku) => sku.to_string(),
        None => unused_sku(conn, product.product_type).await?,
    };

    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO products (name, sku, product_type, category_id, price, cost, weight, description)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(product.name)
    .bind(&sku)
    .bind(product.product_type)
    .bind(product.category_id)
    .bind(product.price)
    .bind(product.cost)
    .bind(product.weight)
    .bind(product.description)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

async fn unused_sku(conn: &mut PgConnection, product_type: ProductType) -> AppResult<String> {
    for _ in 0..SKU_ATTEMPTS {
        let candidate = generate_sku(product_type, &mut rand::thread_rng());
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE sku = $1)")
            .bind(&candidate)
            .fetch_one(&mut *conn)
            .await?;
        if !taken {
            return Ok(candidate);
        }
    }

    Err(AppError::Internal("Could not allocate a SKU".to_string()))
}

/// Seed or top up a product's stock row at a branch.
///
/// A new row starts at `quantity` with `low_stock_threshold`; an existing row
/// keeps its threshold and has `quantity` added.
pub async fn open_stock(
    conn: &mut PgConnection,
    product_id: Uuid,
    branch_id: Uuid,
    quantity: i32,
    low_stock_threshold: i32,
    reason: MovementReason,
) -> AppResult<StockChange> {
    ledger::increment(
        conn,
        product_id,
        branch_id,
        quantity,
        low_stock_threshold,
        MovementContext::new(reason, Some(product_id), None),
    )
    .await
}
