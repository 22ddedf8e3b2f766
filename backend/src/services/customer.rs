//! Customer directory

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::import::CustomerImportRow;
use shared::{validate_optional_email, validate_phone};

#[derive(Clone)]
pub struct CustomerService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomerFilter {
    /// Case-insensitive match on name or phone
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CustomerInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
}

impl CustomerInput {
    fn check(&self) -> AppResult<()> {
        self.validate()?;
        validate_phone(self.phone.trim()).map_err(|msg| AppError::validation("phone", msg))?;
        validate_optional_email(self.email.trim()).map_err(|msg| AppError::validation("email", msg))?;
        Ok(())
    }
}

const CUSTOMER_COLUMNS: &str = "id, name, phone, email, address, created_at";

impl CustomerService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_customers(&self, filter: &CustomerFilter) -> AppResult<Vec<Customer>> {
        let pattern = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE ($1::text IS NULL OR name ILIKE $1 OR phone ILIKE $1) ORDER BY name"
        ))
        .bind(pattern)
        .fetch_all(&self.db)
        .await?;

        Ok(customers)
    }

    pub async fn get_customer(&self, customer_id: Uuid) -> AppResult<Customer> {
        sqlx::query_as::<_, Customer>(&format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1"))
            .bind(customer_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Customer".to_string()))
    }

    pub async fn create_customer(&self, input: CustomerInput) -> AppResult<Customer> {
        input.check()?;

        let customer = sqlx::query_as::<_, Customer>(&format!(
            "INSERT INTO customers (name, phone, email, address) VALUES ($1, $2, $3, $4) RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(input.name.trim())
        .bind(input.phone.trim())
        .bind(input.email.trim())
        .bind(input.address.trim())
        .fetch_one(&self.db)
        .await?;

        Ok(customer)
    }

    pub async fn update_customer(&self, customer_id: Uuid, input: CustomerInput) -> AppResult<Customer> {
        input.check()?;

        sqlx::query_as::<_, Customer>(&format!(
            "UPDATE customers SET name = $2, phone = $3, email = $4, address = $5 WHERE id = $1 RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(customer_id)
        .bind(input.name.trim())
        .bind(input.phone.trim())
        .bind(input.email.trim())
        .bind(input.address.trim())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_string()))
    }

    pub async fn delete_customer(&self, customer_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(customer_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Customer".to_string()));
        }
        Ok(())
    }
}

/// Update-or-create by name, used by the bulk import
pub async fn upsert_by_name(conn: &mut PgConnection, row: &CustomerImportRow) -> AppResult<Uuid> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO customers (name, phone, email, address)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (name)
        DO UPDATE SET phone = EXCLUDED.phone, email = EXCLUDED.email, address = EXCLUDED.address
        RETURNING id
        "#,
    )
    .bind(&row.name)
    .bind(&row.phone)
    .bind(&row.email)
    .bind(&row.address)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}
