//! Payments, expense categories and expenses

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::activity::{self, Actor};
use shared::{
    expense_activity, validate_positive_amount, ActivityKind, Event, PaymentMethod,
    TransactionType,
};

#[derive(Clone)]
pub struct FinanceService {
    db: PgPool,
}

/// A payment recorded against a sale
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub sale_id: Option<Uuid>,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub reference: String,
    pub transaction_type: TransactionType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionFilter {
    pub sale_id: Option<Uuid>,
    pub transaction_type: Option<TransactionType>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransactionInput {
    pub sale_id: Uuid,
    pub amount: Decimal,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub transaction_type: TransactionType,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ExpenseCategory {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ExpenseCategoryInput {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub branch_name: String,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub description: String,
    pub amount: Decimal,
    pub date_incurred: NaiveDate,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateExpenseInput {
    pub branch_id: Uuid,
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    pub amount: Decimal,
    /// Defaults to today
    pub date_incurred: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpenseFilter {
    pub branch_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

const EXPENSE_SELECT: &str = r#"
    SELECT e.id, e.branch_id, b.name AS branch_name, e.category_id, c.name AS category_name,
           e.description, e.amount, e.date_incurred, e.created_by, e.created_at
    FROM expenses e
    JOIN branches b ON b.id = e.branch_id
    LEFT JOIN expense_categories c ON c.id = e.category_id
"#;

impl FinanceService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    pub async fn list_transactions(&self, filter: &TransactionFilter) -> AppResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, sale_id, amount, payment_method, reference, transaction_type, created_at
            FROM transactions
            WHERE ($1::uuid IS NULL OR sale_id = $1)
              AND ($2::transaction_type IS NULL OR transaction_type = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.sale_id)
        .bind(filter.transaction_type)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Record a payment against an existing sale
    pub async fn create_transaction(&self, input: CreateTransactionInput) -> AppResult<Transaction> {
        validate_positive_amount(input.amount).map_err(|msg| AppError::validation("amount", msg))?;

        let sale_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sales WHERE id = $1)")
            .bind(input.sale_id)
            .fetch_one(&self.db)
            .await?;
        if !sale_exists {
            return Err(AppError::NotFound("Sale".to_string()));
        }

        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (sale_id, amount, payment_method, reference, transaction_type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, sale_id, amount, payment_method, reference, transaction_type, created_at
            "#,
        )
        .bind(input.sale_id)
        .bind(input.amount)
        .bind(input.payment_method)
        .bind(input.reference.trim())
        .bind(input.transaction_type)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(
            transaction_id = %transaction.id,
            sale_id = %input.sale_id,
            amount = %transaction.amount,
            "Payment recorded"
        );

        Ok(transaction)
    }

    // ========================================================================
    // Expense categories
    // ========================================================================

    pub async fn list_expense_categories(&self) -> AppResult<Vec<ExpenseCategory>> {
        let rows = sqlx::query_as::<_, ExpenseCategory>("SELECT id, name FROM expense_categories ORDER BY name")
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    pub async fn create_expense_category(&self, input: ExpenseCategoryInput) -> AppResult<ExpenseCategory> {
        input.validate()?;

        let category = sqlx::query_as::<_, ExpenseCategory>(
            "INSERT INTO expense_categories (name) VALUES ($1) RETURNING id, name",
        )
        .bind(input.name.trim())
        .fetch_one(&self.db)
        .await?;

        Ok(category)
    }

    pub async fn delete_expense_category(&self, category_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM expense_categories WHERE id = $1")
            .bind(category_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Expense category".to_string()));
        }
        Ok(())
    }

    // ========================================================================
    // Expenses
    // ========================================================================

    pub async fn list_expenses(&self, filter: &ExpenseFilter) -> AppResult<Vec<Expense>> {
        let rows = sqlx::query_as::<_, Expense>(&format!(
            r#"{EXPENSE_SELECT}
            WHERE ($1::uuid IS NULL OR e.branch_id = $1)
              AND ($2::uuid IS NULL OR e.category_id = $2)
              AND ($3::date IS NULL OR e.date_incurred >= $3)
              AND ($4::date IS NULL OR e.date_incurred <= $4)
            ORDER BY e.date_incurred DESC, e.created_at DESC
            "#
        ))
        .bind(filter.branch_id)
        .bind(filter.category_id)
        .bind(filter.start)
        .bind(filter.end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    pub async fn create_expense(
        &self,
        actor: Actor<'_>,
        input: CreateExpenseInput,
    ) -> AppResult<(Expense, Vec<Event>)> {
        input.validate()?;
        validate_positive_amount(input.amount).map_err(|msg| AppError::validation("amount", msg))?;

        let mut tx = self.db.begin().await?;

        let expense_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO expenses (branch_id, category_id, description, amount, date_incurred, created_by)
            VALUES ($1, $2, $3, $4, COALESCE($5, CURRENT_DATE), $6)
            RETURNING id
            "#,
        )
        .bind(input.branch_id)
        .bind(input.category_id)
        .bind(input.description.trim())
        .bind(input.amount)
        .bind(input.date_incurred)
        .bind(actor.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let expense = sqlx::query_as::<_, Expense>(&format!("{EXPENSE_SELECT} WHERE e.id = $1"))
            .bind(expense_id)
            .fetch_one(&mut *tx)
            .await?;

        let event = activity::record(
            &mut *tx,
            ActivityKind::Expense,
            expense_activity(expense.category_name.as_deref(), expense.amount),
            Some(actor),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(%expense_id, amount = %expense.amount, "Expense recorded");

        Ok((expense, vec![event]))
    }

    pub async fn delete_expense(&self, expense_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(expense_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Expense".to_string()));
        }
        Ok(())
    }
}
