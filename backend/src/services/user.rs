//! Staff accounts and the static role table

use bcrypt::{hash, DEFAULT_COST};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{
    permission_key, validate_optional_email, validate_password, validate_username, Action,
    Permission, Resource, Role,
};

#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

/// User account without the password hash
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub is_superuser: bool,
    pub is_active: bool,
    pub branch_id: Option<Uuid>,
    pub branch_name: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserInput {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
    pub branch_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub branch_id: Option<Uuid>,
    pub password: Option<String>,
}

/// Role as listed by `GET /api/roles`
#[derive(Debug, Clone, Serialize)]
pub struct RoleInfo {
    pub name: Role,
    pub display_name: &'static str,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PermissionInfo {
    pub key: String,
    pub resource: Resource,
    pub action: Action,
}

const USER_SELECT: &str = r#"
    SELECT u.id, u.username, u.first_name, u.last_name, u.email, u.role, u.is_superuser,
           u.is_active, u.branch_id, b.name AS branch_name, u.last_login_at, u.created_at
    FROM users u
    LEFT JOIN branches b ON b.id = u.branch_id
"#;

fn hash_password(password: &str) -> AppResult<String> {
    validate_password(password).map_err(|msg| AppError::validation("password", msg))?;
    hash(password, DEFAULT_COST).map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

fn check_email(email: &str) -> AppResult<()> {
    validate_optional_email(email).map_err(|msg| AppError::validation("email", msg))
}

impl UserService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_users(&self, filter: &UserFilter) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "{USER_SELECT} WHERE ($1::user_role IS NULL OR u.role = $1) ORDER BY u.username"
        ))
        .bind(filter.role)
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    pub async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE u.id = $1"))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    pub async fn create_user(&self, input: CreateUserInput) -> AppResult<User> {
        let username = input.username.trim();
        validate_username(username).map_err(|msg| AppError::validation("username", msg))?;
        check_email(input.email.trim())?;
        let password_hash = hash_password(&input.password)?;

        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&self.db)
            .await?;
        if taken {
            return Err(AppError::DuplicateEntry("username".to_string()));
        }

        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (username, first_name, last_name, email, password_hash, role, branch_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(username)
        .bind(input.first_name.trim())
        .bind(input.last_name.trim())
        .bind(input.email.trim())
        .bind(&password_hash)
        .bind(input.role)
        .bind(input.branch_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%user_id, username, role = input.role.as_str(), "User created");

        self.get_user(user_id).await
    }

    pub async fn update_user(&self, user_id: Uuid, input: UpdateUserInput) -> AppResult<User> {
        if let Some(email) = input.email.as_deref() {
            check_email(email.trim())?;
        }
        let password_hash = input.password.as_deref().map(hash_password).transpose()?;

        let result = sqlx::query(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                role = COALESCE($5, role),
                is_active = COALESCE($6, is_active),
                branch_id = COALESCE($7, branch_id),
                password_hash = COALESCE($8, password_hash)
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(input.first_name.as_deref().map(str::trim))
        .bind(input.last_name.as_deref().map(str::trim))
        .bind(input.email.as_deref().map(str::trim))
        .bind(input.role)
        .bind(input.is_active)
        .bind(input.branch_id)
        .bind(password_hash)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User".to_string()));
        }

        if input.is_active == Some(false) {
            // Deactivated accounts lose their refresh tokens
            sqlx::query("UPDATE refresh_tokens SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL")
                .bind(user_id)
                .execute(&self.db)
                .await?;
        }

        self.get_user(user_id).await
    }

    pub async fn delete_user(&self, user_id: Uuid) -> AppResult<()> {
        let is_superuser = sqlx::query_scalar::<_, bool>("SELECT is_superuser FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        if is_superuser {
            return Err(AppError::Forbidden("Cannot delete a superuser account.".to_string()));
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        tracing::info!(%user_id, "User deleted");
        Ok(())
    }
}

/// Every role with its granted permissions
pub fn list_roles() -> Vec<RoleInfo> {
    Role::ALL
        .iter()
        .map(|role| RoleInfo {
            name: *role,
            display_name: role.display_name(),
            permissions: role.permissions(),
        })
        .collect()
}

/// Every `resource:action` pair the system knows about
pub fn list_permissions() -> Vec<PermissionInfo> {
    Resource::ALL
        .iter()
        .flat_map(|resource| {
            Action::ALL.iter().map(move |action| PermissionInfo {
                key: permission_key(*resource, *action),
                resource: *resource,
                action: *action,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_listing_covers_every_role() {
        let roles = list_roles();
        assert_eq!(roles.len(), Role::ALL.len());
        let keeper = roles.iter().find(|r| r.name == Role::StoreKeeper).unwrap();
        assert_eq!(keeper.display_name, "Store Keeper");
    }

    #[test]
    fn test_permission_listing() {
        let permissions = list_permissions();
        assert_eq!(permissions.len(), Resource::ALL.len() * Action::ALL.len());
        assert!(permissions.iter().any(|p| p.key == "sale:dispatch"));
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            hash_password("abc"),
            Err(AppError::Validation { ref field, .. }) if field == "password"
        ));
    }
}
