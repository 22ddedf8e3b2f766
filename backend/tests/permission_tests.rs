//! Authentication and authorization tests
//!
//! Property-based and unit tests for:
//! - Role permission table enforcement
//! - Superuser override
//! - Access token claims round trip

use proptest::prelude::*;
use shared::{effective_permissions, permission_key, Action, Resource, Role};
use sms_server::middleware::AuthUser;
use uuid::Uuid;

// ============================================================================
// Property Test Strategies
// ============================================================================

fn role_strategy() -> impl Strategy<Value = Role> {
    prop::sample::select(Role::ALL.to_vec())
}

fn resource_strategy() -> impl Strategy<Value = Resource> {
    prop::sample::select(Resource::ALL.to_vec())
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop::sample::select(Action::ALL.to_vec())
}

fn auth_user(role: Role, is_superuser: bool) -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        username: "tester".to_string(),
        role,
        is_superuser,
        permissions: effective_permissions(role, is_superuser),
    }
}

// ============================================================================
// Property Tests: Permission Enforcement
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: token permissions agree with the static role table
    #[test]
    fn test_claims_match_role_table(
        role in role_strategy(),
        resource in resource_strategy(),
        action in action_strategy(),
    ) {
        let user = auth_user(role, false);
        prop_assert_eq!(
            user.has_permission(resource, action),
            role.has_permission(resource, action)
        );
        prop_assert_eq!(user.require(resource, action).is_ok(), role.has_permission(resource, action));
    }

    /// Property: a superuser passes every check whatever their role
    #[test]
    fn test_superuser_passes_every_check(
        role in role_strategy(),
        resource in resource_strategy(),
        action in action_strategy(),
    ) {
        let user = auth_user(role, true);
        prop_assert!(user.require(resource, action).is_ok());
    }

    /// Property: permission keys are unique within a role
    #[test]
    fn test_role_keys_are_unique(role in role_strategy()) {
        let mut keys = role.permission_keys();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        prop_assert_eq!(keys.len(), total);
    }

    /// Property: role names survive a parse
    #[test]
    fn test_role_name_round_trip(role in role_strategy()) {
        let parsed: Role = role.as_str().parse().unwrap();
        prop_assert_eq!(parsed, role);
    }
}

// ============================================================================
// Unit Tests: Role Permissions
// ============================================================================

#[cfg(test)]
mod role_permission_tests {
    use super::*;

    #[test]
    fn test_permission_key_format() {
        assert_eq!(permission_key(Resource::PurchaseOrder, Action::Create), "purchase_order:create");
        assert_eq!(permission_key(Resource::Sale, Action::Dispatch), "sale:dispatch");
    }

    #[test]
    fn test_staff_has_no_permissions() {
        assert!(Role::Staff.permission_keys().is_empty());
        let staff = auth_user(Role::Staff, false);
        assert!(staff.require(Resource::Product, Action::View).is_err());
    }

    #[test]
    fn test_sales_rep_cannot_approve_or_dispatch() {
        let rep = auth_user(Role::SalesRep, false);
        assert!(rep.has_permission(Resource::Sale, Action::Create));
        assert!(!rep.has_permission(Resource::Sale, Action::Approve));
        assert!(!rep.has_permission(Resource::Sale, Action::Dispatch));
    }

    #[test]
    fn test_store_manager_dispatches_but_does_not_approve() {
        let manager = auth_user(Role::StoreManager, false);
        assert!(manager.has_permission(Resource::Sale, Action::Dispatch));
        assert!(!manager.has_permission(Resource::Sale, Action::Approve));
        assert!(manager.has_permission(Resource::Transfer, Action::Create));
    }

    #[test]
    fn test_procurement_roles() {
        assert!(Role::AfisaUgavi.has_permission(Resource::PurchaseOrder, Action::Create));
        assert!(!Role::AfisaUgavi.has_permission(Resource::Grn, Action::Create));
        assert!(Role::StockController.has_permission(Resource::Grn, Action::Create));
        assert!(Role::StockController.has_permission(Resource::Adjustment, Action::Create));
    }

    #[test]
    fn test_admin_matches_superuser_keys() {
        assert_eq!(effective_permissions(Role::Staff, true), Role::Admin.permission_keys());
        assert_eq!(
            Role::Admin.permission_keys().len(),
            Resource::ALL.len() * Action::ALL.len()
        );
    }
}

// ============================================================================
// Unit Tests: Access Tokens
// ============================================================================

#[cfg(test)]
mod token_tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use sms_server::error::AppError;
    use sms_server::services::auth::{decode_access_token, Claims};

    const SECRET: &str = "test-secret";

    fn token(role: Role, exp_offset: i64, secret: &str) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            username: "kamau".to_string(),
            role,
            is_superuser: false,
            permissions: role.permission_keys(),
            exp: now + exp_offset,
            iat: now,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn test_valid_token_decodes() {
        let claims = decode_access_token(&token(Role::Accountant, 600, SECRET), SECRET).unwrap();
        assert_eq!(claims.role, Role::Accountant);
        assert!(claims.permissions.contains(&"expense:create".to_string()));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let err = decode_access_token(&token(Role::Manager, -3600, SECRET), SECRET).unwrap_err();
        assert!(matches!(err, AppError::TokenExpired));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let err = decode_access_token(&token(Role::Manager, 600, "other"), SECRET).unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }
}
