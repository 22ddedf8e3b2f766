//! User roles and the static permission table

use serde::{Deserialize, Serialize};

/// Staff role assigned to a user account
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "user_role", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    Staff,
    /// Procurement officer
    AfisaUgavi,
    StockController,
    SalesRep,
    StoreManager,
    Accountant,
    StoreKeeper,
}

/// A permission granting actions on a resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permission {
    pub resource: Resource,
    pub actions: Vec<Action>,
}

/// Resources that can be accessed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Branch,
    Category,
    Product,
    Stock,
    Supplier,
    Purchase,
    Transfer,
    Adjustment,
    PurchaseOrder,
    Grn,
    Customer,
    Vehicle,
    Sale,
    Transaction,
    Expense,
    User,
    Report,
}

/// Actions that can be performed on resources
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    Approve,
    Dispatch,
    Import,
}

impl Resource {
    pub const ALL: [Resource; 17] = [
        Resource::Branch,
        Resource::Category,
        Resource::Product,
        Resource::Stock,
        Resource::Supplier,
        Resource::Purchase,
        Resource::Transfer,
        Resource::Adjustment,
        Resource::PurchaseOrder,
        Resource::Grn,
        Resource::Customer,
        Resource::Vehicle,
        Resource::Sale,
        Resource::Transaction,
        Resource::Expense,
        Resource::User,
        Resource::Report,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Branch => "branch",
            Resource::Category => "category",
            Resource::Product => "product",
            Resource::Stock => "stock",
            Resource::Supplier => "supplier",
            Resource::Purchase => "purchase",
            Resource::Transfer => "transfer",
            Resource::Adjustment => "adjustment",
            Resource::PurchaseOrder => "purchase_order",
            Resource::Grn => "grn",
            Resource::Customer => "customer",
            Resource::Vehicle => "vehicle",
            Resource::Sale => "sale",
            Resource::Transaction => "transaction",
            Resource::Expense => "expense",
            Resource::User => "user",
            Resource::Report => "report",
        }
    }
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::View,
        Action::Create,
        Action::Edit,
        Action::Delete,
        Action::Approve,
        Action::Dispatch,
        Action::Import,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Approve => "approve",
            Action::Dispatch => "dispatch",
            Action::Import => "import",
        }
    }
}

/// `resource:action` string carried in access token claims
pub fn permission_key(resource: Resource, action: Action) -> String {
    format!("{}:{}", resource.as_str(), action.as_str())
}

fn grant(resource: Resource, actions: &[Action]) -> Permission {
    Permission {
        resource,
        actions: actions.to_vec(),
    }
}

impl Role {
    pub const ALL: [Role; 9] = [
        Role::Admin,
        Role::Manager,
        Role::Staff,
        Role::AfisaUgavi,
        Role::StockController,
        Role::SalesRep,
        Role::StoreManager,
        Role::Accountant,
        Role::StoreKeeper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Staff => "staff",
            Role::AfisaUgavi => "afisa_ugavi",
            Role::StockController => "stock_controller",
            Role::SalesRep => "sales_rep",
            Role::StoreManager => "store_manager",
            Role::Accountant => "accountant",
            Role::StoreKeeper => "store_keeper",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Manager => "Manager",
            Role::Staff => "Staff",
            Role::AfisaUgavi => "Afisa Ugavi",
            Role::StockController => "Stock Controller",
            Role::SalesRep => "Sales Representative",
            Role::StoreManager => "Store Manager",
            Role::Accountant => "Accountant",
            Role::StoreKeeper => "Store Keeper",
        }
    }

    /// Permissions granted to the role
    pub fn permissions(&self) -> Vec<Permission> {
        use Action::*;

        match self {
            Role::Admin => Resource::ALL
                .iter()
                .map(|r| grant(*r, &Action::ALL))
                .collect(),
            Role::Manager => vec![
                grant(Resource::User, &[View, Create, Edit]),
                grant(Resource::Branch, &[View]),
                grant(Resource::Category, &[View]),
                grant(Resource::Product, &[View, Create, Edit, Import]),
                grant(Resource::Stock, &[View]),
                grant(Resource::Customer, &[View]),
                grant(Resource::Vehicle, &[View, Create, Edit]),
                grant(Resource::Sale, &[View, Create, Edit, Delete, Approve, Dispatch]),
                grant(Resource::Report, &[View]),
            ],
            Role::Staff => vec![],
            Role::AfisaUgavi => vec![
                grant(Resource::PurchaseOrder, &[View, Create, Edit]),
                grant(Resource::Supplier, &[View, Create, Edit]),
                grant(Resource::Product, &[View]),
            ],
            Role::StockController => vec![
                grant(Resource::Grn, &[View, Create, Edit]),
                grant(Resource::Stock, &[View, Edit]),
                grant(Resource::Adjustment, &[View, Create]),
                grant(Resource::Product, &[View]),
            ],
            Role::SalesRep => vec![
                grant(Resource::Sale, &[View, Create]),
                grant(Resource::Customer, &[View, Create]),
                grant(Resource::Vehicle, &[View]),
                grant(Resource::Product, &[View]),
            ],
            Role::StoreManager => vec![
                grant(Resource::Transfer, &[View, Create]),
                grant(Resource::Stock, &[View]),
                grant(Resource::Vehicle, &[View, Edit]),
                grant(Resource::Sale, &[View, Dispatch]),
            ],
            Role::Accountant => vec![
                grant(Resource::Expense, &[View, Create, Edit]),
                grant(Resource::Transaction, &[View]),
                grant(Resource::Report, &[View]),
            ],
            Role::StoreKeeper => vec![
                grant(Resource::Stock, &[View]),
                grant(Resource::Sale, &[View]),
            ],
        }
    }

    /// Flattened `resource:action` keys for the role
    pub fn permission_keys(&self) -> Vec<String> {
        self.permissions()
            .iter()
            .flat_map(|p| p.actions.iter().map(move |a| permission_key(p.resource, *a)))
            .collect()
    }

    pub fn has_permission(&self, resource: Resource, action: Action) -> bool {
        self.permissions()
            .iter()
            .any(|p| p.resource == resource && p.actions.contains(&action))
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .find(|r| r.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown role: {}", s))
    }
}

/// Superusers hold every permission regardless of role
pub fn effective_permissions(role: Role, is_superuser: bool) -> Vec<String> {
    if is_superuser {
        Role::Admin.permission_keys()
    } else {
        role.permission_keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_has_everything() {
        for resource in Resource::ALL {
            for action in Action::ALL {
                assert!(Role::Admin.has_permission(resource, action));
            }
        }
    }

    #[test]
    fn test_dispatch_roles() {
        let dispatchers: Vec<Role> = Role::ALL
            .into_iter()
            .filter(|r| r.has_permission(Resource::Sale, Action::Dispatch))
            .collect();
        assert_eq!(
            dispatchers,
            vec![Role::Admin, Role::Manager, Role::StoreManager]
        );
    }

    #[test]
    fn test_staff_has_nothing() {
        assert!(Role::Staff.permission_keys().is_empty());
    }

    #[test]
    fn test_permission_keys_format() {
        let keys = Role::StoreKeeper.permission_keys();
        assert_eq!(keys, vec!["stock:view".to_string(), "sale:view".to_string()]);
    }

    #[test]
    fn test_superuser_gets_admin_permissions() {
        let keys = effective_permissions(Role::Staff, true);
        assert!(keys.contains(&"sale:dispatch".to_string()));
        assert_eq!(keys.len(), Resource::ALL.len() * Action::ALL.len());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("afisa_ugavi".parse::<Role>(), Ok(Role::AfisaUgavi));
        assert!("owner".parse::<Role>().is_err());
    }
}
