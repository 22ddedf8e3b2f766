//! Route definitions for the Store Management System

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Upload limit for spreadsheet imports
const IMPORT_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/auth/me", get(handlers::current_account))
        .nest("/branches", branch_routes())
        .nest("/categories", category_routes())
        .nest("/products", product_routes())
        .nest("/stocks", stock_routes())
        .route(
            "/stock-adjustments",
            get(handlers::list_adjustments).post(handlers::create_adjustment),
        )
        .route(
            "/transfers",
            get(handlers::list_transfers).post(handlers::create_transfer),
        )
        .nest("/suppliers", supplier_routes())
        .route(
            "/purchases",
            get(handlers::list_purchases).post(handlers::create_purchase),
        )
        .nest("/purchase-orders", purchase_order_routes())
        .nest("/grns", grn_routes())
        .nest("/customers", customer_routes())
        .nest("/vehicles", vehicle_routes())
        .nest("/sales", sale_routes())
        .route("/sale-items", get(handlers::list_sale_items))
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .nest("/expenses", expense_routes())
        .nest("/expense-categories", expense_category_routes())
        .nest("/users", user_routes())
        .route("/roles", get(handlers::list_roles))
        .route("/permissions", get(handlers::list_permissions))
        .route("/activities", get(handlers::list_activities))
        .nest("/reports", report_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh))
        .merge(protected)
}

/// Realtime notification sockets. Both paths carry the same event stream.
pub fn ws_routes() -> Router<AppState> {
    Router::new()
        .route("/stock", get(handlers::notifications_socket))
        .route("/stock/", get(handlers::notifications_socket))
        .route("/inventory", get(handlers::notifications_socket))
        .route("/inventory/", get(handlers::notifications_socket))
}

fn branch_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_branches).post(handlers::create_branch))
        .route(
            "/:branch_id",
            get(handlers::get_branch)
                .put(handlers::update_branch)
                .delete(handlers::delete_branch),
        )
}

fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_categories).post(handlers::create_category))
        .route(
            "/:category_id",
            get(handlers::get_category)
                .put(handlers::update_category)
                .delete(handlers::delete_category),
        )
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route(
            "/import",
            post(handlers::import_products).layer(DefaultBodyLimit::max(IMPORT_BODY_LIMIT)),
        )
        .route("/import/template", get(handlers::product_import_template))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
}

fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock))
        .route(
            "/:stock_id",
            get(handlers::get_stock).patch(handlers::update_stock),
        )
        .route("/:stock_id/movements", get(handlers::list_stock_movements))
}

fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_suppliers).post(handlers::create_supplier))
        .route(
            "/:supplier_id",
            get(handlers::get_supplier)
                .put(handlers::update_supplier)
                .delete(handlers::delete_supplier),
        )
}

fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_purchase_orders).post(handlers::create_purchase_order),
        )
        .route(
            "/:order_id",
            get(handlers::get_purchase_order)
                .put(handlers::update_purchase_order)
                .delete(handlers::delete_purchase_order),
        )
        .route("/:order_id/add_item", post(handlers::add_purchase_order_item))
}

fn grn_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_grns).post(handlers::create_grn))
        .route("/:grn_id", get(handlers::get_grn))
        .route("/:grn_id/add_item", post(handlers::add_grn_item))
}

fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_customers).post(handlers::create_customer))
        .route(
            "/import",
            post(handlers::import_customers).layer(DefaultBodyLimit::max(IMPORT_BODY_LIMIT)),
        )
        .route("/import/template", get(handlers::customer_import_template))
        .route(
            "/:customer_id",
            get(handlers::get_customer)
                .put(handlers::update_customer)
                .delete(handlers::delete_customer),
        )
}

fn vehicle_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_vehicles).post(handlers::create_vehicle))
        .route(
            "/:vehicle_id",
            get(handlers::get_vehicle)
                .put(handlers::update_vehicle)
                .delete(handlers::delete_vehicle),
        )
        .route("/:vehicle_id/return_vehicle", post(handlers::return_vehicle))
}

fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::create_sale))
        .route(
            "/:sale_id",
            get(handlers::get_sale).delete(handlers::delete_sale),
        )
        .route("/:sale_id/approve", post(handlers::approve_sale))
        .route("/:sale_id/decline", post(handlers::decline_sale))
        .route("/:sale_id/dispatch_order", post(handlers::dispatch_sale))
        .route("/:sale_id/receipt", get(handlers::get_receipt))
        .route("/:sale_id/delivery_note", get(handlers::get_delivery_note))
}

fn expense_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_expenses).post(handlers::create_expense))
        .route("/:expense_id", axum::routing::delete(handlers::delete_expense))
}

fn expense_category_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_expense_categories).post(handlers::create_expense_category),
        )
        .route(
            "/:category_id",
            axum::routing::delete(handlers::delete_expense_category),
        )
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/:user_id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
}

fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/abc", get(handlers::get_abc_analysis))
        .route("/aging", get(handlers::get_inventory_aging))
        .route("/commissions", get(handlers::get_commission_report))
        .route("/dashboard", get(handlers::get_dashboard))
}
