//! Business logic services for the Store Management System

pub mod activity;
pub mod auth;
pub mod catalog;
pub mod customer;
pub mod finance;
pub mod import;
pub mod ledger;
pub mod notification;
pub mod procurement;
pub mod reporting;
pub mod sale;
pub mod stock;
pub mod user;
pub mod vehicle;

pub use activity::ActivityService;
pub use auth::AuthService;
pub use catalog::CatalogService;
pub use customer::CustomerService;
pub use finance::FinanceService;
pub use import::ImportService;
pub use notification::NotificationService;
pub use procurement::ProcurementService;
pub use reporting::ReportingService;
pub use sale::SaleService;
pub use stock::StockService;
pub use user::UserService;
pub use vehicle::VehicleService;
