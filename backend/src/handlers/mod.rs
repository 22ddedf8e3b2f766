//! HTTP request handlers

pub mod activity;
pub mod auth;
pub mod catalog;
pub mod customer;
pub mod finance;
pub mod health;
pub mod import;
pub mod procurement;
pub mod reporting;
pub mod sale;
pub mod stock;
pub mod user;
pub mod vehicle;
pub mod ws;

pub use activity::*;
pub use auth::*;
pub use catalog::*;
pub use customer::*;
pub use finance::*;
pub use health::*;
pub use import::*;
pub use procurement::*;
pub use reporting::*;
pub use sale::*;
pub use stock::*;
pub use user::*;
pub use vehicle::*;
pub use ws::*;
