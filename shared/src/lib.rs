//! Shared types and models for the Store Management System
//!
//! This crate holds the domain rules that do not need a database: order
//! status transitions, line pricing, payment status, dispatch planning,
//! import row parsing, report classification and the realtime event payloads.

pub mod dispatch;
pub mod error;
pub mod events;
pub mod import;
pub mod models;
pub mod reports;
pub mod types;
pub mod validation;

pub use dispatch::*;
pub use error::*;
pub use events::*;
pub use models::*;
pub use reports::*;
pub use types::*;
pub use validation::*;
