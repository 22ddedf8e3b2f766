//! Domain models for the Store Management System

mod activity;
mod finance;
mod procurement;
mod product;
mod sale;
mod stock;
mod user;
mod vehicle;

pub use activity::*;
pub use finance::*;
pub use procurement::*;
pub use product::*;
pub use sale::*;
pub use stock::*;
pub use user::*;
pub use vehicle::*;
