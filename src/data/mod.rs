//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite database operations
//! - Annotated post/group queries and pagination

mod database;
mod models;
mod pagination;

pub use database::{Database, is_unique_violation};
pub use models::*;
pub use pagination::{PAGE_SIZE, Page, resolve_page};
