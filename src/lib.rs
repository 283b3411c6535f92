//! Cafebot - Telegram ordering assistant for a small cafe
//!
//! This library provides the full bot: event classification and routing,
//! the order aggregate, the add-item wizard, and admin tooling.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, money, and the order domain
//! - `storage`: Database pool, migrations, and the wizard session store
//! - `telegram`: Bot integration, routing, and rendering

pub mod cli;
pub mod core;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult};
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
pub use telegram::{create_bot, schema, HandlerDeps};
