//! Database pool, schema migrations, and the wizard session store

pub mod db;
pub mod migrations;
pub mod session;

pub use db::{create_pool, get_connection, DbConnection, DbPool};
pub use session::SessionStore;
