//! Administrator authorization
//!
//! A caller is an admin if an active roster row matches their Telegram id or
//! the id appears in the `ADMIN_IDS` environment allow-list. Checked fresh on
//! every gated operation; nothing is cached per session, so revoking a row
//! takes effect on the next event.

use rusqlite::Connection;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::storage::db;

pub fn is_admin(conn: &Connection, telegram_user_id: i64) -> AppResult<bool> {
    if config::admin::ADMIN_IDS.contains(&telegram_user_id) {
        return Ok(true);
    }
    Ok(db::find_active_admin(conn, telegram_user_id)?.is_some())
}

/// Errors with `Unauthorized` unless the caller is an admin
pub fn ensure_admin(conn: &Connection, telegram_user_id: i64) -> AppResult<()> {
    if is_admin(conn, telegram_user_id)? {
        Ok(())
    } else {
        Err(AppError::Unauthorized(telegram_user_id))
    }
}
