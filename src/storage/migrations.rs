//! Embedded schema migrations
//!
//! Migration SQL lives in `migrations/` and is compiled into the binary.
//! Refinery runs each file in its own transaction and records it in its
//! history table, so rerunning against an up-to-date database is a no-op.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::time::Duration;

mod embedded {
    use refinery::embed_migrations;

    embed_migrations!("./migrations");
}

/// Brings the schema up to date. Called once from `create_pool` before the
/// pool is handed out.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    // An operator may run a CLI roster command while the bot holds the file;
    // wait out the lock instead of failing the command.
    conn.busy_timeout(Duration::from_secs(30))
        .context("set SQLite busy timeout")?;

    let report = embedded::migrations::runner()
        .run(conn)
        .context("apply schema migrations")?;
    for migration in report.applied_migrations() {
        log::info!("Applied migration: {}", migration);
    }

    Ok(())
}
