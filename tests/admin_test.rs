//! Tests for the administrator authorization gate

use std::sync::Arc;
use std::time::Duration;

use rusqlite::Connection;
use teloxide::types::ChatId;
use tempfile::TempDir;

use cafebot::core::AppError;
use cafebot::storage::db;
use cafebot::storage::migrations::run_migrations;
use cafebot::storage::{create_pool, SessionStore};
use cafebot::telegram::admin::{ensure_admin, is_admin};
use cafebot::telegram::wizard;
use cafebot::telegram::Bot;
use cafebot::HandlerDeps;

const ALLOWLISTED: i64 = 7001;
const ROSTERED: i64 = 5001;
const OUTSIDER: i64 = 9001;

// The allow-list is read once per process, so every test pins it before any
// config access; the snapshot is the same regardless of test order.
fn pin_allowlist() {
    std::env::set_var("ADMIN_IDS", "7001");
}

fn test_conn() -> (TempDir, Connection) {
    pin_allowlist();
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("admin_test.sqlite");
    let mut conn = Connection::open(path).expect("open database");
    run_migrations(&mut conn).expect("run migrations");
    (dir, conn)
}

#[test]
fn test_rostered_admin_is_authorized() {
    let (_dir, conn) = test_conn();
    db::insert_admin(&conn, ROSTERED, "Dana", Some("dana")).expect("insert admin");

    assert!(is_admin(&conn, ROSTERED).expect("check"));
    assert!(ensure_admin(&conn, ROSTERED).is_ok());
}

#[test]
fn test_allowlisted_admin_needs_no_roster_row() {
    let (_dir, conn) = test_conn();

    assert!(is_admin(&conn, ALLOWLISTED).expect("check"));
    assert!(ensure_admin(&conn, ALLOWLISTED).is_ok());
}

#[test]
fn test_outsider_is_denied() {
    let (_dir, conn) = test_conn();
    db::insert_admin(&conn, ROSTERED, "Dana", None).expect("insert admin");

    assert!(!is_admin(&conn, OUTSIDER).expect("check"));
    let err = ensure_admin(&conn, OUTSIDER).expect_err("outsider denied");
    assert!(matches!(err, AppError::Unauthorized(id) if id == OUTSIDER));
}

#[test]
fn test_deactivated_roster_row_is_denied() {
    let (_dir, conn) = test_conn();
    db::insert_admin(&conn, ROSTERED, "Dana", None).expect("insert admin");
    conn.execute("UPDATE admins SET active = 0 WHERE telegram_user_id = ?1", [ROSTERED])
        .expect("deactivate admin");

    assert!(!is_admin(&conn, ROSTERED).expect("check"));
    assert!(matches!(
        ensure_admin(&conn, ROSTERED),
        Err(AppError::Unauthorized(_))
    ));
}

#[test]
fn test_removed_admin_loses_access() {
    let (_dir, conn) = test_conn();
    db::insert_admin(&conn, ROSTERED, "Dana", None).expect("insert admin");
    assert!(is_admin(&conn, ROSTERED).expect("check"));

    assert!(db::remove_admin(&conn, ROSTERED).expect("remove admin"));
    assert!(!is_admin(&conn, ROSTERED).expect("check"));
}

#[tokio::test]
async fn test_denied_wizard_start_creates_no_session() {
    pin_allowlist();
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("wizard_gate.sqlite");
    let pool = create_pool(path.to_str().expect("utf8 path")).expect("create pool");

    let deps = HandlerDeps::new(
        Arc::new(pool),
        Arc::new(SessionStore::new(Duration::from_secs(60))),
    );
    // The denial happens before any API call, so the bot is never contacted.
    let bot = Bot::new("0000000000:TEST");

    let err = wizard::start(&bot, ChatId(OUTSIDER), OUTSIDER, &deps)
        .await
        .expect_err("outsider cannot start the wizard");
    assert!(matches!(err, AppError::Unauthorized(id) if id == OUTSIDER));
    assert!(deps.sessions.is_empty().await);
}
