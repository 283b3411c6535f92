//! Integration tests for the order aggregate against a real SQLite file

use pretty_assertions::assert_eq;
use rusqlite::Connection;
use tempfile::TempDir;

use cafebot::core::orders;
use cafebot::core::{AppError, OrderStatus};
use cafebot::storage::db;
use cafebot::storage::migrations::run_migrations;

const ALICE: i64 = 1001;
const BOB: i64 = 1002;

fn test_conn() -> (TempDir, Connection) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("orders_test.sqlite");
    let mut conn = Connection::open(path).expect("open database");
    conn.execute_batch("PRAGMA foreign_keys = ON;").expect("enable foreign keys");
    run_migrations(&mut conn).expect("run migrations");
    (dir, conn)
}

fn seed_item(conn: &Connection, name: &str, price_cents: i64) -> i64 {
    db::insert_item(conn, name, None, price_cents, None).expect("insert item")
}

#[test]
fn test_add_line_creates_open_order() {
    let (_dir, mut conn) = test_conn();
    let latte = seed_item(&conn, "Latte", 350);

    let (item, view) = orders::add_line(&mut conn, ALICE, latte, 1).expect("add line");

    assert_eq!(item.name, "Latte");
    assert_eq!(view.order.telegram_user_id, ALICE);
    assert_eq!(view.order.status, OrderStatus::Open);
    assert_eq!(view.order.total_cents, 350);
    assert_eq!(view.lines.len(), 1);
    assert_eq!(view.lines[0].quantity, 1);
    assert_eq!(view.lines[0].unit_price_cents, 350);
}

#[test]
fn test_repeated_adds_reuse_the_same_open_order() {
    let (_dir, mut conn) = test_conn();
    let latte = seed_item(&conn, "Latte", 350);
    let scone = seed_item(&conn, "Scone", 250);

    let (_, first) = orders::add_line(&mut conn, ALICE, latte, 1).expect("add latte");
    let (_, second) = orders::add_line(&mut conn, ALICE, scone, 1).expect("add scone");

    assert_eq!(first.order.id, second.order.id);
    assert_eq!(second.lines.len(), 2);
    assert_eq!(second.order.total_cents, 600);

    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM orders WHERE telegram_user_id = ?1",
            [ALICE],
            |row| row.get(0),
        )
        .expect("count orders");
    assert_eq!(count, 1);
}

#[test]
fn test_duplicate_item_merges_into_one_line() {
    let (_dir, mut conn) = test_conn();
    let latte = seed_item(&conn, "Latte", 350);

    orders::add_line(&mut conn, ALICE, latte, 2).expect("add two");
    let (_, view) = orders::add_line(&mut conn, ALICE, latte, 3).expect("add three more");

    assert_eq!(view.lines.len(), 1);
    assert_eq!(view.lines[0].quantity, 5);
    assert_eq!(view.order.total_cents, 5 * 350);
}

#[test]
fn test_quantity_clamps_at_one() {
    let (_dir, mut conn) = test_conn();
    let latte = seed_item(&conn, "Latte", 350);

    // A decrement on an item not yet in the cart still yields one unit.
    let (_, view) = orders::add_line(&mut conn, ALICE, latte, -1).expect("decrement fresh item");
    assert_eq!(view.lines[0].quantity, 1);

    // Decrementing past the floor holds at one instead of removing the line.
    let (_, view) = orders::add_line(&mut conn, ALICE, latte, -5).expect("decrement below floor");
    assert_eq!(view.lines.len(), 1);
    assert_eq!(view.lines[0].quantity, 1);
    assert_eq!(view.order.total_cents, 350);
}

#[test]
fn test_unit_price_is_snapshotted_at_add_time() {
    let (_dir, mut conn) = test_conn();
    let latte = seed_item(&conn, "Latte", 350);

    orders::add_line(&mut conn, ALICE, latte, 1).expect("add at old price");

    conn.execute("UPDATE menu_items SET price_cents = 999 WHERE id = ?1", [latte])
        .expect("raise price");
    db::toggle_item_active(&conn, latte).expect("deactivate item");

    let view = orders::current_order(&conn, ALICE)
        .expect("load order")
        .expect("order exists");
    assert_eq!(view.lines[0].unit_price_cents, 350);
    assert_eq!(view.order.total_cents, 350);
}

#[test]
fn test_inactive_item_cannot_be_added() {
    let (_dir, mut conn) = test_conn();
    let latte = seed_item(&conn, "Latte", 350);
    db::toggle_item_active(&conn, latte).expect("deactivate item");

    // A deactivated item is reported by name, not by the stale button's id.
    let err = orders::add_line(&mut conn, ALICE, latte, 1).expect_err("inactive item rejected");
    match err {
        AppError::ItemUnavailable(what) => assert_eq!(what, "Latte"),
        other => panic!("unexpected error: {}", other),
    }

    let err = orders::add_line(&mut conn, ALICE, 9999, 1).expect_err("missing item rejected");
    match err {
        AppError::ItemUnavailable(what) => assert_eq!(what, "9999"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_confirm_then_complete() {
    let (_dir, mut conn) = test_conn();
    let latte = seed_item(&conn, "Latte", 350);
    let (_, view) = orders::add_line(&mut conn, ALICE, latte, 1).expect("add line");
    let order_id = view.order.id;

    let confirmed = orders::confirm(&mut conn, ALICE, None).expect("confirm");
    assert_eq!(confirmed.order.status, OrderStatus::Confirmed);

    // A confirmed order no longer counts as the user's current order.
    assert!(orders::current_order(&conn, ALICE).expect("load").is_none());

    let completed = orders::complete(&mut conn, order_id).expect("complete");
    assert_eq!(completed.order.status, OrderStatus::Completed);
}

#[test]
fn test_complete_requires_confirmed() {
    let (_dir, mut conn) = test_conn();
    let latte = seed_item(&conn, "Latte", 350);
    let (_, view) = orders::add_line(&mut conn, ALICE, latte, 1).expect("add line");

    let err = orders::complete(&mut conn, view.order.id).expect_err("open order cannot complete");
    assert!(matches!(
        err,
        AppError::InvalidTransition {
            from: OrderStatus::Open,
            to: OrderStatus::Completed,
        }
    ));
}

#[test]
fn test_confirm_twice_is_rejected() {
    let (_dir, mut conn) = test_conn();
    let latte = seed_item(&conn, "Latte", 350);
    let (_, view) = orders::add_line(&mut conn, ALICE, latte, 1).expect("add line");
    let order_id = view.order.id;

    orders::confirm(&mut conn, ALICE, None).expect("first confirm");
    let err = orders::confirm(&mut conn, ALICE, Some(order_id)).expect_err("second confirm rejected");
    assert!(matches!(
        err,
        AppError::InvalidTransition {
            from: OrderStatus::Confirmed,
            to: OrderStatus::Confirmed,
        }
    ));
}

#[test]
fn test_confirm_without_open_order() {
    let (_dir, mut conn) = test_conn();

    let err = orders::confirm(&mut conn, ALICE, None).expect_err("nothing to confirm");
    assert!(matches!(err, AppError::OrderNotFound(0)));
}

#[test]
fn test_confirm_enforces_ownership() {
    let (_dir, mut conn) = test_conn();
    let latte = seed_item(&conn, "Latte", 350);
    let (_, view) = orders::add_line(&mut conn, ALICE, latte, 1).expect("add line");

    // Bob referencing Alice's order id reads as not found, not as forbidden.
    let err = orders::confirm(&mut conn, BOB, Some(view.order.id)).expect_err("foreign order hidden");
    assert!(matches!(err, AppError::OrderNotFound(_)));
}

#[test]
fn test_cancel_deletes_open_order_and_lines() {
    let (_dir, mut conn) = test_conn();
    let latte = seed_item(&conn, "Latte", 350);
    let (_, view) = orders::add_line(&mut conn, ALICE, latte, 2).expect("add line");
    let order_id = view.order.id;

    let cancelled_id = orders::cancel(&mut conn, ALICE, None).expect("cancel");
    assert_eq!(cancelled_id, order_id);
    assert!(db::get_order(&conn, order_id).expect("lookup").is_none());

    let line_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM order_items WHERE order_id = ?1", [order_id], |row| {
            row.get(0)
        })
        .expect("count lines");
    assert_eq!(line_count, 0);
}

#[test]
fn test_cancel_rejects_confirmed_order() {
    let (_dir, mut conn) = test_conn();
    let latte = seed_item(&conn, "Latte", 350);
    let (_, view) = orders::add_line(&mut conn, ALICE, latte, 1).expect("add line");
    orders::confirm(&mut conn, ALICE, None).expect("confirm");

    let err = orders::cancel(&mut conn, ALICE, Some(view.order.id)).expect_err("confirmed order kept");
    assert!(matches!(
        err,
        AppError::InvalidTransition {
            from: OrderStatus::Confirmed,
            to: OrderStatus::Open,
        }
    ));
}

#[test]
fn test_new_open_order_after_confirmation() {
    let (_dir, mut conn) = test_conn();
    let latte = seed_item(&conn, "Latte", 350);

    let (_, first) = orders::add_line(&mut conn, ALICE, latte, 1).expect("add line");
    orders::confirm(&mut conn, ALICE, None).expect("confirm");

    // The next add starts a fresh order; the one-open-per-user index only
    // constrains open orders.
    let (_, second) = orders::add_line(&mut conn, ALICE, latte, 1).expect("add after confirm");
    assert_ne!(first.order.id, second.order.id);
    assert_eq!(second.order.status, OrderStatus::Open);
}

#[test]
fn test_stored_total_matches_line_sum() {
    let (_dir, mut conn) = test_conn();
    let latte = seed_item(&conn, "Latte", 350);
    let scone = seed_item(&conn, "Scone", 250);

    orders::add_line(&mut conn, ALICE, latte, 3).expect("add lattes");
    orders::add_line(&mut conn, ALICE, scone, 2).expect("add scones");
    let (_, view) = orders::add_line(&mut conn, ALICE, latte, -1).expect("drop a latte");

    let line_sum: i64 = view.lines.iter().map(|line| line.subtotal_cents()).sum();
    assert_eq!(view.order.total_cents, line_sum);
    assert_eq!(view.order.total_cents, 2 * 350 + 2 * 250);
}

#[test]
fn test_orders_are_isolated_per_user() {
    let (_dir, mut conn) = test_conn();
    let latte = seed_item(&conn, "Latte", 350);

    orders::add_line(&mut conn, ALICE, latte, 1).expect("alice adds");
    orders::add_line(&mut conn, BOB, latte, 2).expect("bob adds");

    let alice = orders::current_order(&conn, ALICE).expect("load").expect("exists");
    let bob = orders::current_order(&conn, BOB).expect("load").expect("exists");

    assert_ne!(alice.order.id, bob.order.id);
    assert_eq!(alice.order.total_cents, 350);
    assert_eq!(bob.order.total_cents, 700);
}
