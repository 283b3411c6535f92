//! Order aggregate operations
//!
//! All mutations run inside a `BEGIN IMMEDIATE` transaction so the
//! find-or-create of the open order, the line merge, and the total recompute
//! land atomically. Invariants held here:
//!
//! - at most one open order per user (backed by a partial unique index)
//! - line quantities never drop below 1
//! - unit prices are captured at add time and never re-read from the catalog
//! - the stored total always equals the sum of line subtotals
//! - status only moves forward: open -> confirmed -> completed

use rusqlite::{Connection, TransactionBehavior};

use crate::core::error::{AppError, AppResult};
use crate::core::types::OrderStatus;
use crate::storage::db::{self, CatalogItem, Order, OrderLine};

/// An order together with its lines, as rendered to users
#[derive(Debug, Clone)]
pub struct OrderView {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

/// Add `quantity_delta` units of an item to the caller's running open order,
/// creating the order if none exists. Duplicate items merge into one line;
/// the resulting quantity is clamped to at least 1.
///
/// Returns the item and the refreshed order so callers can render a reply
/// without further queries.
pub fn add_line(
    conn: &mut Connection,
    telegram_user_id: i64,
    item_id: i64,
    quantity_delta: i64,
) -> AppResult<(CatalogItem, OrderView)> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let item = match db::get_item(&tx, item_id)? {
        Some(item) if item.active => item,
        // Deactivated rows still have a name; use it in the reply instead
        // of the raw id from the stale button.
        Some(item) => return Err(AppError::ItemUnavailable(item.name)),
        None => return Err(AppError::ItemUnavailable(item_id.to_string())),
    };

    let order_id = find_or_create_open_order(&tx, telegram_user_id)?;
    db::upsert_order_line(&tx, order_id, item.id, quantity_delta, item.price_cents)?;
    db::recompute_total(&tx, order_id)?;

    let view = load_view(&tx, order_id)?;
    tx.commit()?;
    Ok((item, view))
}

/// Confirm an order, moving it open -> confirmed.
///
/// With `order_id = None` the caller's current open order is confirmed.
/// An explicit id must reference an order owned by the caller; anything else
/// reads as not found so order ids stay unguessable.
pub fn confirm(conn: &mut Connection, telegram_user_id: i64, order_id: Option<i64>) -> AppResult<OrderView> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let order = match order_id {
        Some(id) => db::get_order(&tx, id)?
            .filter(|o| o.telegram_user_id == telegram_user_id)
            .ok_or(AppError::OrderNotFound(id))?,
        None => db::find_open_order(&tx, telegram_user_id)?.ok_or(AppError::OrderNotFound(0))?,
    };

    transition(&tx, &order, OrderStatus::Confirmed)?;

    let view = load_view(&tx, order.id)?;
    tx.commit()?;
    Ok(view)
}

/// Complete a confirmed order (admin operation). Completing an order that is
/// still open is rejected; it must be confirmed first.
pub fn complete(conn: &mut Connection, order_id: i64) -> AppResult<OrderView> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let order = db::get_order(&tx, order_id)?.ok_or(AppError::OrderNotFound(order_id))?;
    transition(&tx, &order, OrderStatus::Completed)?;

    let view = load_view(&tx, order.id)?;
    tx.commit()?;
    Ok(view)
}

/// Cancel the caller's open order, deleting it and its lines.
/// Confirmed and completed orders cannot be cancelled.
pub fn cancel(conn: &mut Connection, telegram_user_id: i64, order_id: Option<i64>) -> AppResult<i64> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let order = match order_id {
        Some(id) => db::get_order(&tx, id)?
            .filter(|o| o.telegram_user_id == telegram_user_id)
            .ok_or(AppError::OrderNotFound(id))?,
        None => db::find_open_order(&tx, telegram_user_id)?.ok_or(AppError::OrderNotFound(0))?,
    };

    if order.status != OrderStatus::Open {
        return Err(AppError::InvalidTransition {
            from: order.status,
            to: OrderStatus::Open,
        });
    }

    db::delete_order(&tx, order.id)?;
    tx.commit()?;
    Ok(order.id)
}

/// The caller's current open order with lines, if any
pub fn current_order(conn: &Connection, telegram_user_id: i64) -> AppResult<Option<OrderView>> {
    match db::find_open_order(conn, telegram_user_id)? {
        Some(order) => {
            let lines = db::order_lines(conn, order.id)?;
            Ok(Some(OrderView { order, lines }))
        }
        None => Ok(None),
    }
}

fn transition(conn: &Connection, order: &Order, to: OrderStatus) -> AppResult<()> {
    if !order.status.can_transition_to(to) {
        return Err(AppError::InvalidTransition {
            from: order.status,
            to,
        });
    }
    db::set_order_status(conn, order.id, to)?;
    Ok(())
}

fn load_view(conn: &Connection, order_id: i64) -> AppResult<OrderView> {
    let order = db::get_order(conn, order_id)?.ok_or(AppError::OrderNotFound(order_id))?;
    let lines = db::order_lines(conn, order_id)?;
    Ok(OrderView { order, lines })
}

/// Atomic find-or-create of the single open order.
///
/// Delivery is at-least-once, so two adds can race here. The insert path
/// loses to the partial unique index and falls back to re-reading the row
/// the winner created.
fn find_or_create_open_order(conn: &Connection, telegram_user_id: i64) -> AppResult<i64> {
    if let Some(order) = db::find_open_order(conn, telegram_user_id)? {
        return Ok(order.id);
    }

    match db::insert_open_order(conn, telegram_user_id) {
        Ok(id) => Ok(id),
        Err(err) if is_constraint_violation(&err) => match db::find_open_order(conn, telegram_user_id)? {
            Some(order) => Ok(order.id),
            None => Err(err.into()),
        },
        Err(err) => Err(err.into()),
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
