use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension};

use crate::core::error::AppResult;
use crate::core::types::OrderStatus;

/// A sellable catalog entry
#[derive(Debug, Clone)]
pub struct CatalogItem {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Price in minor units (cents)
    pub price_cents: i64,
    pub photo_url: Option<String>,
    pub active: bool,
}

/// A customer order
#[derive(Debug, Clone)]
pub struct Order {
    pub id: i64,
    pub telegram_user_id: i64,
    pub status: OrderStatus,
    /// Derived sum of line subtotals, refreshed on every mutation
    pub total_cents: i64,
    pub created_at: String,
}

/// One line of an order. Carries the unit price captured at add time so later
/// catalog edits never change a placed order.
#[derive(Debug, Clone)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub menu_item_id: i64,
    pub item_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl OrderLine {
    pub fn subtotal_cents(&self) -> i64 {
        self.quantity * self.unit_price_cents
    }
}

/// An administrator roster entry
#[derive(Debug, Clone, serde::Serialize)]
pub struct Admin {
    pub id: i64,
    pub telegram_user_id: i64,
    pub name: String,
    pub nickname: Option<String>,
    pub active: bool,
}

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool
///
/// Initializes a connection pool with up to 10 connections and runs schema
/// migrations on the first connection. Foreign keys are enabled per connection
/// so order-line cascade deletes work.
pub fn create_pool(database_path: &str) -> anyhow::Result<DbPool> {
    let manager = SqliteConnectionManager::file(database_path)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    let pool = Pool::builder().max_size(10).build(manager)?;

    let mut conn = pool.get()?;
    super::migrations::run_migrations(&mut conn)?;

    Ok(pool)
}

/// Get a connection from the pool
///
/// The connection is automatically returned to the pool when dropped.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

fn map_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<CatalogItem> {
    Ok(CatalogItem {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price_cents: row.get(3)?,
        photo_url: row.get(4)?,
        active: row.get::<_, i64>(5)? != 0,
    })
}

fn map_order(row: &rusqlite::Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        id: row.get(0)?,
        telegram_user_id: row.get(1)?,
        status: row.get(2)?,
        total_cents: row.get(3)?,
        created_at: row.get(4)?,
    })
}

const ITEM_COLUMNS: &str = "id, name, description, price_cents, photo_url, active";
const ORDER_COLUMNS: &str = "id, telegram_user_id, status, total_cents, created_at";

/// Insert a new active catalog item, returns its id
pub fn insert_item(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
    price_cents: i64,
    photo_url: Option<&str>,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO menu_items (name, description, price_cents, photo_url, active) VALUES (?1, ?2, ?3, ?4, 1)",
        rusqlite::params![name, description, price_cents, photo_url],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_item(conn: &Connection, id: i64) -> AppResult<Option<CatalogItem>> {
    let item = conn
        .query_row(
            &format!("SELECT {} FROM menu_items WHERE id = ?1", ITEM_COLUMNS),
            [id],
            map_item,
        )
        .optional()?;
    Ok(item)
}

/// Case-insensitive lookup of an active item by name (for `/order <name>`)
pub fn get_active_item_by_name(conn: &Connection, name: &str) -> AppResult<Option<CatalogItem>> {
    let item = conn
        .query_row(
            &format!(
                "SELECT {} FROM menu_items WHERE active = 1 AND name = ?1 COLLATE NOCASE LIMIT 1",
                ITEM_COLUMNS
            ),
            [name],
            map_item,
        )
        .optional()?;
    Ok(item)
}

pub fn list_active_items(conn: &Connection) -> AppResult<Vec<CatalogItem>> {
    let items = conn.query_and_collect(&format!(
        "SELECT {} FROM menu_items WHERE active = 1 ORDER BY name",
        ITEM_COLUMNS
    ))?;
    Ok(items)
}

pub fn list_all_items(conn: &Connection) -> AppResult<Vec<CatalogItem>> {
    let items = conn.query_and_collect(&format!("SELECT {} FROM menu_items ORDER BY name", ITEM_COLUMNS))?;
    Ok(items)
}

/// Flip the active flag. Returns the new state, or None if no such item.
pub fn toggle_item_active(conn: &Connection, id: i64) -> AppResult<Option<bool>> {
    let changed = conn.execute("UPDATE menu_items SET active = 1 - active WHERE id = ?1", [id])?;
    if changed == 0 {
        return Ok(None);
    }
    let active: i64 = conn.query_row("SELECT active FROM menu_items WHERE id = ?1", [id], |row| row.get(0))?;
    Ok(Some(active != 0))
}

pub fn find_open_order(conn: &Connection, telegram_user_id: i64) -> AppResult<Option<Order>> {
    let order = conn
        .query_row(
            &format!(
                "SELECT {} FROM orders WHERE telegram_user_id = ?1 AND status = 'open'",
                ORDER_COLUMNS
            ),
            [telegram_user_id],
            map_order,
        )
        .optional()?;
    Ok(order)
}

/// Insert a fresh open order. The partial unique index on
/// (telegram_user_id, status='open') makes the concurrent-create race lose
/// with a constraint violation; callers re-read on that error.
pub fn insert_open_order(conn: &Connection, telegram_user_id: i64) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO orders (telegram_user_id, status, total_cents) VALUES (?1, 'open', 0)",
        [telegram_user_id],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_order(conn: &Connection, order_id: i64) -> AppResult<Option<Order>> {
    let order = conn
        .query_row(
            &format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLUMNS),
            [order_id],
            map_order,
        )
        .optional()?;
    Ok(order)
}

/// Merge a quantity delta into an order line, creating the line if absent.
/// Quantity is clamped to >= 1 on both paths, so a "-1" press on a fresh item
/// still yields one unit and decrements never remove the line.
pub fn upsert_order_line(
    conn: &Connection,
    order_id: i64,
    menu_item_id: i64,
    quantity_delta: i64,
    unit_price_cents: i64,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO order_items (order_id, menu_item_id, quantity, unit_price_cents)
         VALUES (?1, ?2, MAX(1, ?3), ?4)
         ON CONFLICT (order_id, menu_item_id)
         DO UPDATE SET quantity = MAX(1, quantity + ?3)",
        rusqlite::params![order_id, menu_item_id, quantity_delta, unit_price_cents],
    )?;
    Ok(())
}

pub fn order_lines(conn: &Connection, order_id: i64) -> AppResult<Vec<OrderLine>> {
    let mut stmt = conn.prepare(
        "SELECT oi.id, oi.order_id, oi.menu_item_id, mi.name, oi.quantity, oi.unit_price_cents
         FROM order_items oi
         JOIN menu_items mi ON mi.id = oi.menu_item_id
         WHERE oi.order_id = ?1
         ORDER BY oi.id",
    )?;
    let lines = stmt
        .query_map([order_id], |row| {
            Ok(OrderLine {
                id: row.get(0)?,
                order_id: row.get(1)?,
                menu_item_id: row.get(2)?,
                item_name: row.get(3)?,
                quantity: row.get(4)?,
                unit_price_cents: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines)
}

/// Recompute the stored order total from line subtotals, returns the new total
pub fn recompute_total(conn: &Connection, order_id: i64) -> AppResult<i64> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(quantity * unit_price_cents), 0) FROM order_items WHERE order_id = ?1",
        [order_id],
        |row| row.get(0),
    )?;
    conn.execute(
        "UPDATE orders SET total_cents = ?1 WHERE id = ?2",
        rusqlite::params![total, order_id],
    )?;
    Ok(total)
}

pub fn set_order_status(conn: &Connection, order_id: i64, status: OrderStatus) -> AppResult<()> {
    conn.execute(
        "UPDATE orders SET status = ?1 WHERE id = ?2",
        rusqlite::params![status, order_id],
    )?;
    Ok(())
}

/// Delete an order; its lines go with it via cascade
pub fn delete_order(conn: &Connection, order_id: i64) -> AppResult<()> {
    conn.execute("DELETE FROM orders WHERE id = ?1", [order_id])?;
    Ok(())
}

/// Most recent orders first, for the admin panel
pub fn recent_orders(conn: &Connection, limit: usize) -> AppResult<Vec<Order>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM orders ORDER BY id DESC LIMIT ?1",
        ORDER_COLUMNS
    ))?;
    let orders = stmt
        .query_map([limit as i64], map_order)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(orders)
}

fn map_admin(row: &rusqlite::Row<'_>) -> rusqlite::Result<Admin> {
    Ok(Admin {
        id: row.get(0)?,
        telegram_user_id: row.get(1)?,
        name: row.get(2)?,
        nickname: row.get(3)?,
        active: row.get::<_, i64>(4)? != 0,
    })
}

const ADMIN_COLUMNS: &str = "id, telegram_user_id, name, nickname, active";

pub fn find_active_admin(conn: &Connection, telegram_user_id: i64) -> AppResult<Option<Admin>> {
    let admin = conn
        .query_row(
            &format!(
                "SELECT {} FROM admins WHERE telegram_user_id = ?1 AND active = 1",
                ADMIN_COLUMNS
            ),
            [telegram_user_id],
            map_admin,
        )
        .optional()?;
    Ok(admin)
}

pub fn find_admin(conn: &Connection, telegram_user_id: i64) -> AppResult<Option<Admin>> {
    let admin = conn
        .query_row(
            &format!("SELECT {} FROM admins WHERE telegram_user_id = ?1", ADMIN_COLUMNS),
            [telegram_user_id],
            map_admin,
        )
        .optional()?;
    Ok(admin)
}

pub fn insert_admin(conn: &Connection, telegram_user_id: i64, name: &str, nickname: Option<&str>) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO admins (telegram_user_id, name, nickname, active) VALUES (?1, ?2, ?3, 1)",
        rusqlite::params![telegram_user_id, name, nickname],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Remove an admin by Telegram id, returns whether a row was deleted
pub fn remove_admin(conn: &Connection, telegram_user_id: i64) -> AppResult<bool> {
    let changed = conn.execute("DELETE FROM admins WHERE telegram_user_id = ?1", [telegram_user_id])?;
    Ok(changed > 0)
}

pub fn list_admins(conn: &Connection) -> AppResult<Vec<Admin>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM admins ORDER BY id", ADMIN_COLUMNS))?;
    let admins = stmt.query_map([], map_admin)?.collect::<Result<Vec<_>, _>>()?;
    Ok(admins)
}

/// Telegram ids of every active admin, for order notifications
pub fn active_admin_ids(conn: &Connection) -> AppResult<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT telegram_user_id FROM admins WHERE active = 1")?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

// Small extension so list queries stay one-liners above.
trait QueryAndCollect {
    fn query_and_collect(&self, sql: &str) -> rusqlite::Result<Vec<CatalogItem>>;
}

impl QueryAndCollect for Connection {
    fn query_and_collect(&self, sql: &str) -> rusqlite::Result<Vec<CatalogItem>> {
        let mut stmt = self.prepare(sql)?;
        let items = stmt.query_map([], map_item)?.collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }
}
