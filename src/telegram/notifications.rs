//! Best-effort notifications to admins and customers
//!
//! Delivery failures here are logged and swallowed: a blocked admin or a
//! closed chat must never fail the order operation that triggered the notice.

use std::collections::HashSet;

use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::core::config;
use crate::core::money::format_cents;
use crate::core::orders::OrderView;
use crate::storage::db;
use crate::storage::DbPool;
use crate::telegram::menu::render_order;
use crate::telegram::Bot;

/// Everyone who should hear about new orders: active roster rows plus the
/// static allow-list, deduplicated.
fn notification_targets(db_pool: &DbPool) -> Vec<i64> {
    let mut targets: HashSet<i64> = config::admin::ADMIN_IDS.iter().copied().collect();
    match db::get_connection(db_pool) {
        Ok(conn) => match db::active_admin_ids(&conn) {
            Ok(ids) => targets.extend(ids),
            Err(e) => log::error!("Failed to load admin ids for notification: {}", e),
        },
        Err(e) => log::error!("Failed to get DB connection for notification: {}", e),
    }
    targets.into_iter().collect()
}

/// Tells every admin a customer confirmed an order.
pub async fn notify_admins_order_confirmed(bot: &Bot, db_pool: &DbPool, view: &OrderView) {
    let text = format!(
        "🔔 New confirmed order!\n\n{}\n\nComplete with /complete {}",
        render_order(view),
        view.order.id
    );

    for admin_id in notification_targets(db_pool) {
        // The customer may be an admin too; they already got a reply.
        if admin_id == view.order.telegram_user_id {
            continue;
        }
        if let Err(e) = bot
            .send_message(ChatId(admin_id), text.clone())
            .parse_mode(ParseMode::Html)
            .await
        {
            log::warn!("Failed to notify admin {} about order {}: {}", admin_id, view.order.id, e);
        }
    }
}

/// Tells the customer their order is ready.
pub async fn notify_customer_completed(bot: &Bot, view: &OrderView) {
    let text = format!(
        "🎉 Your order #{} is ready! Total: ${}. Enjoy!",
        view.order.id,
        format_cents(view.order.total_cents)
    );
    if let Err(e) = bot.send_message(ChatId(view.order.telegram_user_id), text).await {
        log::warn!(
            "Failed to notify customer {} about order {}: {}",
            view.order.telegram_user_id,
            view.order.id,
            e
        );
    }
}
