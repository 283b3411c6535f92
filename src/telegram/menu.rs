//! Keyboards and rendered views: main menu, browse cards, cart, admin panel
//!
//! Text building is split from sending so the rendering logic stays testable.
//! All outbound text uses Telegram HTML parse mode; user-controlled strings go
//! through `escape_html`.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, InputFile, ParseMode};

use crate::core::config;
use crate::core::money::format_cents;
use crate::core::orders::OrderView;
use crate::storage::db::{Admin, CatalogItem, Order};
use crate::telegram::{cb, escape_html, Bot};

/// Main menu text and keyboard. The admin panel row only shows for admins.
pub fn main_menu(is_admin: bool) -> (String, InlineKeyboardMarkup) {
    let text = "👋 Welcome to the cafe!\nWhat would you like to do?".to_string();

    let mut rows = vec![
        vec![cb("☕ Browse the menu", "menu-nav:customer")],
        vec![cb("🛒 My order", "order-action:view")],
    ];
    if is_admin {
        rows.push(vec![cb("🛠 Admin panel", "menu-nav:admin")]);
    }

    (text, InlineKeyboardMarkup::new(rows))
}

pub async fn show_main_menu(bot: &Bot, chat_id: ChatId, is_admin: bool) -> Result<(), teloxide::RequestError> {
    let (text, keyboard) = main_menu(is_admin);
    bot.send_message(chat_id, text).reply_markup(keyboard).await?;
    Ok(())
}

/// Caption for one browse card
pub fn item_caption(item: &CatalogItem) -> String {
    let mut caption = format!(
        "<b>{}</b> — ${}",
        escape_html(&item.name),
        format_cents(item.price_cents)
    );
    if let Some(ref description) = item.description {
        caption.push('\n');
        caption.push_str(&escape_html(description));
    }
    caption
}

fn item_keyboard(item: &CatalogItem) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        cb("➖", format!("catalog-qty:{}:-1", item.id)),
        cb("🛒 Add", format!("catalog-add:{}", item.id)),
        cb("➕", format!("catalog-qty:{}:1", item.id)),
    ]])
}

/// Sends one photo card per active item, then a back-to-menu prompt.
/// Items without a photo get the configured placeholder image.
pub async fn show_customer_menu(
    bot: &Bot,
    chat_id: ChatId,
    items: &[CatalogItem],
) -> Result<(), teloxide::RequestError> {
    if items.is_empty() {
        bot.send_message(chat_id, "😔 The menu is empty right now. Check back soon!")
            .reply_markup(InlineKeyboardMarkup::new(vec![vec![cb("⬅️ Back", "menu-nav:main")]]))
            .await?;
        return Ok(());
    }

    for item in items {
        let photo = item
            .photo_url
            .as_deref()
            .and_then(|raw| url::Url::parse(raw).ok())
            .or_else(|| url::Url::parse(&config::PLACEHOLDER_IMAGE_URL).ok());

        match photo {
            Some(url) => {
                bot.send_photo(chat_id, InputFile::url(url))
                    .caption(item_caption(item))
                    .parse_mode(ParseMode::Html)
                    .reply_markup(item_keyboard(item))
                    .await?;
            }
            None => {
                // Placeholder URL misconfigured; degrade to a text card.
                bot.send_message(chat_id, item_caption(item))
                    .parse_mode(ParseMode::Html)
                    .reply_markup(item_keyboard(item))
                    .await?;
            }
        }
    }

    bot.send_message(chat_id, "Anything else?")
        .reply_markup(InlineKeyboardMarkup::new(vec![vec![
            cb("🛒 My order", "order-action:view"),
            cb("⬅️ Back", "menu-nav:main"),
        ]]))
        .await?;
    Ok(())
}

/// Cart text: one line per item plus the stored total
pub fn render_order(view: &OrderView) -> String {
    let mut text = format!("🛒 <b>Order #{}</b> ({})\n\n", view.order.id, view.order.status.display_name());
    for line in &view.lines {
        text.push_str(&format!(
            "• {} ×{} = ${}\n",
            escape_html(&line.item_name),
            line.quantity,
            format_cents(line.subtotal_cents())
        ));
    }
    text.push_str(&format!("\n<b>Total: ${}</b>", format_cents(view.order.total_cents)));
    text
}

/// Sends the cart view, or an empty-cart nudge with browse buttons.
pub async fn show_current_order(
    bot: &Bot,
    chat_id: ChatId,
    view: Option<&OrderView>,
) -> Result<(), teloxide::RequestError> {
    let Some(view) = view else {
        bot.send_message(chat_id, "🛒 Your order is empty.")
            .reply_markup(InlineKeyboardMarkup::new(vec![vec![
                cb("☕ Browse the menu", "menu-nav:customer"),
                cb("⬅️ Back", "menu-nav:main"),
            ]]))
            .await?;
        return Ok(());
    };

    let keyboard = InlineKeyboardMarkup::new(vec![
        vec![cb("✅ Confirm", "order-action:confirm"), cb("❌ Cancel", "order-action:cancel")],
        vec![cb("➕ Add more", "menu-nav:customer"), cb("⬅️ Back", "menu-nav:main")],
    ]);

    bot.send_message(chat_id, render_order(view))
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

pub async fn show_admin_menu(bot: &Bot, chat_id: ChatId) -> Result<(), teloxide::RequestError> {
    let keyboard = InlineKeyboardMarkup::new(vec![
        vec![cb("📋 Menu items", "admin-action:items"), cb("📦 Orders", "admin-action:orders")],
        vec![cb("⬅️ Back", "menu-nav:main")],
    ]);
    bot.send_message(chat_id, "🛠 Admin panel")
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

/// One line per catalog item with its availability marker
pub fn render_admin_items(items: &[CatalogItem]) -> String {
    if items.is_empty() {
        return "No menu items yet. Send /additem to create one.".to_string();
    }
    let mut text = "📋 <b>Menu items</b>\n\n".to_string();
    for item in items {
        let marker = if item.active { "✅" } else { "❌" };
        text.push_str(&format!(
            "{} #{} {} — ${}\n",
            marker,
            item.id,
            escape_html(&item.name),
            format_cents(item.price_cents)
        ));
    }
    text
}

/// Lists every item with a toggle button each
pub async fn show_admin_items(bot: &Bot, chat_id: ChatId, items: &[CatalogItem]) -> Result<(), teloxide::RequestError> {
    let mut rows: Vec<Vec<_>> = items
        .iter()
        .map(|item| {
            let action = if item.active { "hide" } else { "show" };
            vec![cb(
                format!("{} #{} {}", if item.active { "❌" } else { "✅" }, item.id, action),
                format!("admin-action:toggle-item:{}", item.id),
            )]
        })
        .collect();
    rows.push(vec![cb("⬅️ Back", "menu-nav:admin")]);

    bot.send_message(chat_id, render_admin_items(items))
        .parse_mode(ParseMode::Html)
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

fn format_order_time(created_at: &str) -> String {
    chrono::NaiveDateTime::parse_from_str(created_at, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.format("%d.%m %H:%M").to_string())
        .unwrap_or_else(|_| created_at.to_string())
}

/// Recent orders, newest first, with status emoji
pub fn render_admin_orders(orders: &[Order]) -> String {
    if orders.is_empty() {
        return "No orders yet.".to_string();
    }
    let mut text = "📦 <b>Recent orders</b>\n\n".to_string();
    for order in orders {
        text.push_str(&format!(
            "{} #{} — ${} — user {} — {}\n",
            order.status.emoji(),
            order.id,
            format_cents(order.total_cents),
            order.telegram_user_id,
            format_order_time(&order.created_at)
        ));
    }
    text
}

/// Lists recent orders; confirmed ones get a complete button
pub async fn show_admin_orders(bot: &Bot, chat_id: ChatId, orders: &[Order]) -> Result<(), teloxide::RequestError> {
    use crate::core::types::OrderStatus;

    let mut rows: Vec<Vec<_>> = orders
        .iter()
        .filter(|o| o.status == OrderStatus::Confirmed)
        .map(|o| vec![cb(format!("✅ Complete #{}", o.id), format!("admin-action:complete:{}", o.id))])
        .collect();
    rows.push(vec![cb("⬅️ Back", "menu-nav:admin")]);

    bot.send_message(chat_id, render_admin_orders(orders))
        .parse_mode(ParseMode::Html)
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

/// Roster listing for the CLI
pub fn render_admin_roster(admins: &[Admin]) -> String {
    if admins.is_empty() {
        return "No administrators configured.".to_string();
    }
    let mut text = String::new();
    for admin in admins {
        let marker = if admin.active { "✅" } else { "❌" };
        let nickname = admin.nickname.as_deref().map(|n| format!(" (@{})", n)).unwrap_or_default();
        text.push_str(&format!("{} {} — {}{}\n", marker, admin.telegram_user_id, admin.name, nickname));
    }
    text
}
