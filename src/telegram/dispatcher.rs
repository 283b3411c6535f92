//! Event routing
//!
//! Exactly one handler fires per inbound event, resolved in precedence order:
//! a live wizard session first, then callback namespaces, then command verbs,
//! then the help fallback. Every branch produces one reply; callback-origin
//! events additionally get exactly one `answer_callback_query`, sent here at
//! the end of dispatch regardless of which branch ran.
//!
//! Domain errors never escape `dispatch`: they are translated into
//! deterministic reply text (an alert for callbacks, a message otherwise).
//! Infrastructure faults do escape it, so an event hitting a store outage is
//! handed back to the caller instead of being consumed with a lost mutation.

use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

use crate::core::error::{AppError, AppResult};
use crate::core::{orders, OrderStatus};
use crate::storage::db::{self, DbPool};
use crate::storage::SessionStore;
use crate::telegram::admin::{ensure_admin, is_admin};
use crate::telegram::classifier::{classify, CommandVerb, EventKind, InboundEvent, Namespace};
use crate::telegram::wizard::{self, WizardSession};
use crate::telegram::{menu, notifications, Bot};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<DbPool>,
    pub sessions: Arc<SessionStore<WizardSession>>,
}

impl HandlerDeps {
    pub fn new(db_pool: Arc<DbPool>, sessions: Arc<SessionStore<WizardSession>>) -> Self {
        Self { db_pool, sessions }
    }
}

/// Which branch handles an event. Pure function of the event kind and
/// whether the user has a live wizard session, so precedence is testable
/// without Telegram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Text consumed by the live wizard
    WizardStep,
    /// Callback pressed while a wizard is live; acknowledged only
    WizardBusy,
    /// Known callback namespace
    Callback(Namespace),
    /// Callback with an unknown namespace
    UnknownCallback,
    /// Known command verb
    Command(CommandVerb),
    /// Help reply
    Fallback,
}

pub fn resolve(kind: &EventKind, wizard_active: bool) -> Route {
    if wizard_active {
        return match kind {
            EventKind::Callback(_) => Route::WizardBusy,
            // Restart and escape hatches keep working inside the wizard;
            // every other text is wizard input.
            EventKind::Command {
                verb: verb @ (CommandVerb::AddItem | CommandVerb::Cancel),
                ..
            } => Route::Command(*verb),
            _ => Route::WizardStep,
        };
    }

    match kind {
        EventKind::Callback(token) => match token.known_namespace() {
            Some(ns) => Route::Callback(ns),
            None => Route::UnknownCallback,
        },
        EventKind::Command { verb, .. } => Route::Command(*verb),
        EventKind::PlainText => Route::Fallback,
    }
}

/// How a callback event is acknowledged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackReply {
    Silent,
    Toast(String),
    Alert(String),
}

/// Creates the main dispatcher schema for the Telegram bot.
///
/// The returned handler tree plugs into teloxide's Dispatcher; the same
/// schema serves polling and webhook modes.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry().endpoint(move |bot: Bot, update: Update| {
        let deps = deps.clone();
        async move {
            match classify(&update) {
                Ok(event) => {
                    if let Err(err) = dispatch(&bot, &event, &deps).await {
                        log::error!("Failed to handle event from user {}: {}", event.user_id, err);
                    }
                }
                // Nothing handleable in the update; acknowledging receipt
                // (HTTP 200 / offset advance) is all it gets.
                Err(AppError::EmptyEvent) => log::debug!("Skipping update {:?}: no handleable payload", update.id),
                Err(err) => log::warn!("Failed to classify update {:?}: {}", update.id, err),
            }
            Ok(())
        }
    })
}

/// Routes one event, replies, and sends the single callback ack.
pub async fn dispatch(bot: &Bot, event: &InboundEvent, deps: &HandlerDeps) -> AppResult<()> {
    let wizard_active = deps.sessions.get(event.user_id).await.is_some();
    let route = resolve(&event.kind, wizard_active);
    log::debug!("User {} -> {:?}", event.user_id, route);

    let reply = match run_route(bot, event, deps, route).await {
        Ok(reply) => reply,
        Err(err) => {
            let text = settle_error(event.user_id, err)?;
            if event.is_callback() {
                CallbackReply::Alert(text)
            } else {
                bot.send_message(event.chat_id, text).await?;
                CallbackReply::Silent
            }
        }
    };

    if let Some(ack_id) = &event.ack_id {
        send_ack(bot, ack_id, reply).await?;
    }
    Ok(())
}

/// Settles a failed route. Domain outcomes are terminal per event and become
/// reply text; infrastructure faults are handed back to the caller so the
/// event is not consumed while the store or the API is down.
fn settle_error(user_id: i64, err: AppError) -> AppResult<String> {
    if err.is_domain() {
        log::info!("Domain error for user {}: {}", user_id, err);
        Ok(reply_for_error(&err))
    } else {
        Err(err)
    }
}

async fn send_ack(bot: &Bot, ack_id: &str, reply: CallbackReply) -> AppResult<()> {
    match reply {
        CallbackReply::Silent => {
            bot.answer_callback_query(teloxide::types::CallbackQueryId(ack_id.to_string())).await?;
        }
        CallbackReply::Toast(text) => {
            bot.answer_callback_query(teloxide::types::CallbackQueryId(ack_id.to_string())).text(text).await?;
        }
        CallbackReply::Alert(text) => {
            bot.answer_callback_query(teloxide::types::CallbackQueryId(ack_id.to_string()))
                .text(text)
                .show_alert(true)
                .await?;
        }
    }
    Ok(())
}

async fn run_route(bot: &Bot, event: &InboundEvent, deps: &HandlerDeps, route: Route) -> AppResult<CallbackReply> {
    match route {
        Route::WizardStep => {
            let input = event.text.as_deref().unwrap_or_default();
            wizard::handle_input(bot, event.chat_id, event.user_id, input, deps).await?;
            Ok(CallbackReply::Silent)
        }
        Route::WizardBusy => Ok(CallbackReply::Toast(
            "Finish the item form first, or send /cancel.".to_string(),
        )),
        Route::UnknownCallback => Ok(CallbackReply::Toast("This action is not available.".to_string())),
        Route::Callback(ns) => {
            let args = match &event.kind {
                EventKind::Callback(token) => token.args.clone(),
                _ => String::new(),
            };
            match ns {
                Namespace::CatalogAdd => handle_catalog_add(bot, event, deps, &args).await,
                Namespace::CatalogQty => handle_catalog_qty(event, deps, &args).await,
                Namespace::MenuNav => handle_menu_nav(bot, event, deps, &args).await,
                Namespace::OrderAction => handle_order_action(bot, event, deps, &args).await,
                Namespace::AdminAction => handle_admin_action(bot, event, deps, &args).await,
            }
        }
        Route::Command(verb) => {
            let args = match &event.kind {
                EventKind::Command { args, .. } => args.clone(),
                _ => String::new(),
            };
            handle_command(bot, event, deps, verb, &args).await?;
            Ok(CallbackReply::Silent)
        }
        Route::Fallback => {
            bot.send_message(event.chat_id, help_text()).await?;
            Ok(CallbackReply::Silent)
        }
    }
}

fn help_text() -> String {
    "🤔 I didn't catch that. Try:\n\
     /menu — browse the menu\n\
     /order <name> | <qty> — add an item\n\
     /confirm — confirm your order\n\
     /cancel — cancel your open order\n\
     /start — main menu"
        .to_string()
}

/// Deterministic reply text for a failed operation
pub fn reply_for_error(err: &AppError) -> String {
    match err {
        AppError::EmptyEvent => "Nothing to do here.".to_string(),
        AppError::ItemUnavailable(what) => format!("😔 '{}' is not on the menu right now.", what),
        AppError::OrderNotFound(0) => "🤷 You have no open order. Browse the /menu to start one.".to_string(),
        AppError::OrderNotFound(id) => format!("🤷 Order #{} not found.", id),
        AppError::InvalidTransition { to: OrderStatus::Open, .. } => {
            "Only an open order can be cancelled.".to_string()
        }
        AppError::InvalidTransition { from, to } => format!(
            "Order is {} and cannot become {}.",
            from.display_name().to_lowercase(),
            to.display_name().to_lowercase()
        ),
        AppError::Unauthorized(_) => "🚫 This action is for administrators only.".to_string(),
        AppError::Validation(reason) => format!("⚠️ {}", reason),
        AppError::Database(_) | AppError::DatabasePool(_) | AppError::Telegram(_) => {
            "⚠️ Something went wrong on our side. Please try again shortly.".to_string()
        }
    }
}

// ---- callback handlers ----

fn parse_id(raw: &str) -> AppResult<i64> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("'{}' is not a valid id", raw)))
}

/// `catalog-add:<item_id>` — one unit into the cart, reply with the cart
async fn handle_catalog_add(bot: &Bot, event: &InboundEvent, deps: &HandlerDeps, args: &str) -> AppResult<CallbackReply> {
    let item_id = parse_id(args)?;
    let mut conn = db::get_connection(&deps.db_pool)?;
    let (item, view) = orders::add_line(&mut conn, event.user_id, item_id, 1)?;
    drop(conn);

    menu::show_current_order(bot, event.chat_id, Some(&view)).await?;
    Ok(CallbackReply::Toast(format!("Added {} ✅", item.name)))
}

/// `catalog-qty:<item_id>:<delta>` — quantity nudge, acknowledged with a
/// toast only so rapid +/- presses don't flood the chat
async fn handle_catalog_qty(event: &InboundEvent, deps: &HandlerDeps, args: &str) -> AppResult<CallbackReply> {
    let (raw_id, raw_delta) = args
        .split_once(':')
        .ok_or_else(|| AppError::Validation(format!("'{}' is not a valid quantity action", args)))?;
    let item_id = parse_id(raw_id)?;
    let delta: i64 = raw_delta
        .parse()
        .map_err(|_| AppError::Validation(format!("'{}' is not a valid quantity", raw_delta)))?;

    let mut conn = db::get_connection(&deps.db_pool)?;
    let (item, view) = orders::add_line(&mut conn, event.user_id, item_id, delta)?;

    let quantity = view
        .lines
        .iter()
        .find(|line| line.menu_item_id == item.id)
        .map(|line| line.quantity)
        .unwrap_or(0);
    Ok(CallbackReply::Toast(format!("{} ×{}", item.name, quantity)))
}

/// `menu-nav:main|customer|admin`
async fn handle_menu_nav(bot: &Bot, event: &InboundEvent, deps: &HandlerDeps, args: &str) -> AppResult<CallbackReply> {
    let conn = db::get_connection(&deps.db_pool)?;
    match args {
        "main" => {
            let admin = is_admin(&conn, event.user_id)?;
            drop(conn);
            menu::show_main_menu(bot, event.chat_id, admin).await?;
            Ok(CallbackReply::Silent)
        }
        "customer" => {
            let items = db::list_active_items(&conn)?;
            drop(conn);
            menu::show_customer_menu(bot, event.chat_id, &items).await?;
            Ok(CallbackReply::Silent)
        }
        "admin" => {
            ensure_admin(&conn, event.user_id)?;
            drop(conn);
            menu::show_admin_menu(bot, event.chat_id).await?;
            Ok(CallbackReply::Silent)
        }
        _ => Ok(CallbackReply::Toast("This action is not available.".to_string())),
    }
}

/// `order-action:view|confirm|cancel`
async fn handle_order_action(bot: &Bot, event: &InboundEvent, deps: &HandlerDeps, args: &str) -> AppResult<CallbackReply> {
    match args {
        "view" => {
            let conn = db::get_connection(&deps.db_pool)?;
            let view = orders::current_order(&conn, event.user_id)?;
            drop(conn);
            menu::show_current_order(bot, event.chat_id, view.as_ref()).await?;
            Ok(CallbackReply::Silent)
        }
        "confirm" => {
            let mut conn = db::get_connection(&deps.db_pool)?;
            let view = orders::confirm(&mut conn, event.user_id, None)?;
            drop(conn);

            notifications::notify_admins_order_confirmed(bot, &deps.db_pool, &view).await;
            bot.send_message(
                event.chat_id,
                format!("✅ Order #{} confirmed! We'll let you know when it's ready.", view.order.id),
            )
            .await?;
            Ok(CallbackReply::Toast("Order confirmed ✅".to_string()))
        }
        "cancel" => {
            let mut conn = db::get_connection(&deps.db_pool)?;
            let order_id = orders::cancel(&mut conn, event.user_id, None)?;
            drop(conn);

            bot.send_message(event.chat_id, format!("🗑 Order #{} cancelled.", order_id))
                .await?;
            Ok(CallbackReply::Silent)
        }
        _ => Ok(CallbackReply::Toast("This action is not available.".to_string())),
    }
}

/// `admin-action:items|orders|toggle-item:<id>|complete:<id>` — all gated
async fn handle_admin_action(bot: &Bot, event: &InboundEvent, deps: &HandlerDeps, args: &str) -> AppResult<CallbackReply> {
    {
        let conn = db::get_connection(&deps.db_pool)?;
        ensure_admin(&conn, event.user_id)?;
    }

    match args.split_once(':') {
        None if args == "items" => {
            let conn = db::get_connection(&deps.db_pool)?;
            let items = db::list_all_items(&conn)?;
            drop(conn);
            menu::show_admin_items(bot, event.chat_id, &items).await?;
            Ok(CallbackReply::Silent)
        }
        None if args == "orders" => {
            let conn = db::get_connection(&deps.db_pool)?;
            let recent = db::recent_orders(&conn, crate::core::config::validation::RECENT_ORDERS_LIMIT)?;
            drop(conn);
            menu::show_admin_orders(bot, event.chat_id, &recent).await?;
            Ok(CallbackReply::Silent)
        }
        Some(("toggle-item", raw_id)) => {
            let item_id = parse_id(raw_id)?;
            let conn = db::get_connection(&deps.db_pool)?;
            let new_state = db::toggle_item_active(&conn, item_id)?
                .ok_or_else(|| AppError::ItemUnavailable(item_id.to_string()))?;
            let items = db::list_all_items(&conn)?;
            drop(conn);

            menu::show_admin_items(bot, event.chat_id, &items).await?;
            Ok(CallbackReply::Toast(if new_state {
                "Item is back on the menu ✅".to_string()
            } else {
                "Item hidden from the menu ❌".to_string()
            }))
        }
        Some(("complete", raw_id)) => {
            let order_id = parse_id(raw_id)?;
            let mut conn = db::get_connection(&deps.db_pool)?;
            let view = orders::complete(&mut conn, order_id)?;
            drop(conn);

            notifications::notify_customer_completed(bot, &view).await;
            bot.send_message(event.chat_id, format!("✅ Order #{} completed.", view.order.id))
                .await?;
            Ok(CallbackReply::Silent)
        }
        _ => Ok(CallbackReply::Toast("This action is not available.".to_string())),
    }
}

// ---- command handlers ----

async fn handle_command(
    bot: &Bot,
    event: &InboundEvent,
    deps: &HandlerDeps,
    verb: CommandVerb,
    args: &str,
) -> AppResult<()> {
    match verb {
        CommandVerb::Start => {
            let conn = db::get_connection(&deps.db_pool)?;
            let admin = is_admin(&conn, event.user_id)?;
            drop(conn);
            menu::show_main_menu(bot, event.chat_id, admin).await?;
        }
        CommandVerb::Menu => {
            let conn = db::get_connection(&deps.db_pool)?;
            let items = db::list_active_items(&conn)?;
            drop(conn);
            menu::show_customer_menu(bot, event.chat_id, &items).await?;
        }
        CommandVerb::Order => {
            let (name, quantity) = parse_order_args(args)?;
            let mut conn = db::get_connection(&deps.db_pool)?;
            let item = db::get_active_item_by_name(&conn, &name)?
                .ok_or_else(|| AppError::ItemUnavailable(name.clone()))?;
            let (_, view) = orders::add_line(&mut conn, event.user_id, item.id, quantity)?;
            drop(conn);
            menu::show_current_order(bot, event.chat_id, Some(&view)).await?;
        }
        CommandVerb::Confirm => {
            let order_id = if args.is_empty() { None } else { Some(parse_id(args)?) };
            let mut conn = db::get_connection(&deps.db_pool)?;
            let view = orders::confirm(&mut conn, event.user_id, order_id)?;
            drop(conn);

            notifications::notify_admins_order_confirmed(bot, &deps.db_pool, &view).await;
            bot.send_message(
                event.chat_id,
                format!("✅ Order #{} confirmed! We'll let you know when it's ready.", view.order.id),
            )
            .await?;
        }
        CommandVerb::Complete => {
            let order_id = parse_id(args)?;
            let mut conn = db::get_connection(&deps.db_pool)?;
            ensure_admin(&conn, event.user_id)?;
            let view = orders::complete(&mut conn, order_id)?;
            drop(conn);

            notifications::notify_customer_completed(bot, &view).await;
            bot.send_message(event.chat_id, format!("✅ Order #{} completed.", view.order.id))
                .await?;
        }
        CommandVerb::Orders => {
            let conn = db::get_connection(&deps.db_pool)?;
            ensure_admin(&conn, event.user_id)?;
            let recent = db::recent_orders(&conn, crate::core::config::validation::RECENT_ORDERS_LIMIT)?;
            drop(conn);
            menu::show_admin_orders(bot, event.chat_id, &recent).await?;
        }
        CommandVerb::AddItem => {
            wizard::start(bot, event.chat_id, event.user_id, deps).await?;
        }
        CommandVerb::Cancel => {
            if wizard::cancel(event.user_id, deps).await {
                bot.send_message(event.chat_id, "🚫 Item form cancelled.").await?;
            } else {
                let mut conn = db::get_connection(&deps.db_pool)?;
                let order_id = orders::cancel(&mut conn, event.user_id, None)?;
                drop(conn);
                bot.send_message(event.chat_id, format!("🗑 Order #{} cancelled.", order_id))
                    .await?;
            }
        }
    }
    Ok(())
}

/// Parses `/order <name> | <qty>`; quantity defaults to 1
fn parse_order_args(args: &str) -> AppResult<(String, i64)> {
    let (raw_name, raw_qty) = match args.split_once('|') {
        Some((name, qty)) => (name, Some(qty)),
        None => (args, None),
    };

    let name = raw_name.trim();
    if name.is_empty() {
        return Err(AppError::Validation(
            "Usage: /order <name> | <qty>, e.g. /order latte | 2".to_string(),
        ));
    }

    let quantity = match raw_qty {
        None => 1,
        Some(raw) => {
            let raw = raw.trim();
            raw.parse::<i64>()
                .ok()
                .filter(|q| (1..=crate::core::config::validation::MAX_ORDER_QUANTITY).contains(q))
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "Quantity must be a number between 1 and {}",
                        crate::core::config::validation::MAX_ORDER_QUANTITY
                    ))
                })?
        }
    };

    Ok((name.to_string(), quantity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::classifier::CallbackToken;

    fn command(verb: CommandVerb) -> EventKind {
        EventKind::Command {
            verb,
            args: String::new(),
        }
    }

    fn callback(data: &str) -> EventKind {
        EventKind::Callback(CallbackToken::parse(data))
    }

    #[test]
    fn test_wizard_consumes_text_and_most_commands() {
        assert_eq!(resolve(&EventKind::PlainText, true), Route::WizardStep);
        assert_eq!(resolve(&command(CommandVerb::Menu), true), Route::WizardStep);
        assert_eq!(resolve(&command(CommandVerb::Confirm), true), Route::WizardStep);
    }

    #[test]
    fn test_wizard_escape_hatches() {
        assert_eq!(resolve(&command(CommandVerb::Cancel), true), Route::Command(CommandVerb::Cancel));
        assert_eq!(
            resolve(&command(CommandVerb::AddItem), true),
            Route::Command(CommandVerb::AddItem)
        );
    }

    #[test]
    fn test_wizard_blocks_callbacks() {
        assert_eq!(resolve(&callback("catalog-add:1"), true), Route::WizardBusy);
    }

    #[test]
    fn test_callback_routing_without_wizard() {
        assert_eq!(
            resolve(&callback("catalog-add:1"), false),
            Route::Callback(Namespace::CatalogAdd)
        );
        assert_eq!(
            resolve(&callback("order-action:view"), false),
            Route::Callback(Namespace::OrderAction)
        );
        assert_eq!(resolve(&callback("old_button:7"), false), Route::UnknownCallback);
    }

    #[test]
    fn test_command_and_fallback_routing() {
        assert_eq!(resolve(&command(CommandVerb::Menu), false), Route::Command(CommandVerb::Menu));
        assert_eq!(resolve(&EventKind::PlainText, false), Route::Fallback);
    }

    #[test]
    fn test_parse_order_args() {
        assert_eq!(parse_order_args("latte | 2").unwrap(), ("latte".to_string(), 2));
        assert_eq!(parse_order_args("latte").unwrap(), ("latte".to_string(), 1));
        assert_eq!(parse_order_args("flat white|3").unwrap(), ("flat white".to_string(), 3));
        assert!(parse_order_args("").is_err());
        assert!(parse_order_args("latte | zero").is_err());
        assert!(parse_order_args("latte | 0").is_err());
        assert!(parse_order_args("latte | -1").is_err());
    }

    #[test]
    fn test_parse_order_args_clamps_quantity() {
        let max = crate::core::config::validation::MAX_ORDER_QUANTITY;
        assert_eq!(
            parse_order_args(&format!("latte | {}", max)).unwrap(),
            ("latte".to_string(), max)
        );
        assert!(parse_order_args(&format!("latte | {}", max + 1)).is_err());
        assert!(parse_order_args("latte | 9223372036854775807").is_err());
    }

    #[test]
    fn test_settle_error_replies_domain_and_propagates_infra() {
        assert_eq!(
            settle_error(5, AppError::Unauthorized(5)).unwrap(),
            "🚫 This action is for administrators only."
        );
        assert!(settle_error(5, AppError::Validation("bad".to_string())).is_ok());
        // A store fault must reach the caller instead of becoming a reply.
        assert!(settle_error(5, AppError::Database(rusqlite::Error::InvalidQuery)).is_err());
    }

    #[test]
    fn test_error_replies_are_deterministic() {
        assert_eq!(
            reply_for_error(&AppError::Unauthorized(5)),
            "🚫 This action is for administrators only."
        );
        assert_eq!(reply_for_error(&AppError::OrderNotFound(7)), "🤷 Order #7 not found.");
        assert!(reply_for_error(&AppError::OrderNotFound(0)).contains("no open order"));
        assert_eq!(
            reply_for_error(&AppError::InvalidTransition {
                from: OrderStatus::Open,
                to: OrderStatus::Completed,
            }),
            "Order is open and cannot become completed."
        );
        assert_eq!(
            reply_for_error(&AppError::InvalidTransition {
                from: OrderStatus::Confirmed,
                to: OrderStatus::Open,
            }),
            "Only an open order can be cancelled."
        );
    }
}
