//! Telegram bot integration: event classification, routing, and rendering

pub mod admin;
pub mod bot;
pub mod classifier;
pub mod dispatcher;
pub mod menu;
pub mod notifications;
pub mod wizard;

pub use bot::{create_bot, setup_bot_commands};
pub use dispatcher::{schema, HandlerDeps, HandlerError};
pub use teloxide::Bot;

use teloxide::types::InlineKeyboardButton;

/// Shorthand for building a callback button
pub fn cb(text: impl Into<String>, data: impl Into<String>) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text.into(), data.into())
}

/// Escapes text for Telegram HTML parse mode
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
