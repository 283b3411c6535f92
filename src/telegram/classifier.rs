//! Update normalization
//!
//! Raw `teloxide::types::Update` values are flattened into an `InboundEvent`
//! before any routing happens: a command with a verb and arguments, a callback
//! token split on its namespace, or plain text. Updates carrying neither a
//! message nor a callback classify as `EmptyEvent` and are acknowledged as
//! no-ops by the dispatcher.

use std::fmt;
use std::str::FromStr;

use teloxide::types::{ChatId, Update, UpdateKind};

use crate::core::error::{AppError, AppResult};

/// Slash commands the bot understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandVerb {
    Start,
    Menu,
    Order,
    Confirm,
    Complete,
    Orders,
    AddItem,
    Cancel,
}

impl CommandVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandVerb::Start => "start",
            CommandVerb::Menu => "menu",
            CommandVerb::Order => "order",
            CommandVerb::Confirm => "confirm",
            CommandVerb::Complete => "complete",
            CommandVerb::Orders => "orders",
            CommandVerb::AddItem => "additem",
            CommandVerb::Cancel => "cancel",
        }
    }
}

impl fmt::Display for CommandVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandVerb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(CommandVerb::Start),
            "menu" => Ok(CommandVerb::Menu),
            "order" => Ok(CommandVerb::Order),
            "confirm" => Ok(CommandVerb::Confirm),
            "complete" => Ok(CommandVerb::Complete),
            "orders" => Ok(CommandVerb::Orders),
            "additem" => Ok(CommandVerb::AddItem),
            "cancel" => Ok(CommandVerb::Cancel),
            _ => Err(format!("Unknown command: {}", s)),
        }
    }
}

/// Callback button namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    CatalogAdd,
    CatalogQty,
    MenuNav,
    OrderAction,
    AdminAction,
}

impl FromStr for Namespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "catalog-add" => Ok(Namespace::CatalogAdd),
            "catalog-qty" => Ok(Namespace::CatalogQty),
            "menu-nav" => Ok(Namespace::MenuNav),
            "order-action" => Ok(Namespace::OrderAction),
            "admin-action" => Ok(Namespace::AdminAction),
            _ => Err(format!("Unknown callback namespace: {}", s)),
        }
    }
}

/// A callback payload split on its first colon. The argument part stays
/// opaque here; each namespace handler parses it further.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackToken {
    pub namespace: String,
    pub args: String,
}

impl CallbackToken {
    pub fn parse(data: &str) -> Self {
        match data.split_once(':') {
            Some((ns, args)) => Self {
                namespace: ns.to_string(),
                args: args.to_string(),
            },
            None => Self {
                namespace: data.to_string(),
                args: String::new(),
            },
        }
    }

    pub fn known_namespace(&self) -> Option<Namespace> {
        Namespace::from_str(&self.namespace).ok()
    }
}

/// What kind of interaction an update carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Command { verb: CommandVerb, args: String },
    Callback(CallbackToken),
    PlainText,
}

/// A normalized inbound event
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub user_id: i64,
    pub chat_id: ChatId,
    pub kind: EventKind,
    /// Full message text; present for message-origin events
    pub text: Option<String>,
    /// Callback query id to acknowledge; present iff the event is a callback
    pub ack_id: Option<String>,
}

impl InboundEvent {
    pub fn is_callback(&self) -> bool {
        self.ack_id.is_some()
    }
}

/// Normalizes an update into an `InboundEvent`.
///
/// Messages without a sender or without text (stickers, channel posts, media)
/// and update kinds the bot does not handle all classify as `EmptyEvent`.
pub fn classify(update: &Update) -> AppResult<InboundEvent> {
    match &update.kind {
        UpdateKind::Message(msg) | UpdateKind::EditedMessage(msg) => {
            let user_id = msg
                .from
                .as_ref()
                .and_then(|u| i64::try_from(u.id.0).ok())
                .ok_or(AppError::EmptyEvent)?;
            let text = msg.text().ok_or(AppError::EmptyEvent)?;

            Ok(InboundEvent {
                user_id,
                chat_id: msg.chat.id,
                kind: classify_text(text),
                text: Some(text.to_string()),
                ack_id: None,
            })
        }
        UpdateKind::CallbackQuery(q) => {
            let user_id = i64::try_from(q.from.id.0).map_err(|_| AppError::EmptyEvent)?;
            let chat_id = q
                .message
                .as_ref()
                .map(|m| m.chat().id)
                .unwrap_or(ChatId(user_id));
            let token = CallbackToken::parse(q.data.as_deref().unwrap_or_default());

            Ok(InboundEvent {
                user_id,
                chat_id,
                kind: EventKind::Callback(token),
                text: None,
                ack_id: Some(q.id.0.clone()),
            })
        }
        _ => Err(AppError::EmptyEvent),
    }
}

/// Classifies message text as a known command or plain text. Unknown slash
/// commands stay plain text and fall through to the help reply.
fn classify_text(text: &str) -> EventKind {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return EventKind::PlainText;
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or_default();
    // Strip the bot mention from "/menu@cafebot"
    let verb_token = head.split('@').next().unwrap_or_default().to_lowercase();

    match CommandVerb::from_str(&verb_token) {
        Ok(verb) => EventKind::Command {
            verb,
            args: parts.next().unwrap_or_default().trim().to_string(),
        },
        Err(_) => EventKind::PlainText,
    }
}
