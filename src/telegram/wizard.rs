//! Add-item onboarding wizard
//!
//! Four linear steps: name -> price -> description -> photo, then commit.
//! Step application is a pure function over the session so the state machine
//! is testable without Telegram or a database. Invalid input re-prompts the
//! same step and leaves accumulated fields untouched; "-" skips the two
//! optional fields.

use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::money::{format_cents, parse_price_cents};
use crate::storage::db;
use crate::telegram::admin::ensure_admin;
use crate::telegram::dispatcher::HandlerDeps;
use crate::telegram::escape_html;
use crate::telegram::Bot;

/// Current position in the add-item flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WizardStep {
    #[default]
    Name,
    Price,
    Description,
    Photo,
}

impl WizardStep {
    /// Prompt text for the step, sent when the wizard advances here
    pub fn prompt(&self) -> &'static str {
        match self {
            WizardStep::Name => "📝 What is the item called?",
            WizardStep::Price => "💰 What does it cost? (e.g. 3.50)",
            WizardStep::Description => "📄 Add a description, or send \"-\" to skip.",
            WizardStep::Photo => "📷 Send a photo URL, or \"-\" to skip.",
        }
    }
}

/// Fields collected so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDraft {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    pub description: Option<String>,
    pub photo_url: Option<String>,
}

/// One in-flight add-item flow for one admin
#[derive(Debug, Clone, Default)]
pub struct WizardSession {
    pub step: WizardStep,
    pub draft: ItemDraft,
}

/// Result of feeding one input into the wizard
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// Input accepted, session advanced to the contained state
    Advanced(WizardSession),
    /// Input rejected; same step, with the reason to show the user
    Reprompt(String),
    /// All fields collected; the draft is ready to persist
    Commit(ItemDraft),
}

/// Applies one user reply to the session. Pure: no I/O, no mutation of the
/// input session.
pub fn apply_step(session: &WizardSession, input: &str) -> StepOutcome {
    let input = input.trim();
    match session.step {
        WizardStep::Name => {
            if input.is_empty() {
                return StepOutcome::Reprompt("Name cannot be empty.".to_string());
            }
            if input.len() > config::validation::MAX_ITEM_NAME_LEN {
                return StepOutcome::Reprompt(format!(
                    "Name is too long (max {} characters).",
                    config::validation::MAX_ITEM_NAME_LEN
                ));
            }
            let mut next = session.clone();
            next.draft.name = Some(input.to_string());
            next.step = WizardStep::Price;
            StepOutcome::Advanced(next)
        }
        WizardStep::Price => match parse_price_cents(input) {
            Ok(cents) => {
                let mut next = session.clone();
                next.draft.price_cents = Some(cents);
                next.step = WizardStep::Description;
                StepOutcome::Advanced(next)
            }
            Err(AppError::Validation(reason)) => StepOutcome::Reprompt(reason),
            Err(_) => StepOutcome::Reprompt("That does not look like a price.".to_string()),
        },
        WizardStep::Description => {
            if input != "-" && input.len() > config::validation::MAX_DESCRIPTION_LEN {
                return StepOutcome::Reprompt(format!(
                    "Description is too long (max {} characters).",
                    config::validation::MAX_DESCRIPTION_LEN
                ));
            }
            let mut next = session.clone();
            next.draft.description = skip_or_value(input);
            next.step = WizardStep::Photo;
            StepOutcome::Advanced(next)
        }
        WizardStep::Photo => {
            // Any text commits; "-" leaves the photo unset. The browse view
            // falls back to the placeholder image when the stored value is
            // not a usable URL, so nothing is validated here.
            let mut draft = session.draft.clone();
            draft.photo_url = skip_or_value(input);
            StepOutcome::Commit(draft)
        }
    }
}

fn skip_or_value(input: &str) -> Option<String> {
    if input == "-" || input.is_empty() {
        None
    } else {
        Some(input.to_string())
    }
}

/// Starts (or restarts) the wizard for an admin. A live session for the same
/// user is replaced wholesale; the last /additem wins.
pub async fn start(bot: &Bot, chat_id: ChatId, user_id: i64, deps: &HandlerDeps) -> AppResult<()> {
    {
        let conn = db::get_connection(&deps.db_pool)?;
        ensure_admin(&conn, user_id)?;
    }

    deps.sessions.set(user_id, WizardSession::default()).await;
    bot.send_message(chat_id, format!("🧾 Adding a new menu item.\n\n{}", WizardStep::Name.prompt()))
        .await?;
    Ok(())
}

/// Feeds one text reply into the caller's live session.
pub async fn handle_input(bot: &Bot, chat_id: ChatId, user_id: i64, input: &str, deps: &HandlerDeps) -> AppResult<()> {
    let Some(session) = deps.sessions.get(user_id).await else {
        // Session expired between routing and handling; fall back to help.
        bot.send_message(chat_id, "The item form has expired. Send /additem to start over.")
            .await?;
        return Ok(());
    };

    match apply_step(&session, input) {
        StepOutcome::Advanced(next) => {
            let prompt = next.step.prompt();
            deps.sessions.set(user_id, next).await;
            bot.send_message(chat_id, prompt).await?;
        }
        StepOutcome::Reprompt(reason) => {
            bot.send_message(chat_id, format!("⚠️ {}\n\n{}", reason, session.step.prompt()))
                .await?;
        }
        StepOutcome::Commit(draft) => {
            // The session dies with the commit attempt either way; a failed
            // commit (revoked admin, db fault) must not trap the user in the
            // wizard.
            let result = commit(user_id, &draft, deps);
            deps.sessions.clear(user_id).await;
            let item_id = result?;

            let name = draft.name.unwrap_or_default();
            let price = draft.price_cents.unwrap_or_default();
            log::info!("Admin {} added menu item {} ({})", user_id, item_id, name);
            bot.send_message(
                chat_id,
                format!("✅ <b>{}</b> added to the menu at ${}.", escape_html(&name), format_cents(price)),
            )
            .parse_mode(ParseMode::Html)
            .await?;
        }
    }
    Ok(())
}

/// Cancels a live session, if any. Returns whether one existed.
pub async fn cancel(user_id: i64, deps: &HandlerDeps) -> bool {
    deps.sessions.clear(user_id).await.is_some()
}

/// Persists the finished draft. Admin status is re-checked here: the roster
/// may have changed since the wizard started.
fn commit(user_id: i64, draft: &ItemDraft, deps: &HandlerDeps) -> AppResult<i64> {
    let conn = db::get_connection(&deps.db_pool)?;
    ensure_admin(&conn, user_id)?;

    let name = draft
        .name
        .as_deref()
        .ok_or_else(|| AppError::Validation("Item name is missing".to_string()))?;
    let price_cents = draft
        .price_cents
        .ok_or_else(|| AppError::Validation("Item price is missing".to_string()))?;

    db::insert_item(&conn, name, draft.description.as_deref(), price_cents, draft.photo_url.as_deref())
}
