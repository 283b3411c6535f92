use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

use cafebot::cli::{Cli, Commands};
use cafebot::core::{config, init_logger};
use cafebot::storage::db;
use cafebot::storage::{create_pool, get_connection, SessionStore};
use cafebot::telegram::wizard::WizardSession;
use cafebot::telegram::{create_bot, menu, schema, setup_bot_commands, HandlerDeps, HandlerError};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Load environment variables from .env before any Lazy config is read
    let _ = dotenv();

    // Set up global panic handler to catch panics in the dispatcher
    // so they are logged instead of silently terminating a task
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Run { webhook }) => run_bot(webhook).await,
        Some(Commands::AddAdmin {
            user_id,
            name,
            nickname,
        }) => run_add_admin(user_id, &name, nickname.as_deref()),
        Some(Commands::RemoveAdmin { user_id }) => run_remove_admin(user_id),
        Some(Commands::ListAdmins { json }) => run_list_admins(json),
        None => {
            // No command specified - default to running the bot
            log::info!("No command specified, running bot in polling mode");
            run_bot(false).await
        }
    }
}

fn run_add_admin(user_id: i64, name: &str, nickname: Option<&str>) -> Result<()> {
    let pool = create_pool(&config::DATABASE_PATH)?;
    let conn = get_connection(&pool)?;

    if db::find_admin(&conn, user_id)?.is_some() {
        anyhow::bail!("User {} is already on the admin roster", user_id);
    }

    db::insert_admin(&conn, user_id, name, nickname)?;
    println!("Added admin {} ({})", name, user_id);
    Ok(())
}

fn run_remove_admin(user_id: i64) -> Result<()> {
    let pool = create_pool(&config::DATABASE_PATH)?;
    let conn = get_connection(&pool)?;

    if db::remove_admin(&conn, user_id)? {
        println!("Removed admin {}", user_id);
    } else {
        anyhow::bail!("User {} is not on the admin roster", user_id);
    }
    Ok(())
}

fn run_list_admins(json: bool) -> Result<()> {
    let pool = create_pool(&config::DATABASE_PATH)?;
    let conn = get_connection(&pool)?;
    let admins = db::list_admins(&conn)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&admins)?);
    } else {
        print!("{}", menu::render_admin_roster(&admins));
    }
    Ok(())
}

/// Run the Telegram bot
async fn run_bot(use_webhook: bool) -> Result<()> {
    log::info!("Starting bot...");

    let bot = create_bot()?;
    let me = bot.get_me().await?;
    log::info!("Bot username: {:?}, id: {}", me.username, me.id);

    setup_bot_commands(&bot).await?;

    // Database pool (runs migrations on first connection)
    let db_pool = Arc::new(create_pool(&config::DATABASE_PATH)?);

    // Wizard session store with periodic TTL sweep
    let sessions: Arc<SessionStore<WizardSession>> = Arc::new(SessionStore::new(config::session::ttl()));
    sessions.spawn_cleanup_task(config::session::cleanup_interval());

    let deps = HandlerDeps::new(Arc::clone(&db_pool), Arc::clone(&sessions));
    let handler = schema(deps);

    if use_webhook {
        run_webhook(bot, handler).await
    } else {
        run_polling(bot, handler).await
    }
}

/// Webhook mode: teloxide's axum listener serves the endpoint. The URL path
/// carries the secret, and Telegram's secret-token header is verified by the
/// listener before any update reaches the dispatcher.
async fn run_webhook(bot: Bot, handler: UpdateHandler<HandlerError>) -> Result<()> {
    use teloxide::update_listeners::webhooks;

    let base = config::WEBHOOK_URL
        .clone()
        .ok_or_else(|| anyhow::anyhow!("WEBHOOK_URL must be set for webhook mode"))?;
    let mut url = url::Url::parse(&base)?;
    match config::WEBHOOK_SECRET.as_deref() {
        Some(secret) => url.set_path(&format!("/webhook/{}", secret)),
        None => url.set_path("/webhook"),
    }

    let port = *config::WEBHOOK_PORT;
    let addr = ([0, 0, 0, 0], port).into();
    let mut options = webhooks::Options::new(addr, url);
    if let Some(secret) = config::WEBHOOK_SECRET.clone() {
        options = options.secret_token(secret);
    }

    log::info!("Starting bot in webhook mode on port {}", port);
    let listener = webhooks::axum(bot.clone(), options).await?;

    Dispatcher::builder(bot, handler)
        .dependencies(DependencyMap::new())
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;
    Ok(())
}

/// Long polling mode (default). The dispatcher runs in its own task so a
/// panic inside it is caught via the JoinHandle and the loop reconnects.
async fn run_polling(bot: Bot, handler: UpdateHandler<HandlerError>) -> Result<()> {
    use teloxide::update_listeners::Polling;

    log::info!("Starting bot in long polling mode");
    let mut retry_count = 0u32;

    loop {
        let bot_clone = bot.clone();
        let handler_clone = handler.clone();

        let handle = tokio::spawn(async move {
            // Drop updates accumulated while the bot was down
            let listener = Polling::builder(bot_clone.clone()).drop_pending_updates().build();

            Dispatcher::builder(bot_clone, handler_clone)
                .dependencies(DependencyMap::new())
                .enable_ctrlc_handler()
                .build()
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await
        });

        match handle.await {
            Ok(()) => {
                log::info!("Dispatcher shutdown gracefully");
                break;
            }
            Err(join_err) if join_err.is_panic() => {
                log::error!("Dispatcher panicked: {}", join_err);
                retry_count += 1;
                if retry_count > config::retry::MAX_DISPATCHER_RETRIES {
                    anyhow::bail!(
                        "Dispatcher kept panicking after {} restarts",
                        config::retry::MAX_DISPATCHER_RETRIES
                    );
                }
                log::info!(
                    "Restarting dispatcher (attempt {}/{})...",
                    retry_count,
                    config::retry::MAX_DISPATCHER_RETRIES
                );
                tokio::time::sleep(config::retry::dispatcher_delay()).await;
            }
            Err(join_err) => {
                log::warn!("Dispatcher task was cancelled: {}", join_err);
                break;
            }
        }
    }

    Ok(())
}
