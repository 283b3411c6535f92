use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cafebot")]
#[command(author, version, about = "Telegram bot for taking and managing cafe orders", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot
    Run {
        /// Use webhook mode instead of long polling
        #[arg(long)]
        webhook: bool,
    },

    /// Add an administrator to the roster
    AddAdmin {
        /// Telegram user id
        user_id: i64,

        /// Display name
        name: String,

        /// Telegram username, without @
        #[arg(short, long)]
        nickname: Option<String>,
    },

    /// Remove an administrator from the roster
    RemoveAdmin {
        /// Telegram user id
        user_id: i64,
    },

    /// List the administrator roster
    ListAdmins {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
