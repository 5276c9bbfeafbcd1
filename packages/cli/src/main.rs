// ABOUTME: Entry point for the ragline terminal client
// ABOUTME: Parses subcommands and dispatches to the command handlers

use clap::{Parser, Subcommand};
use colored::*;
use std::process;

mod commands;
mod config;

use commands::{chat, conversations, feedback, user};

#[derive(Parser)]
#[command(name = "ragline")]
#[command(about = "Ragline - terminal client for the document assistant")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a message to the assistant and stream the reply
    Chat {
        /// The question to ask
        message: String,
    },
    /// Manage saved conversations
    #[command(subcommand)]
    Conversations(conversations::ConversationsCommands),
    /// Submit feedback on an assistant message
    Feedback {
        /// Message ID shown after a chat reply
        message_id: String,
        #[arg(value_enum)]
        sign: feedback::SignArg,
        /// Optional free-text comment
        #[arg(short, long)]
        comment: Option<String>,
    },
    /// Show or change the stored user profile
    #[command(subcommand)]
    User(user::UserCommands),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let config = match config::Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "error:".red(), e);
            process::exit(1);
        }
    };

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Chat { message } => chat::handle_chat_command(&config, message).await,
        Commands::Conversations(command) => {
            conversations::handle_conversations_command(command).await
        }
        Commands::Feedback {
            message_id,
            sign,
            comment,
        } => feedback::handle_feedback_command(&config, message_id, sign, comment).await,
        Commands::User(command) => user::handle_user_command(command).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red(), e);
        process::exit(1);
    }
}
