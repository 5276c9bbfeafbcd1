// ABOUTME: Shows and edits the stored user profile sent with chat requests

use anyhow::Result;
use clap::Subcommand;
use colored::*;

use ragline_storage::UserConfig;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Print the current profile
    Show,
    /// Update profile fields
    Set {
        /// Username sent with every chat request
        #[arg(short, long)]
        username: Option<String>,
        /// Access group used for document visibility
        #[arg(short, long)]
        group: Option<String>,
    },
}

pub async fn handle_user_command(command: UserCommands) -> Result<()> {
    match command {
        UserCommands::Show => {
            let config = UserConfig::load().await;
            println!("{} {}", "username:".bold(), config.username);
            println!("{} {}", "group:".bold(), config.user_group);
            Ok(())
        }
        UserCommands::Set { username, group } => {
            let mut config = UserConfig::load().await;
            if let Some(username) = username {
                config.username = username;
            }
            if let Some(group) = group {
                config.user_group = group;
            }
            config.save().await?;
            println!("{}", "Profile updated.".green());
            Ok(())
        }
    }
}
