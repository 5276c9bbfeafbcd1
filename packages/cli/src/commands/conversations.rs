// ABOUTME: Listing, showing, and deleting locally saved conversations

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::*;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};

use ragline_core::Role;
use ragline_storage::ConversationStore;

#[derive(Subcommand)]
pub enum ConversationsCommands {
    /// List all saved conversations
    List,
    /// Print the full transcript of a conversation
    Show {
        /// Conversation ID to show
        id: String,
    },
    /// Delete a conversation
    Delete {
        /// Conversation ID to delete
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

pub async fn handle_conversations_command(command: ConversationsCommands) -> Result<()> {
    match command {
        ConversationsCommands::List => list_conversations().await,
        ConversationsCommands::Show { id } => show_conversation(&id).await,
        ConversationsCommands::Delete { id, yes } => delete_conversation(&id, yes).await,
    }
}

async fn list_conversations() -> Result<()> {
    let store = ConversationStore::load().await?;
    if store.conversations().is_empty() {
        println!("No saved conversations.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Title", "Messages", "Started"]);
    for conversation in store.conversations() {
        table.add_row(vec![
            conversation.id.clone(),
            conversation.title.clone(),
            conversation.messages.len().to_string(),
            conversation.created_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

async fn show_conversation(id: &str) -> Result<()> {
    let store = ConversationStore::load().await?;
    let Some(conversation) = store.conversations().iter().find(|c| c.id == id) else {
        bail!("no conversation with id {}", id);
    };

    println!("{}\n", conversation.title.bold());
    for message in &conversation.messages {
        match message.role {
            Role::User => println!("{} {}", "you:".cyan().bold(), message.content),
            Role::Assistant => {
                let text = message.display_content.as_ref().unwrap_or(&message.content);
                println!("{} {}", "assistant:".green().bold(), text);
                println!("   {} {}", "id:".dimmed(), message.id.dimmed());
            }
        }
        println!();
    }
    Ok(())
}

async fn delete_conversation(id: &str, yes: bool) -> Result<()> {
    if !yes {
        bail!("pass --yes to confirm deleting conversation {}", id);
    }
    let mut store = ConversationStore::load().await?;
    if !store.delete_conversation(id) {
        bail!("no conversation with id {}", id);
    }
    store.save().await?;
    println!("Deleted conversation {}", id);
    Ok(())
}
