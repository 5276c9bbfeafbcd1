// ABOUTME: Interactive chat command that streams one assistant reply
// ABOUTME: Thinking text renders dimmed, the response renders as it arrives

use std::io::Write as _;
use std::sync::Arc;

use anyhow::Result;
use colored::*;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use ragline_client::{ChatOrchestrator, ClientError, LlmApiClient};
use ragline_storage::{ConversationStore, UserConfig};

use crate::config::Config;

pub async fn handle_chat_command(config: &Config, message: String) -> Result<()> {
    let api = LlmApiClient::new(config.api_url.clone());
    let store = Arc::new(Mutex::new(ConversationStore::load().await?));
    let orchestrator = ChatOrchestrator::new(api, store.clone());
    let user = UserConfig::load().await;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let mut printed_thinking = 0usize;
    let mut printed_response = 0usize;
    let result = orchestrator
        .send_message(&message, &user.username, cancel, |session| {
            if session.thinking_text.len() > printed_thinking {
                print!("{}", session.thinking_text[printed_thinking..].dimmed());
                printed_thinking = session.thinking_text.len();
            }
            if session.response_text.len() > printed_response {
                if printed_response == 0 && printed_thinking > 0 {
                    println!();
                }
                print!("{}", &session.response_text[printed_response..]);
                printed_response = session.response_text.len();
            }
            let _ = std::io::stdout().flush();
        })
        .await;
    println!();

    match result {
        Ok(message_id) => {
            let store = store.lock().await;
            let reply = store
                .current_conversation()
                .and_then(|c| c.messages.iter().find(|m| m.id == message_id));
            if let Some(reply) = reply {
                if let Some(followups) = &reply.followup_questions {
                    println!("\n{}", "You could ask next:".bold());
                    for question in &followups.followups {
                        println!("  - {}", question);
                    }
                }
                println!(
                    "\n{} {}",
                    "message id (for feedback):".dimmed(),
                    reply.id.dimmed()
                );
            }
            Ok(())
        }
        Err(ClientError::Cancelled) => {
            println!("{}", "cancelled".yellow());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
