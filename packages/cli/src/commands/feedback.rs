// ABOUTME: Submits thumbs-up/down feedback for an assistant message

use std::sync::Arc;

use anyhow::Result;
use clap::ValueEnum;
use colored::*;
use tokio::sync::Mutex;

use ragline_client::{ChatOrchestrator, LlmApiClient};
use ragline_core::FeedbackSign;
use ragline_storage::ConversationStore;

use crate::config::Config;

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SignArg {
    Positive,
    Negative,
    Neutral,
}

impl From<SignArg> for FeedbackSign {
    fn from(sign: SignArg) -> Self {
        match sign {
            SignArg::Positive => FeedbackSign::Positive,
            SignArg::Negative => FeedbackSign::Negative,
            SignArg::Neutral => FeedbackSign::Neutral,
        }
    }
}

pub async fn handle_feedback_command(
    config: &Config,
    message_id: String,
    sign: SignArg,
    comment: Option<String>,
) -> Result<()> {
    let api = LlmApiClient::new(config.api_url.clone());
    let store = Arc::new(Mutex::new(ConversationStore::load().await?));
    let orchestrator = ChatOrchestrator::new(api, store);

    match orchestrator
        .submit_feedback(&message_id, sign.into(), comment)
        .await
    {
        Ok(()) => {
            println!("{}", "Feedback recorded.".green());
            Ok(())
        }
        Err(ragline_client::ClientError::Storage(e)) => Err(e.into()),
        Err(e) => {
            // The local record was written before the remote call
            println!(
                "{} {}",
                "Feedback saved locally, but submission failed:".yellow(),
                e
            );
            Ok(())
        }
    }
}
