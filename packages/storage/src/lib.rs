// ABOUTME: Local persistence for Ragline
// ABOUTME: Conversations and user config as JSON files under ~/.ragline

pub mod conversations;
pub mod test_utils;
pub mod user_config;

use thiserror::Error;

pub use conversations::{ConversationStore, ConversationsFile};
pub use user_config::UserConfig;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),
    #[error("Message not found: {0}")]
    MessageNotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
