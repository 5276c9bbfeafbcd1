// ABOUTME: Conversation store with JSON file persistence
// ABOUTME: Owns the conversation list; messages are appended, never rewritten across sessions

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, error, warn};

use ragline_core::constants::{conversations_file, ragline_dir, CONVERSATIONS_VERSION};
use ragline_core::utils::derive_conversation_title;
use ragline_core::{ChatMessage, Conversation, FeedbackSign, MessageFeedback, Role};

use crate::{StorageError, StorageResult};

/// On-disk shape of the conversation list. Timestamps serialize as ISO
/// strings and round-trip back into date values on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationsFile {
    pub version: String,
    pub conversations: Vec<Conversation>,
}

impl Default for ConversationsFile {
    fn default() -> Self {
        Self {
            version: CONVERSATIONS_VERSION.to_string(),
            conversations: Vec::new(),
        }
    }
}

/// Exclusive owner of the conversation list.
///
/// All mutation goes through this store; the orchestrator only ever touches
/// the single in-flight message of the current conversation.
#[derive(Debug)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    current_id: Option<String>,
    path: PathBuf,
}

impl ConversationStore {
    /// Load the store from the default location (~/.ragline/conversations.json)
    pub async fn load() -> StorageResult<Self> {
        Self::load_from(conversations_file()).await
    }

    /// Load the store from a specific file, degrading to an empty list when
    /// the file is missing or unparsable.
    pub async fn load_from(path: PathBuf) -> StorageResult<Self> {
        let file = match fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<ConversationsFile>(&content) {
                Ok(file) => {
                    debug!("loaded {} conversations", file.conversations.len());
                    file
                }
                Err(e) => {
                    error!("failed to parse {:?}: {}", path, e);
                    warn!("starting with an empty conversation list");
                    ConversationsFile::default()
                }
            },
            Err(_) => ConversationsFile::default(),
        };

        let current_id = file.conversations.first().map(|c| c.id.clone());
        Ok(Self {
            conversations: file.conversations,
            current_id,
            path,
        })
    }

    /// Persist the conversation list to disk
    pub async fn save(&self) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                debug!("creating storage directory: {:?}", parent);
                fs::create_dir_all(parent).await?;
            }
        }
        let file = ConversationsFile {
            version: CONVERSATIONS_VERSION.to_string(),
            conversations: self.conversations.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(&self.path, json).await?;
        debug!("wrote {} conversations to disk", self.conversations.len());
        Ok(())
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn current_conversation(&self) -> Option<&Conversation> {
        let id = self.current_id.as_deref()?;
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn current_conversation_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    /// Create and select a new conversation. The list is ordered most recent
    /// first, so the newest conversation is re-selected on the next load.
    pub fn create_conversation(&mut self, title: Option<String>) -> &Conversation {
        let title =
            title.unwrap_or_else(|| format!("Conversation {}", self.conversations.len() + 1));
        let conversation = Conversation::new(title);
        self.current_id = Some(conversation.id.clone());
        self.conversations.insert(0, conversation);
        self.conversations.first().expect("just inserted")
    }

    pub fn select_conversation(&mut self, id: &str) -> bool {
        if self.conversations.iter().any(|c| c.id == id) {
            self.current_id = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// Delete a conversation; selection falls back to the first remaining one
    pub fn delete_conversation(&mut self, id: &str) -> bool {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != id);
        let removed = self.conversations.len() < before;
        if removed && self.current_id.as_deref() == Some(id) {
            self.current_id = self.conversations.first().map(|c| c.id.clone());
        }
        removed
    }

    /// Append a message to the current conversation, creating one first if
    /// none is selected. The first user message titles a new conversation.
    /// Returns `(conversation_id, message_id)`.
    pub fn append_message(&mut self, message: ChatMessage) -> (String, String) {
        if self.current_conversation().is_none() {
            let title = (message.role == Role::User && !message.content.trim().is_empty())
                .then(|| derive_conversation_title(&message.content));
            self.create_conversation(title);
        }
        let message_id = message.id.clone();
        let conversation = self
            .current_conversation_mut()
            .expect("conversation created above");
        conversation.push_message(message);
        (conversation.id.clone(), message_id)
    }

    /// Mutate a single message in place. Other messages are never touched,
    /// so this is safe to call many times per second while streaming.
    pub fn update_message(
        &mut self,
        conversation_id: &str,
        message_id: &str,
        update: impl FnOnce(&mut ChatMessage),
    ) -> StorageResult<()> {
        let conversation = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
            .ok_or_else(|| StorageError::ConversationNotFound(conversation_id.to_string()))?;
        let message = conversation
            .message_mut(message_id)
            .ok_or_else(|| StorageError::MessageNotFound(message_id.to_string()))?;
        update(message);
        Ok(())
    }

    /// Optimistically record feedback on a message before any network call.
    /// Returns the server-assigned message id to correlate the remote
    /// submission, when the message has one.
    pub fn record_feedback(
        &mut self,
        message_id: &str,
        sign: FeedbackSign,
        comment: Option<String>,
    ) -> StorageResult<Option<String>> {
        let message = self
            .conversations
            .iter_mut()
            .flat_map(|c| c.messages.iter_mut())
            .find(|m| m.id == message_id)
            .ok_or_else(|| StorageError::MessageNotFound(message_id.to_string()))?;
        message.feedback = Some(MessageFeedback::new(message_id, sign, comment));
        Ok(message.api_message_id.clone())
    }

    fn current_conversation_mut(&mut self) -> Option<&mut Conversation> {
        let id = self.current_id.clone()?;
        self.conversations.iter_mut().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_helpers::with_temp_home;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_persistence_round_trip_keeps_timestamps() {
        with_temp_home(|| async {
            let mut store = ConversationStore::load().await.unwrap();
            store.append_message(ChatMessage::user("what is the isolation procedure?"));
            let saved_at = store.conversations()[0].messages[0].timestamp;
            store.save().await.unwrap();

            let restored = ConversationStore::load().await.unwrap();
            assert_eq!(restored.conversations().len(), 1);
            // The timestamp deserializes to an equal instant, not a string
            assert_eq!(restored.conversations()[0].messages[0].timestamp, saved_at);
        })
        .await;
    }

    #[tokio::test]
    async fn test_first_user_message_titles_conversation() {
        with_temp_home(|| async {
            let mut store = ConversationStore::load().await.unwrap();
            store.append_message(ChatMessage::user("pump curve for P-101"));
            assert_eq!(store.conversations()[0].title, "pump curve for P-101");
        })
        .await;
    }

    #[tokio::test]
    async fn test_corrupt_file_degrades_to_empty() {
        with_temp_home(|| async {
            fs::create_dir_all(ragline_dir()).await.unwrap();
            fs::write(conversations_file(), "{not json").await.unwrap();
            let store = ConversationStore::load().await.unwrap();
            assert!(store.conversations().is_empty());
        })
        .await;
    }

    #[tokio::test]
    async fn test_newest_conversation_is_current_after_reload() {
        with_temp_home(|| async {
            let mut store = ConversationStore::load().await.unwrap();
            store.create_conversation(Some("older".into()));
            let newest = store.create_conversation(Some("newer".into())).id.clone();
            store.save().await.unwrap();

            let restored = ConversationStore::load().await.unwrap();
            assert_eq!(restored.current_conversation_id(), Some(newest.as_str()));
        })
        .await;
    }

    #[tokio::test]
    async fn test_select_conversation() {
        with_temp_home(|| async {
            let mut store = ConversationStore::load().await.unwrap();
            let first = store.create_conversation(Some("one".into())).id.clone();
            store.create_conversation(Some("two".into()));

            assert!(store.select_conversation(&first));
            assert_eq!(store.current_conversation_id(), Some(first.as_str()));
            assert!(!store.select_conversation("missing"));
        })
        .await;
    }

    #[tokio::test]
    async fn test_delete_reselects_first_remaining() {
        with_temp_home(|| async {
            let mut store = ConversationStore::load().await.unwrap();
            let first = store.create_conversation(Some("one".into())).id.clone();
            let second = store.create_conversation(Some("two".into())).id.clone();
            assert_eq!(store.current_conversation_id(), Some(second.as_str()));

            assert!(store.delete_conversation(&second));
            assert_eq!(store.current_conversation_id(), Some(first.as_str()));
            assert!(!store.delete_conversation("missing"));
        })
        .await;
    }

    #[tokio::test]
    async fn test_update_message_touches_only_target() {
        with_temp_home(|| async {
            let mut store = ConversationStore::load().await.unwrap();
            let (conversation_id, user_id) =
                store.append_message(ChatMessage::user("question"));
            let (_, assistant_id) =
                store.append_message(ChatMessage::assistant_placeholder());

            store
                .update_message(&conversation_id, &assistant_id, |m| {
                    m.content = "partial answer".to_string();
                })
                .unwrap();

            let conversation = store.current_conversation().unwrap();
            assert_eq!(conversation.messages[0].id, user_id);
            assert_eq!(conversation.messages[0].content, "question");
            assert_eq!(conversation.messages[1].content, "partial answer");
        })
        .await;
    }

    #[tokio::test]
    async fn test_record_feedback_is_local_first() {
        with_temp_home(|| async {
            let mut store = ConversationStore::load().await.unwrap();
            let mut message = ChatMessage::assistant_placeholder();
            message.api_message_id = Some("api-77".to_string());
            let (_, message_id) = store.append_message(message);

            let api_id = store
                .record_feedback(&message_id, FeedbackSign::Positive, Some("good".into()))
                .unwrap();
            assert_eq!(api_id.as_deref(), Some("api-77"));

            let recorded = &store.conversations()[0].messages[0];
            let feedback = recorded.feedback.as_ref().unwrap();
            assert_eq!(feedback.sign, FeedbackSign::Positive);
            assert_eq!(feedback.comment.as_deref(), Some("good"));
        })
        .await;
    }
}
