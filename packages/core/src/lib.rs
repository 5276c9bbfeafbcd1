// ABOUTME: Core types and utilities for Ragline
// ABOUTME: Shared data model for conversations, RAG documents, and citation metadata

pub mod constants;
pub mod keys;
pub mod types;
pub mod utils;

// Re-export main types
pub use types::{
    ChatMessage, ChunkMetadata, Conversation, DocumentCitationMetadata, DocumentSource,
    FeedbackSign, FollowupQuestions, MessageFeedback, RagDocument, Role, SourceKind,
};

// Re-export constants
pub use constants::{conversations_file, ragline_dir, user_config_file, CONVERSATIONS_VERSION};

// Re-export citation key helpers
pub use keys::{is_uuid_key, normalize_citation_key, unbraced_citation_key};

// Re-export utilities
pub use utils::{derive_conversation_title, generate_id};
