// ABOUTME: Data model for conversations, messages, RAG documents, and citation metadata
// ABOUTME: Wire-format field names are preserved via serde renames

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::utils::generate_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn in a conversation. Assistant messages additionally carry the
/// parallel text channels and citation metadata produced while streaming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<MessageFeedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag_documents: Option<Vec<RagDocument>>,
    /// Message id assigned by the API, used for feedback correlation.
    /// Distinct from the client-generated `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooling_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_metadata: Option<HashMap<String, DocumentCitationMetadata>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followup_questions: Option<FollowupQuestions>,
    /// Citation-resolved form of `content`, kept separate so the resolver can
    /// always re-run over the raw text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_content: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content.into(), Role::User)
    }

    /// Empty assistant message inserted before the stream starts; its fields
    /// are filled in as stream snapshots arrive.
    pub fn assistant_placeholder() -> Self {
        Self::new(String::new(), Role::Assistant)
    }

    fn new(content: String, role: Role) -> Self {
        Self {
            id: generate_id(),
            content,
            role,
            timestamp: Utc::now(),
            feedback: None,
            rag_documents: None,
            api_message_id: None,
            thinking_text: None,
            tooling_text: None,
            citation_metadata: None,
            followup_questions: None,
            display_content: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackSign {
    Positive,
    Negative,
    Neutral,
}

impl FeedbackSign {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackSign::Positive => "positive",
            FeedbackSign::Negative => "negative",
            FeedbackSign::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageFeedback {
    pub id: String,
    pub message_id: String,
    pub sign: FeedbackSign,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl MessageFeedback {
    pub fn new(message_id: impl Into<String>, sign: FeedbackSign, comment: Option<String>) -> Self {
        Self {
            id: generate_id(),
            message_id: message_id.into(),
            sign,
            timestamp: Utc::now(),
            comment,
        }
    }
}

/// Ordered sequence of messages, owned exclusively by the conversation store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            title: title.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    pub fn message_mut(&mut self, message_id: &str) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Documents published in an external registry, cited by accession number
    External,
    /// Internal controlled documents, cited by eDoc id
    Internal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSource {
    pub id: String,
    pub name: String,
    pub kind: SourceKind,
    pub requires_auth: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_groups: Option<Vec<String>>,
}

/// A retrieval-augmented-generation source document surfaced by the backend
/// as supporting evidence for a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    pub source: DocumentSource,
    /// Registry accession number, required to cite an external document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accession_number: Option<String>,
    /// Internal document id, required to cite an internal document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edoc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

/// Describes one retrievable source document, delivered out-of-band on a
/// `metadata:` stream line. Field names match the wire format.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentCitationMetadata {
    #[serde(rename = "DocumentTitle", default)]
    pub document_title: String,
    #[serde(rename = "eDocID", default, skip_serializing_if = "Option::is_none")]
    pub edoc_id: Option<String>,
    #[serde(rename = "Revision", default)]
    pub revision: String,
    #[serde(rename = "PathName", default)]
    pub path_name: String,
    #[serde(rename = "FileName", default)]
    pub file_name: String,
    #[serde(rename = "SWMSStatus", default)]
    pub swms_status: String,
    #[serde(rename = "SWMSTitle", default)]
    pub swms_title: String,
    #[serde(rename = "Category", default)]
    pub category: String,
    #[serde(rename = "DocType", default)]
    pub doc_type: String,
    #[serde(rename = "Chunks", default)]
    pub chunks: Vec<ChunkMetadata>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default)]
    pub chunk_id: String,
    #[serde(default)]
    pub pages: Vec<u32>,
    /// JSON string mapping page number to an array of `[x1, y1, x2, y2]` boxes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_boxes: Option<String>,
    #[serde(default)]
    pub relevance_score: f64,
}

impl ChunkMetadata {
    /// Decode the bounding-box JSON string into page -> boxes. A malformed or
    /// absent payload degrades to "no highlight available", never an error.
    pub fn decoded_bounding_boxes(&self) -> HashMap<u32, Vec<[f64; 4]>> {
        let Some(raw) = self.bounding_boxes.as_deref() else {
            return HashMap::new();
        };
        match serde_json::from_str(raw) {
            Ok(boxes) => boxes,
            Err(e) => {
                warn!(chunk_id = %self.chunk_id, error = %e, "malformed bounding_boxes JSON, skipping highlight");
                HashMap::new()
            }
        }
    }

    /// Human-readable page range, e.g. "3" or "3-7".
    pub fn format_pages(&self) -> String {
        match self.pages.as_slice() {
            [] => "N/A".to_string(),
            [only] => only.to_string(),
            [first, .., last] => format!("{}-{}", first, last),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowupQuestions {
    pub topic: String,
    pub followups: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_citation_metadata_wire_names() {
        let json = r#"{
            "DocumentTitle": "Pump Maintenance Procedure",
            "eDocID": "EDOC-4411",
            "Revision": "3",
            "PathName": "/docs/procedures",
            "FileName": "pump-maintenance.pdf",
            "SWMSStatus": "Approved",
            "SWMSTitle": "Pump SWMS",
            "Category": "Procedure",
            "DocType": "PDF",
            "Chunks": [
                {
                    "chunk_id": "c1",
                    "pages": [2, 3],
                    "bounding_boxes": "{\"2\": [[0.1, 0.2, 0.8, 0.4]]}",
                    "relevance_score": 0.91
                }
            ]
        }"#;

        let meta: DocumentCitationMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.document_title, "Pump Maintenance Procedure");
        assert_eq!(meta.edoc_id.as_deref(), Some("EDOC-4411"));
        assert_eq!(meta.chunks.len(), 1);
        assert_eq!(meta.chunks[0].format_pages(), "2-3");

        let boxes = meta.chunks[0].decoded_bounding_boxes();
        assert_eq!(boxes[&2], vec![[0.1, 0.2, 0.8, 0.4]]);
    }

    #[test]
    fn test_partial_citation_metadata_still_parses() {
        // The backend omits fields freely; missing values default
        let meta: DocumentCitationMetadata =
            serde_json::from_str(r#"{"DocumentTitle": "X"}"#).unwrap();
        assert_eq!(meta.document_title, "X");
        assert!(meta.edoc_id.is_none());
        assert!(meta.chunks.is_empty());
    }

    #[test]
    fn test_malformed_bounding_boxes_degrade() {
        let chunk = ChunkMetadata {
            chunk_id: "c9".to_string(),
            pages: vec![1],
            bounding_boxes: Some("{not json".to_string()),
            relevance_score: 0.5,
        };
        assert!(chunk.decoded_bounding_boxes().is_empty());
    }

    #[test]
    fn test_format_pages_empty() {
        let chunk = ChunkMetadata::default();
        assert_eq!(chunk.format_pages(), "N/A");
    }

    #[test]
    fn test_message_timestamp_round_trip() {
        let message = ChatMessage::user("hello");
        let json = serde_json::to_string(&message).unwrap();
        let restored: ChatMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.timestamp, message.timestamp);
        assert_eq!(restored, message);
    }
}
