// ABOUTME: Per-turn streaming session state
// ABOUTME: Append-only channel text plus sideband data, immutable once terminal

use std::collections::HashMap;

use ragline_core::{DocumentCitationMetadata, FollowupQuestions};

/// One user turn's streaming lifecycle.
///
/// Created when the user submits a message, mutated by each parsed stream
/// fragment, and frozen once `is_complete` is true or `error` is set (an
/// error also marks the session complete).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSession {
    pub session_id: String,
    pub user_query: String,
    pub username: String,
    pub thinking_text: String,
    pub tooling_text: String,
    pub response_text: String,
    /// Populated at most once per session, from a `metadata:` control line.
    /// Keys are stored in canonical braced-UUID form.
    pub metadata: Option<HashMap<String, DocumentCitationMetadata>>,
    pub followup_questions: Option<FollowupQuestions>,
    /// Server-assigned message id from the `x-message-id` response header,
    /// independent of the stream body.
    pub message_id: Option<String>,
    pub is_complete: bool,
    pub error: Option<String>,
}

impl StreamSession {
    pub fn new(
        session_id: impl Into<String>,
        user_query: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_query: user_query.into(),
            username: username.into(),
            ..Self::default()
        }
    }

    /// Terminal states are not mutually exclusive: a failed session is also
    /// complete.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.is_complete = true;
    }

    pub fn complete(&mut self) {
        self.is_complete = true;
    }

    pub fn is_terminal(&self) -> bool {
        self.is_complete || self.error.is_some()
    }
}
