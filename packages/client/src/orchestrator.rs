// ABOUTME: Drives one user turn end-to-end against the streaming backend
// ABOUTME: Feeds the parser, republishes snapshots, resolves citations, persists

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use ragline_citations::CitationResolver;
use ragline_core::{ChatMessage, FeedbackSign, RagDocument};
use ragline_storage::ConversationStore;
use ragline_stream::{StreamParser, StreamSession};

use crate::api::LlmApiClient;
use crate::error::{ClientError, ClientResult};

/// Assistant text shown when the stream fails before producing a response.
pub const STREAM_FAILURE_MESSAGE: &str =
    "The request failed. Please try sending your message again.";

/// Coordinates a single conversation turn: appends the user message, opens
/// the stream, and publishes parsed snapshots into the conversation store.
/// At most one turn is in flight at a time; overlapping sends are rejected.
pub struct ChatOrchestrator {
    api: LlmApiClient,
    resolver: CitationResolver,
    store: Arc<Mutex<ConversationStore>>,
    in_flight: AtomicBool,
}

impl ChatOrchestrator {
    pub fn new(api: LlmApiClient, store: Arc<Mutex<ConversationStore>>) -> Self {
        let resolver = CitationResolver::with_api_base(api.base_url().clone());
        Self {
            api,
            resolver,
            store,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Run one user turn. `on_update` is invoked with every session snapshot
    /// so a front-end can repaint incrementally. Returns the id of the
    /// assistant message that accumulated the response.
    pub async fn send_message<F>(
        &self,
        user_query: &str,
        username: &str,
        cancel: CancellationToken,
        mut on_update: F,
    ) -> ClientResult<String>
    where
        F: FnMut(&StreamSession),
    {
        let _turn = TurnGuard::acquire(&self.in_flight)?;

        let (conversation_id, assistant_id) = {
            let mut store = self.store.lock().await;
            store.append_message(ChatMessage::user(user_query));
            let (conversation_id, assistant_id) =
                store.append_message(ChatMessage::assistant_placeholder());
            store.save().await?;
            (conversation_id, assistant_id)
        };

        // The conversation id doubles as the backend session id, keeping
        // retrieval context stable across turns of the same conversation.
        let mut parser = StreamParser::new(StreamSession::new(
            conversation_id.clone(),
            user_query,
            username,
        ));

        let stream = match self
            .api
            .chat_stream(user_query, username, &conversation_id)
            .await
        {
            Ok((message_id, stream)) => {
                parser.set_message_id(message_id);
                stream
            }
            Err(e) => {
                warn!("failed to open chat stream: {}", e);
                parser.fail(e.to_string());
                self.apply_failure(&conversation_id, &assistant_id).await?;
                return Err(e);
            }
        };
        tokio::pin!(stream);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("turn cancelled, discarding partial response");
                    self.discard_partial(&conversation_id, &assistant_id).await?;
                    return Err(ClientError::Cancelled);
                }
                chunk = stream.next() => match chunk {
                    Some(Ok(text)) => {
                        if parser.feed(&text) {
                            self.apply_snapshot(&conversation_id, &assistant_id, parser.session())
                                .await?;
                            on_update(parser.session());
                        }
                    }
                    Some(Err(e)) => {
                        warn!("chat stream failed mid-turn: {}", e);
                        parser.fail(e.to_string());
                        self.apply_failure(&conversation_id, &assistant_id).await?;
                        return Err(e);
                    }
                    None => break,
                }
            }
        }

        let session = parser.finish().clone();
        self.apply_snapshot(&conversation_id, &assistant_id, &session)
            .await?;
        on_update(&session);
        self.store.lock().await.save().await?;
        Ok(assistant_id)
    }

    /// Record feedback locally first, then submit it remotely when the
    /// message has a server-assigned id. The local record stands even when
    /// the remote submission fails.
    pub async fn submit_feedback(
        &self,
        message_id: &str,
        sign: FeedbackSign,
        comment: Option<String>,
    ) -> ClientResult<()> {
        let api_message_id = {
            let mut store = self.store.lock().await;
            let api_message_id = store.record_feedback(message_id, sign, comment.clone())?;
            store.save().await?;
            api_message_id
        };

        match api_message_id {
            Some(api_message_id) => {
                self.api
                    .submit_feedback(&api_message_id, sign, comment.as_deref())
                    .await
            }
            None => {
                debug!(message_id, "no server message id, feedback kept local only");
                Ok(())
            }
        }
    }

    /// Attach the supporting documents for an assistant message and
    /// re-resolve its display text from the raw response. Surfaces that fetch
    /// RAG documents out-of-band call this once they arrive; index and
    /// identifier citations resolve against them even without a metadata map.
    pub async fn attach_documents(
        &self,
        conversation_id: &str,
        message_id: &str,
        documents: Vec<RagDocument>,
    ) -> ClientResult<()> {
        let resolver = &self.resolver;
        let mut store = self.store.lock().await;
        store.update_message(conversation_id, message_id, |message| {
            let display = (!message.content.is_empty()).then(|| {
                resolver.resolve(
                    &message.content,
                    &documents,
                    message.citation_metadata.as_ref(),
                )
            });
            message.rag_documents = Some(documents);
            if display.is_some() {
                message.display_content = display;
            }
        })?;
        store.save().await?;
        Ok(())
    }

    /// Copy a session snapshot into the in-flight assistant message. Only
    /// that one message is mutated, so repeated calls while streaming never
    /// disturb already-rendered messages.
    async fn apply_snapshot(
        &self,
        conversation_id: &str,
        message_id: &str,
        session: &StreamSession,
    ) -> ClientResult<()> {
        let resolver = &self.resolver;
        let mut store = self.store.lock().await;
        store.update_message(conversation_id, message_id, |message| {
            message.content = session.response_text.clone();
            message.thinking_text = non_empty(&session.thinking_text);
            message.tooling_text = non_empty(&session.tooling_text);
            message.citation_metadata = session.metadata.clone();
            message.followup_questions = session.followup_questions.clone();
            message.api_message_id = session.message_id.clone();

            // Resolution always re-runs over the raw response text, so
            // repeated snapshots never double-wrap references.
            let documents = message.rag_documents.as_deref().unwrap_or(&[]);
            if !session.response_text.is_empty()
                && (session.metadata.is_some() || !documents.is_empty())
            {
                let display =
                    resolver.resolve(&session.response_text, documents, session.metadata.as_ref());
                message.display_content = Some(display);
            }
        })?;
        Ok(())
    }

    async fn apply_failure(&self, conversation_id: &str, message_id: &str) -> ClientResult<()> {
        let mut store = self.store.lock().await;
        store.update_message(conversation_id, message_id, |message| {
            message.content = STREAM_FAILURE_MESSAGE.to_string();
            message.display_content = None;
        })?;
        store.save().await?;
        Ok(())
    }

    /// Cancellation discards the partial text; the placeholder stays in the
    /// conversation but renders empty.
    async fn discard_partial(&self, conversation_id: &str, message_id: &str) -> ClientResult<()> {
        let mut store = self.store.lock().await;
        store.update_message(conversation_id, message_id, |message| {
            message.content.clear();
            message.thinking_text = None;
            message.tooling_text = None;
            message.display_content = None;
        })?;
        store.save().await?;
        Ok(())
    }
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

/// Releases the in-flight flag when the turn ends, on any exit path.
struct TurnGuard<'a>(&'a AtomicBool);

impl<'a> TurnGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> ClientResult<Self> {
        if flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ClientError::TurnInFlight);
        }
        Ok(Self(flag))
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
