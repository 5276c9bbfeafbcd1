// ABOUTME: Line-level stream parser wiring the demultiplexer and sideband extractor
// ABOUTME: Feeds raw transport chunks, publishes full-session snapshots on change

use tracing::debug;

use crate::demux::TagDemux;
use crate::lines::LineBuffer;
use crate::session::StreamSession;
use crate::sideband::{self, SidebandLine};

/// Drives one streaming response: splits transport chunks into lines, routes
/// `data:` content through the tag demultiplexer and sideband lines through
/// the extractor, and keeps a [`StreamSession`] snapshot current.
#[derive(Debug)]
pub struct StreamParser {
    lines: LineBuffer,
    demux: TagDemux,
    session: StreamSession,
}

impl StreamParser {
    pub fn new(session: StreamSession) -> Self {
        Self {
            lines: LineBuffer::new(),
            demux: TagDemux::new(),
            session,
        }
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    /// Record the server-assigned message id from the `x-message-id` header.
    pub fn set_message_id(&mut self, message_id: Option<String>) {
        self.session.message_id = message_id;
    }

    /// Consume one transport chunk. Returns true when the session snapshot
    /// changed and should be republished.
    pub fn feed(&mut self, chunk: &str) -> bool {
        let mut changed = false;
        for line in self.lines.push(chunk) {
            changed |= self.process_line(&line);
        }
        changed
    }

    /// End of stream: flush any buffered partial line and mark the session
    /// complete regardless of whether the last fragment closed a tag.
    pub fn finish(&mut self) -> &StreamSession {
        if let Some(tail) = self.lines.take_remainder() {
            self.process_line(&tail);
        }
        self.sync_channels();
        self.session.complete();
        &self.session
    }

    /// Transport failure: record the error and freeze the session.
    pub fn fail(&mut self, error: impl Into<String>) -> &StreamSession {
        self.session.fail(error);
        &self.session
    }

    fn process_line(&mut self, line: &str) -> bool {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            return false;
        }

        if let Some(payload) = line.strip_prefix("data:") {
            let content = decode_data_payload(payload);
            if self.demux.feed(&content) {
                self.sync_channels();
                return true;
            }
            return false;
        }

        match sideband::classify(line) {
            Some(SidebandLine::Metadata(payload)) => {
                // First valid occurrence wins; later metadata lines are ignored.
                if self.session.metadata.is_some() {
                    debug!("metadata already set for session, ignoring line");
                    return false;
                }
                match sideband::parse_metadata(payload) {
                    Some(map) => {
                        self.session.metadata = Some(map);
                        true
                    }
                    None => false,
                }
            }
            Some(SidebandLine::Followups(payload)) => {
                if self.session.followup_questions.is_some() {
                    debug!("followup questions already set for session, ignoring line");
                    return false;
                }
                match sideband::parse_followups(payload) {
                    Some(followups) => {
                        self.session.followup_questions = Some(followups);
                        true
                    }
                    None => false,
                }
            }
            Some(SidebandLine::Tool(payload)) => match sideband::parse_tool(payload) {
                Some(value) => {
                    self.demux.set_tooling(value);
                    self.sync_channels();
                    true
                }
                None => false,
            },
            None => {
                debug!(line, "ignoring unrecognized stream line");
                false
            }
        }
    }

    fn sync_channels(&mut self) {
        self.session.thinking_text = self.demux.thinking().to_string();
        self.session.tooling_text = self.demux.tooling().to_string();
        self.session.response_text = self.demux.response().to_string();
    }
}

/// Content of a `data:` line. The server sends either a raw string or a
/// JSON-encoded string; the latter is decoded once.
fn decode_data_payload(payload: &str) -> String {
    let content = payload.strip_prefix(' ').unwrap_or(payload);
    let trimmed = content.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        if let Ok(decoded) = serde_json::from_str::<String>(trimmed) {
            return decoded;
        }
    }
    content.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parser() -> StreamParser {
        StreamParser::new(StreamSession::new("session-1", "query", "user"))
    }

    #[test]
    fn test_end_to_end_fragments() {
        let mut parser = parser();
        for chunk in [
            "data: <think>\n",
            "data: reasoning\n",
            "data: </think>\n",
            "data: <response>\n",
            "data: Answer [Source: 1]\n",
            "data: </response>\n",
        ] {
            parser.feed(chunk);
        }
        let session = parser.finish();
        assert_eq!(session.thinking_text, "reasoning");
        assert_eq!(session.response_text, "Answer [Source: 1]");
        assert!(session.is_complete);
        assert!(session.error.is_none());
    }

    #[test]
    fn test_chunks_split_mid_line() {
        let mut parser = parser();
        parser.feed("data: <think>hel");
        parser.feed("lo</think>\n");
        let session = parser.finish();
        assert_eq!(session.thinking_text, "hello");
    }

    #[test]
    fn test_json_encoded_data_content() {
        let mut parser = parser();
        parser.feed("data: \"<response>quoted text</response>\"\n");
        assert_eq!(parser.session().response_text, "quoted text");
    }

    #[test]
    fn test_metadata_line_first_wins() {
        let mut parser = parser();
        assert!(parser.feed("metadata: {\"k\": {\"DocumentTitle\": \"First\"}}\n"));
        assert!(!parser.feed("metadata: {\"k\": {\"DocumentTitle\": \"Second\"}}\n"));
        let metadata = parser.session().metadata.as_ref().unwrap();
        assert_eq!(metadata["k"].document_title, "First");
    }

    #[test]
    fn test_malformed_sideband_does_not_abort_stream() {
        let mut parser = parser();
        assert!(!parser.feed("metadata: {broken\n"));
        assert!(parser.feed("data: <response>still works</response>\n"));
        let session = parser.finish();
        assert_eq!(session.response_text, "still works");
        assert!(session.error.is_none());
    }

    #[test]
    fn test_tool_line_replaces_tooling_channel() {
        let mut parser = parser();
        parser.feed("data: <tooling>legacy</tooling>\n");
        parser.feed("tool: {\"action\": \"fresh\"}\n");
        assert_eq!(parser.session().tooling_text, "fresh");
    }

    #[test]
    fn test_followup_questions_line() {
        let mut parser = parser();
        parser.feed("followup_questions: {\"topic\": \"valves\", \"followups\": [\"q1\"]}\n");
        let followups = parser.session().followup_questions.as_ref().unwrap();
        assert_eq!(followups.topic, "valves");
    }

    #[test]
    fn test_unterminated_final_line_flushed_on_finish() {
        let mut parser = parser();
        parser.feed("data: <response>tail");
        let session = parser.finish();
        assert_eq!(session.response_text, "tail");
        assert!(session.is_complete);
    }

    #[test]
    fn test_transport_failure_freezes_session() {
        let mut parser = parser();
        parser.feed("data: <response>partial</response>\n");
        let session = parser.fail("connection reset");
        assert!(session.is_complete);
        assert_eq!(session.error.as_deref(), Some("connection reset"));
        assert_eq!(session.response_text, "partial");
    }
}
