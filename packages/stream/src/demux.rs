// ABOUTME: Tag-stream demultiplexer splitting one text stream into three channels
// ABOUTME: Handles tag markers split across chunk boundaries and the inline (tool: ...) syntax

use tracing::debug;

use crate::sideband;

/// One of the three parallel text accumulators multiplexed onto the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Thinking,
    Tooling,
    Response,
}

#[derive(Debug, Clone, Copy)]
enum Marker {
    Open(Channel),
    Close,
}

const MARKERS: [(&str, Marker); 6] = [
    ("<think>", Marker::Open(Channel::Thinking)),
    ("</think>", Marker::Close),
    ("<response>", Marker::Open(Channel::Response)),
    ("</response>", Marker::Close),
    ("<tooling>", Marker::Open(Channel::Tooling)),
    ("</tooling>", Marker::Close),
];

/// Longest retained run of untagged content that could still be the start of
/// a marker arriving in the next fragment.
const PARTIAL_TAG_LIMIT: usize = 15;

/// Incrementally splits incoming text fragments into the thinking, tooling,
/// and response channels.
///
/// A single tag buffer accumulates content until a marker can be recognized or
/// ruled out, so markers split exactly at a fragment boundary still match once
/// the rest arrives. Content seen before any opening tag is discarded rather
/// than buffered indefinitely.
#[derive(Debug, Default)]
pub struct TagDemux {
    buffer: String,
    current: Option<Channel>,
    thinking: String,
    tooling: String,
    response: String,
}

impl TagDemux {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thinking(&self) -> &str {
        &self.thinking
    }

    pub fn tooling(&self) -> &str {
        &self.tooling
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    /// Replace the tooling channel's value wholesale. Used by the inline
    /// `(tool: ...)` syntax and the `tool:` sideband line; tool calls
    /// overwrite, they never append.
    pub fn set_tooling(&mut self, value: String) {
        self.tooling = value;
    }

    /// Consume one text fragment. Returns true when any channel changed, in
    /// which case the caller publishes a snapshot of all three channels.
    pub fn feed(&mut self, fragment: &str) -> bool {
        self.buffer.push_str(fragment);

        let mut changed = self.extract_inline_tool_calls();

        // Strip every fully-matched tag marker, routing the text between
        // markers to whichever channel is currently open.
        while let Some((index, text, marker)) = self.find_marker() {
            if index > 0 {
                let before: String = self.buffer[..index].to_string();
                if let Some(channel) = self.current {
                    self.append(channel, &before);
                    changed = true;
                }
            }
            self.buffer.replace_range(..index + text.len(), "");
            match marker {
                Marker::Open(channel) => self.current = Some(channel),
                Marker::Close => self.current = None,
            }
        }

        if self.buffer.is_empty() {
            return changed;
        }

        if let Some(channel) = self.current {
            // Inside a channel the whole remainder belongs to it.
            let rest = std::mem::take(&mut self.buffer);
            self.append(channel, &rest);
            changed = true;
        } else if self.buffer.len() > PARTIAL_TAG_LIMIT {
            // Too long to be a partial marker; noise between tags.
            debug!(discarded = self.buffer.len(), "discarding untagged stream content");
            self.buffer.clear();
        }
        // Short untagged remainders are retained as a possible partial tag.

        changed
    }

    fn find_marker(&self) -> Option<(usize, &'static str, Marker)> {
        let mut earliest: Option<(usize, &'static str, Marker)> = None;
        for (text, marker) in MARKERS {
            if let Some(index) = self.buffer.find(text) {
                if earliest.map_or(true, |(best, _, _)| index < best) {
                    earliest = Some((index, text, marker));
                }
            }
        }
        earliest
    }

    fn append(&mut self, channel: Channel, text: &str) {
        match channel {
            Channel::Thinking => self.thinking.push_str(text),
            Channel::Tooling => self.tooling.push_str(text),
            Channel::Response => self.response.push_str(text),
        }
    }

    /// Remove every complete `(tool: "...")` / `(tool: {...})` occurrence
    /// from the buffer, each replacing the tooling channel's current value.
    fn extract_inline_tool_calls(&mut self) -> bool {
        const PREFIX: &str = "(tool:";
        let mut changed = false;
        let mut search_from = 0;

        while let Some(offset) = self.buffer[search_from..].find(PREFIX) {
            let start = search_from + offset;
            let after_prefix = start + PREFIX.len();
            let body_start =
                after_prefix + leading_whitespace(&self.buffer[after_prefix..]);
            let body = &self.buffer[body_start..];

            let parsed = match body.as_bytes().first() {
                Some(b'"') => scan_quoted(body),
                Some(b'{') => scan_object(body),
                Some(_) => {
                    // Not the tool-call syntax; leave it as plain text.
                    search_from = after_prefix;
                    continue;
                }
                None => break, // prefix at end of buffer, wait for more
            };

            let Some(value_len) = parsed else {
                break; // value still incomplete, wait for more
            };

            let after_value = body_start + value_len;
            let close = after_value + leading_whitespace(&self.buffer[after_value..]);
            match self.buffer.as_bytes().get(close) {
                Some(b')') => {
                    let raw = self.buffer[body_start..after_value].to_string();
                    self.buffer.replace_range(start..close + 1, "");
                    self.tooling = sideband::tool_call_value(&raw);
                    changed = true;
                    search_from = start;
                }
                Some(_) => {
                    // Complete value but no closing paren; plain text after all.
                    search_from = after_prefix;
                }
                None => break, // closing paren may arrive in the next fragment
            }
        }

        changed
    }
}

fn leading_whitespace(text: &str) -> usize {
    text.len() - text.trim_start().len()
}

/// Length of a complete double-quoted JSON string at the start of `body`,
/// or None while its closing quote has not arrived yet.
fn scan_quoted(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut escaped = false;
    for (index, &byte) in bytes.iter().enumerate().skip(1) {
        if escaped {
            escaped = false;
        } else if byte == b'\\' {
            escaped = true;
        } else if byte == b'"' {
            return Some(index + 1);
        }
    }
    None
}

/// Length of a balanced `{...}` object at the start of `body`, or None while
/// it is still open. Brace counting skips braces inside string literals.
fn scan_object(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (index, &byte) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_single_fragment_round_trip() {
        let mut demux = TagDemux::new();
        demux.feed("<think>reasoning</think><response>answer</response>");
        assert_eq!(demux.thinking(), "reasoning");
        assert_eq!(demux.response(), "answer");
        assert_eq!(demux.tooling(), "");
    }

    #[rstest]
    #[case(vec!["<think>hello</think>"])]
    #[case(vec!["<thi", "nk>hel", "lo</think>"])]
    #[case(vec!["<think>", "hello", "</think>"])]
    #[case(vec!["<", "t", "hink>hello</think>"])]
    fn test_tag_reassembly_across_boundaries(#[case] fragments: Vec<&str>) {
        let mut demux = TagDemux::new();
        for fragment in fragments {
            demux.feed(fragment);
        }
        assert_eq!(demux.thinking(), "hello");
        assert_eq!(demux.response(), "");
    }

    #[test]
    fn test_content_before_any_tag_is_discarded() {
        let mut demux = TagDemux::new();
        demux.feed("stray preamble that belongs to no channel\n");
        demux.feed("<response>real</response>");
        assert_eq!(demux.response(), "real");
        assert_eq!(demux.thinking(), "");
        assert_eq!(demux.tooling(), "");
    }

    #[test]
    fn test_short_untagged_remainder_is_retained() {
        let mut demux = TagDemux::new();
        assert!(!demux.feed("<resp"));
        assert!(demux.feed("onse>yes</response>"));
        assert_eq!(demux.response(), "yes");
    }

    #[test]
    fn test_legacy_tooling_tags() {
        let mut demux = TagDemux::new();
        demux.feed("<tooling>searching index</tooling>");
        assert_eq!(demux.tooling(), "searching index");
    }

    #[test]
    fn test_inline_tool_call_replaces_not_appends() {
        let mut demux = TagDemux::new();
        demux.feed("(tool: \"a\")");
        assert_eq!(demux.tooling(), "a");
        demux.feed("(tool: \"b\")");
        assert_eq!(demux.tooling(), "b");
    }

    #[test]
    fn test_inline_tool_call_with_object_payload() {
        let mut demux = TagDemux::new();
        demux.feed(r#"(tool: {"action": "query_db", "args": {"table": "pumps"}})"#);
        assert_eq!(demux.tooling(), "query_db");
    }

    #[test]
    fn test_inline_tool_call_inside_response_text() {
        let mut demux = TagDemux::new();
        demux.feed("<response>before (tool: \"lookup\") after</response>");
        assert_eq!(demux.response(), "before  after");
        assert_eq!(demux.tooling(), "lookup");
    }

    #[test]
    fn test_inline_tool_call_split_within_retention_limit() {
        let mut demux = TagDemux::new();
        demux.feed("(tool: \"ab");
        demux.feed("c\")");
        assert_eq!(demux.tooling(), "abc");
    }

    #[test]
    fn test_false_tool_prefix_stays_text() {
        let mut demux = TagDemux::new();
        demux.feed("<response>(tool: not quoted)</response>");
        assert_eq!(demux.response(), "(tool: not quoted)");
        assert_eq!(demux.tooling(), "");
    }

    #[test]
    fn test_interleaved_channels() {
        let mut demux = TagDemux::new();
        demux.feed("<think>a</think><response>b</response><think>c</think>");
        assert_eq!(demux.thinking(), "ac");
        assert_eq!(demux.response(), "b");
    }

    #[test]
    fn test_set_tooling_overwrites() {
        let mut demux = TagDemux::new();
        demux.feed("<tooling>old</tooling>");
        demux.set_tooling("new".to_string());
        assert_eq!(demux.tooling(), "new");
    }
}
