// ABOUTME: Accumulating line buffer for the SSE byte stream
// ABOUTME: Network chunks split at arbitrary boundaries; lines are reassembled here

/// Buffers incoming text chunks and yields complete lines. The trailing
/// incomplete line stays buffered until the next chunk or end of stream.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every complete line it finishes.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.pending.push_str(chunk);
        let mut lines = Vec::new();
        while let Some(newline) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=newline).collect();
            lines.push(
                line.trim_end_matches(|c| c == '\n' || c == '\r')
                    .to_string(),
            );
        }
        lines
    }

    /// Whatever is still buffered at end of stream, if non-blank.
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.pending.trim().is_empty() {
            self.pending.clear();
            return None;
        }
        Some(std::mem::take(&mut self.pending))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lines_split_across_chunks() {
        let mut buffer = LineBuffer::new();
        assert_eq!(buffer.push("data: hel"), Vec::<String>::new());
        assert_eq!(buffer.push("lo\ndata: wor"), vec!["data: hello"]);
        assert_eq!(buffer.push("ld\n"), vec!["data: world"]);
        assert_eq!(buffer.take_remainder(), None);
    }

    #[test]
    fn test_crlf_stripped() {
        let mut buffer = LineBuffer::new();
        assert_eq!(buffer.push("data: a\r\n"), vec!["data: a"]);
    }

    #[test]
    fn test_remainder_returned_at_end() {
        let mut buffer = LineBuffer::new();
        buffer.push("metadata: {}");
        assert_eq!(buffer.take_remainder(), Some("metadata: {}".to_string()));
        assert_eq!(buffer.take_remainder(), None);
    }
}
