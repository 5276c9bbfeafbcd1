// ABOUTME: Shared utility functions for Ragline
// ABOUTME: ID generation and conversation title derivation

use uuid::Uuid;

/// Generate a unique client-side identifier for messages and conversations
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

const TITLE_MAX_CHARS: usize = 40;

/// Derive a conversation title from the first user message
pub fn derive_conversation_title(first_message: &str) -> String {
    let trimmed = first_message.trim();
    if trimmed.is_empty() {
        return "New Conversation".to_string();
    }
    if trimmed.chars().count() <= TITLE_MAX_CHARS {
        return trimmed.to_string();
    }
    let truncated: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
    format!("{}...", truncated.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_generate_id() {
        let id1 = generate_id();
        let id2 = generate_id();

        assert_ne!(id1, id2);
        assert_eq!(id1.len(), 36);
    }

    #[test]
    fn test_short_title_kept_verbatim() {
        assert_eq!(
            derive_conversation_title("How do I isolate pump P-101?"),
            "How do I isolate pump P-101?"
        );
    }

    #[test]
    fn test_long_title_truncated() {
        let long = "What are the lockout tagout requirements for the cooling water system?";
        let title = derive_conversation_title(long);
        assert!(title.ends_with("..."));
        assert!(title.chars().count() <= TITLE_MAX_CHARS + 3);
    }

    #[test]
    fn test_empty_title_falls_back() {
        assert_eq!(derive_conversation_title("   "), "New Conversation");
    }
}
