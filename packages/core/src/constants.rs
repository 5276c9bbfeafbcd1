use std::env;
use std::path::PathBuf;

/// Current version of the conversations file format
pub const CONVERSATIONS_VERSION: &str = "1.0.0";

/// Streaming chat endpoint path
pub const CHAT_PATH: &str = "/chat";

/// Feedback submission endpoint path
pub const FEEDBACK_PATH: &str = "/feedback";

/// Document retrieval endpoint path
pub const GET_DOCUMENT_PATH: &str = "/get_document";

/// Get the path to the Ragline directory (~/.ragline)
pub fn ragline_dir() -> PathBuf {
    // First try HOME environment variable (useful for tests)
    if let Ok(home) = env::var("HOME") {
        PathBuf::from(home).join(".ragline")
    } else {
        // Fall back to dirs crate for normal usage
        dirs::home_dir()
            .expect("Unable to get home directory")
            .join(".ragline")
    }
}

/// Get the path to the conversations.json file (~/.ragline/conversations.json)
pub fn conversations_file() -> PathBuf {
    ragline_dir().join("conversations.json")
}

/// Get the path to the config.json file (~/.ragline/config.json)
pub fn user_config_file() -> PathBuf {
    ragline_dir().join("config.json")
}
