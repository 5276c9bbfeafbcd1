// ABOUTME: Client library for the Ragline chat backend
// ABOUTME: Streaming HTTP transport plus per-turn conversation orchestration

pub mod api;
pub mod error;
pub mod orchestrator;

pub use api::LlmApiClient;
pub use error::{ClientError, ClientResult};
pub use orchestrator::{ChatOrchestrator, STREAM_FAILURE_MESSAGE};
