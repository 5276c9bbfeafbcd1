// ABOUTME: Streaming response parsing for Ragline
// ABOUTME: Demultiplexes tagged SSE chat streams into thinking/tooling/response channels

pub mod demux;
pub mod lines;
pub mod parser;
pub mod session;
pub mod sideband;

pub use demux::{Channel, TagDemux};
pub use lines::LineBuffer;
pub use parser::StreamParser;
pub use session::StreamSession;
