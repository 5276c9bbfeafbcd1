// ABOUTME: Citation resolution for Ragline response text
// ABOUTME: Rewrites [Source: ...] markers into clickable reference markup

pub mod reference;
pub mod resolver;

pub use reference::SourceReference;
pub use resolver::CitationResolver;
