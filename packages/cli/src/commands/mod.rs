// ABOUTME: Subcommand handlers for the ragline binary

pub mod chat;
pub mod conversations;
pub mod feedback;
pub mod user;
