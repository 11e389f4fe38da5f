//! Conversations and their messages, scoped to the signed-in user.

pub mod handlers;
mod service;

pub use service::ConversationService;
