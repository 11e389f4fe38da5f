//! Proxy to the external chat-completion provider.

mod completion;
pub mod handlers;

pub use completion::{
    require_message, ChatCompletionRequest, ChatMessage, CompletionGateway, ProviderReply,
    FALLBACK_REPLY,
};
