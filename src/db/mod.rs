//! Database module for the StudyAI server
//!
//! [`Store`] is the handle every service is given. [`DbOperations`] implements
//! it over a SQLite pool; connections are checked out per query and go back to
//! the pool on every exit path.

pub mod models;
pub mod operations;

use async_trait::async_trait;

use crate::Result;

pub use models::{Conversation, Message, User, UserProfile};
pub use operations::DbOperations;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap round trip used by the health endpoint.
    async fn ping(&self) -> Result<()>;

    /// Releases pooled connections at shutdown.
    async fn close(&self);

    /// Fails with `DatabaseError::Duplicate` when the username or email is taken.
    async fn create_user(&self, user: &User) -> Result<()>;

    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn create_conversation(&self, conversation: &Conversation) -> Result<()>;

    /// Conversations owned by `user_id`, newest first.
    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>>;

    /// Looks the conversation up by id and owner together, so a conversation
    /// owned by somebody else is reported exactly like a missing one.
    async fn get_conversation_for_user(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Option<Conversation>>;

    /// Inserts all messages in one transaction.
    async fn create_messages(&self, messages: &[Message]) -> Result<()>;

    /// Messages of a conversation, oldest first.
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>>;
}
