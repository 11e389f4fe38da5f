use chrono::Duration;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::Session;
use crate::db::models::{Conversation, Message, DEFAULT_CONVERSATION_TITLE};
use crate::db::Store;
use crate::error::AppError;

pub struct ConversationService {
    store: Arc<dyn Store>,
}

impl ConversationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, session: &Session) -> Result<Vec<Conversation>, AppError> {
        let user = session.require()?;
        self.store.list_conversations(&user.id).await
    }

    /// A missing or blank title falls back to "New Conversation". Fails with
    /// `NotFoundError` when the session outlived its user record.
    pub async fn create(
        &self,
        session: &Session,
        title: Option<&str>,
    ) -> Result<Conversation, AppError> {
        let user = session.require()?;
        if self.store.get_user_by_id(&user.id).await?.is_none() {
            warn!("Session refers to missing user {}", user.id);
            return Err(AppError::NotFoundError("User not found".into()));
        }
        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_CONVERSATION_TITLE);

        let conversation = Conversation::new(user.id.clone(), title.to_string());
        self.store.create_conversation(&conversation).await?;

        info!("User {} created conversation {}", user.id, conversation.id);
        Ok(conversation)
    }

    /// Resolves a conversation the caller owns. Missing and foreign ids give
    /// the same error.
    pub async fn owned(
        &self,
        session: &Session,
        conversation_id: &str,
    ) -> Result<Conversation, AppError> {
        let user = session.require()?;
        self.store
            .get_conversation_for_user(conversation_id, &user.id)
            .await?
            .ok_or_else(|| AppError::NotFoundError("Conversation not found".into()))
    }

    pub async fn messages(
        &self,
        session: &Session,
        conversation_id: &str,
    ) -> Result<Vec<Message>, AppError> {
        let conversation = self.owned(session, conversation_id).await?;
        self.store.list_messages(&conversation.id).await
    }

    /// Stores one chat turn: the user's message, then the assistant's reply.
    pub async fn record_exchange(
        &self,
        conversation: &Conversation,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<(), AppError> {
        let question = Message::new(conversation.id.clone(), "user", user_text.to_string());
        let mut answer =
            Message::new(conversation.id.clone(), "assistant", assistant_text.to_string());
        // The reply must sort after the question even on a coarse clock.
        if answer.created_at <= question.created_at {
            answer.created_at = question.created_at + Duration::microseconds(1);
        }

        self.store.create_messages(&[question, answer]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionUser;
    use crate::db::{MockStore, User};
    use crate::error::AuthError;

    fn session() -> Session {
        Session::Authenticated(SessionUser {
            id: "user-1".to_string(),
            username: "alice".to_string(),
        })
    }

    #[tokio::test]
    async fn test_anonymous_calls_are_rejected() {
        let conversations = ConversationService::new(Arc::new(MockStore::new()));

        let listed = conversations.list(&Session::Anonymous).await;
        assert!(matches!(listed, Err(AppError::AuthError(AuthError::NotLoggedIn))));

        let created = conversations.create(&Session::Anonymous, Some("x")).await;
        assert!(matches!(created, Err(AppError::AuthError(AuthError::NotLoggedIn))));

        let messages = conversations.messages(&Session::Anonymous, "c-1").await;
        assert!(matches!(messages, Err(AppError::AuthError(AuthError::NotLoggedIn))));
    }

    #[tokio::test]
    async fn test_blank_title_uses_default() {
        let mut store = MockStore::new();
        store
            .expect_get_user_by_id()
            .returning(|id: &str| Ok(Some(User::new(id.to_string(), "a@example.com".into(), "hash".into()))));
        store.expect_create_conversation().times(2).returning(|_| Ok(()));
        let conversations = ConversationService::new(Arc::new(store));

        let untitled = conversations.create(&session(), None).await.unwrap();
        assert_eq!(untitled.title, "New Conversation");

        let blank = conversations.create(&session(), Some("   ")).await.unwrap();
        assert_eq!(blank.title, "New Conversation");
    }

    #[tokio::test]
    async fn test_create_for_missing_user_is_not_found() {
        let mut store = MockStore::new();
        store
            .expect_get_user_by_id()
            .withf(|id: &str| id == "user-1")
            .returning(|_| Ok(None));
        store.expect_create_conversation().never();

        let conversations = ConversationService::new(Arc::new(store));
        match conversations.create(&session(), Some("Math")).await {
            Err(AppError::NotFoundError(msg)) => assert_eq!(msg, "User not found"),
            other => panic!("Expected not found, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_messages_of_unowned_conversation_are_not_found() {
        let mut store = MockStore::new();
        store
            .expect_get_conversation_for_user()
            .withf(|conversation_id: &str, user_id: &str| {
                conversation_id == "c-other" && user_id == "user-1"
            })
            .returning(|_, _| Ok(None));
        store.expect_list_messages().never();

        let conversations = ConversationService::new(Arc::new(store));
        let result = conversations.messages(&session(), "c-other").await;
        match result {
            Err(AppError::NotFoundError(msg)) => assert_eq!(msg, "Conversation not found"),
            other => panic!("Expected not found, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_record_exchange_orders_user_before_assistant() {
        let mut store = MockStore::new();
        store
            .expect_create_messages()
            .withf(|messages: &[Message]| {
                messages.len() == 2
                    && messages[0].role == "user"
                    && messages[1].role == "assistant"
                    && messages[0].created_at < messages[1].created_at
            })
            .times(1)
            .returning(|_| Ok(()));

        let conversations = ConversationService::new(Arc::new(store));
        let conversation = Conversation::new("user-1".into(), "chat".into());
        conversations
            .record_exchange(&conversation, "2+2=?", "4")
            .await
            .unwrap();
    }
}
