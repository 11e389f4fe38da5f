use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::db::models::{Conversation, Message, User};
use crate::db::Store;
use crate::error::{AppError, DatabaseError};
use crate::Result;

const CREATE_USERS: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT UNIQUE NOT NULL,
        email TEXT UNIQUE NOT NULL,
        password_hash TEXT NOT NULL,
        created_at TEXT NOT NULL,
        usage_count INTEGER NOT NULL DEFAULT 0,
        usage_limit INTEGER NOT NULL DEFAULT 100
    )
"#;

const CREATE_CONVERSATIONS: &str = r#"
    CREATE TABLE IF NOT EXISTS conversations (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        title TEXT NOT NULL,
        created_at TEXT NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users (id)
    )
"#;

const CREATE_MESSAGES: &str = r#"
    CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        conversation_id TEXT NOT NULL,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL,
        FOREIGN KEY (conversation_id) REFERENCES conversations (id)
    )
"#;

const CREATE_INDEXES: [&str; 2] = [
    "CREATE INDEX IF NOT EXISTS idx_conversations_user_id ON conversations (user_id)",
    "CREATE INDEX IF NOT EXISTS idx_messages_conversation_id ON messages (conversation_id)",
];

#[derive(Clone)]
pub struct DbOperations {
    pool: SqlitePool,
}

impl DbOperations {
    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| AppError::DatabaseError(DatabaseError::ConnectionError(e.to_string())))?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database lives exactly as long as its connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(DatabaseError::ConnectionError(e.to_string())))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the tables if they do not exist yet. Safe to run on every start.
    pub async fn init_schema(&self) -> Result<()> {
        let mut transaction = self.begin_transaction().await?;
        for statement in [CREATE_USERS, CREATE_CONVERSATIONS, CREATE_MESSAGES]
            .into_iter()
            .chain(CREATE_INDEXES)
        {
            sqlx::query(statement).execute(&mut *transaction).await?;
        }
        transaction.commit().await?;

        info!("Database schema ready");
        Ok(())
    }

    pub async fn begin_transaction(&self) -> Result<Transaction<'_, Sqlite>> {
        Ok(self.pool.begin().await?)
    }
}

#[async_trait]
impl Store for DbOperations {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at, usage_count, usage_limit)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.usage_count)
        .bind(user.usage_limit)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at, usage_count, usage_limit FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at, usage_count, usage_limit FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_conversation(&self, conversation: &Conversation) -> Result<()> {
        sqlx::query("INSERT INTO conversations (id, user_id, title, created_at) VALUES (?, ?, ?, ?)")
            .bind(&conversation.id)
            .bind(&conversation.user_id)
            .bind(&conversation.title)
            .bind(conversation.created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let conversations = sqlx::query_as::<_, Conversation>(
            "SELECT id, user_id, title, created_at FROM conversations WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(conversations)
    }

    async fn get_conversation_for_user(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(
            "SELECT id, user_id, title, created_at FROM conversations WHERE id = ? AND user_id = ?",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(conversation)
    }

    async fn create_messages(&self, messages: &[Message]) -> Result<()> {
        let mut transaction = self.begin_transaction().await?;

        for message in messages {
            let result = sqlx::query(
                "INSERT INTO messages (id, conversation_id, role, content, created_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&message.id)
            .bind(&message.conversation_id)
            .bind(&message.role)
            .bind(&message.content)
            .bind(message.created_at)
            .execute(&mut *transaction)
            .await;

            if let Err(e) = result {
                transaction.rollback().await?;
                return Err(e.into());
            }
        }

        transaction.commit().await?;
        Ok(())
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT id, conversation_id, role, content, created_at FROM messages WHERE conversation_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }
}
