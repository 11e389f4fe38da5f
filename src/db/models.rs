use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_USAGE_LIMIT: i64 = 100;
pub const DEFAULT_CONVERSATION_TITLE: &str = "New Conversation";

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub usage_count: i64,
    pub usage_limit: i64,
}

impl User {
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            password_hash,
            created_at: Utc::now(),
            usage_count: 0,
            usage_limit: DEFAULT_USAGE_LIMIT,
        }
    }
}

/// Public view of a user, as returned by `GET /api/user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub usage_count: i64,
    pub usage_limit: i64,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            usage_count: user.usage_count,
            usage_limit: user.usage_limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    pub id: String,
    #[serde(skip_serializing, default)]
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(user_id: String, title: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            title,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: String,
    #[serde(skip_serializing, default)]
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(conversation_id: String, role: &str, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id,
            role: role.to_string(),
            content,
            created_at: Utc::now(),
        }
    }
}
