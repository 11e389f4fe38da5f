use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::password::{hash_password_offloaded, verify_password_offloaded};
use crate::auth::session::{Session, SessionUser};
use crate::db::models::{User, UserProfile};
use crate::db::Store;
use crate::error::{AppError, AuthError, DatabaseError};

/// Whitespace-only values count as missing, which is stricter than a plain
/// emptiness check.
fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn rejected(email: &str) -> AppError {
    warn!("Rejected login for email: {}", email);
    AppError::AuthError(AuthError::InvalidCredentials)
}

pub struct AuthService {
    store: Arc<dyn Store>,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<SessionUser, AppError> {
        if is_blank(username) || is_blank(email) || password.is_empty() {
            return Err(AppError::ValidationError("Missing fields".into()));
        }

        let password_hash = hash_password_offloaded(password).await?;
        let user = User::new(username.to_string(), email.to_string(), password_hash);

        match self.store.create_user(&user).await {
            Ok(()) => {}
            Err(AppError::DatabaseError(DatabaseError::Duplicate)) => {
                return Err(AppError::ConflictError("Username or email already exists".into()));
            }
            Err(e) => return Err(e),
        }

        info!("Registered user {} ({})", user.username, user.id);
        Ok(SessionUser {
            id: user.id,
            username: user.username,
        })
    }

    /// An unknown email and a wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionUser, AppError> {
        if is_blank(email) || password.is_empty() {
            return Err(AppError::ValidationError("Missing fields".into()));
        }

        let user = match self.store.get_user_by_email(email).await? {
            Some(user) => user,
            None => return Err(rejected(email)),
        };
        if !verify_password_offloaded(password, &user.password_hash).await? {
            return Err(rejected(email));
        }

        info!("Login successful for user {}", user.id);
        Ok(SessionUser {
            id: user.id,
            username: user.username,
        })
    }

    /// Fails with `NotFoundError` when the session outlived its user record;
    /// the caller is expected to drop the session in that case.
    pub async fn current_user(&self, session: &Session) -> Result<UserProfile, AppError> {
        let identity = session.require()?;

        match self.store.get_user_by_id(&identity.id).await? {
            Some(user) => Ok(user.into()),
            None => {
                warn!("Session refers to missing user {}", identity.id);
                Err(AppError::NotFoundError("User not found".into()))
            }
        }
    }
}
