use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use tracing::debug;

use crate::config::AuthConfig;
use crate::error::{AppError, AuthError};
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // User ID
    pub username: String,
    pub exp: i64,         // Expiration time
    pub iat: i64,         // Issued at
}

/// The identity a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub id: String,
    pub username: String,
}

/// Per-request authentication context, handed explicitly to every service call.
///
/// A missing, tampered or expired cookie all read as `Anonymous`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Anonymous,
    Authenticated(SessionUser),
}

impl Session {
    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            Session::Authenticated(user) => Some(user),
            Session::Anonymous => None,
        }
    }

    pub fn require(&self) -> Result<&SessionUser, AppError> {
        self.user().ok_or(AppError::AuthError(AuthError::NotLoggedIn))
    }
}

impl FromRequest for Session {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let session = req
            .app_data::<web::Data<AppState>>()
            .map(|state| state.sessions.read(req))
            .unwrap_or(Session::Anonymous);
        ready(Ok(session))
    }
}

/// Issues and reads the signed session cookie.
pub struct SessionManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    cookie_name: String,
    cookie_secure: bool,
    expiry_hours: i64,
}

impl SessionManager {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.session_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.session_secret.as_bytes()),
            cookie_name: config.cookie_name.clone(),
            cookie_secure: config.cookie_secure,
            expiry_hours: config.session_expiry_hours,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn generate_token(&self, user: &SessionUser) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            exp: (now + Duration::hours(self.expiry_hours)).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(format!("Failed to sign session: {}", e)))
    }

    pub fn decode_token(&self, token: &str) -> Result<SessionUser, AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map_err(|_| AppError::AuthError(AuthError::InvalidToken))?;

        Ok(SessionUser {
            id: data.claims.sub,
            username: data.claims.username,
        })
    }

    /// Establishes a session for `user`.
    pub fn issue(&self, user: &SessionUser) -> Result<Cookie<'static>, AppError> {
        let token = self.generate_token(user)?;
        Ok(self
            .base_cookie(token)
            .max_age(CookieDuration::hours(self.expiry_hours))
            .finish())
    }

    /// A cookie that tells the client to drop the session.
    pub fn clear(&self) -> Cookie<'static> {
        let mut cookie = self.base_cookie(String::new()).finish();
        cookie.make_removal();
        cookie
    }

    pub fn read(&self, req: &HttpRequest) -> Session {
        let Some(cookie) = req.cookie(&self.cookie_name) else {
            return Session::Anonymous;
        };

        match self.decode_token(cookie.value()) {
            Ok(user) => Session::Authenticated(user),
            Err(e) => {
                debug!("Ignoring session cookie: {}", e);
                Session::Anonymous
            }
        }
    }

    fn base_cookie(&self, value: String) -> actix_web::cookie::CookieBuilder<'static> {
        Cookie::build(self.cookie_name.clone(), value)
            .path("/")
            .http_only(true)
            .secure(self.cookie_secure)
            .same_site(SameSite::Lax)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;
    use actix_web::test::TestRequest;

    fn manager() -> SessionManager {
        SessionManager::new(&Settings::new_for_test().unwrap().auth)
    }

    fn alice() -> SessionUser {
        SessionUser {
            id: "user-1".to_string(),
            username: "alice".to_string(),
        }
    }

    #[test]
    fn test_issued_cookie_reads_back() {
        let sessions = manager();
        let cookie = sessions.issue(&alice()).unwrap();
        assert_eq!(cookie.name(), "studyai_session");
        assert_eq!(cookie.http_only(), Some(true));

        let req = TestRequest::default().cookie(cookie).to_http_request();
        assert_eq!(sessions.read(&req), Session::Authenticated(alice()));
    }

    #[test]
    fn test_missing_or_tampered_cookie_is_anonymous() {
        let sessions = manager();
        let req = TestRequest::default().to_http_request();
        assert_eq!(sessions.read(&req), Session::Anonymous);

        let mut token = sessions.generate_token(&alice()).unwrap();
        token.push('x');
        let req = TestRequest::default()
            .cookie(Cookie::new("studyai_session", token))
            .to_http_request();
        assert_eq!(sessions.read(&req), Session::Anonymous);
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let mut config = Settings::new_for_test().unwrap().auth;
        config.session_secret = "another_secret".to_string();
        let foreign = SessionManager::new(&config);

        let token = foreign.generate_token(&alice()).unwrap();
        assert!(matches!(
            manager().decode_token(&token),
            Err(AppError::AuthError(AuthError::InvalidToken))
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let mut config = Settings::new_for_test().unwrap().auth;
        config.session_expiry_hours = -2;
        let sessions = SessionManager::new(&config);

        let token = sessions.generate_token(&alice()).unwrap();
        assert!(sessions.decode_token(&token).is_err());
    }

    #[test]
    fn test_require_on_anonymous_fails() {
        assert!(matches!(
            Session::Anonymous.require(),
            Err(AppError::AuthError(AuthError::NotLoggedIn))
        ));
        let session = Session::Authenticated(alice());
        assert_eq!(session.require().unwrap().username, "alice");
    }

    #[test]
    fn test_clear_cookie_expires_session() {
        let cookie = manager().clear();
        assert_eq!(cookie.name(), "studyai_session");
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(CookieDuration::ZERO));
    }
}
