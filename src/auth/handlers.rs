use actix_web::{web, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::auth::session::{Session, SessionUser};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub user_id: String,
    pub username: String,
}

fn signed_in(state: &AppState, user: SessionUser) -> Result<HttpResponse, AppError> {
    let cookie = state.sessions.issue(&user)?;
    Ok(HttpResponse::Ok().cookie(cookie).json(AuthResponse {
        success: true,
        user_id: user.id,
        username: user.username,
    }))
}

pub async fn register(
    req: Option<web::Json<RegisterRequest>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = req.map(web::Json::into_inner).unwrap_or_default();

    let user = state
        .auth_service
        .register(
            req.username.as_deref().unwrap_or_default(),
            req.email.as_deref().unwrap_or_default(),
            req.password.as_deref().unwrap_or_default(),
        )
        .await
        .map_err(|e| {
            error!("Registration failed: {}", e);
            e
        })?;

    signed_in(&state, user)
}

pub async fn login(
    req: Option<web::Json<LoginRequest>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = req.map(web::Json::into_inner).unwrap_or_default();

    let user = state
        .auth_service
        .login(
            req.email.as_deref().unwrap_or_default(),
            req.password.as_deref().unwrap_or_default(),
        )
        .await?;

    signed_in(&state, user)
}

/// Always succeeds, with or without an active session.
pub async fn logout(session: Session, state: web::Data<AppState>) -> HttpResponse {
    if let Some(user) = session.user() {
        info!("Logging out user {}", user.id);
    }

    HttpResponse::Ok()
        .cookie(state.sessions.clear())
        .json(serde_json::json!({ "success": true }))
}

pub async fn current_user(
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    match state.auth_service.current_user(&session).await {
        Ok(profile) => Ok(HttpResponse::Ok().json(profile)),
        Err(e) => without_stale_session(&state, e),
    }
}

/// Turns a "User not found" failure into its error response with the session
/// cookie removed, since the user behind the session is gone. Other errors
/// pass through.
pub fn without_stale_session(state: &AppState, err: AppError) -> Result<HttpResponse, AppError> {
    if !matches!(err, AppError::NotFoundError(_)) {
        return Err(err);
    }
    let mut response = err.error_response();
    response
        .add_cookie(&state.sessions.clear())
        .map_err(|http_err| AppError::InternalError(http_err.to_string()))?;
    Ok(response)
}
