use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::handlers::without_stale_session;
use crate::auth::Session;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateConversationRequest {
    pub title: Option<String>,
}

pub async fn list_conversations(
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let conversations = state.conversations.list(&session).await?;
    Ok(HttpResponse::Ok().json(conversations))
}

/// The body is optional; an empty POST creates an untitled conversation.
pub async fn create_conversation(
    session: Session,
    req: Option<web::Json<CreateConversationRequest>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = req.map(web::Json::into_inner).unwrap_or_default();
    match state.conversations.create(&session, req.title.as_deref()).await {
        Ok(conversation) => Ok(HttpResponse::Ok().json(conversation)),
        Err(e) => without_stale_session(&state, e),
    }
}

pub async fn list_messages(
    session: Session,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let messages = state.conversations.messages(&session, &path).await?;
    Ok(HttpResponse::Ok().json(messages))
}
