use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::Session;
use crate::error::AppError;
use crate::proxy::completion::require_message;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    /// When present and non-blank, the exchange is stored in this conversation.
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
}

pub async fn chat(
    session: Session,
    req: Option<web::Json<ChatRequest>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = req.map(web::Json::into_inner).unwrap_or_default();
    let message = require_message(req.message.as_deref().unwrap_or_default())?;

    // Check ownership before spending an upstream call.
    let conversation = match req.conversation_id.as_deref().filter(|id| !id.trim().is_empty()) {
        Some(id) => Some(state.conversations.owned(&session, id).await?),
        None => None,
    };

    let content = state.completion.complete(message).await?;

    if let Some(conversation) = conversation {
        state
            .conversations
            .record_exchange(&conversation, message, &content)
            .await?;
        info!("Stored chat exchange in conversation {}", conversation.id);
    }

    Ok(HttpResponse::Ok().json(ChatResponse { content }))
}
