/**
 * Chat Routes
 * Canned assistant for the floating chat widget
 */
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::widgets::chat::{self, ChatMessage, GREETING, QUICK_ACTIONS};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatGreeting {
    pub message: ChatMessage,
    pub quick_actions: &'static [&'static str],
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

/// GET /api/chat
pub async fn greeting() -> Json<ChatGreeting> {
    Json(ChatGreeting {
        message: ChatMessage::from_ai(GREETING),
        quick_actions: QUICK_ACTIONS,
    })
}

/// POST /api/chat
pub async fn reply(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatMessage>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::validation("Message is required"));
    }

    // ThreadRng is !Send, so it must be gone before the await
    let (content, delay) = {
        let mut rng = rand::rng();
        let content = chat::select_reply(&request.message, &mut rng);
        (content, chat::reply_delay(&state.config.widgets, &mut rng))
    };

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    Ok(Json(ChatMessage::from_ai(content)))
}
