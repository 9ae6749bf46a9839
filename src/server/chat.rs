//! `POST /api/chat`: questions about a Markdown document.

use super::{AppError, AppState};
use crate::llm::{ChatMessage, Generate, GenerationRequest};
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

/// Answer given when no LLM key is configured.
pub const NO_API_KEY_RESPONSE: &str =
    "Sorry, GROK_API_KEY is not set, so no real answer can be generated. Please set the environment variable.";

const CHAT_TEMPERATURE: f64 = 0.7;
const CHAT_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub topic_id: String,
    pub message: String,
    #[serde(default)]
    pub chat_history: Vec<HistoryEntry>,
    #[serde(default)]
    pub markdown: Option<String>,
}

/// A prior turn; missing fields default to an empty user message.
#[derive(Debug, Deserialize)]
pub struct HistoryEntry {
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

fn default_role() -> String {
    "user".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

/// System prompt, with the document appended when one was supplied.
fn system_prompt(markdown: Option<&str>) -> String {
    let mut prompt =
        "You are a helpful assistant. Answer the user's questions about the content they provided."
            .to_string();
    if let Some(markdown) = markdown.filter(|m| !m.trim().is_empty()) {
        prompt.push_str("\n\nBase your answer on the following content:\n\n");
        prompt.push_str(markdown);
    }
    prompt
}

#[instrument(level = "info", skip_all, fields(topic_id = %request.topic_id, history = request.chat_history.len()))]
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let Some(llm) = state.llm.as_ref() else {
        info!("No LLM key configured; returning notice");
        return Ok(Json(ChatResponse {
            response: NO_API_KEY_RESPONSE.to_string(),
        }));
    };

    let history = request
        .chat_history
        .into_iter()
        .map(|entry| ChatMessage::new(&entry.role, entry.content))
        .collect();
    let generation = GenerationRequest::new(request.message)
        .system(system_prompt(request.markdown.as_deref()))
        .history(history)
        .temperature(CHAT_TEMPERATURE)
        .max_tokens(CHAT_MAX_TOKENS);

    let response = llm.generate(&generation).await.map_err(|e| {
        error!(error = %e, "Chat generation failed");
        AppError::internal(format!("Error while processing the chat request: {e}"))
    })?;
    Ok(Json(ChatResponse { response }))
}
