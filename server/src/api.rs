// server/src/api.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response as AxumResponse},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use orchestrator::{Orchestrator, StatsSnapshot, TurnError};
use router_core::{ConversationSummary, Message, Role, RouteDecision, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct ApiCommand {
    #[serde(rename = "ProcessText")]
    pub process_text: String,
    #[serde(rename = "ConversationId", alias = "conversation_id", default)]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiResponse {
    pub text: String,
    pub conversation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteDecision>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConversationEntry {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

impl From<ConversationSummary> for ConversationEntry {
    fn from(summary: ConversationSummary) -> Self {
        Self {
            id: summary.id,
            title: summary.title,
            created_at: summary.created_at,
            updated_at: summary.updated_at,
            message_count: summary.message_count,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ToolCallView {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageView {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl From<Message> for MessageView {
    fn from(message: Message) -> Self {
        Self {
            role: message.role,
            content: message.content,
            tool_calls: message
                .tool_calls
                .into_iter()
                .map(|call| ToolCallView {
                    id: call.id,
                    name: call.name,
                    arguments: call.arguments,
                })
                .collect(),
            tool_call_id: message.tool_call_id,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConversationView {
    pub id: String,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Turn(#[from] TurnError),
    #[error("conversation '{0}' not found")]
    NotFound(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Turn(TurnError::EmptyQuery) => StatusCode::BAD_REQUEST,
            ApiError::Turn(TurnError::MalformedHistory(_)) => StatusCode::CONFLICT,
            ApiError::Turn(TurnError::Llm(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Turn(TurnError::Store(StoreError::NotFound(_))) => StatusCode::NOT_FOUND,
            ApiError::Turn(TurnError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Failures travel in `Error`, never in `Text`, so the front-end can tell
// them apart from answers.
impl IntoResponse for ApiError {
    fn into_response(self) -> AxumResponse {
        let status = self.status();
        if status.is_server_error() {
            error!("[Server] {} -> {:?}", status, self);
        } else {
            warn!("[Server] {} -> {}", status, self);
        }
        let body = Json(serde_json::json!({ "Error": self.to_string() }));
        (status, body).into_response()
    }
}

pub type SharedOrchestrator = Arc<Orchestrator>;

async fn dispatch_handler(
    State(orchestrator): State<SharedOrchestrator>,
    Json(payload): Json<ApiCommand>,
) -> Result<Json<ApiResponse>, ApiError> {
    let conversation_id = payload
        .conversation_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let outcome = orchestrator.handle_turn(&conversation_id, &payload.process_text).await?;
    Ok(Json(ApiResponse {
        text: outcome.answer,
        conversation_id: outcome.conversation_id,
        route: outcome.route,
    }))
}

async fn list_conversations(
    State(orchestrator): State<SharedOrchestrator>,
) -> Result<Json<Vec<ConversationEntry>>, ApiError> {
    let summaries = orchestrator.list_conversations().await?;
    Ok(Json(summaries.into_iter().map(ConversationEntry::from).collect()))
}

async fn get_conversation(
    State(orchestrator): State<SharedOrchestrator>,
    Path(id): Path<String>,
) -> Result<Json<ConversationView>, ApiError> {
    let messages = orchestrator.history(&id).await?;
    if messages.is_empty() {
        return Err(ApiError::NotFound(id));
    }
    Ok(Json(ConversationView {
        id,
        messages: messages.into_iter().map(MessageView::from).collect(),
    }))
}

async fn delete_conversation(
    State(orchestrator): State<SharedOrchestrator>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    orchestrator.delete_conversation(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn stats_handler(State(orchestrator): State<SharedOrchestrator>) -> Json<StatsSnapshot> {
    Json(orchestrator.stats())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "Status": "ok" }))
}

pub fn router(orchestrator: SharedOrchestrator) -> Router {
    Router::new()
        .route("/api/v1/dispatch", post(dispatch_handler))
        .route("/api/v1/conversations", get(list_conversations))
        .route(
            "/api/v1/conversations/:id",
            get(get_conversation).delete(delete_conversation),
        )
        .route("/api/v1/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .with_state(orchestrator)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
