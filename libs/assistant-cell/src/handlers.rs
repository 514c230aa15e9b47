// libs/assistant-cell/src/handlers.rs
use std::sync::Arc;

use axum::{extract::State, Json};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    AnalysisResponse, AnalyzeReportRequest, AssistantError, ChatMessage, ChatRequest, ChatResponse,
};
use crate::services::gateway::AssistantGateway;

fn assistant_error(e: AssistantError) -> AppError {
    match e {
        AssistantError::ValidationError(msg) => AppError::ValidationError(msg),
        AssistantError::NotConfigured => {
            AppError::Internal("Assistant is not configured".to_string())
        }
        AssistantError::Upstream(msg) => AppError::ExternalService(msg),
    }
}

#[axum::debug_handler]
pub async fn chat(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if request.message.trim().is_empty() {
        return Err(AppError::ValidationError("message is required".to_string()));
    }

    let gateway = AssistantGateway::new(&state).map_err(assistant_error)?;
    let response = gateway.chat(&request.message).await.map_err(assistant_error)?;

    Ok(Json(ChatResponse {
        message: ChatMessage::persisted(response.clone()),
        response,
    }))
}

#[axum::debug_handler]
pub async fn analyze_report(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<AnalyzeReportRequest>,
) -> Result<Json<AnalysisResponse>, AppError> {
    if request.content.trim().is_empty() {
        return Err(AppError::ValidationError("content is required".to_string()));
    }

    let gateway = AssistantGateway::new(&state).map_err(assistant_error)?;
    let analysis = gateway
        .analyze_report(&request.content)
        .await
        .map_err(assistant_error)?;

    Ok(Json(AnalysisResponse { analysis }))
}
