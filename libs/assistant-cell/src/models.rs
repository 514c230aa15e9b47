// libs/assistant-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeReportRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    pub analysis: String,
}

/// A chat entry is either still in flight on the client or persisted with a
/// real id. The tag replaces the old habit of smuggling the distinction
/// through an id-string prefix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChatMessage {
    Pending {
        content: String,
    },
    Persisted {
        id: Uuid,
        content: String,
        created_at: DateTime<Utc>,
    },
}

impl ChatMessage {
    pub fn persisted(content: String) -> Self {
        ChatMessage::Persisted {
            id: Uuid::new_v4(),
            content,
            created_at: Utc::now(),
        }
    }

    pub fn content(&self) -> &str {
        match self {
            ChatMessage::Pending { content } => content,
            ChatMessage::Persisted { content, .. } => content,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AssistantError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Assistant is not configured")]
    NotConfigured,

    #[error("Upstream error: {0}")]
    Upstream(String),
}
