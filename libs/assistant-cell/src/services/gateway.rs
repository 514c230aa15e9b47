// libs/assistant-cell/src/services/gateway.rs
use reqwest::{header, Client};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;

use crate::models::AssistantError;

const CHAT_SYSTEM_PROMPT: &str = "You are a helpful medical assistant for a clinic's patients. \
Provide general, educational health guidance in plain language. Do not diagnose conditions, \
do not prescribe medication, and remind users to consult a doctor for anything specific to \
their situation.";

const REPORT_SYSTEM_PROMPT: &str = "You are a medical assistant analyzing a patient's blood \
test report. Summarize the key findings, point out values outside their reference ranges, and \
give dietary and lifestyle suggestions. Keep the whole analysis under roughly 300 words and \
remind the patient that this is not a diagnosis.";

/// Stateless pass-through to an OpenAI-compatible chat-completion API. One
/// request upstream per call, no retries; an upstream failure surfaces
/// directly to the caller.
pub struct AssistantGateway {
    api_key: String,
    base_url: String,
    http_client: Client,
}

impl AssistantGateway {
    pub fn new(config: &AppConfig) -> Result<Self, AssistantError> {
        if !config.is_assistant_configured() {
            return Err(AssistantError::NotConfigured);
        }
        Ok(Self {
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.clone(),
            http_client: Client::new(),
        })
    }

    pub async fn chat(&self, message: &str) -> Result<String, AssistantError> {
        debug!("Forwarding chat message to assistant upstream");
        self.complete(CHAT_SYSTEM_PROMPT, message).await
    }

    pub async fn analyze_report(&self, content: &str) -> Result<String, AssistantError> {
        debug!("Forwarding report content for analysis");
        let user_content = format!("Analyze this blood test report:\n\n{}", content);
        self.complete(REPORT_SYSTEM_PROMPT, &user_content).await
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, AssistantError> {
        let body = json!({
            "model": "gpt-4o",
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ],
            "temperature": 0.5
        });

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AssistantError::Upstream(error_text));
        }

        let completion: Value = response
            .json()
            .await
            .map_err(|e| AssistantError::Upstream(e.to_string()))?;

        completion["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AssistantError::Upstream("Invalid completion response format".to_string()))
    }
}
