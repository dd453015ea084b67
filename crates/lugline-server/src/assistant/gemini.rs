// SPDX-License-Identifier: Apache-2.0

//! Non-streaming client for the Google Generative Language API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{AssistantBackend, AssistantError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const MAX_OUTPUT_TOKENS: u32 = 500;
const TEMPERATURE: f64 = 0.7;

pub struct GeminiAssistant {
    client: reqwest::Client,
    base: String,
    model: String,
    api_key: String,
}

impl GeminiAssistant {
    pub fn new(base: &str, model: &str, api_key: &str) -> Result<Self, AssistantError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl AssistantBackend for GeminiAssistant {
    async fn reply(&self, system_prompt: &str, message: &str) -> Result<String, AssistantError> {
        let url = format!("{}/{}:generateContent", self.base, self.model);
        let body = json!({
            "contents": [{"role": "user", "parts": [{"text": message}]}],
            "systemInstruction": {"parts": [{"text": system_prompt}]},
            "generationConfig": {
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
                "temperature": TEMPERATURE,
            },
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(&error_text) {
                return Err(AssistantError::Provider {
                    status: parsed.error.code.unwrap_or(status.as_u16()),
                    message: parsed.error.message,
                });
            }
            return Err(AssistantError::Provider {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        if let Some(reason) = parsed
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
        {
            return Err(AssistantError::Blocked(format!("prompt blocked: {reason}")));
        }
        let candidate = parsed.candidates.first().ok_or(AssistantError::Empty)?;
        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(AssistantError::Blocked(
                "response blocked for safety".to_string(),
            ));
        }
        let text: String = candidate
            .content
            .as_ref()
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        if text.is_empty() {
            return Err(AssistantError::Empty);
        }
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ProviderError,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    code: Option<u16>,
    message: String,
    #[serde(default)]
    #[allow(dead_code)]
    status: Option<String>,
}
