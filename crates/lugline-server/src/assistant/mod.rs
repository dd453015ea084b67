// SPDX-License-Identifier: Apache-2.0

//! Lassy, the in-app assistant: a prompt builder and a thin pass-through to a
//! hosted generative-AI API. Upstream trouble never surfaces as an error to the
//! client; the handler degrades to a canned reply.

pub mod actions;
pub mod gemini;
pub mod prompt;

pub use gemini::GeminiAssistant;

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

pub const FALLBACK_REPLY: &str = "I'm sorry, I'm having trouble connecting right now. \
Please try again or use the navigation menu to access what you need.";

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("assistant request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("assistant provider returned {status}: {message}")]
    Provider { status: u16, message: String },
    #[error("assistant reply blocked: {0}")]
    Blocked(String),
    #[error("assistant returned no content")]
    Empty,
    #[error("assistant not configured")]
    Disabled,
}

#[async_trait]
pub trait AssistantBackend: Send + Sync {
    async fn reply(&self, system_prompt: &str, message: &str) -> Result<String, AssistantError>;
}

/// Stands in when no API key is configured.
pub struct DisabledAssistant;

#[async_trait]
impl AssistantBackend for DisabledAssistant {
    async fn reply(&self, _system_prompt: &str, _message: &str) -> Result<String, AssistantError> {
        Err(AssistantError::Disabled)
    }
}

/// Scripted backend for tests: one fixed reply, or a failure on every call.
pub struct FakeAssistant {
    reply: Option<String>,
    seen: Mutex<Vec<(String, String)>>,
}

impl FakeAssistant {
    pub fn with_reply(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Every `(system_prompt, message)` pair this backend has seen.
    pub fn requests(&self) -> Vec<(String, String)> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AssistantBackend for FakeAssistant {
    async fn reply(&self, system_prompt: &str, message: &str) -> Result<String, AssistantError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push((system_prompt.to_string(), message.to_string()));
        }
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => Err(AssistantError::Empty),
        }
    }
}
