//! LLM dispatch for tag-value and sentence-template generation
//! (spec.md §4.8), grounded on the source's `data_generation_job.llms`
//! provider classes — one HTTP call per prompt, response text recorded,
//! usage tallied.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::DatagenError;

/// One prompt dispatched to an LLM provider.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
}

/// A provider capable of completing prompts. Implemented once per
/// backend (OpenAI-compatible, Anthropic, ...); `platform-datagen` itself
/// only depends on the trait.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete one prompt.
    ///
    /// # Errors
    ///
    /// Returns [`DatagenError::LlmCall`] on a transport or non-2xx
    /// response failure — callers write this to the traceback file and
    /// continue rather than aborting the batch (§4.8).
    async fn completion(&self, request: &PromptRequest) -> Result<String, DatagenError>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// An OpenAI-compatible chat-completions client — the shape every
/// provider the source supports (`OpenAI`, `Azure OpenAI`, on-prem
/// vLLM gateways) ultimately exposes.
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatibleClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn completion(&self, request: &PromptRequest) -> Result<String, DatagenError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system_prompt) = &request.system_prompt {
            messages.push(serde_json::json!({ "role": "system", "content": system_prompt }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": request.prompt }));

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "model": self.model, "messages": messages }))
            .send()
            .await
            .map_err(|e| DatagenError::LlmCall(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DatagenError::LlmCall(format!(
                "provider returned {}",
                response.status()
            )));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| DatagenError::LlmCall(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| DatagenError::LlmCall("empty completion response".to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn completion_extracts_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": "generated text" } }]
            })))
            .mount(&server)
            .await;

        let client = OpenAiCompatibleClient::new(server.uri(), "key", "gpt-test");
        let text = client
            .completion(&PromptRequest {
                prompt: "hello".to_owned(),
                system_prompt: None,
            })
            .await
            .unwrap();

        assert_eq!(text, "generated text");
    }

    #[tokio::test]
    async fn non_success_status_is_reported_not_panicked() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = OpenAiCompatibleClient::new(server.uri(), "key", "gpt-test");
        let result = client
            .completion(&PromptRequest {
                prompt: "hello".to_owned(),
                system_prompt: None,
            })
            .await;

        assert!(result.is_err());
    }
}
