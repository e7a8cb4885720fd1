/// LLM Client: the single point of entry for all completion API calls.
///
/// No other module talks to the provider directly. Calls run through a
/// `FallbackPolicy`, an ordered list of `(model, max_attempts)` pairs tried
/// in sequence with the same prompt and no backoff.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const PRIMARY_MODEL: &str = "gpt-3.5-turbo-16k";
/// Smaller model used when the primary call fails (quota, rate limit, outage).
pub const FALLBACK_MODEL: &str = "gpt-3.5-turbo";
const TEMPERATURE: f32 = 0.3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("no model attempts configured")]
    NoAttempts,
}

/// One stateless completion call against a specific model.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, model: &str, system: &str, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// OpenAI-compatible chat-completions provider.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    api_url: String,
    api_key: String,
}

impl OpenAiProvider {
    pub fn new(api_url: String, api_key: String, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_url,
            api_key,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, model: &str, system: &str, prompt: &str) -> Result<String, LlmError> {
        let request_body = ChatRequest {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await?;
        if let Some(usage) = &chat.usage {
            debug!(
                "LLM call succeeded: model={model}, prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }
}

/// A model and how many times to try it before moving on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAttempt {
    pub model: String,
    pub max_attempts: u32,
}

/// Ordered model attempts, evaluated front to back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPolicy {
    attempts: Vec<ModelAttempt>,
}

impl FallbackPolicy {
    pub fn new(attempts: Vec<ModelAttempt>) -> Self {
        Self { attempts }
    }

    /// One try on `primary`, then one on `fallback`.
    pub fn primary_then_fallback(primary: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self::new(vec![
            ModelAttempt {
                model: primary.into(),
                max_attempts: 1,
            },
            ModelAttempt {
                model: fallback.into(),
                max_attempts: 1,
            },
        ])
    }

    pub fn attempts(&self) -> &[ModelAttempt] {
        &self.attempts
    }
}

/// The single LLM client used by every service.
#[derive(Clone)]
pub struct LlmClient {
    provider: Arc<dyn CompletionProvider>,
    policy: FallbackPolicy,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn CompletionProvider>, policy: FallbackPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> &FallbackPolicy {
        &self.policy
    }

    /// Sends `prompt` through the fallback policy and returns the first
    /// successful reply text. If every attempt fails, the last error propagates.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let mut last_error: Option<LlmError> = None;

        for step in &self.policy.attempts {
            for attempt in 1..=step.max_attempts {
                match self.provider.complete(&step.model, system, prompt).await {
                    Ok(text) => {
                        if last_error.is_some() {
                            info!("LLM call recovered on model {}", step.model);
                        }
                        return Ok(text);
                    }
                    Err(e) => {
                        warn!(
                            "LLM call to {} failed (attempt {attempt}/{}): {e}",
                            step.model, step.max_attempts
                        );
                        last_error = Some(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or(LlmError::NoAttempts))
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    fn client(provider: Arc<ScriptedProvider>) -> LlmClient {
        LlmClient::new(
            provider,
            FallbackPolicy::primary_then_fallback("big-model", "small-model"),
        )
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("{}".to_string())]));
        let reply = client(provider.clone()).call("prompt", "system").await.unwrap();
        assert_eq!(reply, "{}");
        assert_eq!(provider.models_called(), vec!["big-model"]);
    }

    #[tokio::test]
    async fn test_primary_failure_invokes_fallback_once_with_same_prompt() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(LlmError::Api {
                status: 429,
                message: "quota exceeded".to_string(),
            }),
            Ok("{\"summary\": \"ok\"}".to_string()),
        ]));
        let reply = client(provider.clone())
            .call("the exact prompt", "system")
            .await
            .unwrap();

        assert_eq!(reply, "{\"summary\": \"ok\"}");
        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].model, "big-model");
        assert_eq!(calls[1].model, "small-model");
        assert_eq!(calls[0].prompt, "the exact prompt");
        assert_eq!(calls[1].prompt, calls[0].prompt);
    }

    #[tokio::test]
    async fn test_both_failures_propagate_last_error() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(LlmError::EmptyContent),
            Err(LlmError::Api {
                status: 503,
                message: "overloaded".to_string(),
            }),
        ]));
        let err = client(provider.clone()).call("p", "s").await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 503, .. }));
        assert_eq!(provider.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_policy_honors_max_attempts_per_model() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(LlmError::EmptyContent),
            Err(LlmError::EmptyContent),
            Ok("done".to_string()),
        ]));
        let llm = LlmClient::new(
            provider.clone(),
            FallbackPolicy::new(vec![
                ModelAttempt {
                    model: "a".to_string(),
                    max_attempts: 2,
                },
                ModelAttempt {
                    model: "b".to_string(),
                    max_attempts: 1,
                },
            ]),
        );
        assert_eq!(llm.call("p", "s").await.unwrap(), "done");
        assert_eq!(provider.models_called(), vec!["a", "a", "b"]);
    }

    #[tokio::test]
    async fn test_empty_policy_errors() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let llm = LlmClient::new(provider, FallbackPolicy::new(vec![]));
        assert!(matches!(llm.call("p", "s").await, Err(LlmError::NoAttempts)));
    }

    #[test]
    fn test_chat_request_wire_shape() {
        let body = ChatRequest {
            model: "m",
            messages: [
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "hi",
                },
            ],
            temperature: TEMPERATURE,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_chat_response_without_usage_deserializes() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "{}"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.usage.is_none());
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("{}"));
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }
}
