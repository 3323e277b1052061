//! OpenAI chat completions client (fallback provider).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::{CardPrompt, ProviderError, TextProvider};

/// Model used when none is configured.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
/// Public API root.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const TEMPERATURE: f32 = 0.9;
const MAX_TOKENS: u32 = 750;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI client. Without an API key every call fails with
/// [ProviderError::NotConfigured].
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: Url,
}

impl OpenAiProvider {
    /// New client against `base_url`.
    pub fn new(
        client: reqwest::Client,
        api_key: Option<String>,
        model: &str,
        base_url: Url,
    ) -> Self {
        Self {
            client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: model.to_string(),
            base_url,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.base_url.as_str().trim_end_matches('/')
        )
    }
}

#[async_trait]
impl TextProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, prompt: &CardPrompt) -> Result<String, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ProviderError::NotConfigured);
        };

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.instructions,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        debug!("POST {} model={}", self.endpoint(), self.model);
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::status(status, &text));
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|err| ProviderError::Malformed(err.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenAiProvider {
        let client = super::super::http_client(Duration::from_secs(5)).expect("client");
        let base = Url::parse(&server.uri()).expect("mock url");
        OpenAiProvider::new(client, Some("sk-test".to_string()), DEFAULT_OPENAI_MODEL, base)
    }

    fn prompt() -> CardPrompt {
        CardPrompt {
            instructions: "You design cards.".to_string(),
            user: "1. Always late".to_string(),
        }
    }

    #[tokio::test]
    async fn sends_system_and_user_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "max_tokens": 750,
                "messages": [
                    {"role": "system", "content": "You design cards."},
                    {"role": "user", "content": "1. Always late"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "card_name: Late Larry"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = provider(&server).complete(&prompt()).await.expect("completion");
        assert_eq!(text, "card_name: Late Larry");
    }

    #[tokio::test]
    async fn null_content_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": null}}]
            })))
            .mount(&server)
            .await;

        let err = provider(&server).complete(&prompt()).await.expect_err("should fail");
        assert!(matches!(err, ProviderError::EmptyResponse));
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = provider(&server).complete(&prompt()).await.expect_err("should fail");
        assert!(matches!(err, ProviderError::Malformed(_)));
    }
}
