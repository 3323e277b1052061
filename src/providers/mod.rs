//! Hosted text-generation clients and the primary/secondary fallback chain.

pub mod gemini;
pub mod openai;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::content::{ParseError, StructuredText};

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Longest slice of an error response body we keep for logs.
const ERROR_BODY_CHARS: usize = 200;

/// A prompt split into standing instructions and the per-card request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardPrompt {
    /// Output format, the type list and the rules.
    pub instructions: String,
    /// The five facts and the optional theme hint.
    pub user: String,
}

impl CardPrompt {
    /// Instructions and user part as a single message, for providers without roles.
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.instructions, self.user)
    }
}

/// Why a single provider attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// No API key was supplied for this provider.
    #[error("not configured (no API key)")]
    NotConfigured,
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),
    /// The attempt ran out of time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// Non-2xx answer.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Response status code
        status: u16,
        /// Start of the response body
        body: String,
    },
    /// The response was well-formed but held no text.
    #[error("response contained no text")]
    EmptyResponse,
    /// The response body was not the JSON we expected.
    #[error("malformed response: {0}")]
    Malformed(String),
    /// The text came back but lacked required card fields.
    #[error("unusable card text: {0}")]
    Schema(#[from] ParseError),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

impl ProviderError {
    /// Builds a [ProviderError::Status], keeping only the start of the body.
    pub fn status(status: reqwest::StatusCode, body: &str) -> Self {
        ProviderError::Status {
            status: status.as_u16(),
            body: body.chars().take(ERROR_BODY_CHARS).collect(),
        }
    }
}

/// One failed attempt, tagged with the provider that made it.
#[derive(Debug, thiserror::Error)]
#[error("{provider}: {error}")]
pub struct ProviderFailure {
    /// Provider name
    pub provider: String,
    /// What went wrong
    pub error: ProviderError,
}

/// Both providers failed; carries both reasons.
#[derive(Debug, thiserror::Error)]
#[error("all text providers failed (primary {primary}; secondary {secondary})")]
pub struct GenerationFailure {
    /// The first attempt
    pub primary: ProviderFailure,
    /// The fallback attempt
    pub secondary: ProviderFailure,
}

/// Something that turns a prompt into raw text.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Whether credentials are present. An unconfigured provider still gets
    /// called, and fails with [ProviderError::NotConfigured].
    fn is_configured(&self) -> bool;

    /// Sends the prompt and returns the generated text.
    async fn complete(&self, prompt: &CardPrompt) -> Result<String, ProviderError>;
}

/// Tries the primary provider, then the secondary exactly once.
#[derive(Clone)]
pub struct ProviderChain {
    primary: Arc<dyn TextProvider>,
    secondary: Arc<dyn TextProvider>,
    timeout: Duration,
}

impl ProviderChain {
    /// `timeout` bounds each attempt separately.
    pub fn new(
        primary: Arc<dyn TextProvider>,
        secondary: Arc<dyn TextProvider>,
        timeout: Duration,
    ) -> Self {
        Self {
            primary,
            secondary,
            timeout,
        }
    }

    /// True when at least one provider has credentials.
    pub fn any_configured(&self) -> bool {
        self.primary.is_configured() || self.secondary.is_configured()
    }

    /// Names of the providers that have credentials, primary first.
    pub fn configured_names(&self) -> Vec<String> {
        [&self.primary, &self.secondary]
            .into_iter()
            .filter(|provider| provider.is_configured())
            .map(|provider| provider.name().to_string())
            .collect()
    }

    /// Produces schema-checked card text, falling back once on any failure.
    pub async fn generate(&self, prompt: &CardPrompt) -> Result<StructuredText, GenerationFailure> {
        let primary = match self.attempt(self.primary.as_ref(), prompt).await {
            Ok(text) => return Ok(text),
            Err(failure) => failure,
        };
        warn!(
            "Falling back from {} to {}: {}",
            primary.provider,
            self.secondary.name(),
            primary.error
        );

        match self.attempt(self.secondary.as_ref(), prompt).await {
            Ok(text) => Ok(text),
            Err(secondary) => Err(GenerationFailure { primary, secondary }),
        }
    }

    async fn attempt(
        &self,
        provider: &dyn TextProvider,
        prompt: &CardPrompt,
    ) -> Result<StructuredText, ProviderFailure> {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.timeout, provider.complete(prompt)).await {
            Ok(Ok(raw)) => StructuredText::parse(&raw).map_err(ProviderError::from),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(ProviderError::Timeout(self.timeout)),
        };
        let latency_ms = started.elapsed().as_millis();

        match result {
            Ok(text) => {
                info!(
                    "event=provider_attempt provider={} outcome=ok latency_ms={}",
                    provider.name(),
                    latency_ms
                );
                Ok(text)
            }
            Err(error) => {
                warn!(
                    "event=provider_attempt provider={} outcome=error latency_ms={} reason={:?}",
                    provider.name(),
                    latency_ms,
                    error.to_string()
                );
                Err(ProviderFailure {
                    provider: provider.name().to_string(),
                    error,
                })
            }
        }
    }
}

/// Builds the shared HTTP client both providers use.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("cardsmith/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|err| ProviderError::Transport(err.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) const GLITCH_JSON: &str = r#"{"card_name": "Buffer Betty", "custom_type": "Glitch",
        "stat1_name": "Chaos", "stat1_value": 2400, "stat2_name": "Uptime", "stat2_value": 300,
        "effect_description": "When this card is played, every plan reboots twice.",
        "visual_effects": ["glitch", "neon"]}"#;

    enum Reply {
        Text(String),
        Fail(String),
        NotConfigured,
    }

    /// Scripted provider for tests.
    pub(crate) struct MockProvider {
        name: &'static str,
        reply: Reply,
        delay: Option<Duration>,
        calls: AtomicUsize,
        pub(crate) prompts: Mutex<Vec<CardPrompt>>,
    }

    impl MockProvider {
        fn build(name: &'static str, reply: Reply, delay: Option<Duration>) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply,
                delay,
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn ok(name: &'static str, text: &str) -> Arc<Self> {
            Self::build(name, Reply::Text(text.to_string()), None)
        }

        pub(crate) fn failing(name: &'static str, reason: &str) -> Arc<Self> {
            Self::build(name, Reply::Fail(reason.to_string()), None)
        }

        pub(crate) fn unconfigured(name: &'static str) -> Arc<Self> {
            Self::build(name, Reply::NotConfigured, None)
        }

        pub(crate) fn slow(name: &'static str, delay: Duration) -> Arc<Self> {
            Self::build(name, Reply::Text(GLITCH_JSON.to_string()), Some(delay))
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextProvider for MockProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn is_configured(&self) -> bool {
            !matches!(self.reply, Reply::NotConfigured)
        }

        async fn complete(&self, prompt: &CardPrompt) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().expect("lock").push(prompt.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.reply {
                Reply::Text(text) => Ok(text.clone()),
                Reply::Fail(reason) => Err(ProviderError::Transport(reason.clone())),
                Reply::NotConfigured => Err(ProviderError::NotConfigured),
            }
        }
    }

    fn prompt() -> CardPrompt {
        CardPrompt {
            instructions: "make a card".to_string(),
            user: "1. likes cats".to_string(),
        }
    }

    fn chain(primary: Arc<MockProvider>, secondary: Arc<MockProvider>) -> ProviderChain {
        ProviderChain::new(primary, secondary, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn primary_success_skips_secondary() {
        let primary = MockProvider::ok("gemini", GLITCH_JSON);
        let secondary = MockProvider::ok("openai", GLITCH_JSON);
        let text = chain(primary.clone(), secondary.clone())
            .generate(&prompt())
            .await
            .expect("generation should succeed");

        assert_eq!(text.name, "Buffer Betty");
        assert_eq!(primary.call_count(), 1);
        assert_eq!(secondary.call_count(), 0);
    }

    #[tokio::test]
    async fn primary_failure_falls_back_once_with_same_prompt() {
        let primary = MockProvider::failing("gemini", "refused");
        let secondary = MockProvider::ok("openai", GLITCH_JSON);
        let text = chain(primary.clone(), secondary.clone())
            .generate(&prompt())
            .await
            .expect("fallback should succeed");

        assert_eq!(text.personality_type, "Glitch");
        assert_eq!(primary.call_count(), 1);
        assert_eq!(secondary.call_count(), 1);
        let sent = secondary.prompts.lock().expect("lock");
        assert_eq!(sent.first(), Some(&prompt()));
    }

    #[tokio::test]
    async fn schema_incomplete_primary_triggers_fallback() {
        let primary = MockProvider::ok("gemini", r#"{"card_name": "No Type Here"}"#);
        let secondary = MockProvider::ok("openai", GLITCH_JSON);
        let text = chain(primary.clone(), secondary.clone())
            .generate(&prompt())
            .await
            .expect("fallback should succeed");

        assert_eq!(text.name, "Buffer Betty");
        assert_eq!(secondary.call_count(), 1);
    }

    #[tokio::test]
    async fn unconfigured_primary_counts_as_failure() {
        let primary = MockProvider::unconfigured("gemini");
        let secondary = MockProvider::ok("openai", GLITCH_JSON);
        let chain = chain(primary.clone(), secondary.clone());

        assert!(chain.any_configured());
        assert_eq!(chain.configured_names(), vec!["openai".to_string()]);
        chain.generate(&prompt()).await.expect("fallback should succeed");
        assert_eq!(primary.call_count(), 1);
    }

    #[tokio::test]
    async fn both_failing_reports_both_reasons() {
        let primary = MockProvider::failing("gemini", "refused");
        let secondary = MockProvider::ok("openai", "I'd rather not.");
        let failure = chain(primary.clone(), secondary.clone())
            .generate(&prompt())
            .await
            .expect_err("both should fail");

        assert_eq!(failure.primary.provider, "gemini");
        assert_eq!(failure.secondary.provider, "openai");
        assert!(matches!(failure.secondary.error, ProviderError::Schema(_)));
        assert_eq!(primary.call_count(), 1);
        assert_eq!(secondary.call_count(), 1);
    }

    #[tokio::test]
    async fn slow_primary_times_out_and_falls_back() {
        let primary = MockProvider::slow("gemini", Duration::from_secs(30));
        let secondary = MockProvider::ok("openai", GLITCH_JSON);
        let chain = ProviderChain::new(primary.clone(), secondary.clone(), Duration::from_millis(50));

        let text = chain.generate(&prompt()).await.expect("fallback should succeed");
        assert_eq!(text.name, "Buffer Betty");
        assert_eq!(secondary.call_count(), 1);
    }

    #[test]
    fn status_error_body_is_truncated() {
        let body = "x".repeat(1000);
        match ProviderError::status(reqwest::StatusCode::BAD_GATEWAY, &body) {
            ProviderError::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body.len(), ERROR_BODY_CHARS);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
