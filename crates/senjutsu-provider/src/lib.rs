//! Text-generation capability used by the skills security review.
//!
//! Callers hand a configured [`TextGenerator`] to the skills crate; the
//! skills crate never builds one itself.

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use senjutsu_types::{ChatMessage, Provider, Role, GROQ_BASE_URL};
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Boxed future returned by [`TextGenerator::generate`], keeps the trait object safe.
pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = Result<Generation>> + Send + 'a>>;

/// Sampling temperature used for Groq-hosted models
const GROQ_TEMPERATURE: f32 = 0.35;

/// One generation call
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// System instruction
    pub system: String,
    /// Ordered conversation, system message excluded
    pub messages: Vec<ChatMessage>,
    /// Human label for logs
    pub label: String,
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn new(system: impl Into<String>, label: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            system: system.into(),
            messages: Vec::new(),
            label: label.into(),
            max_tokens,
        }
    }

    pub fn with_message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }
}

/// Generated text and how long it took
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    /// Wall-clock seconds spent in the call
    pub elapsed: f64,
}

/// Anything that turns a system instruction plus messages into text.
///
/// Transport concerns (retries, timeouts) belong to the implementation.
pub trait TextGenerator: Send + Sync {
    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> GenerateFuture<'a>;

    fn name(&self) -> &str;
}

/// Generator backed by an OpenAI-compatible chat-completions endpoint
pub struct ChatGenerator {
    provider: Provider,
    client: Client<OpenAIConfig>,
}

impl ChatGenerator {
    /// Create a generator for the given backend
    pub fn new(provider: Provider) -> Self {
        let config = match &provider {
            Provider::OpenAI {
                api_key, base_url, ..
            } => {
                let mut config = OpenAIConfig::new();
                if let Some(key) = api_key {
                    config = config.with_api_key(key);
                }
                if let Some(url) = base_url {
                    config = config.with_api_base(url);
                }
                config
            }
            Provider::Groq { api_key, .. } => {
                let config = OpenAIConfig::new().with_api_base(GROQ_BASE_URL);
                match api_key {
                    Some(key) => config.with_api_key(key),
                    None => config,
                }
            }
            Provider::Ollama { base_url, .. } => OpenAIConfig::new()
                .with_api_base(format!("{}/v1", base_url.trim_end_matches('/')))
                .with_api_key("ollama"),
        };

        info!(
            "Chat generator initialized: {} ({})",
            provider.name(),
            provider.model()
        );

        Self {
            provider,
            client: Client::with_config(config),
        }
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    #[allow(deprecated)]
    async fn complete(&self, request: &GenerationRequest) -> Result<Generation> {
        let mut chat_messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system.clone())
                .build()?
                .into(),
        ];

        for msg in &request.messages {
            let message: ChatCompletionRequestMessage = match msg.role {
                Role::System => ChatCompletionRequestSystemMessageArgs::default()
                    .content(msg.content.clone())
                    .build()?
                    .into(),
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(msg.content.clone())
                    .build()?
                    .into(),
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(msg.content.clone())
                    .build()?
                    .into(),
            };
            chat_messages.push(message);
        }

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(self.provider.model())
            .messages(chat_messages)
            .max_tokens(request.max_tokens);
        if matches!(self.provider, Provider::Groq { .. }) {
            builder.temperature(GROQ_TEMPERATURE);
        }
        let chat_request = builder.build()?;

        debug!(label = %request.label, "Sending chat completion request");
        let started = Instant::now();
        let response = self.client.chat().create(chat_request).await?;
        let elapsed = started.elapsed().as_secs_f64();

        let text = if let Some(choice) = response.choices.first() {
            choice.message.content.clone().unwrap_or_default()
        } else {
            warn!(label = %request.label, "{} returned no choices", self.provider.name());
            String::new()
        };

        debug!(label = %request.label, elapsed, "Chat completion finished");
        Ok(Generation { text, elapsed })
    }
}

impl TextGenerator for ChatGenerator {
    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> GenerateFuture<'a> {
        Box::pin(self.complete(request))
    }

    fn name(&self) -> &str {
        self.provider.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder_keeps_order() {
        let request = GenerationRequest::new("system", "label", 600)
            .with_message(ChatMessage::user("first"))
            .with_message(ChatMessage::assistant("second"));
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::User);
        assert_eq!(request.messages[1].content, "second");
        assert_eq!(request.max_tokens, 600);
    }

    #[test]
    fn test_generator_reports_backend_name() {
        let generator = ChatGenerator::new(Provider::ollama("llama3", "http://localhost:11434/"));
        assert_eq!(generator.name(), "ollama");
        assert_eq!(generator.provider().model(), "llama3");
    }

    #[tokio::test]
    #[ignore] // Needs OPENAI_API_KEY and network access
    async fn test_openai_roundtrip() {
        let generator = ChatGenerator::new(Provider::openai("gpt-4o-mini"));
        let request = GenerationRequest::new("Reply with OK.", "smoke", 5)
            .with_message(ChatMessage::user("ping"));
        let result = generator.generate(&request).await;
        assert!(result.is_ok());
    }
}
