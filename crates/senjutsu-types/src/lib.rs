//! Senjutsu Types - values shared between the provider, skills and engine crates.

use serde::{Deserialize, Serialize};

/// Which chat-completions backend generates text
#[derive(Debug, Clone, PartialEq)]
pub enum Provider {
    OpenAI {
        model: String,
        api_key: Option<String>,
        base_url: Option<String>,
    },
    Groq {
        model: String,
        api_key: Option<String>,
    },
    Ollama {
        model: String,
        base_url: String,
    },
}

/// Groq exposes an OpenAI-compatible API under this prefix
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

impl Default for Provider {
    fn default() -> Self {
        Provider::groq("moonshotai/kimi-k2-instruct")
    }
}

impl Provider {
    pub fn openai(model: &str) -> Self {
        Provider::OpenAI {
            model: model.to_string(),
            api_key: None,
            base_url: None,
        }
    }

    pub fn openai_full(model: &str, api_key: Option<&str>, base_url: Option<&str>) -> Self {
        Provider::OpenAI {
            model: model.to_string(),
            api_key: api_key.map(str::to_string),
            base_url: base_url.map(str::to_string),
        }
    }

    pub fn groq(model: &str) -> Self {
        Provider::Groq {
            model: model.to_string(),
            api_key: None,
        }
    }

    pub fn groq_with_api_key(model: &str, api_key: &str) -> Self {
        Provider::Groq {
            model: model.to_string(),
            api_key: Some(api_key.to_string()),
        }
    }

    pub fn ollama(model: &str, base_url: &str) -> Self {
        Provider::Ollama {
            model: model.to_string(),
            base_url: base_url.to_string(),
        }
    }

    /// Short backend name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "openai",
            Provider::Groq { .. } => "groq",
            Provider::Ollama { .. } => "ollama",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::OpenAI { model, .. }
            | Provider::Groq { model, .. }
            | Provider::Ollama { model, .. } => model,
        }
    }
}

/// Chat role for messages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One `{role, content}` pair sent to a generator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let msg = ChatMessage::user("hello");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hello"}"#);
    }

    #[test]
    fn test_provider_accessors() {
        let provider = Provider::ollama("llama3", "http://localhost:11434");
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.model(), "llama3");
        assert_eq!(Provider::default().name(), "groq");
    }
}
