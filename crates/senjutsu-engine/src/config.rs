use anyhow::{anyhow, Context};
use config::builder::{ConfigBuilder, DefaultState};
use senjutsu_skills::{RetrievalConfig, SourceRegistry, StoreConfig};
use senjutsu_types::Provider;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default config template created when no config exists
const DEFAULT_CONFIG: &str = r#"
[skills]
cache_dir = ".senjutsu_cache"
# builtin_dir = ""   # defaults to the skills shipped with senjutsu-skills
fallback_dir = ""
local_dir = ""       # your own SKILL.md / *.cursorrules
max_content_chars = 3000
pull_on_start = false

# Leave [sources] unset to mirror the four default remotes. Once any config
# file defines it, only the listed names are used. Tables from several files
# merge key by key, so set a URL to "" to switch a source off.
# [sources]
# anthropics = "https://github.com/anthropics/skills"
# microsoft = "https://github.com/microsoft/skills"
# vercel = "https://github.com/vercel-labs/skills"
# regenrek = "https://github.com/regenrek/agent-skills"

[retrieval]
top_k = 6
pinned = ["dev-expert", "github-actions", "svg-animations"]
extra_stopwords = []

[security]
llm_review = true  # semantic review when a provider is usable

[provider]
default = "groq"  # or "openai", "ollama"

[provider.groq]
api_key = ""  # Set via GROQ_API_KEY env var
model = "moonshotai/kimi-k2-instruct"

[provider.openai]
api_key = ""  # Set via OPENAI_API_KEY env var
model = "gpt-4o"
base_url = ""  # Optional: Set via OPENAI_BASE_URL env var

[provider.ollama]
base_url = "http://localhost:11434"
model = "llama3"

[logging]
level = "info"  # trace, debug, info, warn, error
json = false
"#;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SkillsConfig {
    pub cache_dir: String,
    /// Unset means the shipped skills directory
    pub builtin_dir: Option<String>,
    pub fallback_dir: Option<String>,
    pub local_dir: Option<String>,
    pub max_content_chars: usize,
    pub pull_on_start: bool,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            cache_dir: ".senjutsu_cache".into(),
            builtin_dir: None,
            fallback_dir: None,
            local_dir: None,
            max_content_chars: 3000,
            pull_on_start: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RetrievalSection {
    pub top_k: usize,
    pub pinned: Vec<String>,
    pub extra_stopwords: Vec<String>,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            top_k: 6,
            pinned: RetrievalConfig::default().pinned,
            extra_stopwords: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SecurityConfig {
    pub llm_review: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self { llm_review: true }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GroqConfig {
    pub api_key: String,
    pub model: String,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "moonshotai/kimi-k2-instruct".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-4o".into(),
            base_url: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "llama3".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    pub default: String,
    pub groq: GroqConfig,
    pub openai: OpenAIConfig,
    pub ollama: OllamaConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            default: "groq".into(),
            groq: GroqConfig::default(),
            openai: OpenAIConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

fn default_sources() -> BTreeMap<String, String> {
    SourceRegistry::default()
        .iter()
        .map(|s| (s.name.clone(), s.url.clone()))
        .collect()
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub skills: SkillsConfig,
    /// Source name to git URL. An empty URL disables the source.
    pub sources: BTreeMap<String, String>,
    pub retrieval: RetrievalSection,
    pub security: SecurityConfig,
    pub provider: ProviderConfig,
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            skills: SkillsConfig::default(),
            sources: default_sources(),
            retrieval: RetrievalSection::default(),
            security: SecurityConfig::default(),
            provider: ProviderConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Get the global config path: ~/.senjutsu/senjutsu.toml
    fn global_config_path() -> anyhow::Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home.join(".senjutsu").join("senjutsu.toml"))
    }

    /// Create `path` and its directory from the default template if missing
    pub fn ensure_config_file(path: &Path) -> anyhow::Result<()> {
        if let Some(config_dir) = path.parent() {
            if !config_dir.exists() {
                fs::create_dir_all(config_dir)?;
                eprintln!("Created config directory: {}", config_dir.display());
            }
        }

        if !path.exists() {
            fs::write(path, DEFAULT_CONFIG.trim())?;
            eprintln!("Created default config: {}", path.display());
            eprintln!("Please edit this file or set environment variables.");
        }

        Ok(())
    }

    /// Load configuration with layered approach:
    /// 1. Global config: ~/.senjutsu/senjutsu.toml (auto-created if missing)
    /// 2. Local override: ./senjutsu.toml (workspace, optional)
    /// 3. Environment variables (SENJUTSU__SECTION__KEY)
    /// 4. GROQ_API_KEY, OPENAI_API_KEY, OPENAI_BASE_URL, OLLAMA_BASE_URL
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let global_config_path = Self::global_config_path()?;
        Self::ensure_config_file(&global_config_path)?;

        let mut config_builder = Self::file_layers(&[global_config_path])
            .add_source(config::File::with_name("senjutsu").required(false))
            .add_source(config::Environment::with_prefix("SENJUTSU").separator("__"));

        if let Ok(key) = env::var("GROQ_API_KEY") {
            config_builder = config_builder.set_override("provider.groq.api_key", key)?;
        }

        if let Ok(key) = env::var("OPENAI_API_KEY") {
            config_builder = config_builder.set_override("provider.openai.api_key", key)?;
        }

        if let Ok(url) = env::var("OPENAI_BASE_URL") {
            config_builder = config_builder.set_override("provider.openai.base_url", url)?;
        }

        if let Ok(url) = env::var("OLLAMA_BASE_URL") {
            config_builder = config_builder.set_override("provider.ollama.base_url", url)?;
        }

        let config: Self = config_builder
            .build()?
            .try_deserialize()
            .context("invalid senjutsu configuration")?;
        Ok(config)
    }

    fn file_layers(paths: &[PathBuf]) -> ConfigBuilder<DefaultState> {
        paths.iter().fold(config::Config::builder(), |builder, path| {
            builder.add_source(config::File::from(path.as_path()))
        })
    }

    /// Layer config files in order, later files winning key by key
    pub fn from_files(paths: &[PathBuf]) -> anyhow::Result<Self> {
        let config: Self = Self::file_layers(paths)
            .build()?
            .try_deserialize()
            .context("invalid senjutsu configuration")?;
        Ok(config)
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Backend for semantic review, if one is usable.
    ///
    /// Hosted backends need an API key; Ollama only needs its endpoint.
    pub fn provider(&self) -> Option<Provider> {
        let p = &self.provider;
        match p.default.as_str() {
            "groq" => non_empty(&p.groq.api_key)
                .map(|key| Provider::groq_with_api_key(&p.groq.model, key)),
            "openai" => non_empty(&p.openai.api_key).map(|key| {
                Provider::openai_full(
                    &p.openai.model,
                    Some(key),
                    p.openai.base_url.as_deref().and_then(non_empty),
                )
            }),
            "ollama" => {
                non_empty(&p.ollama.base_url).map(|url| Provider::ollama(&p.ollama.model, url))
            }
            other => {
                warn!("Unknown provider '{}', semantic review disabled", other);
                None
            }
        }
    }

    /// Indexer settings with `~` expanded and empty paths treated as unset
    pub fn store_config(&self) -> anyhow::Result<StoreConfig> {
        let skills = &self.skills;
        let mut store = StoreConfig::default()
            .with_cache_dir(expand_path(&skills.cache_dir))
            .with_fallback_dir(optional_path(skills.fallback_dir.as_deref()))
            .with_local_dir(optional_path(skills.local_dir.as_deref()))
            .with_sources(self.source_registry()?)
            .with_max_content_chars(skills.max_content_chars);
        if let Some(dir) = skills.builtin_dir.as_deref() {
            store = store.with_builtin_dir(optional_path(Some(dir)));
        }
        Ok(store)
    }

    /// Known remotes keep their usual order, extra ones follow by name
    pub fn source_registry(&self) -> anyhow::Result<SourceRegistry> {
        let defaults = SourceRegistry::default();
        let enabled = |name: &str| {
            self.sources
                .get(name)
                .filter(|url| !url.trim().is_empty())
                .cloned()
        };

        let mut pairs: Vec<(String, String)> = defaults
            .iter()
            .filter_map(|s| enabled(&s.name).map(|url| (s.name.clone(), url)))
            .collect();
        pairs.extend(
            self.sources
                .keys()
                .filter(|name| !defaults.is_known(name))
                .filter_map(|name| enabled(name).map(|url| (name.clone(), url))),
        );

        Ok(SourceRegistry::from_pairs(pairs)?)
    }

    pub fn retrieval_config(&self) -> RetrievalConfig {
        RetrievalConfig::default()
            .with_pinned(self.retrieval.pinned.clone())
            .with_extra_stopwords(&self.retrieval.extra_stopwords)
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

fn optional_path(value: Option<&str>) -> Option<PathBuf> {
    value.and_then(non_empty).map(expand_path)
}

/// Expand a leading `~/` to the home directory
fn expand_path(value: &str) -> PathBuf {
    match (value.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(value),
    }
}
