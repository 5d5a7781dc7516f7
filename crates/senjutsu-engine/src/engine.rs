use anyhow::Result;
use senjutsu_provider::{ChatGenerator, TextGenerator};
use senjutsu_skills::{IndexReport, RetrievalHit, Retriever, SecurityValidator, SkillStore};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::EngineConfig;

/// Hits handed to [`SkillsEngine::context_for`]
pub const CONTEXT_SKILLS: usize = 4;

/// Store, validator and retriever built from one configuration
pub struct SkillsEngine {
    store: SkillStore,
    retriever: Retriever,
    top_k: usize,
    pull_on_start: bool,
}

impl SkillsEngine {
    /// Build from configuration, with semantic review when a provider is usable
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let generator = if config.security.llm_review {
            config.provider().map(|provider| {
                info!(
                    "Semantic review enabled: {} ({})",
                    provider.name(),
                    provider.model()
                );
                Arc::new(ChatGenerator::new(provider)) as Arc<dyn TextGenerator>
            })
        } else {
            None
        };

        if generator.is_none() {
            info!("Semantic review disabled, pattern scan only");
        }

        Self::with_generator(config, generator)
    }

    /// Build with an explicit generator (or none)
    pub fn with_generator(
        config: &EngineConfig,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Result<Self> {
        let validator = SecurityValidator::new(generator)?;
        let store = SkillStore::new(config.store_config()?, validator);

        Ok(Self {
            store,
            retriever: Retriever::new(config.retrieval_config()),
            top_k: config.retrieval.top_k,
            pull_on_start: config.skills.pull_on_start,
        })
    }

    /// Optionally refresh remote mirrors, then rebuild the index
    pub async fn bootstrap(&mut self) -> IndexReport {
        if self.pull_on_start {
            let synced = self.store.pull_sources().await;
            info!("Pulled {} remote source(s)", synced);
        }

        let indexed = self.store.index_all().await;
        if indexed == 0 {
            warn!("No skills indexed, retrieval will return nothing");
        }
        self.store.last_report()
    }

    /// Best matches for `query`, at most the configured `top_k`
    pub fn retrieve(&self, query: &str) -> Vec<RetrievalHit<'_>> {
        self.retriever.retrieve(&self.store, query, self.top_k)
    }

    /// Content blocks of the best few matches, ready for a prompt
    pub fn context_for(&self, query: &str) -> String {
        let keys: Vec<&str> = self
            .retrieve(query)
            .into_iter()
            .take(CONTEXT_SKILLS)
            .map(|hit| hit.key)
            .collect();
        self.store.get_content(&keys)
    }

    pub fn list_skills(&self) -> String {
        self.store.list_skills()
    }

    pub fn store(&self) -> &SkillStore {
        &self.store
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}
