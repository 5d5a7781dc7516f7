//! Senjutsu Engine - wires configuration, logging and the skills pipeline
//! together for an embedding application.

pub mod config;
pub mod engine;

pub use config::EngineConfig;
pub use engine::SkillsEngine;

use anyhow::Result;
use tracing::info;

/// Initialize logging from `config`, build the engine and index skills
pub async fn start(config: &EngineConfig) -> Result<SkillsEngine> {
    senjutsu_logging::init_logging(&config.logging.level, config.logging.json)?;
    info!("Starting Senjutsu skills engine");

    let mut engine = SkillsEngine::from_config(config)?;
    let report = engine.bootstrap().await;
    info!(
        "Skills engine ready: {} indexed, {} rejected, {} errors",
        report.indexed, report.rejected, report.errors
    );
    Ok(engine)
}
