//! Remote skill sources mirrored into a local cache with git

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{Result, SkillError};

/// Timeout for refreshing an existing mirror
pub const PULL_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for a fresh shallow clone
pub const CLONE_TIMEOUT: Duration = Duration::from_secs(60);

/// One known remote skill collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSource {
    /// Also the mirror directory name under the cache
    pub name: String,
    /// git URL
    pub url: String,
}

impl RemoteSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Mirror location under `cache_dir`
    pub fn mirror_dir(&self, cache_dir: &Path) -> PathBuf {
        cache_dir.join(&self.name)
    }

    /// Clone or refresh the mirror under `cache_dir`
    pub async fn sync(&self, cache_dir: &Path) -> Result<()> {
        let mirror = self.mirror_dir(cache_dir);

        let (cmd, timeout) = if mirror.exists() {
            let mut cmd = Command::new("git");
            cmd.arg("-C").arg(&mirror).args(["pull", "--quiet"]);
            (cmd, PULL_TIMEOUT)
        } else {
            let mut cmd = Command::new("git");
            cmd.args(["clone", "--depth=1", "--quiet", self.url.as_str()])
                .arg(&mirror);
            (cmd, CLONE_TIMEOUT)
        };

        debug!("Syncing source '{}' into {}", self.name, mirror.display());
        run_with_timeout(&self.name, cmd, timeout).await
    }
}

/// Run a sync command for source `name`, killing it after `timeout`
async fn run_with_timeout(name: &str, mut cmd: Command, timeout: Duration) -> Result<()> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| SkillError::SyncTimeout {
            name: name.to_string(),
            timeout: timeout.as_secs(),
        })?
        .map_err(|e| SkillError::SyncFailed {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

    if output.status.success() {
        Ok(())
    } else {
        Err(SkillError::SyncFailed {
            name: name.to_string(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Ordered set of known remote sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRegistry {
    sources: Vec<RemoteSource>,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new(vec![
            RemoteSource::new("anthropics", "https://github.com/anthropics/skills"),
            RemoteSource::new("microsoft", "https://github.com/microsoft/skills"),
            RemoteSource::new("vercel", "https://github.com/vercel-labs/skills"),
            RemoteSource::new("regenrek", "https://github.com/regenrek/agent-skills"),
        ])
    }
}

impl SourceRegistry {
    pub fn new(sources: Vec<RemoteSource>) -> Self {
        Self { sources }
    }

    /// Registry with no remotes
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Build from `(name, url)` pairs, keeping their order.
    ///
    /// Names become directories under the cache, so they must be a single
    /// plain path component.
    pub fn from_pairs<I, N, U>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, U)>,
        N: Into<String>,
        U: Into<String>,
    {
        let mut sources: Vec<RemoteSource> = Vec::new();
        for (name, url) in pairs {
            let source = RemoteSource::new(name, url);
            let plain = !source.name.is_empty()
                && source.name != "."
                && source.name != ".."
                && !source.name.contains(['/', '\\']);
            if !plain {
                return Err(SkillError::InvalidConfig(format!(
                    "source name '{}' is not a plain directory name",
                    source.name
                )));
            }
            if source.url.trim().is_empty() {
                return Err(SkillError::InvalidConfig(format!(
                    "source '{}' has no url",
                    source.name
                )));
            }
            if sources.iter().any(|s| s.name == source.name) {
                return Err(SkillError::InvalidConfig(format!(
                    "source '{}' is listed twice",
                    source.name
                )));
            }
            sources.push(source);
        }
        Ok(Self::new(sources))
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.sources.iter().any(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteSource> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Sync every source one after another.
    ///
    /// A failing source is logged and skipped. Returns how many synced.
    pub async fn sync_all(&self, cache_dir: &Path) -> usize {
        if self.sources.is_empty() {
            info!("No remote skill sources configured");
            return 0;
        }

        if let Err(e) = tokio::fs::create_dir_all(cache_dir).await {
            warn!("❌ Cannot create skill cache {}: {}", cache_dir.display(), e);
            return 0;
        }

        let mut synced = 0;
        for source in &self.sources {
            match source.sync(cache_dir).await {
                Ok(()) => {
                    info!("✅ Source '{}' synced", source.name);
                    synced += 1;
                }
                Err(e) => warn!("❌ {}", e),
            }
        }

        info!("Remote sources ready: {}/{} synced", synced, self.sources.len());
        synced
    }
}
