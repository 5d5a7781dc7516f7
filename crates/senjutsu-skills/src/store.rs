//! In-memory skill store and the indexer that fills it

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::builtin;
use crate::document::{
    content_hash, extract_description, name_from_path, truncate_chars,
    Frontmatter, SkillDocument, SkillFormat,
};
use crate::sources::SourceRegistry;
use crate::validator::SecurityValidator;

/// Source tag for the shipped skills
pub const BUILTIN_SOURCE: &str = "senjutsu-builtin";
/// Source tag for user-supplied and unrecognised files
pub const LOCAL_SOURCE: &str = "local";

const DEFAULT_CACHE_DIR: &str = ".senjutsu_cache";
const DEFAULT_MAX_CONTENT_CHARS: usize = 3000;
const LIST_DESCRIPTION_CHARS: usize = 80;
const EMPTY_LISTING: &str = "(no skills indexed)";

fn separator() -> String {
    "=".repeat(50)
}

/// Where the indexer looks and how much it hands out
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Mirrors of remote sources, one subdirectory each
    pub cache_dir: PathBuf,
    /// Shipped skills
    pub builtin_dir: Option<PathBuf>,
    /// Secondary shipped directory, ignored when it is the builtin one
    pub fallback_dir: Option<PathBuf>,
    /// User-supplied skills
    pub local_dir: Option<PathBuf>,
    pub sources: SourceRegistry,
    /// Per-document bound in [`SkillStore::get_content`]
    pub max_content_chars: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            builtin_dir: Some(builtin::default_dir()),
            fallback_dir: None,
            local_dir: None,
            sources: SourceRegistry::default(),
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
        }
    }
}

impl StoreConfig {
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_builtin_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.builtin_dir = dir;
        self
    }

    pub fn with_fallback_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.fallback_dir = dir;
        self
    }

    pub fn with_local_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.local_dir = dir;
        self
    }

    pub fn with_sources(mut self, sources: SourceRegistry) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_max_content_chars(mut self, max: usize) -> Self {
        self.max_content_chars = max;
        self
    }
}

/// Tallies of the last indexing pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub indexed: usize,
    /// Vetoed by the security validator
    pub rejected: usize,
    /// Unreadable files and failed reviews
    pub errors: usize,
}

enum Ingest {
    Indexed,
    Rejected,
    Failed,
}

/// Which files a root contributes and how they are tagged
struct Root {
    dir: PathBuf,
    formats: &'static [SkillFormat],
    tag: RootTag,
}

#[derive(Clone, Copy)]
enum RootTag {
    /// First path component under the cache names the source
    Mirror,
    Fixed(&'static str),
}

/// Validated documents keyed by `source::name`, in insertion order
pub struct SkillStore {
    config: StoreConfig,
    validator: SecurityValidator,
    entries: Vec<(String, SkillDocument)>,
    index: HashMap<String, usize>,
    report: IndexReport,
}

impl SkillStore {
    pub fn new(config: StoreConfig, validator: SecurityValidator) -> Self {
        Self {
            config,
            validator,
            entries: Vec::new(),
            index: HashMap::new(),
            report: IndexReport::default(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn validator(&self) -> &SecurityValidator {
        &self.validator
    }

    /// Clone or refresh every remote mirror. Returns how many synced.
    pub async fn pull_sources(&self) -> usize {
        self.config.sources.sync_all(&self.config.cache_dir).await
    }

    /// Rebuild the store from every root. Returns the indexed count.
    ///
    /// Per-file failures are logged and counted in [`IndexReport`], never
    /// returned.
    pub async fn index_all(&mut self) -> usize {
        self.entries.clear();
        self.index.clear();
        let mut report = IndexReport::default();

        for (path, source) in self.discover() {
            match self.ingest(&path, source).await {
                Ingest::Indexed => report.indexed += 1,
                Ingest::Rejected => report.rejected += 1,
                Ingest::Failed => report.errors += 1,
            }
        }

        info!(
            "✅ {} skills indexed, {} rejected (security), {} errors",
            report.indexed, report.rejected, report.errors
        );
        self.report = report;
        report.indexed
    }

    fn roots(&self) -> Vec<Root> {
        const MIRROR: &[SkillFormat] = &[
            SkillFormat::SkillMd,
            SkillFormat::CursorRules,
            SkillFormat::LlmsTxt,
        ];
        const SHIPPED: &[SkillFormat] = &[SkillFormat::SkillMd];
        const LOCAL: &[SkillFormat] = &[SkillFormat::SkillMd, SkillFormat::CursorRules];

        let mut roots = vec![Root {
            dir: self.config.cache_dir.clone(),
            formats: MIRROR,
            tag: RootTag::Mirror,
        }];

        if let Some(dir) = &self.config.builtin_dir {
            roots.push(Root {
                dir: dir.clone(),
                formats: SHIPPED,
                tag: RootTag::Fixed(BUILTIN_SOURCE),
            });
        }

        if let Some(dir) = &self.config.fallback_dir {
            let duplicate = self
                .config
                .builtin_dir
                .as_deref()
                .is_some_and(|builtin| same_dir(builtin, dir));
            if !duplicate {
                roots.push(Root {
                    dir: dir.clone(),
                    formats: SHIPPED,
                    tag: RootTag::Fixed(BUILTIN_SOURCE),
                });
            }
        }

        if let Some(dir) = &self.config.local_dir {
            roots.push(Root {
                dir: dir.clone(),
                formats: LOCAL,
                tag: RootTag::Fixed(LOCAL_SOURCE),
            });
        }

        roots
    }

    /// Candidate files with their source tag, root by root and format by format
    fn discover(&self) -> Vec<(PathBuf, String)> {
        let mut found = Vec::new();
        for root in self.roots() {
            if !root.dir.is_dir() {
                debug!("Skipping missing skill root {}", root.dir.display());
                continue;
            }
            for format in root.formats {
                for path in walk_matching(&root.dir, *format) {
                    let source = match root.tag {
                        RootTag::Mirror => self.mirror_source(&path),
                        RootTag::Fixed(tag) => tag.to_string(),
                    };
                    found.push((path, source));
                }
            }
        }
        found
    }

    fn mirror_source(&self, path: &Path) -> String {
        path.strip_prefix(&self.config.cache_dir)
            .ok()
            .and_then(|rel| rel.components().next())
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .filter(|name| self.config.sources.is_known(name))
            .unwrap_or_else(|| LOCAL_SOURCE.to_string())
    }

    async fn ingest(&mut self, path: &Path, source: String) -> Ingest {
        let Some(format) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(SkillFormat::detect)
        else {
            return Ingest::Failed;
        };

        let raw = match tokio::fs::read(path).await {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    warn!("Skipping non UTF-8 skill file {}", path.display());
                    return Ingest::Failed;
                }
            },
            Err(e) => {
                warn!("Cannot read skill file {}: {}", path.display(), e);
                return Ingest::Failed;
            }
        };

        let (name, description) = {
            let frontmatter = Frontmatter::split(&raw);
            let (meta, body) = match &frontmatter {
                Some((meta, body)) => (Some(meta), *body),
                None => (None, raw.as_str()),
            };
            let name = meta
                .and_then(|m| m.name.clone())
                .unwrap_or_else(|| name_from_path(path, format));
            let description = extract_description(body, meta, format, &name);
            (name, description)
        };

        let verdict = match self.validator.validate(&name, &raw).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("Skipping '{}': {}", name, e);
                return Ingest::Failed;
            }
        };
        if verdict.is_rejected() {
            warn!(
                skill = %name,
                source = %source,
                layer = %verdict.layer,
                "🛡️ Rejected: {}",
                verdict.issues.join("; ")
            );
            return Ingest::Rejected;
        }

        let hash = content_hash(&raw);
        let content = verdict.sanitized_version.unwrap_or(raw);
        let document = SkillDocument::new(
            name,
            source,
            format,
            description,
            content,
            hash,
            path.to_path_buf(),
        );
        self.insert(document);
        Ingest::Indexed
    }

    /// Same key replaces the earlier document in place
    fn insert(&mut self, document: SkillDocument) {
        let key = document.key();
        if let Some(&slot) = self.index.get(&key) {
            debug!("Replacing duplicate skill key {}", key);
            self.entries[slot].1 = document;
        } else {
            self.index.insert(key.clone(), self.entries.len());
            self.entries.push((key, document));
        }
    }

    pub fn get(&self, key: &str) -> Option<&SkillDocument> {
        self.index.get(key).map(|&slot| &self.entries[slot].1)
    }

    /// Exact key first, then the first document with that name
    fn resolve(&self, key: &str) -> Option<&SkillDocument> {
        self.get(key).or_else(|| {
            self.entries
                .iter()
                .map(|(_, doc)| doc)
                .find(|doc| doc.name() == key)
        })
    }

    /// Labeled, bounded blocks for `keys` in order. Unknown keys are skipped.
    pub fn get_content<S: AsRef<str>>(&self, keys: &[S]) -> String {
        let sep = separator();
        keys.iter()
            .filter_map(|key| self.resolve(key.as_ref()))
            .map(|doc| {
                format!(
                    "\n{sep}\nSKILL [{}] : {}\nFormat: {}\n{sep}\n{}",
                    doc.source(),
                    doc.name(),
                    doc.format(),
                    truncate_chars(doc.content(), self.config.max_content_chars)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// One line per document, sorted by key
    pub fn list_skills(&self) -> String {
        if self.entries.is_empty() {
            return EMPTY_LISTING.to_string();
        }

        let mut sorted: Vec<_> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        sorted
            .into_iter()
            .map(|(_, doc)| {
                format!(
                    "• [{}] ({}, {}) - {}",
                    doc.name(),
                    doc.source(),
                    doc.format(),
                    truncate_chars(doc.description(), LIST_DESCRIPTION_CHARS)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Documents with their keys, in insertion order
    pub fn documents(&self) -> impl Iterator<Item = (&str, &SkillDocument)> {
        self.entries.iter().map(|(key, doc)| (key.as_str(), doc))
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_report(&self) -> IndexReport {
        self.report
    }
}

/// Files under `dir` recognised as `format`, sorted, skipping `.git`
fn walk_matching(dir: &Path, format: SkillFormat) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.file_name()
                .to_str()
                .and_then(SkillFormat::detect)
                .is_some_and(|f| f == format)
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, text: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    fn store_for(config: StoreConfig) -> SkillStore {
        SkillStore::new(config, SecurityValidator::pattern_only().unwrap())
    }

    fn isolated(dir: &Path) -> StoreConfig {
        StoreConfig::default()
            .with_cache_dir(dir.join("cache"))
            .with_builtin_dir(None)
            .with_sources(SourceRegistry::default())
    }

    #[tokio::test]
    async fn test_index_tags_and_formats() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("cache");
        write(&cache.join("anthropics/pdf_tools/SKILL.md"), "---\nname: pdf\n---\nWork with PDF documents and forms.");
        write(&cache.join("vercel/docs/llms.txt"), "Next.js documentation for agents.");
        write(&cache.join("somebody/react.cursorrules"), "Prefer function components always.");
        write(&cache.join("anthropics/.git/SKILL.md"), "should never be read");

        let mut store = store_for(isolated(dir.path()));
        assert_eq!(store.index_all().await, 3);

        let pdf = store.get("anthropics::pdf").unwrap();
        assert_eq!(pdf.format(), SkillFormat::SkillMd);
        assert_eq!(pdf.description(), "Work with PDF documents and forms.");

        let docs = store.get("vercel::docs").unwrap();
        assert_eq!(docs.format(), SkillFormat::LlmsTxt);

        let react = store.get("local::react").unwrap();
        assert_eq!(react.format(), SkillFormat::CursorRules);
    }

    #[tokio::test]
    async fn test_rejected_and_unreadable_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("mine");
        write(&local.join("good/SKILL.md"), "Write small focused functions.");
        write(&local.join("evil/SKILL.md"), "jailbreak the assistant");
        fs::create_dir_all(local.join("binary")).unwrap();
        fs::write(local.join("binary/SKILL.md"), [0xff, 0xfe, 0x00]).unwrap();

        let mut store = store_for(isolated(dir.path()).with_local_dir(Some(local)));
        assert_eq!(store.index_all().await, 1);
        assert_eq!(
            store.last_report(),
            IndexReport {
                indexed: 1,
                rejected: 1,
                errors: 1
            }
        );
        assert!(store.get("local::evil").is_none());
    }

    #[tokio::test]
    async fn test_fallback_equal_to_builtin_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let shipped = dir.path().join("shipped");
        write(&shipped.join("one/SKILL.md"), "A shipped skill with guidance.");

        let config = isolated(dir.path())
            .with_builtin_dir(Some(shipped.clone()))
            .with_fallback_dir(Some(shipped));
        let mut store = store_for(config);
        store.index_all().await;

        assert_eq!(store.count(), 1);
        assert_eq!(store.last_report().indexed, 1);
        assert_eq!(store.get("senjutsu-builtin::one").unwrap().source(), BUILTIN_SOURCE);
    }

    #[tokio::test]
    async fn test_get_content_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("mine");
        write(&local.join("alpha/SKILL.md"), "alpha body that is long enough");
        write(&local.join("beta/SKILL.md"), "beta body that is long enough");

        let config = isolated(dir.path())
            .with_local_dir(Some(local))
            .with_max_content_chars(10);
        let mut store = store_for(config);
        store.index_all().await;

        let sep = separator();
        let text = store.get_content(&["beta", "missing", "local::alpha"]);
        assert_eq!(
            text,
            format!(
                "\n{sep}\nSKILL [local] : beta\nFormat: skill_md\n{sep}\nbeta body \n\n{sep}\nSKILL [local] : alpha\nFormat: skill_md\n{sep}\nalpha body"
            )
        );
        assert_eq!(store.get_content(&["nonexistent::key"]), "");
    }

    #[tokio::test]
    async fn test_list_skills_sorted_and_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_for(isolated(dir.path()));
        store.index_all().await;
        assert_eq!(store.list_skills(), EMPTY_LISTING);

        let local = dir.path().join("mine");
        write(&local.join("zeta/SKILL.md"), "---\ndescription: Last one\n---\n");
        write(&local.join("alpha/SKILL.md"), "---\ndescription: First one\n---\n");
        let mut store = store_for(isolated(dir.path()).with_local_dir(Some(local)));
        store.index_all().await;

        assert_eq!(
            store.list_skills(),
            "• [alpha] (local, skill_md) - First one\n• [zeta] (local, skill_md) - Last one"
        );
    }
}
