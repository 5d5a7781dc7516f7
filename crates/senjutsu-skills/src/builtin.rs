//! Skills shipped with the crate under `skills/<name>/SKILL.md`

use std::path::PathBuf;

use crate::document::SKILL_MD;
use crate::error::{Result, SkillError};

/// Directory holding the shipped skills
pub fn default_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("skills")
}

/// Raw `SKILL.md` text of a shipped skill
pub fn builtin_skill(name: &str) -> Result<String> {
    let path = default_dir().join(name).join(SKILL_MD);
    if !path.is_file() {
        return Err(SkillError::NotFound(name.to_string()));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Names of shipped skills, sorted
pub fn list_builtin_skills() -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(default_dir())? {
        let entry = entry?;
        if entry.path().join(SKILL_MD).is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}
