//! Harness configuration.
//!
//! The catalogues are opaque host input: plain files listing one entity
//! key per line (or a JSON string array), referenced by path from the
//! config. Which keys are in them is entirely the operator's business.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use trihunt_coordinator::Catalogues;
use trihunt_core::{CreatureKind, ItemKind, MilestoneKey};

fn default_data_dir() -> PathBuf {
    PathBuf::from(".trihunt")
}

fn default_autosave_seconds() -> u64 {
    30
}

/// Configuration loaded from a JSON file next to the working directory.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Where snapshot files live.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Autosave period for the live `run` loop.
    #[serde(default = "default_autosave_seconds")]
    pub autosave_seconds: u64,
    /// Catalogue file of item keys.
    pub items_file: Option<PathBuf>,
    /// Catalogue file of creature keys.
    pub creatures_file: Option<PathBuf>,
    /// Catalogue file of milestone keys.
    pub milestones_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            autosave_seconds: default_autosave_seconds(),
            items_file: None,
            creatures_file: None,
            milestones_file: None,
        }
    }
}

impl Config {
    /// Load from `path`. A missing file yields the defaults; a present
    /// but malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))
    }

    /// Read the three catalogue files. An unset file yields an empty
    /// catalogue for that category.
    pub fn catalogues(&self) -> Result<Catalogues> {
        Ok(Catalogues {
            items: read_keys(self.items_file.as_deref())?
                .into_iter()
                .map(ItemKind::new)
                .collect(),
            creatures: read_keys(self.creatures_file.as_deref())?
                .into_iter()
                .map(CreatureKind::new)
                .collect(),
            milestones: read_keys(self.milestones_file.as_deref())?
                .into_iter()
                .map(MilestoneKey::new)
                .collect(),
        })
    }
}

/// One key per line, blank lines and `#` comments skipped. A file whose
/// first non-space byte is `[` is read as a JSON string array instead.
fn read_keys(path: Option<&Path>) -> Result<Vec<String>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading catalogue {}", path.display()))?;

    if raw.trim_start().starts_with('[') {
        return serde_json::from_str(&raw)
            .with_context(|| format!("parsing catalogue {}", path.display()));
    }

    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_config_file_yields_defaults() {
        let config = Config::load(Path::new("/definitely/not/here.json")).unwrap();
        assert_eq!(config.data_dir, PathBuf::from(".trihunt"));
        assert_eq!(config.autosave_seconds, 30);
        assert!(config.items_file.is_none());
    }

    #[test]
    fn line_catalogue_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.txt");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "# staples").unwrap();
        writeln!(f, "apple").unwrap();
        writeln!(f).unwrap();
        writeln!(f, "  bread  ").unwrap();

        let keys = read_keys(Some(&path)).unwrap();
        assert_eq!(keys, vec!["apple", "bread"]);
    }

    #[test]
    fn json_array_catalogue_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        fs::write(&path, r#"["apple", "bread"]"#).unwrap();

        let keys = read_keys(Some(&path)).unwrap();
        assert_eq!(keys, vec!["apple", "bread"]);
    }

    #[test]
    fn config_parses_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trihunt.json");
        fs::write(&path, r#"{"autosave_seconds": 5}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.autosave_seconds, 5);
        assert_eq!(config.data_dir, PathBuf::from(".trihunt"));
    }
}
