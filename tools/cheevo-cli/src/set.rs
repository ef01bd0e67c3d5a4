//! Achievement set files
//!
//! ```toml
//! [[achievements]]
//! id = "first-coin"
//! title = "Pocket Change"
//! formula = "0xH0010=1"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// A list of achievements loaded from TOML.
#[derive(Debug, Default, Deserialize)]
pub struct AchievementSet {
    #[serde(default)]
    pub achievements: Vec<AchievementEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AchievementEntry {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub formula: String,
}

impl AchievementSet {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read achievement set: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let set: Self = toml::from_str(content).context("Failed to parse achievement set")?;
        let mut seen = std::collections::BTreeSet::new();
        for entry in &set.achievements {
            anyhow::ensure!(!entry.id.is_empty(), "Achievement with empty id");
            anyhow::ensure!(seen.insert(entry.id.as_str()), "Duplicate achievement id: {}", entry.id);
        }
        Ok(set)
    }

    /// Wrap a single command-line formula.
    pub fn single(id: impl Into<String>, formula: impl Into<String>) -> Self {
        Self {
            achievements: vec![AchievementEntry {
                id: id.into(),
                title: String::new(),
                formula: formula.into(),
            }],
        }
    }
}
