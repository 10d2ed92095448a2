//! Per-user template selection
//!
//! Structure: <user_preferences_path>/<stem>.json holding `{"template": "<role>"}`,
//! with the stem escaped as for persona records

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::store::write_atomic;
use super::{user_file_stem, user_id_from_stem};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreference {
    #[serde(default)]
    pub template: Option<String>,
}

pub struct PreferenceStore {
    root: PathBuf,
    preferences: HashMap<String, UserPreference>,
}

impl PreferenceStore {
    /// Load every stored preference; unreadable files are skipped
    pub fn load(root: PathBuf) -> Self {
        let mut preferences = HashMap::new();

        if let Ok(entries) = fs::read_dir(&root) {
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.extension().map(|e| e == "json").unwrap_or(false) {
                    continue;
                }
                let Some(user_id) = path.file_stem().and_then(|s| s.to_str()).and_then(user_id_from_stem) else {
                    log::debug!("Skipping foreign file in preferences directory: {}", path.display());
                    continue;
                };
                match read_preference(&path) {
                    Ok(preference) => {
                        preferences.insert(user_id, preference);
                    }
                    Err(e) => {
                        log::warn!("Failed to load preferences from {}: {:#}", path.display(), e);
                    }
                }
            }
        }

        log::debug!("Loaded preferences for {} users", preferences.len());
        Self { root, preferences }
    }

    /// Template role chosen by the user, if any
    pub fn template_for(&self, user_id: &str) -> Option<&str> {
        self.preferences.get(user_id).and_then(|p| p.template.as_deref())
    }

    pub fn set_template(&mut self, user_id: &str, role: &str) -> Result<()> {
        let preference = self.preferences.entry(user_id.to_string()).or_default();
        preference.template = Some(role.to_string());

        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create preferences directory: {}", self.root.display()))?;
        let path = self.root.join(format!("{}.json", user_file_stem(user_id)));
        let json = serde_json::to_string_pretty(preference).context("Failed to serialize preferences")?;
        write_atomic(&path, &json)?;

        log::info!("User {} switched to template {}", user_id, role);
        Ok(())
    }
}

fn read_preference(path: &Path) -> Result<UserPreference> {
    let content = fs::read_to_string(path).context("Failed to read preferences file")?;
    serde_json::from_str(&content).context("Failed to parse preferences file")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_template_persists() {
        let temp = TempDir::new().unwrap();
        let mut store = PreferenceStore::load(temp.path().join("prefs"));
        assert_eq!(store.template_for("alice"), None);

        store.set_template("alice", "catgirl").unwrap();
        assert_eq!(store.template_for("alice"), Some("catgirl"));

        let reloaded = PreferenceStore::load(temp.path().join("prefs"));
        assert_eq!(reloaded.template_for("alice"), Some("catgirl"));
    }

    #[test]
    fn test_malformed_preferences_skipped() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("bob.json"), "nope").unwrap();
        fs::write(temp.path().join("carol.json"), r#"{"template": "intellectual_maid"}"#).unwrap();

        let store = PreferenceStore::load(temp.path().to_path_buf());

        assert_eq!(store.template_for("bob"), None);
        assert_eq!(store.template_for("carol"), Some("intellectual_maid"));
    }

    #[test]
    fn test_similar_user_ids_keep_separate_preferences() {
        let temp = TempDir::new().unwrap();
        let mut store = PreferenceStore::load(temp.path().join("prefs"));

        store.set_template("alice.b", "catgirl").unwrap();
        store.set_template("alice_b", "intellectual_maid").unwrap();

        let reloaded = PreferenceStore::load(temp.path().join("prefs"));
        assert_eq!(reloaded.template_for("alice.b"), Some("catgirl"));
        assert_eq!(reloaded.template_for("alice_b"), Some("intellectual_maid"));
        assert_eq!(reloaded.template_for("alice/b"), None);
    }

    #[test]
    fn test_set_template_leaves_only_the_record() {
        let temp = TempDir::new().unwrap();
        let mut store = PreferenceStore::load(temp.path().to_path_buf());

        store.set_template("alice", "catgirl").unwrap();
        store.set_template("alice", "intellectual_maid").unwrap();

        let files: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(files, vec!["alice.json"]);
        let raw = fs::read_to_string(temp.path().join("alice.json")).unwrap();
        assert!(raw.contains("intellectual_maid"));
    }
}
