//! Per-user persona records
//!
//! Structure: <user_persona_path>/<stem>.json, where the stem is the
//! user id escaped by `user_file_stem`

use chrono::{DateTime, Duration, Local};
use eyre::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::extract::TOP_KEYWORDS;
use super::{TraitTag, user_file_stem, user_id_from_stem};

/// Accumulated traits for one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPersonaRecord {
    #[serde(skip)]
    pub user_id: String,

    /// `"category:value"` -> weight, in first-seen order
    #[serde(default)]
    pub traits: IndexMap<String, u32>,

    #[serde(default)]
    pub last_updated: Option<DateTime<Local>>,

    /// Keyword -> number of profile updates it appeared in
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub keyword_frequency: IndexMap<String, u32>,
}

impl UserPersonaRecord {
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.traits.is_empty() && self.keyword_frequency.is_empty()
    }

    /// Keywords ordered by how often they appeared
    pub fn top_keywords(&self, limit: usize) -> Vec<&str> {
        let mut keywords: Vec<(&String, &u32)> = self.keyword_frequency.iter().collect();
        keywords.sort_by(|a, b| b.1.cmp(a.1));
        keywords.into_iter().take(limit).map(|(k, _)| k.as_str()).collect()
    }
}

/// Merge `incoming` into `traits`, keeping the larger weight per tag, then
/// drop every tag weighted below `min_frequency`.
pub fn merge_traits(traits: &mut IndexMap<String, u32>, incoming: &IndexMap<TraitTag, u32>, min_frequency: u32) {
    for (tag, weight) in incoming {
        let entry = traits.entry(tag.to_string()).or_insert(*weight);
        *entry = (*entry).max(*weight);
    }
    traits.retain(|_, weight| *weight >= min_frequency);
}

/// File-backed store, one JSON record per user
pub struct PersonaStore {
    root: PathBuf,
    min_keyword_frequency: u32,
}

impl PersonaStore {
    pub fn new(root: PathBuf, min_keyword_frequency: u32) -> Self {
        Self {
            root,
            min_keyword_frequency,
        }
    }

    /// Record file for a user
    pub fn path(&self, user_id: &str) -> PathBuf {
        self.root.join(format!("{}.json", user_file_stem(user_id)))
    }

    /// Load a user's record; a missing or unreadable file yields an empty record
    pub fn load(&self, user_id: &str) -> UserPersonaRecord {
        let path = self.path(user_id);
        if !path.exists() {
            return UserPersonaRecord::empty(user_id);
        }

        match read_record(&path) {
            Ok(mut record) => {
                record.user_id = user_id.to_string();
                record
            }
            Err(e) => {
                log::warn!("Ignoring unreadable persona record {}: {:#}", path.display(), e);
                UserPersonaRecord::empty(user_id)
            }
        }
    }

    /// Max-merge new trait weights into the user's record and persist it
    pub fn update(&self, user_id: &str, new_traits: &IndexMap<TraitTag, u32>) -> Result<UserPersonaRecord> {
        let mut record = self.load(user_id);
        merge_traits(&mut record.traits, new_traits, self.min_keyword_frequency);
        record.last_updated = Some(Local::now());

        self.save(&record)?;
        log::info!("Updated persona for {}: {} traits", user_id, record.traits.len());
        Ok(record)
    }

    /// Count each keyword once more and keep only the most frequent ones
    pub fn update_keywords(&self, user_id: &str, keywords: &[String]) -> Result<UserPersonaRecord> {
        let mut record = self.load(user_id);
        for keyword in keywords {
            *record.keyword_frequency.entry(keyword.clone()).or_insert(0) += 1;
        }
        record.keyword_frequency.sort_by(|_, a, _, b| b.cmp(a));
        record.keyword_frequency.truncate(TOP_KEYWORDS);
        record.last_updated = Some(Local::now());

        self.save(&record)?;
        Ok(record)
    }

    /// Clear everything learned about a user
    pub fn reset(&self, user_id: &str) -> Result<()> {
        self.save(&UserPersonaRecord::empty(user_id))?;
        log::info!("Reset persona for {}", user_id);
        Ok(())
    }

    /// Replace the stored record in one step (temp file + rename)
    pub fn save(&self, record: &UserPersonaRecord) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create persona directory: {}", self.root.display()))?;

        let json = serde_json::to_string_pretty(record).context("Failed to serialize persona record")?;
        write_atomic(&self.path(&record.user_id), &json)
    }

    /// Ids of every stored record, sorted
    pub fn users(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut users = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.extension().map(|e| e == "json").unwrap_or(false) {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()).and_then(user_id_from_stem) {
                Some(user_id) => users.push(user_id),
                None => log::debug!("Skipping foreign file in persona directory: {}", path.display()),
            }
        }
        users.sort();
        Ok(users)
    }

    /// Reset every record last updated more than `max_age_days` before `now`.
    /// Returns the ids that were reset.
    pub fn prune(&self, max_age_days: u32, now: DateTime<Local>) -> Result<Vec<String>> {
        let cutoff = prune_cutoff(max_age_days, now)?;
        let mut pruned = Vec::new();

        for user_id in self.users()? {
            let record = self.load(&user_id);
            if record.last_updated.map(|t| t < cutoff).unwrap_or(false) {
                self.reset(&user_id)?;
                pruned.push(user_id);
            }
        }

        Ok(pruned)
    }
}

fn read_record(path: &Path) -> Result<UserPersonaRecord> {
    let content = fs::read_to_string(path).context("Failed to read persona record")?;
    serde_json::from_str(&content).context("Failed to parse persona record")
}

/// Oldest `last_updated` that survives a prune of `max_age_days`
pub fn prune_cutoff(max_age_days: u32, now: DateTime<Local>) -> Result<DateTime<Local>> {
    Duration::try_days(i64::from(max_age_days))
        .and_then(|age| now.checked_sub_signed(age))
        .ok_or_else(|| eyre::eyre!("Max age of {} days is out of range", max_age_days))
}

/// Replace `path` with `contents` in one step (temp file in the same directory + rename)
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).context("Failed to create temp file")?;
    tmp.write_all(contents.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("Failed to persist {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tags(list: &[(&str, u32)]) -> IndexMap<TraitTag, u32> {
        list.iter()
            .map(|(t, w)| (t.parse::<TraitTag>().unwrap(), *w))
            .collect()
    }

    #[test]
    fn test_merge_takes_max_and_inserts_new() {
        let mut traits = IndexMap::from([("身份关系:主人".to_string(), 5), ("称谓方式:前辈".to_string(), 2)]);

        merge_traits(
            &mut traits,
            &tags(&[("身份关系:主人", 3), ("称谓方式:前辈", 4), ("说话特征:喵", 1)]),
            1,
        );

        assert_eq!(traits["身份关系:主人"], 5);
        assert_eq!(traits["称谓方式:前辈"], 4);
        assert_eq!(traits["说话特征:喵"], 1);
    }

    #[test]
    fn test_merge_drops_below_threshold() {
        let mut traits = IndexMap::from([("身份关系:主人".to_string(), 1)]);

        merge_traits(&mut traits, &tags(&[("说话特征:喵", 1), ("称谓方式:前辈", 3)]), 2);

        assert!(!traits.contains_key("身份关系:主人"));
        assert!(!traits.contains_key("说话特征:喵"));
        assert_eq!(traits["称谓方式:前辈"], 3);
    }

    #[test]
    fn test_merge_weights_never_decrease() {
        let mut traits = IndexMap::new();
        for weight in [3, 1, 2, 5, 4] {
            merge_traits(&mut traits, &tags(&[("身份关系:主人", weight)]), 1);
        }
        assert_eq!(traits["身份关系:主人"], 5);
    }

    #[test]
    fn test_load_missing_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = PersonaStore::new(temp.path().join("personas"), 1);

        let record = store.load("alice");

        assert_eq!(record.user_id, "alice");
        assert!(record.traits.is_empty());
        assert!(record.last_updated.is_none());
    }

    #[test]
    fn test_update_persists_and_reloads() {
        let temp = TempDir::new().unwrap();
        let store = PersonaStore::new(temp.path().to_path_buf(), 2);

        store.update("alice", &tags(&[("身份关系:主人", 3), ("说话特征:喵", 1)])).unwrap();
        let record = store.load("alice");

        assert_eq!(record.traits.len(), 1);
        assert_eq!(record.traits["身份关系:主人"], 3);
        assert!(record.last_updated.is_some());

        let raw = fs::read_to_string(store.path("alice")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["traits"]["身份关系:主人"], 3);
        assert!(json["last_updated"].is_string());
    }

    #[test]
    fn test_malformed_record_loads_empty() {
        let temp = TempDir::new().unwrap();
        let store = PersonaStore::new(temp.path().to_path_buf(), 1);
        fs::write(store.path("bob"), "[1, 2").unwrap();

        assert!(store.load("bob").traits.is_empty());

        store.update("bob", &tags(&[("身份关系:朋友", 2)])).unwrap();
        assert_eq!(store.load("bob").traits["身份关系:朋友"], 2);
    }

    #[test]
    fn test_null_timestamp_record_loads() {
        let temp = TempDir::new().unwrap();
        let store = PersonaStore::new(temp.path().to_path_buf(), 1);
        fs::write(store.path("carol"), r#"{"traits": {"身份关系:主人": 4}, "last_updated": null}"#).unwrap();

        let record = store.load("carol");

        assert_eq!(record.traits["身份关系:主人"], 4);
        assert!(record.last_updated.is_none());
    }

    #[test]
    fn test_reset_clears_traits() {
        let temp = TempDir::new().unwrap();
        let store = PersonaStore::new(temp.path().to_path_buf(), 1);
        store.update("alice", &tags(&[("身份关系:主人", 3)])).unwrap();
        store.update_keywords("alice", &["游戏".to_string()]).unwrap();

        store.reset("alice").unwrap();

        assert!(store.load("alice").is_empty());
    }

    #[test]
    fn test_path_escapes_user_id() {
        let store = PersonaStore::new(PathBuf::from("/data"), 1);
        assert_eq!(store.path("12345"), PathBuf::from("/data/12345.json"));
        assert_eq!(store.path("../etc/passwd"), PathBuf::from("/data/_2E_2E_2Fetc_2Fpasswd.json"));
        assert_eq!(store.path(""), PathBuf::from("/data/_.json"));
    }

    #[test]
    fn test_similar_user_ids_keep_separate_records() {
        let temp = TempDir::new().unwrap();
        let store = PersonaStore::new(temp.path().to_path_buf(), 1);

        store.update("alice.b", &tags(&[("身份关系:主人", 3)])).unwrap();

        for other in ["alice_b", "alice/b", "alice-b"] {
            assert!(store.load(other).traits.is_empty(), "{} shares a record", other);
        }

        store.update("alice_b", &tags(&[("身份关系:朋友", 2)])).unwrap();
        store.reset("alice_b").unwrap();
        assert_eq!(store.load("alice.b").traits["身份关系:主人"], 3);
    }

    #[test]
    fn test_users_reports_original_ids() {
        let temp = TempDir::new().unwrap();
        let store = PersonaStore::new(temp.path().to_path_buf(), 1);
        store.update("alice.b", &tags(&[("身份关系:主人", 1)])).unwrap();
        store.update("alice_b", &tags(&[("身份关系:主人", 1)])).unwrap();
        store.update("主人", &tags(&[("身份关系:主人", 1)])).unwrap();
        fs::write(temp.path().join("notes.bak.json"), "{}").unwrap();

        assert_eq!(store.users().unwrap(), vec!["alice.b", "alice_b", "主人"]);
    }

    #[test]
    fn test_update_keywords_counts_and_caps() {
        let temp = TempDir::new().unwrap();
        let store = PersonaStore::new(temp.path().to_path_buf(), 1);

        store
            .update_keywords("alice", &["游戏".to_string(), "音乐".to_string()])
            .unwrap();
        let many: Vec<String> = (0..30).map(|i| format!("词{}", i)).chain(["游戏".to_string()]).collect();
        let record = store.update_keywords("alice", &many).unwrap();

        assert_eq!(record.keyword_frequency.len(), TOP_KEYWORDS);
        assert_eq!(record.keyword_frequency["游戏"], 2);
        assert_eq!(record.top_keywords(1), vec!["游戏"]);
    }

    #[test]
    fn test_users_lists_records() {
        let temp = TempDir::new().unwrap();
        let store = PersonaStore::new(temp.path().to_path_buf(), 1);
        assert!(store.users().unwrap().is_empty());

        store.update("bob", &tags(&[("身份关系:主人", 1)])).unwrap();
        store.update("alice", &tags(&[("身份关系:主人", 1)])).unwrap();

        assert_eq!(store.users().unwrap(), vec!["alice", "bob"]);
    }

    #[test]
    fn test_prune_resets_stale_records() {
        let temp = TempDir::new().unwrap();
        let store = PersonaStore::new(temp.path().to_path_buf(), 1);
        store.update("fresh", &tags(&[("身份关系:主人", 2)])).unwrap();

        let mut stale = UserPersonaRecord::empty("stale");
        stale.traits.insert("身份关系:朋友".to_string(), 3);
        stale.last_updated = Some(Local::now() - Duration::days(45));
        store.save(&stale).unwrap();

        let pruned = store.prune(30, Local::now()).unwrap();

        assert_eq!(pruned, vec!["stale"]);
        assert!(store.load("stale").traits.is_empty());
        assert_eq!(store.load("fresh").traits["身份关系:主人"], 2);
    }

    #[test]
    fn test_prune_with_huge_age_is_an_error() {
        let temp = TempDir::new().unwrap();
        let store = PersonaStore::new(temp.path().to_path_buf(), 1);
        store.update("alice", &tags(&[("身份关系:主人", 2)])).unwrap();

        assert!(store.prune(u32::MAX, Local::now()).is_err());
        assert_eq!(store.load("alice").traits["身份关系:主人"], 2);
    }

    #[test]
    fn test_prune_cutoff() {
        let now = Local::now();
        assert_eq!(prune_cutoff(0, now).unwrap(), now);
        assert_eq!(prune_cutoff(30, now).unwrap(), now - Duration::days(30));
        assert!(prune_cutoff(u32::MAX, now).is_err());
    }
}
