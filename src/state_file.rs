//! Persistent state across command invocations
//!
//! A single YAML document keyed by repository. It is read once at the start
//! of a command and written once at the end; nothing mutates it mid-command.
//! Keys this tool does not understand are preserved round-trip.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Merge-check record meaning "skip the check for this repository"
pub const MERGE_CHECK_SKIP: &str = "SKIP";

/// State persisted between invocations
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PersistentState {
    /// Repository name -> (commit-id -> PR-set index)
    #[serde(default)]
    pub repo_to_commit_id_to_pr_set: BTreeMap<String, BTreeMap<String, usize>>,
    /// Repository key -> hash of the newest commit the merge check passed
    /// against, `"SKIP"`, or `""` after a failed check
    #[serde(default)]
    pub merge_check_commit: BTreeMap<String, String>,
    /// Settings written by other tools or other versions, passed through
    /// unchanged
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl PersistentState {
    /// The commit-id -> PR-set mapping for one repository
    pub fn pr_sets_for_repo(&self, repo_name: &str) -> BTreeMap<String, usize> {
        self.repo_to_commit_id_to_pr_set
            .get(repo_name)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace the mapping for one repository, leaving other repositories'
    /// entries untouched.
    pub fn set_pr_sets_for_repo(&mut self, repo_name: &str, map: BTreeMap<String, usize>) {
        self.repo_to_commit_id_to_pr_set
            .insert(repo_name.to_string(), map);
    }
}

/// Default location of the state file
pub fn default_state_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cascade")
        .join("state.yml")
}

/// Load persistent state from `path`.
///
/// A missing file yields the default (empty) state.
pub fn load_state(path: &Path) -> Result<PersistentState> {
    if !path.exists() {
        return Ok(PersistentState::default());
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| Error::Internal(format!("failed to read {}: {e}", path.display())))?;
    serde_yaml::from_str(&contents)
        .map_err(|e| Error::Internal(format!("failed to parse {}: {e}", path.display())))
}

/// Write persistent state to `path`, creating the parent directory if
/// needed.
pub fn save_state(path: &Path, state: &PersistentState) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .map_err(|e| Error::Internal(format!("failed to create {}: {e}", dir.display())))?;
        }
    }
    let contents = serde_yaml::to_string(state)
        .map_err(|e| Error::Internal(format!("failed to serialize state: {e}")))?;
    fs::write(path, contents)
        .map_err(|e| Error::Internal(format!("failed to write {}: {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_returns_default() {
        let temp = TempDir::new().unwrap();
        let state = load_state(&temp.path().join("state.yml")).unwrap();
        assert!(state.repo_to_commit_id_to_pr_set.is_empty());
        assert!(state.merge_check_commit.is_empty());
    }

    #[test]
    fn test_save_creates_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("state.yml");
        save_state(&path, &PersistentState::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.yml");

        let mut state = PersistentState::default();
        let mut map = BTreeMap::new();
        map.insert("aaaaaaaa".to_string(), 0);
        map.insert("bbbbbbbb".to_string(), 2);
        state.set_pr_sets_for_repo("widgets", map);
        state
            .merge_check_commit
            .insert("octo/widgets:main".to_string(), "SKIP".to_string());

        save_state(&path, &state).unwrap();
        let loaded = load_state(&path).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.pr_sets_for_repo("widgets")["bbbbbbbb"], 2);
    }

    #[test]
    fn test_unknown_keys_survive_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.yml");
        fs::write(
            &path,
            "repo_to_commit_id_to_pr_set: {}\nmerge_check_commit: {}\nstargazer: true\n",
        )
        .unwrap();

        let loaded = load_state(&path).unwrap();
        save_state(&path, &loaded).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("stargazer: true"));
    }

    #[test]
    fn test_set_pr_sets_leaves_other_repos_alone() {
        let mut state = PersistentState::default();
        state.set_pr_sets_for_repo(
            "alpha",
            BTreeMap::from([("11111111".to_string(), 1)]),
        );
        state.set_pr_sets_for_repo(
            "beta",
            BTreeMap::from([("22222222".to_string(), 0)]),
        );
        state.set_pr_sets_for_repo("alpha", BTreeMap::new());

        assert!(state.pr_sets_for_repo("alpha").is_empty());
        assert_eq!(state.pr_sets_for_repo("beta").len(), 1);
    }
}
