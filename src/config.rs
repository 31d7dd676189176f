//! Settings for a single command invocation
//!
//! Settings are immutable once loaded. The mutable counterpart (the
//! commit-id to PR-set mapping, merge-check records) lives in
//! [`crate::state_file::PersistentState`] and is read at command start and
//! written at command end.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::MergeMethod;

/// Name of the per-repository settings file, looked up at the repo root
pub const SETTINGS_FILE: &str = ".cascade.yml";

/// Repository-level settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "snake_case")]
pub struct RepoSettings {
    /// Remote to push branches to and fetch from
    pub github_remote: String,
    /// Default branch that PR sets eventually land on
    pub github_branch: String,
    /// Host name, e.g. "github.com"
    pub github_host: String,
    /// Repository owner (user or organization)
    pub github_repo_owner: String,
    /// Repository name
    pub github_repo_name: String,
    /// Require checks to pass before a PR counts as ready
    pub require_checks: bool,
    /// Require an approving review before a PR counts as ready
    pub require_approval: bool,
    /// Merge-check command that must pass before `cascade merge`
    pub merge_check: String,
    /// Merge method used when landing a PR set
    pub merge_method: MergeMethod,
    /// Path to a PR template, relative to the repo root
    pub pr_template_path: String,
    /// Marker line after which the generated body is inserted
    pub pr_template_insert_start: String,
    /// Marker line before which the generated body insertion ends
    pub pr_template_insert_end: String,
    /// Include PR titles in the stack list of PR bodies
    pub show_pr_titles_in_stack: bool,
    /// Pass `--tags --force` when fetching
    pub force_fetch_tags: bool,
    /// Push one branch per `git push` instead of a single atomic push
    pub branch_push_individually: bool,
}

impl Default for RepoSettings {
    fn default() -> Self {
        Self {
            github_remote: "origin".to_string(),
            github_branch: "main".to_string(),
            github_host: "github.com".to_string(),
            github_repo_owner: String::new(),
            github_repo_name: String::new(),
            require_checks: true,
            require_approval: true,
            merge_check: String::new(),
            merge_method: MergeMethod::default(),
            pr_template_path: String::new(),
            pr_template_insert_start: String::new(),
            pr_template_insert_end: String::new(),
            show_pr_titles_in_stack: false,
            force_fetch_tags: false,
            branch_push_individually: false,
        }
    }
}

/// User-level settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "snake_case")]
pub struct UserSettings {
    /// Create pull requests as drafts
    pub create_draft_prs: bool,
    /// Render status bits as emoji instead of ascii
    pub status_bits_emojis: bool,
    /// Render full PR links instead of bare numbers
    pub show_pr_link: bool,
    /// Delete remote branches once their PR has merged
    pub delete_merged_branches: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            create_draft_prs: false,
            status_bits_emojis: false,
            show_pr_link: false,
            delete_merged_branches: true,
        }
    }
}

/// All settings for one command invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "snake_case")]
pub struct Settings {
    /// Repository-level settings
    pub repo: RepoSettings,
    /// User-level settings
    pub user: UserSettings,
}

impl Settings {
    /// Load settings from `<repo_root>/.cascade.yml`, falling back to
    /// defaults when the file is missing.
    pub fn load(repo_root: &Path) -> Result<Self> {
        let path = repo_root.join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(&path)
            .map_err(|e| Error::ConfigMissing(format!("failed to read {}: {e}", path.display())))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| Error::ConfigMissing(format!("failed to parse {}: {e}", path.display())))
    }

    /// Key identifying this repository and target branch in persistent
    /// state (merge-check records).
    pub fn repo_key(&self) -> String {
        format!(
            "{}/{}:{}",
            self.repo.github_repo_owner, self.repo.github_repo_name, self.repo.github_branch
        )
    }

    /// Fill owner/name/host from a git remote URL when not configured.
    ///
    /// Understands `git@host:owner/repo.git` and `https://host/owner/repo`.
    pub fn infer_repo_from_remote_url(&mut self, url: &str) {
        if !self.repo.github_repo_owner.is_empty() && !self.repo.github_repo_name.is_empty() {
            return;
        }
        let Some((host, path)) = split_remote_url(url) else {
            return;
        };
        let mut segments = path.trim_matches('/').splitn(2, '/');
        let (Some(owner), Some(name)) = (segments.next(), segments.next()) else {
            return;
        };
        self.repo.github_host = host.to_string();
        self.repo.github_repo_owner = owner.to_string();
        self.repo.github_repo_name = name.trim_end_matches(".git").to_string();
    }
}

fn split_remote_url(url: &str) -> Option<(&str, &str)> {
    if let Some(rest) = url.strip_prefix("git@") {
        return rest.split_once(':');
    }
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .or_else(|| url.strip_prefix("ssh://git@"))?;
    rest.split_once('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.repo.github_remote, "origin");
        assert_eq!(settings.repo.github_branch, "main");
        assert!(settings.repo.require_checks);
        assert!(!settings.user.create_draft_prs);
    }

    #[test]
    fn test_infer_repo_from_ssh_url() {
        let mut settings = Settings::default();
        settings.infer_repo_from_remote_url("git@github.com:octo/widgets.git");
        assert_eq!(settings.repo.github_host, "github.com");
        assert_eq!(settings.repo.github_repo_owner, "octo");
        assert_eq!(settings.repo.github_repo_name, "widgets");
    }

    #[test]
    fn test_infer_repo_from_https_url() {
        let mut settings = Settings::default();
        settings.infer_repo_from_remote_url("https://github.example.com/team/tool");
        assert_eq!(settings.repo.github_host, "github.example.com");
        assert_eq!(settings.repo.github_repo_owner, "team");
        assert_eq!(settings.repo.github_repo_name, "tool");
    }

    #[test]
    fn test_infer_does_not_override_explicit_settings() {
        let mut settings = Settings::default();
        settings.repo.github_repo_owner = "configured".to_string();
        settings.repo.github_repo_name = "repo".to_string();
        settings.infer_repo_from_remote_url("git@github.com:other/thing.git");
        assert_eq!(settings.repo.github_repo_owner, "configured");
        assert_eq!(settings.repo.github_repo_name, "repo");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let settings = Settings::load(temp.path()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_partial_file() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(SETTINGS_FILE),
            "repo:\n  github_branch: trunk\n  require_approval: false\n",
        )
        .unwrap();
        let settings = Settings::load(temp.path()).unwrap();
        assert_eq!(settings.repo.github_branch, "trunk");
        assert!(!settings.repo.require_approval);
        // untouched fields keep their defaults
        assert_eq!(settings.repo.github_remote, "origin");
        assert!(settings.repo.require_checks);
    }
}
