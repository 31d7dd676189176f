//! Shared test fixtures

#![allow(dead_code)]

mod mock_host;
mod mock_vcs;

pub use mock_host::{MergeCall, MockHost};
pub use mock_vcs::{CherryPickCall, MockVcs};

use std::path::PathBuf;
use std::sync::Arc;

use cascade::concurrent::ExecMode;
use cascade::config::Settings;
use cascade::engine::Engine;
use cascade::stack::PRCommit;
use cascade::types::{Commit, MergeStatus, PullRequest, RawCommit};

/// Settings pointing at a fixed test repository
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.repo.github_repo_owner = "octo".to_string();
    settings.repo.github_repo_name = "widgets".to_string();
    settings
}

/// A raw commit carrying a commit-id trailer
pub fn raw_commit(commit_id: &str, hash: &str, parent: Option<&str>, subject: &str) -> RawCommit {
    RawCommit {
        hash: hash.to_string(),
        parents: parent.map(|p| vec![p.to_string()]).unwrap_or_default(),
        message: format!("{subject}\n\ncommit-id:{commit_id}"),
    }
}

/// A fake 40-char hash built from a single character
pub fn fake_hash(c: char) -> String {
    c.to_string().repeat(40)
}

/// Build a linear stack, HEAD first, from (commit-id, subject) pairs given
/// newest first. Hashes are derived from the commit-id's first character
/// and parents chain onto the next entry.
pub fn linear_stack(entries: &[(&str, &str)]) -> Vec<RawCommit> {
    let mut commits = Vec::with_capacity(entries.len());
    for (i, (commit_id, subject)) in entries.iter().enumerate() {
        let hash = fake_hash(commit_id.chars().next().unwrap_or('0'));
        let parent = entries
            .get(i + 1)
            .map(|(next_id, _)| fake_hash(next_id.chars().next().unwrap_or('0')))
            .unwrap_or_else(|| fake_hash('9'));
        commits.push(raw_commit(commit_id, &hash, Some(&parent), subject));
    }
    commits
}

/// Commits for selector and mutator tests: `index` runs 0..count and the
/// commit-id repeats the index digit. `pr_map` pairs (commit index, PR-set
/// index); commits in a set also get a numbered pull request attached.
pub fn testing_commits(count: usize, pr_map: &[(usize, usize)]) -> Vec<PRCommit> {
    let mut commits = Vec::with_capacity(count);
    for i in 0..count {
        let pr_index = pr_map
            .iter()
            .find(|(commit, _)| *commit == i)
            .map(|(_, set)| *set);
        let commit_id: String = i.to_string().chars().cycle().take(8).collect();
        let pull_request = pr_index.map(|_| PullRequest {
            number: (i + 1) as u64,
            from_branch: format!("spr/main/{commit_id}"),
            commit: Commit {
                commit_id: commit_id.clone(),
                ..Commit::default()
            },
            ..PullRequest::default()
        });
        commits.push(PRCommit {
            commit: Commit {
                commit_id,
                ..Commit::default()
            },
            pull_request,
            index: i,
            pr_index,
        });
    }
    commits
}

/// A PR whose status bits all pass
pub fn passing_pr(number: u64) -> PullRequest {
    PullRequest {
        number,
        merge_status: MergeStatus {
            checks_pass: cascade::types::CheckStatus::Pass,
            review_approved: true,
            no_conflicts: true,
            stacked: false,
        },
        ..PullRequest::default()
    }
}

/// A deterministic engine over the mock host and git layers
pub fn test_engine(
    host: Arc<MockHost>,
    vcs: Arc<MockVcs>,
    state_path: PathBuf,
    repo_root: PathBuf,
) -> Engine {
    Engine::new(
        test_settings(),
        state_path,
        repo_root,
        host,
        vcs,
        ExecMode::Serial,
    )
    .expect("engine")
}
