//! Core types for cascade

use serde::{Deserialize, Serialize};

/// A local commit parsed from the stack
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// 8-hex commit-id parsed from the `commit-id:<hex8>` message trailer
    /// (empty when the trailer is missing)
    pub commit_id: String,
    /// Full git commit hash
    pub commit_hash: String,
    /// First line of the commit message
    pub subject: String,
    /// Rest of the commit message
    pub body: String,
    /// Whether the message starts with "WIP"
    pub wip: bool,
}

/// A commit as read from the local repository, before parsing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCommit {
    /// Full git commit hash
    pub hash: String,
    /// Parent commit hashes
    pub parents: Vec<String>,
    /// Full commit message
    pub message: String,
}

/// Status of the host's checks for a PR head commit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    /// No combined status was available
    #[default]
    Unknown,
    /// Checks are still running
    Pending,
    /// All checks pass
    Pass,
    /// Some checks have failed
    Fail,
}

/// Merge status of a pull request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStatus {
    /// Status of the host's checks
    pub checks_pass: CheckStatus,
    /// True when the pull request has an approving review
    pub review_approved: bool,
    /// True when there are no merge conflicts against the base
    pub no_conflicts: bool,
    /// True when every request in the stack up to this one is ready to merge
    pub stacked: bool,
}

/// A pull request on the host, joined with its local commit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Numeric id, stringly typed as the host returns it
    pub id: String,
    /// PR number
    pub number: u64,
    /// Head branch (`spr/<default>/<commit-id>`)
    pub from_branch: String,
    /// Base branch
    pub to_branch: String,
    /// PR title
    pub title: String,
    /// PR body
    pub body: String,
    /// The local commit this PR represents (the PR's head commit)
    pub commit: Commit,
    /// Merge status bits
    pub merge_status: MergeStatus,
    /// True once the PR has been merged
    pub merged: bool,
    /// True when the PR sits in the host's merge queue
    pub in_queue: bool,
    /// Commits on the PR branch, when the host provides them
    pub commits: Vec<Commit>,
}

/// Merge strategy used when landing a PR set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    /// Create a merge commit
    #[default]
    Merge,
    /// Squash all commits into one
    Squash,
    /// Rebase commits onto the base branch
    Rebase,
}

impl std::fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Merge => write!(f, "merge"),
            Self::Squash => write!(f, "squash"),
            Self::Rebase => write!(f, "rebase"),
        }
    }
}
