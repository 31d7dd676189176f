//! Local version-control operations
//!
//! The reconciler drives git through this trait; the real implementation
//! ([`GitCli`]) combines libgit2 reads with git subprocess calls, and tests
//! substitute a scripted mock.

pub mod git;

pub use git::{discover_root, GitCli};

use async_trait::async_trait;

use crate::error::Result;
use crate::types::RawCommit;

/// Local git operations consumed by the engine.
///
/// All methods may block on subprocess or repository I/O.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Fetch from the upstream remote, pruning deleted branches (and
    /// forcing tags when configured).
    async fn fetch(&self) -> Result<()>;

    /// Rebase the local branch onto the upstream default branch,
    /// autostashing local changes.
    async fn rebase_onto_upstream(&self) -> Result<()>;

    /// Read the unmerged local commits: HEAD down to (excluding) the
    /// upstream default branch head. Order is unspecified; the state
    /// builder normalizes it.
    async fn read_stack(&self) -> Result<Vec<RawCommit>>;

    /// Rewrite commits missing a `commit-id` trailer via an autosquash
    /// rebase with the reword helper as editor. A missing helper is a
    /// warning, not an error.
    async fn append_commit_ids(&self) -> Result<()>;

    /// Create (or reuse) branch `branch_name` at the head of
    /// `dest_branch`, cherry-pick `sha` onto it in a scratch worktree, and
    /// force-push it to the remote. The worktree, scratch branch, and
    /// temporary directory are released on every exit path.
    async fn create_branch_with_cherry_pick(
        &self,
        branch_name: &str,
        dest_branch: &str,
        sha: &str,
    ) -> Result<()>;

    /// Delete a remote branch by pushing an empty refspec.
    async fn delete_remote_branch(&self, branch: &str) -> Result<()>;

    /// Force-push `hash:refs/heads/branch` refspecs, atomically or one at
    /// a time per configuration.
    async fn push_refspecs(&self, refspecs: &[String]) -> Result<()>;

    /// True when `status --porcelain` reports tracked changes.
    async fn working_tree_dirty(&self) -> Result<bool>;

    /// Stash local changes.
    async fn stash(&self) -> Result<()>;

    /// Pop the most recent stash.
    async fn stash_pop(&self) -> Result<()>;

    /// Record a fixup commit for `hash`.
    async fn commit_fixup(&self, hash: &str) -> Result<()>;

    /// Interactive autosquash rebase onto the upstream default branch
    /// (applies pending fixups).
    async fn autosquash_rebase(&self) -> Result<()>;

    /// Cherry-pick every commit up to `upto_hash` that is missing locally
    /// (`cherry-pick ..<hash>`).
    async fn cherry_pick_range(&self, upto_hash: &str) -> Result<()>;
}
