//! Remote operations combining the host API and local git
//!
//! Small composite operations used by the reconciler and the merger:
//! closing a PR together with its branch, and creating or re-pointing PRs
//! with the right head/base chain and formatted body.

use std::path::Path;

use tracing::debug;

use crate::body;
use crate::branch;
use crate::config::Settings;
use crate::error::Result;
use crate::host::{HostService, PrCreate, PrUpdate};
use crate::types::{Commit, PullRequest};
use crate::vcs::Vcs;

/// Close a pull request and delete its remote branch.
pub async fn delete_pull_request(
    host: &dyn HostService,
    vcs: &dyn Vcs,
    pr: &PullRequest,
) -> Result<()> {
    debug!(number = pr.number, "closing PR and deleting branch");
    host.edit_pr(
        pr.number,
        PrUpdate {
            state: Some("closed".to_string()),
            ..PrUpdate::default()
        },
    )
    .await?;
    vcs.delete_remote_branch(&pr.from_branch).await
}

/// Head and base branch names for a commit. The base chains onto the
/// previous commit's branch, or the default branch for the oldest commit
/// in a set.
pub fn branches(settings: &Settings, commit: &Commit, prev_commit: Option<&Commit>) -> (String, String) {
    let head = branch::branch_name_from_commit_id(settings, &commit.commit_id);
    let base = match prev_commit {
        Some(prev) => branch::branch_name_from_commit_id(settings, &prev.commit_id),
        None => settings.repo.github_branch.clone(),
    };
    (head, base)
}

/// Update an existing PR's title, body, head, and base.
///
/// `stack` is used for the body's stack list. With `prev_commit` of `None`
/// the PR is re-pointed at the default branch.
pub async fn update_pull_request(
    host: &dyn HostService,
    settings: &Settings,
    repo_root: &Path,
    stack: &[PullRequest],
    pr: &PullRequest,
    commit: &Commit,
    prev_commit: Option<&Commit>,
) -> Result<()> {
    let (head, base) = branches(settings, commit, prev_commit);
    let pr_body = body::build_body(settings, repo_root, commit, stack)?;

    debug!(number = pr.number, %head, %base, "updating PR");
    host.edit_pr(
        pr.number,
        PrUpdate {
            state: None,
            title: Some(commit.subject.clone()),
            body: Some(pr_body),
            draft: Some(settings.user.create_draft_prs),
            head: Some(head),
            base: Some(base),
        },
    )
    .await?;
    Ok(())
}

/// Re-point an existing PR at the default branch (used by the out-of-order
/// repair pass and before merging a set).
pub async fn update_pull_request_to_main(
    host: &dyn HostService,
    settings: &Settings,
    repo_root: &Path,
    stack: &[PullRequest],
    pr: &PullRequest,
    commit: &Commit,
) -> Result<()> {
    update_pull_request(host, settings, repo_root, stack, pr, commit, None).await
}

/// Create a pull request for `commit`, based on `prev_commit`'s branch or
/// the default branch.
///
/// The body carries no stack list yet; once the whole set exists the
/// update pass fills in the links.
pub async fn create_pull_request(
    host: &dyn HostService,
    settings: &Settings,
    repo_root: &Path,
    commit: &Commit,
    prev_commit: Option<&Commit>,
) -> Result<PullRequest> {
    let (head, base) = branches(settings, commit, prev_commit);
    let pr_body = body::build_body(settings, repo_root, commit, &[])?;

    debug!(%head, %base, "creating PR");
    let data = host
        .create_pr(PrCreate {
            title: commit.subject.clone(),
            body: pr_body.clone(),
            head: head.clone(),
            base: base.clone(),
            draft: settings.user.create_draft_prs,
        })
        .await?;

    Ok(PullRequest {
        id: data.id.map(|id| id.to_string()).unwrap_or_default(),
        number: data.number.unwrap_or_default(),
        from_branch: data.head_ref.unwrap_or(head),
        to_branch: data.base_ref.unwrap_or(base),
        title: data.title.unwrap_or_else(|| commit.subject.clone()),
        body: data.body.unwrap_or(pr_body),
        commit: commit.clone(),
        merge_status: Default::default(),
        merged: false,
        in_queue: false,
        commits: Vec::new(),
    })
}
