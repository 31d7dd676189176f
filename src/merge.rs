//! Merging a PR set
//!
//! The newest PR in a set carries every earlier commit on its branch, so
//! re-pointing it at the default branch and merging it lands the whole set
//! atomically. The remaining PRs are then closed and their branches
//! deleted.

use tracing::debug;

use crate::concurrent::try_map_ordered;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::remote;
use crate::selector;
use crate::state_file::MERGE_CHECK_SKIP;
use crate::types::{Commit, PullRequest};

/// Merge the PR set named by `prset` (e.g. `"s0"`)
pub async fn run(engine: &mut Engine, prset: &str) -> Result<()> {
    let Some(pr_set) = selector::as_pr_set(prset) else {
        return Err(Error::InvalidSelector(format!(
            "unable to parse PR set index {prset}"
        )));
    };

    let state = engine.read_state().await?;

    let mut positions = state.positions_by_pr_set(pr_set);
    if positions.is_empty() {
        return Err(Error::InvalidSelector(format!(
            "pull request set s{pr_set} has no commits"
        )));
    }

    // The configured merge check must have passed against the newest
    // commit in the set (or be explicitly skipped).
    if !engine.settings.repo.merge_check.is_empty() {
        let newest = &state.commits[positions[0]].commit;
        let checked = engine
            .persistent
            .merge_check_commit
            .get(&engine.settings.repo_key());
        match checked {
            None => return Err(Error::MergeCheckRequired),
            Some(commit_hash)
                if commit_hash != MERGE_CHECK_SKIP && *commit_hash != newest.commit_hash =>
            {
                return Err(Error::MergeCheckRequired)
            }
            Some(_) => {}
        }
    }

    positions.reverse(); // oldest first, so PR links stay intact
    let stack_prs = state.prs_at(&positions);
    let items: Vec<(PullRequest, Commit)> = positions
        .iter()
        .filter_map(|&pos| {
            let cm = &state.commits[pos];
            cm.pull_request.clone().map(|pr| (pr, cm.commit.clone()))
        })
        .collect();

    debug!(pr_set, count = items.len(), "merging PR set");
    let newest_index = items.len().saturating_sub(1);

    let host = engine.host.clone();
    let vcs = engine.vcs.clone();
    let settings = engine.settings.clone();
    let root = engine.repo_root.clone();
    let merge_method = engine.settings.repo.merge_method;
    let mode = engine.mode;

    try_map_ordered(mode, items, move |ci, (pr, commit)| {
        let host = host.clone();
        let vcs = vcs.clone();
        let settings = settings.clone();
        let root = root.clone();
        let stack_prs = stack_prs.clone();
        async move {
            if ci == newest_index {
                // The newest PR lands the whole set: re-point it at the
                // default branch, merge, then refresh local remote refs.
                // Its close below only runs after the merge completed.
                remote::update_pull_request_to_main(
                    host.as_ref(),
                    &settings,
                    &root,
                    &stack_prs,
                    &pr,
                    &commit,
                )
                .await
                .map_err(|e| {
                    Error::HostApi(format!(
                        "updating PR #{} to merge into {}: {e}",
                        pr.number, settings.repo.github_branch
                    ))
                })?;
                host.merge_pr(pr.number, merge_method).await?;
                vcs.fetch().await?;
            }

            remote::delete_pull_request(host.as_ref(), vcs.as_ref(), &pr).await
        }
    })
    .await?;

    Ok(())
}
