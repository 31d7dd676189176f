//! The reconciling update
//!
//! `update <selector>` drives the remote to match a PR-set selection:
//! orphaned PRs are closed, out-of-order sets have their bases broken back
//! to the default branch, branches are rebuilt by cherry-picking over
//! scratch worktrees, and PRs are created or re-pointed so their bases
//! chain in stack order.
//!
//! `update` with no selector reconciles the whole stack one-PR-per-commit:
//! commit branches are force-pushed, missing PRs created in stack order,
//! and existing ones re-pointed, without assigning any PR-set membership.

use tracing::debug;

use crate::branch;
use crate::concurrent::{try_map_ordered, Task};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::host::PrUpdate;
use crate::remote;
use crate::selector;
use crate::stack::{self, State};
use crate::status;
use crate::types::{Commit, PullRequest};

/// Run the update command. Returns the rendered status view.
pub async fn run(engine: &mut Engine, sel: &str, width: Option<usize>) -> Result<String> {
    if sel.trim().is_empty() {
        update_full_stack(engine, width).await
    } else {
        update_pr_sets(engine, sel, width).await
    }
}

/// A queued PR update: the PR, its commit, and the previous commit in
/// stack order (whose branch becomes the base)
type PrUpdateItem = (PullRequest, Commit, Option<Commit>);

/// Reconcile PR sets against a selector (phases 0-7)
async fn update_pr_sets(engine: &mut Engine, sel: &str, width: Option<usize>) -> Result<String> {
    let mode = engine.mode;

    // Phase 0: fetch/prune concurrently with the state read (which also
    // appends missing commit-id trailers).
    let fetch_task = Task::spawn(mode, {
        let vcs = engine.vcs.clone();
        async move { vcs.fetch().await }
    });
    let mut state = engine.read_state().await?;

    // Phase 1: evaluate the selector and apply it to the state.
    let mut indices = selector::evaluate(&state.commits, sel)?;
    state.apply_indices(&mut indices);
    debug!(?indices, mutated = ?state.mutated_pr_sets, "applied selector");

    // Phase 2: close orphaned PRs and delete their branches.
    let orphans = std::mem::take(&mut state.orphaned_prs);
    {
        let host = engine.host.clone();
        let vcs = engine.vcs.clone();
        try_map_ordered(mode, orphans, move |_, pr| {
            let host = host.clone();
            let vcs = vcs.clone();
            async move { remote::delete_pull_request(host.as_ref(), vcs.as_ref(), &pr).await }
        })
        .await?;
    }

    // Phase 3: break the bases of out-of-order sets back to the default
    // branch so re-pointing in phase 5 can't make the host auto-close a PR
    // whose head became identical to its base.
    for pr_set in state.mutated_pr_sets_with_out_of_order_commits() {
        let mut positions = state.positions_by_pr_set(pr_set);
        positions.reverse(); // oldest first
        let stack_prs = state.prs_at(&positions);
        let items: Vec<(PullRequest, Commit)> = positions
            .iter()
            .filter_map(|&pos| {
                let cm = &state.commits[pos];
                cm.pull_request.clone().map(|pr| (pr, cm.commit.clone()))
            })
            .collect();

        let host = engine.host.clone();
        let settings = engine.settings.clone();
        let root = engine.repo_root.clone();
        try_map_ordered(mode, items, move |_, (pr, commit)| {
            let host = host.clone();
            let settings = settings.clone();
            let root = root.clone();
            let stack_prs = stack_prs.clone();
            async move {
                remote::update_pull_request_to_main(
                    host.as_ref(),
                    &settings,
                    &root,
                    &stack_prs,
                    &pr,
                    &commit,
                )
                .await
            }
        })
        .await?;
    }

    // The branch rebuild below starts from the upstream default branch
    // head, so the fetch must have landed.
    fetch_task.join().await?;

    // Phase 4: rebuild each mutated set's branches, oldest first. Serial
    // within a set: every branch starts at the previous one.
    for &pr_set in &state.mutated_pr_sets {
        let mut positions = state.positions_by_pr_set(pr_set);
        positions.reverse(); // oldest first
        let mut dest_branch = engine.settings.repo.github_branch.clone();
        for &pos in &positions {
            let commit = &state.commits[pos].commit;
            if commit.commit_id.is_empty() {
                return Err(Error::Vcs(format!(
                    "commit {} has no commit-id trailer; is the reword helper installed?",
                    commit.commit_hash
                )));
            }
            let branch_name =
                branch::branch_name_from_commit_id(&engine.settings, &commit.commit_id);
            engine
                .vcs
                .create_branch_with_cherry_pick(&branch_name, &dest_branch, &commit.commit_hash)
                .await?;
            dest_branch = branch_name;
        }
    }

    // Phase 5: create missing PRs sequentially (so numbers allocate in
    // stack order), then re-point every PR in the set in parallel.
    let mutated: Vec<usize> = state.mutated_pr_sets.iter().copied().collect();
    for pr_set in mutated {
        let mut positions = state.positions_by_pr_set(pr_set);
        positions.reverse(); // oldest first

        for ci in 0..positions.len() {
            let pos = positions[ci];
            if state.commits[pos].pull_request.is_some() {
                continue;
            }
            let prev_commit = if ci > 0 {
                Some(state.commits[positions[ci - 1]].commit.clone())
            } else {
                None
            };
            let commit = state.commits[pos].commit.clone();
            let pr = remote::create_pull_request(
                engine.host.as_ref(),
                &engine.settings,
                &engine.repo_root,
                &commit,
                prev_commit.as_ref(),
            )
            .await?;
            state.commits[pos].pull_request = Some(pr);
        }

        let stack_prs = state.prs_at(&positions);
        let items: Vec<PrUpdateItem> = positions
            .iter()
            .enumerate()
            .filter_map(|(ci, &pos)| {
                let cm = &state.commits[pos];
                let prev_commit = if ci > 0 {
                    Some(state.commits[positions[ci - 1]].commit.clone())
                } else {
                    None
                };
                cm.pull_request
                    .clone()
                    .map(|pr| (pr, cm.commit.clone(), prev_commit))
            })
            .collect();

        let host = engine.host.clone();
        let settings = engine.settings.clone();
        let root = engine.repo_root.clone();
        try_map_ordered(mode, items, move |_, (pr, commit, prev_commit)| {
            let host = host.clone();
            let settings = settings.clone();
            let root = root.clone();
            let stack_prs = stack_prs.clone();
            async move {
                remote::update_pull_request(
                    host.as_ref(),
                    &settings,
                    &root,
                    &stack_prs,
                    &pr,
                    &commit,
                    prev_commit.as_ref(),
                )
                .await
            }
        })
        .await?;
    }

    // Phase 6: persist the commit-id to PR-set mapping.
    state.update_pr_set_state(&engine.settings, &mut engine.persistent);
    engine.save_persistent()?;

    // Phase 7: render from fresh state.
    let state = engine.read_state().await?;
    Ok(status::render(&state, &engine.settings, width))
}

/// Reconcile the whole stack one-PR-per-commit (empty selector)
async fn update_full_stack(engine: &mut Engine, width: Option<usize>) -> Result<String> {
    let mode = engine.mode;

    engine.vcs.fetch().await?;
    engine.vcs.rebase_onto_upstream().await?;
    engine.vcs.append_commit_ids().await?;

    let statuses = engine.read_statuses().await?;
    let raws = engine.vcs.read_stack().await?;
    let pr_map = stack::pull_request_map(&statuses);
    let raws = stack::align_local_commits(raws, &pr_map);
    let mut state =
        State::build_from_parts(&engine.settings, &mut engine.persistent, pr_map, raws);

    // Close PRs whose backing commit is gone.
    let orphans = std::mem::take(&mut state.orphaned_prs);
    {
        let host = engine.host.clone();
        try_map_ordered(mode, orphans, move |_, pr| {
            let host = host.clone();
            async move {
                host.comment_pr(pr.number, "Closing pull request: commit has gone away")
                    .await?;
                host.edit_pr(
                    pr.number,
                    PrUpdate {
                        state: Some("closed".to_string()),
                        ..PrUpdate::default()
                    },
                )
                .await?;
                Ok(())
            }
        })
        .await?;
    }

    // Reordered commits: re-point every PR at the default branch first, so
    // the base re-chaining below can't trip the host's auto-close.
    if state.stack_out_of_order() {
        let items: Vec<(PullRequest, Commit)> = state
            .commits
            .iter()
            .filter_map(|cm| cm.pull_request.clone().map(|pr| (pr, cm.commit.clone())))
            .collect();
        let stack_prs: Vec<PullRequest> = items.iter().map(|(pr, _)| pr.clone()).collect();

        let host = engine.host.clone();
        let settings = engine.settings.clone();
        let root = engine.repo_root.clone();
        try_map_ordered(mode, items, move |_, (pr, commit)| {
            let host = host.clone();
            let settings = settings.clone();
            let root = root.clone();
            let stack_prs = stack_prs.clone();
            async move {
                remote::update_pull_request_to_main(
                    host.as_ref(),
                    &settings,
                    &root,
                    &stack_prs,
                    &pr,
                    &commit,
                )
                .await
            }
        })
        .await?;
    }

    push_stack_branches(engine, &state).await?;

    // Create missing PRs and queue updates, oldest first up to the first
    // WIP commit. Creation is sequential so PR numbers follow stack order.
    let mut positions: Vec<usize> = (0..state.commits.len()).collect();
    positions.reverse(); // oldest first

    let mut queue: Vec<PrUpdateItem> = Vec::new();
    let mut prev_commit: Option<Commit> = None;
    for &pos in &positions {
        let commit = state.commits[pos].commit.clone();
        if commit.wip {
            break;
        }
        if let Some(pr) = &state.commits[pos].pull_request {
            queue.push((pr.clone(), commit.clone(), prev_commit.clone()));
        } else {
            let pr = remote::create_pull_request(
                engine.host.as_ref(),
                &engine.settings,
                &engine.repo_root,
                &commit,
                prev_commit.as_ref(),
            )
            .await?;
            state.commits[pos].pull_request = Some(pr.clone());
            queue.push((pr, commit.clone(), prev_commit.clone()));
        }
        prev_commit = Some(commit);
    }

    // Stack list for PR bodies, in local commit order.
    let sorted_prs: Vec<PullRequest> = positions
        .iter()
        .filter_map(|&pos| {
            let cm = &state.commits[pos];
            if cm.commit.wip {
                None
            } else {
                cm.pull_request.clone()
            }
        })
        .collect();

    {
        let host = engine.host.clone();
        let settings = engine.settings.clone();
        let root = engine.repo_root.clone();
        try_map_ordered(mode, queue, move |_, (pr, commit, prev_commit)| {
            let host = host.clone();
            let settings = settings.clone();
            let root = root.clone();
            let sorted_prs = sorted_prs.clone();
            async move {
                remote::update_pull_request(
                    host.as_ref(),
                    &settings,
                    &root,
                    &sorted_prs,
                    &pr,
                    &commit,
                    prev_commit.as_ref(),
                )
                .await
            }
        })
        .await?;
    }

    let state = engine.read_state().await?;
    Ok(status::render(&state, &engine.settings, width))
}

/// Force-push the branch for every commit whose branch is missing or
/// stale, stopping at the first WIP commit. Stashes around the push when
/// the working tree is dirty.
async fn push_stack_branches(engine: &Engine, state: &State) -> Result<()> {
    let mut refspecs = Vec::new();
    for cm in state.commits.iter().rev() {
        if cm.commit.wip {
            break;
        }
        if cm.commit.commit_id.is_empty() {
            return Err(Error::Vcs(format!(
                "commit {} has no commit-id trailer; is the reword helper installed?",
                cm.commit.commit_hash
            )));
        }
        let up_to_date = cm
            .pull_request
            .as_ref()
            .is_some_and(|pr| pr.commit.commit_hash == cm.commit.commit_hash);
        if up_to_date {
            continue;
        }
        let branch_name =
            branch::branch_name_from_commit_id(&engine.settings, &cm.commit.commit_id);
        refspecs.push(format!("{}:refs/heads/{}", cm.commit.commit_hash, branch_name));
    }

    if refspecs.is_empty() {
        return Ok(());
    }

    let dirty = engine.vcs.working_tree_dirty().await?;
    if dirty {
        engine.vcs.stash().await?;
    }
    let pushed = engine.vcs.push_refspecs(&refspecs).await;
    if dirty {
        // restore the working tree whether or not the push succeeded
        engine.vcs.stash_pop().await?;
    }
    pushed
}
