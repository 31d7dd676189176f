//! Stack state
//!
//! Joins the local commit stack with the host's open pull requests into a
//! single [`State`] that every command starts from. The state is rebuilt at
//! the start of each command and never cached across them; mutation happens
//! only through [`State::apply_indices`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::branch;
use crate::config::Settings;
use crate::host::PrStatus;
use crate::message;
use crate::state_file::PersistentState;
use crate::types::{CheckStatus, Commit, MergeStatus, PullRequest, RawCommit};

/// A local commit joined with its pull request and PR-set membership.
///
/// The commit slice is ordered HEAD first; `index` counts the other way, so
/// index 0 is the oldest unmerged commit and HEAD has the largest index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PRCommit {
    /// The parsed commit
    pub commit: Commit,
    /// The pull request whose head is this commit, if one exists
    pub pull_request: Option<PullRequest>,
    /// Position counted from the oldest unmerged commit
    pub index: usize,
    /// The PR set this commit belongs to, if any
    pub pr_index: Option<usize>,
}

/// Selector output: a destination PR set and the commits that belong in it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Indices {
    /// Destination PR-set index; `None` means allocate a fresh one (only
    /// when `commit_indexes` is non-empty)
    pub destination_pr_index: Option<usize>,
    /// Commit indexes selected (matching [`PRCommit::index`])
    pub commit_indexes: BTreeSet<usize>,
}

/// The joined state of local commits and remote pull requests
#[derive(Debug, Clone, Default)]
pub struct State {
    /// Commits ordered HEAD first
    pub commits: Vec<PRCommit>,
    /// PRs no longer backed by any commit, or removed from a PR set
    pub orphaned_prs: Vec<PullRequest>,
    /// PR sets touched by the last [`State::apply_indices`]
    pub mutated_pr_sets: BTreeSet<usize>,
}

/// Order raw commits HEAD first.
///
/// If the second commit is a parent of the first, the input already leads
/// with HEAD; otherwise it is reversed.
pub fn head_first(mut commits: Vec<RawCommit>) -> Vec<RawCommit> {
    if commits.len() < 2 {
        return commits;
    }
    if commits[0].parents.iter().any(|p| *p == commits[1].hash) {
        return commits;
    }
    commits.reverse();
    commits
}

/// Parse raw commits into indexed [`PRCommit`]s, HEAD first.
pub fn generate_commits(commits: Vec<RawCommit>) -> Vec<PRCommit> {
    let commits = head_first(commits);
    let count = commits.len();
    commits
        .iter()
        .enumerate()
        .map(|(i, raw)| PRCommit {
            commit: message::parse_commit(raw),
            pull_request: None,
            index: count - (i + 1),
            pr_index: None,
        })
        .collect()
}

/// Fold a PR's combined status, reviews, and mergeable bit into a
/// [`MergeStatus`]. `stacked` is computed later by the stacked walk.
pub fn compute_merge_status(status: &PrStatus) -> MergeStatus {
    let mut merge_status = MergeStatus::default();

    let combined = status.combined_status.as_ref();
    match combined.and_then(|cs| cs.state.as_deref()) {
        None => merge_status.checks_pass = CheckStatus::Unknown,
        Some(state) => {
            if combined.and_then(|cs| cs.total_count) == Some(0) {
                merge_status.checks_pass = CheckStatus::Pass;
            } else {
                merge_status.checks_pass = match state {
                    "success" => CheckStatus::Pass,
                    "pending" => CheckStatus::Pending,
                    "failure" => CheckStatus::Fail,
                    _ => CheckStatus::Unknown,
                };
            }
        }
    }

    merge_status.no_conflicts = status
        .pull_request
        .as_ref()
        .is_some_and(|pr| pr.mergeable == Some(true));

    merge_status.review_approved = status
        .reviews
        .iter()
        .any(|review| review.state.as_deref() == Some("APPROVED"));

    merge_status
}

/// Key the host's open PRs by the commit-id decoded from their head branch.
///
/// PRs on branches that don't match `spr/<branch>/<hex8>` are not managed
/// by this tool and are skipped.
pub fn pull_request_map(statuses: &[PrStatus]) -> HashMap<String, PullRequest> {
    let mut map = HashMap::new();
    for status in statuses {
        let Some(pr) = &status.pull_request else {
            continue;
        };
        let from_branch = pr.head_ref.clone().unwrap_or_default();
        let commit_id = branch::commit_id_from_branch(&from_branch);
        if commit_id.is_empty() {
            continue;
        }
        map.insert(
            commit_id.to_string(),
            PullRequest {
                id: pr.id.map(|id| id.to_string()).unwrap_or_default(),
                number: pr.number.unwrap_or_default(),
                from_branch: from_branch.clone(),
                to_branch: pr.base_ref.clone().unwrap_or_default(),
                title: pr.title.clone().unwrap_or_default(),
                body: pr.body.clone().unwrap_or_default(),
                // The embedded commit is the PR's remote head: its id from
                // the branch name, its hash from the head sha. Comparing
                // against the local commit hash detects amends.
                commit: Commit {
                    commit_id: commit_id.to_string(),
                    commit_hash: pr.head_sha.clone().unwrap_or_default(),
                    ..Commit::default()
                },
                merge_status: compute_merge_status(status),
                merged: pr.merged.unwrap_or(false),
                in_queue: pr.in_queue.unwrap_or(false),
                commits: Vec::new(),
            },
        );
    }
    map
}

/// Drop local commits that already live on a PR branch without being that
/// PR's head commit. Such commits are represented remotely by someone
/// else's PR and must not get a PR of their own.
pub fn align_local_commits(
    raws: Vec<RawCommit>,
    pr_map: &HashMap<String, PullRequest>,
) -> Vec<RawCommit> {
    let mut remote_heads: HashMap<&str, bool> = HashMap::new();
    for pr in pr_map.values() {
        for commit in &pr.commits {
            remote_heads.insert(&commit.commit_id, commit.commit_id == pr.commit.commit_id);
        }
    }

    raws.into_iter()
        .filter(|raw| {
            let commit_id = message::commit_id(&raw.message);
            !matches!(remote_heads.get(commit_id.as_str()), Some(false))
        })
        .collect()
}

/// Walk commits oldest to newest setting the `stacked` bit on every PR
/// until the first barrier: a WIP commit, a conflict, a failing required
/// check, or a missing required approval. Commits without a PR don't stop
/// the walk.
pub fn set_stacked_check(settings: &Settings, commits: &mut [PRCommit]) {
    for cm in commits.iter_mut().rev() {
        let Some(pr) = &mut cm.pull_request else {
            continue;
        };
        if cm.commit.wip {
            return;
        }
        if !pr.merge_status.no_conflicts {
            return;
        }
        if settings.repo.require_checks && pr.merge_status.checks_pass != CheckStatus::Pass {
            return;
        }
        if settings.repo.require_approval && !pr.merge_status.review_approved {
            return;
        }
        pr.merge_status.stacked = true;
    }
}

impl State {
    /// Build the state from PR statuses and raw commits.
    ///
    /// Purges persistent PR-set entries whose commit no longer exists in
    /// the local stack.
    pub fn build(
        settings: &Settings,
        persistent: &mut PersistentState,
        statuses: &[PrStatus],
        raws: Vec<RawCommit>,
    ) -> Self {
        let pr_map = pull_request_map(statuses);
        Self::build_from_parts(settings, persistent, pr_map, raws)
    }

    /// Build from an already-computed PR map (the classic update path
    /// realigns commits against the map first).
    pub fn build_from_parts(
        settings: &Settings,
        persistent: &mut PersistentState,
        mut pr_map: HashMap<String, PullRequest>,
        raws: Vec<RawCommit>,
    ) -> Self {
        let mut commits = generate_commits(raws);

        let pr_set_map = persistent.pr_sets_for_repo(&settings.repo.github_repo_name);
        for cm in &mut commits {
            if cm.commit.commit_id.is_empty() {
                continue;
            }
            if let Some(pr) = pr_map.remove(&cm.commit.commit_id) {
                cm.pr_index = pr_set_map.get(&cm.commit.commit_id).copied();
                cm.pull_request = Some(pr);
            }
        }

        // PRs never joined to a commit are orphans scheduled for closure.
        let orphaned_prs: Vec<PullRequest> = pr_map.into_values().collect();

        // Persistent entries whose commit is gone are garbage.
        let mut purged = pr_set_map;
        purged.retain(|commit_id, _| {
            commits
                .iter()
                .any(|cm| cm.commit.commit_id == *commit_id)
        });
        persistent.set_pr_sets_for_repo(&settings.repo.github_repo_name, purged);

        set_stacked_check(settings, &mut commits);

        Self {
            commits,
            orphaned_prs,
            mutated_pr_sets: BTreeSet::new(),
        }
    }

    /// The HEAD commit
    pub fn head(&self) -> Option<&PRCommit> {
        self.commits.first()
    }

    /// Apply selector output: recompute each commit's PR-set membership,
    /// recording orphaned PRs and mutated sets.
    ///
    /// Allocates a fresh destination index (written back into `indices`)
    /// when none was given and the commit list is non-empty.
    pub fn apply_indices(&mut self, indices: &mut Indices) {
        // Assigning zero commits to a fresh set is a no-op.
        if indices.destination_pr_index.is_none() && indices.commit_indexes.is_empty() {
            return;
        }

        let destination = match indices.destination_pr_index {
            Some(destination) => destination,
            None => {
                let mut next = 0;
                for cm in &self.commits {
                    if let Some(pr_index) = cm.pr_index {
                        if pr_index >= next {
                            next = pr_index + 1;
                        }
                    }
                }
                indices.destination_pr_index = Some(next);
                next
            }
        };

        for cm in &mut self.commits {
            let should_be_in_set = indices.commit_indexes.contains(&cm.index);
            let is_in_set = cm.pr_index == Some(destination);

            if is_in_set == should_be_in_set {
                continue;
            }
            if is_in_set {
                // Leaving the destination set: the PR is orphaned.
                if let Some(pr) = &cm.pull_request {
                    self.orphaned_prs.push(pr.clone());
                }
                self.mutated_pr_sets.insert(destination);
                cm.pr_index = None;
            } else {
                // Joining the destination set, possibly leaving another.
                if let Some(old) = cm.pr_index {
                    self.mutated_pr_sets.insert(old);
                }
                self.mutated_pr_sets.insert(destination);
                cm.pr_index = Some(destination);
            }
        }

        // A set can be mutated out of existence; don't report those.
        let existing: BTreeSet<usize> =
            self.commits.iter().filter_map(|cm| cm.pr_index).collect();
        self.mutated_pr_sets = self
            .mutated_pr_sets
            .intersection(&existing)
            .copied()
            .collect();
    }

    /// Positions (into `commits`) of the members of a PR set, newest first.
    pub fn positions_by_pr_set(&self, pr_index: usize) -> Vec<usize> {
        self.commits
            .iter()
            .enumerate()
            .filter(|(_, cm)| cm.pr_index == Some(pr_index))
            .map(|(pos, _)| pos)
            .collect()
    }

    /// The pull requests at the given positions, in the same order.
    pub fn prs_at(&self, positions: &[usize]) -> Vec<PullRequest> {
        positions
            .iter()
            .filter_map(|&pos| self.commits[pos].pull_request.clone())
            .collect()
    }

    /// Mutated PR sets whose member PRs don't form a contiguous from/to
    /// branch chain in stack order. Those need their bases broken back to
    /// the default branch before the normal update can re-point them.
    pub fn mutated_pr_sets_with_out_of_order_commits(&self) -> BTreeSet<usize> {
        let mut out_of_order = BTreeSet::new();
        for &pr_set in &self.mutated_pr_sets {
            if self.pr_chain_broken(|cm| cm.pr_index == Some(pr_set)) {
                out_of_order.insert(pr_set);
            }
        }
        out_of_order
    }

    /// True when the whole stack's PRs don't chain in stack order.
    pub fn stack_out_of_order(&self) -> bool {
        self.pr_chain_broken(|_| true)
    }

    fn pr_chain_broken(&self, member: impl Fn(&PRCommit) -> bool) -> bool {
        let mut last_to: Option<&str> = None;
        for cm in &self.commits {
            let Some(pr) = &cm.pull_request else {
                continue;
            };
            if !member(cm) {
                continue;
            }
            match last_to {
                None => last_to = Some(&pr.to_branch),
                Some(to) => {
                    if pr.from_branch != to {
                        return true;
                    }
                    last_to = Some(&pr.to_branch);
                }
            }
        }
        false
    }

    /// Rebuild this repository's persistent commit-id to PR-set mapping
    /// from the current commits.
    pub fn update_pr_set_state(&self, settings: &Settings, persistent: &mut PersistentState) {
        let mut pr_set_map = BTreeMap::new();
        for cm in &self.commits {
            if let Some(pr_index) = cm.pr_index {
                pr_set_map.insert(cm.commit.commit_id.clone(), pr_index);
            }
        }
        persistent.set_pr_sets_for_repo(&settings.repo.github_repo_name, pr_set_map);
    }
}
