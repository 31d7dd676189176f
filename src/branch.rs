//! Remote branch naming
//!
//! Every commit in the stack is backed by a remote branch named
//! `spr/<default-branch>/<commit-id>`. The codec here is the only place
//! that form is produced or recognized; branches that don't match it are
//! never touched.

use crate::config::Settings;

/// The fixed prefix of managed branch names
const BRANCH_PREFIX: &str = "spr";

/// Branch name for a commit id: `spr/<default-branch>/<commit-id>`
pub fn branch_name_from_commit_id(settings: &Settings, commit_id: &str) -> String {
    format!("{}/{}/{}", BRANCH_PREFIX, settings.repo.github_branch, commit_id)
}

/// Extract the commit id from a managed branch name.
///
/// Returns an empty string unless the name splits into exactly
/// `spr/<branch>/<8 chars>`.
pub fn commit_id_from_branch(branch_name: &str) -> &str {
    let segments: Vec<&str> = branch_name.split('/').collect();
    if segments.len() != 3 {
        return "";
    }
    if segments[0] != BRANCH_PREFIX {
        return "";
    }
    let commit_id = segments[2];
    if commit_id.len() != 8 {
        return "";
    }
    commit_id
}
