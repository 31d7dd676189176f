//! Selector evaluation
//!
//! A selector names the commits that should make up a PR set on the next
//! update, and optionally the destination set:
//!
//! ```text
//! 1,2,5-7        commits by index and inclusive range
//! s0             every current member of PR set 0
//! s0:1-3         replace PR set 0's members with commits 1..=3
//! s0+5-7         add commits 5..=7 to PR set 0 (short for "s0:s0,5-7")
//! ```
//!
//! Whitespace between tokens is ignored everywhere.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::stack::{Indices, PRCommit};

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidSelector(msg.into())
}

fn split_and_clean<'a>(s: &'a str, sep: char) -> Vec<&'a str> {
    s.trim()
        .split(sep)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

fn as_integer(s: &str) -> Option<usize> {
    s.trim().parse().ok()
}

fn as_range(s: &str) -> Option<(usize, usize)> {
    let parts = split_and_clean(s, '-');
    if parts.len() != 2 {
        return None;
    }
    let start = as_integer(parts[0])?;
    let end = as_integer(parts[1])?;
    if start > end {
        return None;
    }
    Some((start, end))
}

/// Parse a PR-set reference: `"s3"` -> `3`
pub fn as_pr_set(s: &str) -> Option<usize> {
    s.trim().strip_prefix('s').and_then(as_integer)
}

/// Parse a destination prefix, returning the destination set index and the
/// remaining commit-list text. The additive form `sN+rest` is rewritten to
/// `sN,rest` so the set's current members stay selected.
fn as_destination(s: &str) -> Option<(usize, String)> {
    let s = s.trim();

    if let Some((head, rest)) = s.split_once(':') {
        if s.matches(':').count() == 1 {
            if let Some(pr_index) = as_pr_set(head) {
                return Some((pr_index, rest.trim().to_string()));
            }
        }
        return None;
    }

    if let Some((head, rest)) = s.split_once('+') {
        if s.matches('+').count() == 1 {
            if let Some(pr_index) = as_pr_set(head) {
                let head = head.trim();
                let rest = rest.trim();
                return Some((pr_index, format!("{head},{rest}")));
            }
        }
    }

    None
}

/// Evaluate a selector against the current commits.
///
/// Any syntactic problem, reference to an empty PR set, or commit index
/// outside the stack yields [`Error::InvalidSelector`].
pub fn evaluate(commits: &[PRCommit], selector: &str) -> Result<Indices> {
    let mut destination_pr_index = None;
    let mut selector = selector.to_string();
    if let Some((dest, rest)) = as_destination(&selector) {
        destination_pr_index = Some(dest);
        selector = rest;
    }

    let commit_indexes = evaluate_commit_indexes(commits, &selector)?;
    Ok(Indices {
        destination_pr_index,
        commit_indexes,
    })
}

fn evaluate_commit_indexes(commits: &[PRCommit], selector: &str) -> Result<BTreeSet<usize>> {
    let mut commit_indexes = BTreeSet::new();

    for item in split_and_clean(selector, ',') {
        if let Some(n) = as_integer(item) {
            commit_indexes.insert(n);
            continue;
        }
        if let Some((from, to)) = as_range(item) {
            commit_indexes.extend(from..=to);
            continue;
        }
        if let Some(pr_index) = as_pr_set(item) {
            let members: Vec<usize> = commits
                .iter()
                .filter(|cm| cm.pr_index == Some(pr_index))
                .map(|cm| cm.index)
                .collect();
            if members.is_empty() {
                return Err(invalid(format!("invalid pull request set {item}")));
            }
            commit_indexes.extend(members);
            continue;
        }
        return Err(invalid(format!("unrecognized selector item {item:?}")));
    }

    for &commit_index in &commit_indexes {
        if commit_index >= commits.len() {
            return Err(invalid(format!("commit index {commit_index} is not valid")));
        }
    }

    Ok(commit_indexes)
}
