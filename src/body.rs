//! Pull request body formatting
//!
//! Bodies start from the commit message body. When a stack has more than
//! one PR, a stack list is appended so reviewers can navigate between the
//! linked requests. Repositories with a PR template get the generated body
//! inserted between configured marker lines.

use std::fs;
use std::path::Path;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::types::{Commit, PullRequest};

/// Marker appended to the stack entry of the PR being rendered
const CURRENT_MARKER: &str = "⬅";

/// Format the body for `commit`'s pull request.
///
/// `stack` is the full list of linked PRs in stack order (oldest first);
/// with one or zero entries no stack list is added.
pub fn format_body(commit: &Commit, stack: &[PullRequest], show_pr_titles: bool) -> String {
    if stack.len() <= 1 {
        return commit.body.trim().to_string();
    }

    let mut lines = Vec::with_capacity(stack.len());
    for pr in stack.iter().rev() {
        let mut line = if show_pr_titles {
            format!("- {} #{}", pr.title, pr.number)
        } else {
            format!("- #{}", pr.number)
        };
        if pr.commit.commit_id == commit.commit_id {
            line.push(' ');
            line.push_str(CURRENT_MARKER);
        }
        lines.push(line);
    }

    format!(
        "{}\n\n---\n\n**Stack**:\n{}",
        commit.body.trim(),
        lines.join("\n")
    )
    .trim()
    .to_string()
}

/// Insert `body` into a PR template between the configured marker lines.
///
/// Everything up to and including the start marker is kept, then the body,
/// then everything from the end marker on.
pub fn insert_into_template(
    body: &str,
    template: &str,
    insert_start: &str,
    insert_end: &str,
) -> Result<String> {
    let start = template.find(insert_start).ok_or_else(|| {
        Error::Vcs(format!(
            "PR template is missing the insert start marker {insert_start:?}"
        ))
    })?;
    let after_start = start + insert_start.len();
    let end_offset = template[after_start..].find(insert_end).ok_or_else(|| {
        Error::Vcs(format!(
            "PR template is missing the insert end marker {insert_end:?}"
        ))
    })?;
    let end = after_start + end_offset;

    Ok(format!(
        "{}\n{}\n{}",
        &template[..after_start],
        body,
        &template[end..]
    ))
}

/// Build the final body for `commit`, applying the repository's PR
/// template when one is configured.
pub fn build_body(
    settings: &Settings,
    repo_root: &Path,
    commit: &Commit,
    stack: &[PullRequest],
) -> Result<String> {
    let body = format_body(commit, stack, settings.repo.show_pr_titles_in_stack);
    if settings.repo.pr_template_path.is_empty() {
        return Ok(body);
    }

    let template_path = repo_root.join(&settings.repo.pr_template_path);
    let template = fs::read_to_string(&template_path)
        .map_err(|e| Error::Vcs(format!("reading template {}: {e}", template_path.display())))?;

    insert_into_template(
        &body,
        &template,
        &settings.repo.pr_template_insert_start,
        &settings.repo.pr_template_insert_end,
    )
}
