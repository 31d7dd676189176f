//! Status rendering
//!
//! One line per commit, HEAD first: commit index, PR-set index, the
//! status-bit quartet (checks, approval, no-conflicts, stacked), the PR
//! number, and the subject, trimmed to the terminal width.

use crate::config::Settings;
use crate::stack::{PRCommit, State};
use crate::style::{self, Icons, LIGHT_BLUE, RESET};
use crate::types::{CheckStatus, PullRequest};

/// Column width reserved so missing-PR lines align with PR lines
const NO_PR_PADDING: usize = 36;

fn check_status_icon(status: CheckStatus, settings: &Settings, icons: &Icons) -> &'static str {
    if !settings.repo.require_checks {
        return icons.empty;
    }
    match status {
        CheckStatus::Unknown => icons.questionmark,
        CheckStatus::Pending => icons.pending,
        CheckStatus::Pass => icons.checkmark,
        CheckStatus::Fail => icons.crossmark,
    }
}

/// The `[cars]` quartet: checks, approval, no-conflicts, stacked
pub fn status_string(pr: &PullRequest, settings: &Settings) -> String {
    let icons = style::icons(settings);
    let mut out = String::from("[");

    out.push_str(check_status_icon(pr.merge_status.checks_pass, settings, &icons));

    if settings.repo.require_approval {
        out.push_str(if pr.merge_status.review_approved {
            icons.checkmark
        } else {
            icons.crossmark
        });
    } else {
        out.push_str(icons.empty);
    }

    out.push_str(if pr.merge_status.no_conflicts {
        icons.checkmark
    } else {
        icons.crossmark
    });

    out.push_str(if pr.merge_status.stacked {
        icons.checkmark
    } else {
        icons.crossmark
    });

    out.push(']');
    out
}

/// One pull request rendered for the status view
pub fn pr_string(pr: &PullRequest, settings: &Settings) -> String {
    let status = if pr.merged {
        "MERGED".to_string()
    } else {
        status_string(pr, settings)
    };

    let padded_number = format!("{:<5}", format!("{:3}", pr.number));
    let pr_info = if settings.user.show_pr_link {
        format!(
            "https://{}/{}/{}/pull/{}",
            settings.repo.github_host,
            settings.repo.github_repo_owner,
            settings.repo.github_repo_name,
            format!("{:<5}", pr.number.to_string()),
        )
    } else {
        padded_number
    };

    let icons = style::icons(settings);
    let mut queue_marker = if pr.commits.len() > 1 {
        icons.warning.to_string()
    } else {
        String::new()
    };
    if pr.in_queue {
        queue_marker = icons.pending.to_string();
    }
    if !queue_marker.is_empty() {
        queue_marker.push(' ');
    }

    format!("{status} {queue_marker}{pr_info} : {}", pr.title)
}

/// One commit rendered for the status view
pub fn commit_string(prc: &PRCommit, settings: &Settings, width: Option<usize>) -> String {
    let icons = style::icons(settings);
    let pr_part = match &prc.pull_request {
        Some(pr) => pr_string(pr, settings),
        None => format!(
            "[{e}{e}{e}{e}] No Pull Request Created{pad} : {subject}",
            e = icons.empty,
            pad = " ".repeat(NO_PR_PADDING),
            subject = prc.commit.subject,
        ),
    };

    let pr_index = match prc.pr_index {
        Some(i) => format!("s{i}"),
        None => "--".to_string(),
    };

    let line = format!(
        "{LIGHT_BLUE}{index:2}{RESET} {color}{pr_index}{RESET} {pr_part}",
        index = prc.index,
        color = style::pr_set_color(prc.pr_index),
    );

    trim_to_width(settings, &line, width)
}

/// Trim a line to the terminal width.
///
/// Emoji status bits occupy two terminal cells each, compensated with a
/// flat padding of four regardless of glyph count.
pub fn trim_to_width(settings: &Settings, line: &str, width: Option<usize>) -> String {
    let width = width.unwrap_or(1000);
    let mut length = line.chars().count();
    if settings.user.status_bits_emojis {
        length += 4;
    }
    if length > width && width > 3 {
        let mut trimmed: String = line.chars().take(width - 3).collect();
        trimmed.push_str("...");
        return trimmed;
    }
    line.to_string()
}

/// Render the whole stack, HEAD first
pub fn render(state: &State, settings: &Settings, width: Option<usize>) -> String {
    if state.head().is_none() {
        return "no local commits\n".to_string();
    }
    let mut out = String::new();
    for prc in &state.commits {
        out.push_str(&commit_string(prc, settings, width));
        out.push('\n');
    }
    out
}

/// Legend explaining the status columns, shown with `status --detail`
pub fn header(settings: &Settings) -> &'static str {
    if settings.user.status_bits_emojis {
        "
 ┌─ commit index
 │ ┌─ pull request set index
 │ │   ┌─ checks pass
 │ │   │ ┌── pull request approved
 │ │   │ │ ┌─── no merge conflicts
 │ │   │ │ │ ┌──── stack check
 │ │   │ │ │ │
"
    } else {
        "
 ┌─ commit index
 │ ┌─ pull request set index
 │ │   ┌─ checks pass
 │ │   │┌── pull request approved
 │ │   ││┌─── no merge conflicts
 │ │   │││┌──── stack check
 │ │   ││││
"
    }
}
