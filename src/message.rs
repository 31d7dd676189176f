//! Commit-message parsing
//!
//! Extracts the `commit-id:<hex8>` trailer, subject, body, and WIP flag
//! from a raw commit message.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::{Commit, RawCommit};

fn commit_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^commit-id:([a-f0-9]{8})$").expect("static regex"))
}

/// Parse the commit id out of a `commit-id:<hex8>` trailer line.
///
/// Returns an empty string when no trailer is present. The trailer must be
/// exactly eight lowercase hex digits on a line of its own.
pub fn commit_id(msg: &str) -> String {
    commit_id_regex()
        .captures(msg)
        .map(|caps| caps[1].to_string())
        .unwrap_or_default()
}

/// True when the message starts with "WIP"
pub fn is_wip(msg: &str) -> bool {
    msg.starts_with("WIP")
}

/// The first line of the message
pub fn subject(msg: &str) -> &str {
    msg.split('\n').next().unwrap_or(msg)
}

/// Everything after the first line of the message
pub fn body(msg: &str) -> &str {
    match msg.split_once('\n') {
        Some((_, rest)) => rest,
        None => "",
    }
}

/// Parse a raw commit into a [`Commit`]
pub fn parse_commit(raw: &RawCommit) -> Commit {
    Commit {
        commit_id: commit_id(&raw.message),
        commit_hash: raw.hash.clone(),
        subject: subject(&raw.message).to_string(),
        body: body(&raw.message).to_string(),
        wip: is_wip(&raw.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_id() {
        assert_eq!(commit_id("msg\nsdf\ncommit-id:c0530239"), "c0530239");
        assert_eq!(commit_id("msg\nsdf\ncommit-id:c0530239\nasdf"), "c0530239");
        assert_eq!(commit_id("commit-id:c0530239"), "c0530239");
        // nine digits must not match
        assert_eq!(commit_id("commit-id:c053023999"), "");
        assert_eq!(commit_id("xcommit-id:c0530239"), "");
        assert_eq!(commit_id(""), "");
        assert_eq!(commit_id("\n\ncommit-id:"), "");
    }

    #[test]
    fn test_is_wip() {
        assert!(is_wip("WIP\nother text"));
        assert!(!is_wip("nop\nother text"));
    }

    #[test]
    fn test_subject() {
        assert_eq!(subject("msg\nsdf\nsdf"), "msg");
        assert_eq!(subject("msg\nsdf"), "msg");
        assert_eq!(subject("msg\n"), "msg");
        assert_eq!(subject("msg"), "msg");
        assert_eq!(subject("\nmsg"), "");
        assert_eq!(subject(""), "");
    }

    #[test]
    fn test_body() {
        assert_eq!(body("msg\nsdf\nsdf"), "sdf\nsdf");
        assert_eq!(body("msg\nsdf"), "sdf");
        assert_eq!(body("msg\n"), "");
        assert_eq!(body("msg"), "");
        assert_eq!(body("\nmsg"), "msg");
        assert_eq!(body(""), "");
    }

    #[test]
    fn test_subject_and_body_recompose_message() {
        for msg in ["one\ntwo\nthree", "only-subject", "head\n"] {
            if msg.contains('\n') {
                assert_eq!(format!("{}\n{}", subject(msg), body(msg)), msg);
            } else {
                assert_eq!(subject(msg), msg);
            }
        }
    }
}
