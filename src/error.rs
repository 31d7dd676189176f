//! Error types for cascade

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// All errors that can occur in cascade
#[derive(Error, Debug)]
pub enum Error {
    /// Syntactic or referential error in a user selector
    #[error("invalid commit selector: {0}")]
    InvalidSelector(String),

    /// Hosting-provider API failure
    #[error("host API error: {0}")]
    HostApi(String),

    /// Local git failure
    #[error("git error: {0}")]
    Vcs(String),

    /// Cherry-pick hit a merge conflict while rebuilding a PR-set branch
    #[error(
        "unable to add {0} to the PR set as an earlier commit is required for it to merge properly"
    )]
    CherryPickConflict(String),

    /// The configured merge check has not been run against the newest commit
    #[error("need to run merge check 'cascade check' before merging")]
    MergeCheckRequired,

    /// A required external tool or configuration entry is missing
    #[error("missing configuration: {0}")]
    ConfigMissing(String),

    /// Internal invariant violation
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<octocrab::Error> for Error {
    fn from(err: octocrab::Error) -> Self {
        Self::HostApi(err.to_string())
    }
}

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        Self::Vcs(err.to_string())
    }
}
