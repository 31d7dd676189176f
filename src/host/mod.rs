//! Host pull-request service
//!
//! Abstracts the hosting provider's REST surface behind a trait so the
//! reconciler can be driven against a mock in tests. The wire types mirror
//! what the provider actually returns: everything optional, resolved into
//! the crate's own types by the state builder.

mod github;

pub use github::GitHubHost;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::MergeMethod;

/// A pull request as the host reports it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrData {
    /// Numeric id (distinct from the PR number)
    pub id: Option<u64>,
    /// PR number
    pub number: Option<u64>,
    /// Head branch name
    pub head_ref: Option<String>,
    /// Head commit sha
    pub head_sha: Option<String>,
    /// Base branch name
    pub base_ref: Option<String>,
    /// Title
    pub title: Option<String>,
    /// Body
    pub body: Option<String>,
    /// Whether the host computed the PR as conflict-free; `None` while the
    /// computation is pending
    pub mergeable: Option<bool>,
    /// Whether the PR has been merged
    pub merged: Option<bool>,
    /// Whether the PR is a draft
    pub draft: Option<bool>,
    /// Whether the PR sits in the host's merge queue
    pub in_queue: Option<bool>,
}

/// A review on a pull request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Review {
    /// Review state literal, e.g. `"APPROVED"`
    pub state: Option<String>,
}

/// Combined commit status for a PR head
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedStatus {
    /// Status literal: `"success"`, `"pending"`, or `"failure"`
    pub state: Option<String>,
    /// Number of contexts contributing to the status
    pub total_count: Option<u64>,
}

/// Everything the state builder needs to know about one open PR
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrStatus {
    /// The full PR record
    pub pull_request: Option<PrData>,
    /// Combined status for the head commit
    pub combined_status: Option<CombinedStatus>,
    /// Reviews on the PR
    pub reviews: Vec<Review>,
}

/// Fields to change on an existing pull request; `None` leaves a field
/// untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrUpdate {
    /// New state, `"open"` or `"closed"`
    pub state: Option<String>,
    /// New title
    pub title: Option<String>,
    /// New body
    pub body: Option<String>,
    /// New draft flag
    pub draft: Option<bool>,
    /// New head branch
    pub head: Option<String>,
    /// New base branch
    pub base: Option<String>,
}

/// Fields for creating a pull request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrCreate {
    /// Title
    pub title: String,
    /// Body
    pub body: String,
    /// Head branch
    pub head: String,
    /// Base branch
    pub base: String,
    /// Create as draft
    pub draft: bool,
}

/// Host pull-request operations consumed by the reconciler.
///
/// The owner/repository pair is part of the service, not of every call.
/// Implementations must be internally thread-safe; rate limiting is the
/// client's responsibility.
#[async_trait]
pub trait HostService: Send + Sync {
    /// List open pull requests
    async fn list_prs(&self) -> Result<Vec<PrData>>;

    /// Fetch one pull request with full details (mergeable bit included)
    async fn get_pr(&self, number: u64) -> Result<PrData>;

    /// List reviews on a pull request
    async fn list_reviews(&self, number: u64) -> Result<Vec<Review>>;

    /// Combined commit status for a head sha
    async fn get_combined_status(&self, head_sha: &str) -> Result<CombinedStatus>;

    /// Edit a pull request
    async fn edit_pr(&self, number: u64, update: PrUpdate) -> Result<PrData>;

    /// Merge a pull request with the given method
    async fn merge_pr(&self, number: u64, method: MergeMethod) -> Result<()>;

    /// Create a pull request
    async fn create_pr(&self, create: PrCreate) -> Result<PrData>;

    /// Comment on a pull request
    async fn comment_pr(&self, number: u64, body: &str) -> Result<()>;
}
