//! Command engine
//!
//! Owns everything a command invocation needs: immutable settings, the
//! persistent state handle (read once at start, written once at end), and
//! the host and git seams. State is rebuilt from scratch by every command
//! and never cached across them.

use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

use tracing::debug;

use crate::concurrent::{try_map_ordered, ExecMode, Task};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::host::{HostService, PrStatus};
use crate::stack::{self, State};
use crate::state_file::{self, PersistentState};
use crate::status;
use crate::vcs::Vcs;

/// Shared context for all commands
pub struct Engine {
    /// Immutable settings for this invocation
    pub settings: Settings,
    /// Persistent state, flushed by [`Engine::save_persistent`]
    pub persistent: PersistentState,
    /// Where persistent state is written
    pub state_path: PathBuf,
    /// Repository working directory
    pub repo_root: PathBuf,
    /// Host pull-request service
    pub host: Arc<dyn HostService>,
    /// Local git operations
    pub vcs: Arc<dyn Vcs>,
    /// Parallel in production, serial in deterministic tests
    pub mode: ExecMode,
}

impl Engine {
    /// Create an engine, loading persistent state from `state_path`
    pub fn new(
        settings: Settings,
        state_path: PathBuf,
        repo_root: PathBuf,
        host: Arc<dyn HostService>,
        vcs: Arc<dyn Vcs>,
        mode: ExecMode,
    ) -> Result<Self> {
        let persistent = state_file::load_state(&state_path)?;
        Ok(Self {
            settings,
            persistent,
            state_path,
            repo_root,
            host,
            vcs,
            mode,
        })
    }

    /// Write persistent state back to disk
    pub fn save_persistent(&self) -> Result<()> {
        state_file::save_state(&self.state_path, &self.persistent)
    }

    /// Fetch every open PR's status: the PR record, combined status, and
    /// reviews, pipelined per PR.
    pub async fn read_statuses(&self) -> Result<Vec<PrStatus>> {
        let prs = self.host.list_prs().await?;
        let host = self.host.clone();
        let mode = self.mode;
        try_map_ordered(mode, prs, move |_, pr| {
            let host = host.clone();
            async move {
                let number = pr.number.unwrap_or_default();
                let head_sha = pr.head_sha.clone().unwrap_or_default();

                let combined = Task::spawn(mode, {
                    let host = host.clone();
                    async move { host.get_combined_status(&head_sha).await }
                });
                let reviews = Task::spawn(mode, {
                    let host = host.clone();
                    async move { host.list_reviews(number).await }
                });
                let full = Task::spawn(mode, {
                    let host = host.clone();
                    async move { host.get_pr(number).await }
                });

                let combined = combined.join().await?;
                let reviews = reviews.join().await?;
                let full = full.join().await?;

                Ok(PrStatus {
                    pull_request: Some(full),
                    combined_status: Some(combined),
                    reviews,
                })
            }
        })
        .await
    }

    /// Build the current [`State`]: append missing commit-id trailers,
    /// then join local commits with the host's open PRs.
    pub async fn read_state(&mut self) -> Result<State> {
        self.vcs.append_commit_ids().await?;
        let statuses = self.read_statuses().await?;
        let raws = self.vcs.read_stack().await?;
        Ok(State::build(
            &self.settings,
            &mut self.persistent,
            &statuses,
            raws,
        ))
    }

    /// Render the status view
    pub async fn status(&mut self, width: Option<usize>, detail: bool) -> Result<String> {
        let state = self.read_state().await?;
        let mut out = String::new();
        if detail && !state.commits.is_empty() {
            out.push_str(status::header(&self.settings));
        }
        out.push_str(&status::render(&state, &self.settings, width));
        Ok(out)
    }

    /// Cherry-pick the commits behind the newest PR onto the local branch.
    ///
    /// Returns false when there is no PR to sync from.
    pub async fn sync(&mut self) -> Result<bool> {
        let state = self.read_state().await?;
        let Some(newest) = state
            .commits
            .iter()
            .find_map(|cm| cm.pull_request.as_ref())
        else {
            return Ok(false);
        };
        self.vcs
            .cherry_pick_range(&newest.commit.commit_hash)
            .await?;
        Ok(true)
    }

    /// Record a fixup for `hash` and fold it into the stack
    pub async fn amend(&self, hash: &str) -> Result<()> {
        self.vcs.commit_fixup(hash).await?;
        self.vcs.autosquash_rebase().await
    }

    /// Run the configured merge-check command and record the outcome
    /// against the newest commit.
    pub async fn check(&mut self) -> Result<String> {
        if self.settings.repo.merge_check.is_empty() {
            return Ok(
                "use merge_check to configure a pre merge check command to run".to_string(),
            );
        }

        let raws = self.vcs.read_stack().await?;
        if raws.is_empty() {
            return Ok("no local commits - nothing to check".to_string());
        }
        let ordered = stack::head_first(raws);
        let newest_hash = ordered[0].hash.clone();

        let parts: Vec<&str> = self.settings.repo.merge_check.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(
                "use merge_check to configure a pre merge check command to run".to_string(),
            );
        }
        debug!(command = %self.settings.repo.merge_check, "running merge check");
        let status = Command::new(parts[0])
            .args(&parts[1..])
            .current_dir(&self.repo_root)
            .status()
            .map_err(|e| {
                Error::ConfigMissing(format!(
                    "failed to run merge check {:?}: {e}",
                    self.settings.repo.merge_check
                ))
            })?;

        let key = self.settings.repo_key();
        if status.success() {
            self.persistent.merge_check_commit.insert(key, newest_hash);
            self.save_persistent()?;
            Ok("merge check PASSED".to_string())
        } else {
            self.persistent.merge_check_commit.insert(key, String::new());
            self.save_persistent()?;
            Ok(format!("merge check FAILED: {status}"))
        }
    }
}
