//! Git implementation of the [`Vcs`] trait
//!
//! Repository reads go through libgit2; everything libgit2 does not cover
//! (cherry-pick, worktrees, rebase with an editor override) shells out to
//! the git binary. Branch rebuilding happens in scratch worktrees inside
//! fresh temporary directories so the user's working tree is never touched.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use async_trait::async_trait;
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::types::RawCommit;
use crate::vcs::Vcs;

/// Editor helper that injects missing commit-id trailers during an
/// autosquash rebase. Must be discoverable on `PATH`.
pub const REWORD_HELPER: &str = "cascade_reword_helper";

/// Git operations against one local repository
pub struct GitCli {
    settings: Settings,
    root: PathBuf,
}

/// Locate the repository working directory containing `path`
pub fn discover_root(path: &Path) -> Result<PathBuf> {
    let repo = git2::Repository::discover(path)?;
    repo.workdir()
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::Vcs("bare repositories are not supported".to_string()))
}

impl GitCli {
    /// Create a git layer rooted at `root`
    pub fn new(settings: Settings, root: PathBuf) -> Self {
        Self { settings, root }
    }

    /// URL of the configured upstream remote
    pub fn remote_url(&self) -> Result<String> {
        let repo = git2::Repository::open(&self.root)?;
        let remote = repo.find_remote(&self.settings.repo.github_remote)?;
        Ok(remote.url().unwrap_or_default().to_string())
    }

    fn upstream_ref(&self) -> String {
        format!(
            "refs/remotes/{}/{}",
            self.settings.repo.github_remote, self.settings.repo.github_branch
        )
    }

    fn run(&self, dir: &Path, args: &[&str], envs: &[(&str, &str)]) -> Result<std::process::Output> {
        debug!(?args, dir = %dir.display(), "running git");
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(dir);
        for (key, value) in envs {
            cmd.env(key, value);
        }
        cmd.output()
            .map_err(|e| Error::Vcs(format!("failed to run git {}: {e}", args.join(" "))))
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        self.git_in(&self.root, args)
    }

    fn git_in(&self, dir: &Path, args: &[&str]) -> Result<String> {
        let output = self.run(dir, args, &[])?;
        if !output.status.success() {
            return Err(Error::Vcs(format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn git_with_editor(&self, args: &[&str], editor: &str) -> Result<String> {
        let output = self.run(
            &self.root,
            args,
            &[("GIT_SEQUENCE_EDITOR", editor), ("GIT_EDITOR", editor)],
        )?;
        if !output.status.success() {
            return Err(Error::Vcs(format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Hash of the upstream head of `branch`
    fn remote_branch_hash(&self, branch: &str) -> Result<String> {
        let repo = git2::Repository::open(&self.root)?;
        let reference = repo
            .find_reference(&format!(
                "refs/remotes/{}/{}",
                self.settings.repo.github_remote, branch
            ))
            .map_err(|e| {
                Error::Vcs(format!(
                    "getting {}/{branch}: {e}",
                    self.settings.repo.github_remote
                ))
            })?;
        let commit = reference.peel_to_commit()?;
        Ok(commit.id().to_string())
    }

    fn local_branch_exists(&self, branch: &str) -> Result<bool> {
        let repo = git2::Repository::open(&self.root)?;
        let exists = repo.find_branch(branch, git2::BranchType::Local).is_ok();
        Ok(exists)
    }
}

/// A scratch worktree plus the local branch created inside it.
///
/// Releasing happens in `Drop`, in reverse order of acquisition: the
/// worktree is force-removed and pruned, the scratch branch deleted, and
/// the temporary directory removed (by `TempDir`). This runs on every exit
/// path, including errors and panics.
struct ScratchWorktree<'a> {
    git: &'a GitCli,
    branch: Option<String>,
    dir: TempDir,
}

impl ScratchWorktree<'_> {
    fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Drop for ScratchWorktree<'_> {
    fn drop(&mut self) {
        let path = self.dir.path().to_string_lossy().to_string();
        let _ = self.git.run(
            &self.git.root,
            &["worktree", "remove", "--force", path.as_str()],
            &[],
        );
        let _ = self.git.run(&self.git.root, &["worktree", "prune"], &[]);
        if let Some(branch) = &self.branch {
            let _ = self
                .git
                .run(&self.git.root, &["branch", "-D", branch.as_str()], &[]);
        }
    }
}

#[async_trait]
impl Vcs for GitCli {
    async fn fetch(&self) -> Result<()> {
        let remote = self.settings.repo.github_remote.clone();
        let mut args = vec!["fetch", remote.as_str(), "--prune"];
        if self.settings.repo.force_fetch_tags {
            args.extend(["--tags", "--force"]);
        }
        self.git(&args)?;
        Ok(())
    }

    async fn rebase_onto_upstream(&self) -> Result<()> {
        let upstream = format!(
            "{}/{}",
            self.settings.repo.github_remote, self.settings.repo.github_branch
        );
        self.git(&["rebase", upstream.as_str(), "--autostash"])?;
        Ok(())
    }

    async fn read_stack(&self) -> Result<Vec<RawCommit>> {
        let repo = git2::Repository::open(&self.root)?;
        let head = repo.head()?.peel_to_commit()?;
        let upstream = repo
            .find_reference(&self.upstream_ref())
            .map_err(|e| Error::Vcs(format!("getting {}: {e}", self.upstream_ref())))?
            .peel_to_commit()?
            .id();

        let mut walk = repo.revwalk()?;
        walk.push(head.id())?;

        let mut commits = Vec::new();
        for oid in walk {
            let oid = oid?;
            if oid == upstream {
                break;
            }
            let commit = repo.find_commit(oid)?;
            commits.push(RawCommit {
                hash: oid.to_string(),
                parents: commit.parent_ids().map(|id| id.to_string()).collect(),
                message: commit.message().unwrap_or_default().to_string(),
            });
        }
        debug!(count = commits.len(), "read local stack");
        Ok(commits)
    }

    async fn append_commit_ids(&self) -> Result<()> {
        let Some(helper) = find_on_path(REWORD_HELPER) else {
            warn!("{REWORD_HELPER} not found on PATH, commit-id trailers will not be added");
            return Ok(());
        };
        let upstream = format!(
            "{}/{}",
            self.settings.repo.github_remote, self.settings.repo.github_branch
        );
        self.git_with_editor(
            &["rebase", upstream.as_str(), "-i", "--autosquash", "--autostash"],
            &helper.to_string_lossy(),
        )?;
        Ok(())
    }

    async fn create_branch_with_cherry_pick(
        &self,
        branch_name: &str,
        dest_branch: &str,
        sha: &str,
    ) -> Result<()> {
        let dest_hash = self.remote_branch_hash(dest_branch)?;

        let dir = tempfile::Builder::new()
            .prefix(&branch_name.replace('/', "-"))
            .tempdir()
            .map_err(|e| Error::Vcs(format!("creating temp dir: {e}")))?;

        let worktree_path = dir.path().to_string_lossy().to_string();
        self.git(&["worktree", "add", worktree_path.as_str(), dest_hash.as_str()])?;
        let mut worktree = ScratchWorktree {
            git: self,
            branch: None,
            dir,
        };

        if !self.local_branch_exists(branch_name)? {
            self.git_in(
                worktree.path(),
                &["checkout", "-b", branch_name, dest_hash.as_str()],
            )?;
        }
        worktree.branch = Some(branch_name.to_string());

        let output = self.run(worktree.path(), &["cherry-pick", sha], &[])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("Merge conflict in") {
                return Err(Error::CherryPickConflict(sha.to_string()));
            }
            return Err(Error::Vcs(format!(
                "cherry-picking {sha} into {branch_name}: {}",
                stderr.trim()
            )));
        }

        let refspec = format!("{branch_name}:{branch_name}");
        self.git_in(
            worktree.path(),
            &[
                "push",
                "--force",
                self.settings.repo.github_remote.as_str(),
                refspec.as_str(),
            ],
        )?;

        Ok(())
    }

    async fn delete_remote_branch(&self, branch: &str) -> Result<()> {
        let refspec = format!(":refs/heads/{branch}");
        self.git(&[
            "push",
            self.settings.repo.github_remote.as_str(),
            refspec.as_str(),
        ])?;
        Ok(())
    }

    async fn push_refspecs(&self, refspecs: &[String]) -> Result<()> {
        if refspecs.is_empty() {
            return Ok(());
        }
        let remote = self.settings.repo.github_remote.clone();
        if self.settings.repo.branch_push_individually {
            for refspec in refspecs {
                self.git(&["push", "--force", remote.as_str(), refspec.as_str()])?;
            }
        } else {
            let mut args = vec!["push", "--force", "--atomic", remote.as_str()];
            args.extend(refspecs.iter().map(String::as_str));
            self.git(&args)?;
        }
        Ok(())
    }

    async fn working_tree_dirty(&self) -> Result<bool> {
        let output = self.git(&["status", "--porcelain", "--untracked-files=no"])?;
        Ok(!output.trim().is_empty())
    }

    async fn stash(&self) -> Result<()> {
        self.git(&["stash"])?;
        Ok(())
    }

    async fn stash_pop(&self) -> Result<()> {
        self.git(&["stash", "pop"])?;
        Ok(())
    }

    async fn commit_fixup(&self, hash: &str) -> Result<()> {
        self.git(&["commit", "--fixup", hash])?;
        Ok(())
    }

    async fn autosquash_rebase(&self) -> Result<()> {
        let upstream = format!(
            "{}/{}",
            self.settings.repo.github_remote, self.settings.repo.github_branch
        );
        // Accept the generated todo list as-is so fixups apply without an
        // interactive editor.
        self.git_with_editor(
            &["rebase", "-i", "--autosquash", "--autostash", upstream.as_str()],
            ":",
        )?;
        Ok(())
    }

    async fn cherry_pick_range(&self, upto_hash: &str) -> Result<()> {
        let range = format!("..{upto_hash}");
        self.git(&["cherry-pick", range.as_str()])?;
        Ok(())
    }
}

fn find_on_path(name: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
