//! Mock git layer for testing
//!
//! Holds an in-memory commit stack and records every operation the
//! reconciler performs against it.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use cascade::error::Result;
use cascade::types::RawCommit;
use cascade::vcs::Vcs;

/// Call record for `create_branch_with_cherry_pick`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CherryPickCall {
    pub branch: String,
    pub dest_branch: String,
    pub sha: String,
}

/// Scripted in-memory git layer
#[derive(Default)]
pub struct MockVcs {
    commits: Mutex<Vec<RawCommit>>,
    dirty: AtomicBool,
    // call tracking
    pub fetch_calls: AtomicUsize,
    pub rebase_calls: AtomicUsize,
    pub append_calls: AtomicUsize,
    pub stash_calls: AtomicUsize,
    pub stash_pop_calls: AtomicUsize,
    cherry_picks: Mutex<Vec<CherryPickCall>>,
    pushed_refspecs: Mutex<Vec<Vec<String>>>,
    deleted_branches: Mutex<Vec<String>>,
    fixups: Mutex<Vec<String>>,
    cherry_pick_ranges: Mutex<Vec<String>>,
}

impl MockVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the local stack (HEAD first)
    pub fn set_commits(&self, commits: Vec<RawCommit>) {
        *self.commits.lock().unwrap() = commits;
    }

    /// Mark the working tree dirty so pushes stash around themselves
    pub fn set_dirty(&self, dirty: bool) {
        self.dirty.store(dirty, Ordering::SeqCst);
    }

    pub fn cherry_picks(&self) -> Vec<CherryPickCall> {
        self.cherry_picks.lock().unwrap().clone()
    }

    /// Every push, one `Vec` of refspecs per `git push`
    pub fn pushed_refspecs(&self) -> Vec<Vec<String>> {
        self.pushed_refspecs.lock().unwrap().clone()
    }

    pub fn deleted_branches(&self) -> Vec<String> {
        self.deleted_branches.lock().unwrap().clone()
    }

    pub fn fixups(&self) -> Vec<String> {
        self.fixups.lock().unwrap().clone()
    }

    pub fn cherry_pick_ranges(&self) -> Vec<String> {
        self.cherry_pick_ranges.lock().unwrap().clone()
    }
}

#[async_trait]
impl Vcs for MockVcs {
    async fn fetch(&self) -> Result<()> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rebase_onto_upstream(&self) -> Result<()> {
        self.rebase_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read_stack(&self) -> Result<Vec<RawCommit>> {
        Ok(self.commits.lock().unwrap().clone())
    }

    async fn append_commit_ids(&self) -> Result<()> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create_branch_with_cherry_pick(
        &self,
        branch_name: &str,
        dest_branch: &str,
        sha: &str,
    ) -> Result<()> {
        self.cherry_picks.lock().unwrap().push(CherryPickCall {
            branch: branch_name.to_string(),
            dest_branch: dest_branch.to_string(),
            sha: sha.to_string(),
        });
        Ok(())
    }

    async fn delete_remote_branch(&self, branch: &str) -> Result<()> {
        self.deleted_branches
            .lock()
            .unwrap()
            .push(branch.to_string());
        Ok(())
    }

    async fn push_refspecs(&self, refspecs: &[String]) -> Result<()> {
        self.pushed_refspecs
            .lock()
            .unwrap()
            .push(refspecs.to_vec());
        Ok(())
    }

    async fn working_tree_dirty(&self) -> Result<bool> {
        Ok(self.dirty.load(Ordering::SeqCst))
    }

    async fn stash(&self) -> Result<()> {
        self.stash_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stash_pop(&self) -> Result<()> {
        self.stash_pop_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn commit_fixup(&self, hash: &str) -> Result<()> {
        self.fixups.lock().unwrap().push(hash.to_string());
        Ok(())
    }

    async fn autosquash_rebase(&self) -> Result<()> {
        self.rebase_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn cherry_pick_range(&self, upto_hash: &str) -> Result<()> {
        self.cherry_pick_ranges
            .lock()
            .unwrap()
            .push(upto_hash.to_string());
        Ok(())
    }
}
