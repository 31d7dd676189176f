//! Mock host service for testing
//!
//! Manually implements `HostService` with call recording and scripted
//! responses, so reconciler flows can be driven and verified without a
//! network.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use cascade::error::{Error, Result};
use cascade::host::{CombinedStatus, HostService, PrCreate, PrData, PrUpdate, Review};
use cascade::types::MergeMethod;

/// One PR held by the mock, with open/merged bookkeeping the wire type
/// doesn't carry
#[derive(Debug, Clone)]
struct MockPr {
    data: PrData,
    open: bool,
    merged: bool,
}

/// Call record for `merge_pr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCall {
    pub number: u64,
    pub method: MergeMethod,
}

/// Scripted in-memory host
pub struct MockHost {
    next_pr_number: AtomicU64,
    prs: Mutex<BTreeMap<u64, MockPr>>,
    reviews: Mutex<HashMap<u64, Vec<Review>>>,
    combined: Mutex<HashMap<String, CombinedStatus>>,
    // call tracking
    create_calls: Mutex<Vec<PrCreate>>,
    edit_calls: Mutex<Vec<(u64, PrUpdate)>>,
    merge_calls: Mutex<Vec<MergeCall>>,
    comment_calls: Mutex<Vec<(u64, String)>>,
    // error injection
    error_on_create: Mutex<Option<String>>,
    error_on_edit: Mutex<Option<String>>,
    error_on_merge: Mutex<Option<String>>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            next_pr_number: AtomicU64::new(1),
            prs: Mutex::new(BTreeMap::new()),
            reviews: Mutex::new(HashMap::new()),
            combined: Mutex::new(HashMap::new()),
            create_calls: Mutex::new(Vec::new()),
            edit_calls: Mutex::new(Vec::new()),
            merge_calls: Mutex::new(Vec::new()),
            comment_calls: Mutex::new(Vec::new()),
            error_on_create: Mutex::new(None),
            error_on_edit: Mutex::new(None),
            error_on_merge: Mutex::new(None),
        }
    }

    // === Scripting ===

    /// Seed an existing open PR
    pub fn seed_pr(&self, number: u64, head: &str, base: &str, head_sha: &str) {
        self.prs.lock().unwrap().insert(
            number,
            MockPr {
                data: PrData {
                    id: Some(1000 + number),
                    number: Some(number),
                    head_ref: Some(head.to_string()),
                    head_sha: Some(head_sha.to_string()),
                    base_ref: Some(base.to_string()),
                    title: Some(format!("PR {number}")),
                    body: Some(String::new()),
                    mergeable: Some(true),
                    merged: Some(false),
                    draft: Some(false),
                    in_queue: None,
                },
                open: true,
                merged: false,
            },
        );
        if number >= self.next_pr_number.load(Ordering::SeqCst) {
            self.next_pr_number.store(number + 1, Ordering::SeqCst);
        }
    }

    /// Set the reviews returned for a PR
    pub fn set_reviews(&self, number: u64, states: &[&str]) {
        self.reviews.lock().unwrap().insert(
            number,
            states
                .iter()
                .map(|s| Review {
                    state: Some((*s).to_string()),
                })
                .collect(),
        );
    }

    /// Set the combined status returned for a head sha
    pub fn set_combined_status(&self, head_sha: &str, state: &str, total_count: u64) {
        self.combined.lock().unwrap().insert(
            head_sha.to_string(),
            CombinedStatus {
                state: Some(state.to_string()),
                total_count: Some(total_count),
            },
        );
    }

    pub fn fail_create(&self, msg: &str) {
        *self.error_on_create.lock().unwrap() = Some(msg.to_string());
    }

    pub fn fail_edit(&self, msg: &str) {
        *self.error_on_edit.lock().unwrap() = Some(msg.to_string());
    }

    pub fn fail_merge(&self, msg: &str) {
        *self.error_on_merge.lock().unwrap() = Some(msg.to_string());
    }

    // === Inspection ===

    pub fn create_calls(&self) -> Vec<PrCreate> {
        self.create_calls.lock().unwrap().clone()
    }

    pub fn edit_calls(&self) -> Vec<(u64, PrUpdate)> {
        self.edit_calls.lock().unwrap().clone()
    }

    pub fn merge_calls(&self) -> Vec<MergeCall> {
        self.merge_calls.lock().unwrap().clone()
    }

    pub fn comment_calls(&self) -> Vec<(u64, String)> {
        self.comment_calls.lock().unwrap().clone()
    }

    /// (number, head, base) of every currently open PR
    pub fn open_prs(&self) -> Vec<(u64, String, String)> {
        self.prs
            .lock()
            .unwrap()
            .values()
            .filter(|pr| pr.open)
            .map(|pr| {
                (
                    pr.data.number.unwrap_or_default(),
                    pr.data.head_ref.clone().unwrap_or_default(),
                    pr.data.base_ref.clone().unwrap_or_default(),
                )
            })
            .collect()
    }

    pub fn is_merged(&self, number: u64) -> bool {
        self.prs
            .lock()
            .unwrap()
            .get(&number)
            .is_some_and(|pr| pr.merged)
    }

    pub fn base_of(&self, number: u64) -> Option<String> {
        self.prs
            .lock()
            .unwrap()
            .get(&number)
            .and_then(|pr| pr.data.base_ref.clone())
    }
}

#[async_trait]
impl HostService for MockHost {
    async fn list_prs(&self) -> Result<Vec<PrData>> {
        Ok(self
            .prs
            .lock()
            .unwrap()
            .values()
            .filter(|pr| pr.open)
            .map(|pr| pr.data.clone())
            .collect())
    }

    async fn get_pr(&self, number: u64) -> Result<PrData> {
        self.prs
            .lock()
            .unwrap()
            .get(&number)
            .map(|pr| pr.data.clone())
            .ok_or_else(|| Error::HostApi(format!("no PR #{number}")))
    }

    async fn list_reviews(&self, number: u64) -> Result<Vec<Review>> {
        Ok(self
            .reviews
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_combined_status(&self, head_sha: &str) -> Result<CombinedStatus> {
        Ok(self
            .combined
            .lock()
            .unwrap()
            .get(head_sha)
            .cloned()
            .unwrap_or_default())
    }

    async fn edit_pr(&self, number: u64, update: PrUpdate) -> Result<PrData> {
        self.edit_calls
            .lock()
            .unwrap()
            .push((number, update.clone()));

        if let Some(msg) = self.error_on_edit.lock().unwrap().as_ref() {
            return Err(Error::HostApi(msg.clone()));
        }

        let mut prs = self.prs.lock().unwrap();
        let pr = prs
            .get_mut(&number)
            .ok_or_else(|| Error::HostApi(format!("no PR #{number}")))?;

        if update.state.as_deref() == Some("closed") {
            pr.open = false;
        }
        if let Some(title) = update.title {
            pr.data.title = Some(title);
        }
        if let Some(body) = update.body {
            pr.data.body = Some(body);
        }
        if let Some(head) = update.head {
            pr.data.head_ref = Some(head);
        }
        if let Some(base) = update.base {
            pr.data.base_ref = Some(base);
        }
        Ok(pr.data.clone())
    }

    async fn merge_pr(&self, number: u64, method: MergeMethod) -> Result<()> {
        self.merge_calls
            .lock()
            .unwrap()
            .push(MergeCall { number, method });

        if let Some(msg) = self.error_on_merge.lock().unwrap().as_ref() {
            return Err(Error::HostApi(msg.clone()));
        }

        let mut prs = self.prs.lock().unwrap();
        let pr = prs
            .get_mut(&number)
            .ok_or_else(|| Error::HostApi(format!("no PR #{number}")))?;
        pr.merged = true;
        pr.open = false;
        pr.data.merged = Some(true);
        Ok(())
    }

    async fn create_pr(&self, create: PrCreate) -> Result<PrData> {
        self.create_calls.lock().unwrap().push(create.clone());

        if let Some(msg) = self.error_on_create.lock().unwrap().as_ref() {
            return Err(Error::HostApi(msg.clone()));
        }

        let number = self.next_pr_number.fetch_add(1, Ordering::SeqCst);
        let data = PrData {
            id: Some(1000 + number),
            number: Some(number),
            head_ref: Some(create.head.clone()),
            head_sha: None,
            base_ref: Some(create.base.clone()),
            title: Some(create.title.clone()),
            body: Some(create.body.clone()),
            mergeable: Some(true),
            merged: Some(false),
            draft: Some(create.draft),
            in_queue: None,
        };
        self.prs.lock().unwrap().insert(
            number,
            MockPr {
                data: data.clone(),
                open: true,
                merged: false,
            },
        );
        Ok(data)
    }

    async fn comment_pr(&self, number: u64, body: &str) -> Result<()> {
        self.comment_calls
            .lock()
            .unwrap()
            .push((number, body.to_string()));
        Ok(())
    }
}
