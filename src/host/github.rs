//! GitHub host service implementation

use async_trait::async_trait;
use octocrab::Octocrab;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::host::{CombinedStatus, HostService, PrCreate, PrData, PrUpdate, Review};
use crate::types::MergeMethod;

/// GitHub service using octocrab, with raw HTTP for the endpoints octocrab
/// does not model (combined status, PR edits that move head/base).
pub struct GitHubHost {
    client: Octocrab,
    owner: String,
    repo: String,
    /// Token for raw HTTP requests
    token: String,
    /// HTTP client for raw requests
    http_client: Client,
    /// API host for raw requests
    api_host: String,
}

impl GitHubHost {
    /// Create a new GitHub service
    pub fn new(token: &str, owner: String, repo: String, host: Option<String>) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(token.to_string());

        let api_host = if let Some(ref h) = host {
            let base_url = format!("https://{h}/api/v3");
            builder = builder
                .base_uri(&base_url)
                .map_err(|e| Error::HostApi(e.to_string()))?;
            format!("{h}/api/v3")
        } else {
            "api.github.com".to_string()
        };

        let client = builder.build().map_err(|e| Error::HostApi(e.to_string()))?;

        let http_client = Client::builder()
            .user_agent("cascade")
            .build()
            .map_err(|e| Error::HostApi(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            owner,
            repo,
            token: token.to_string(),
            http_client,
            api_host,
        })
    }

    fn rest_url(&self, path: &str) -> String {
        format!(
            "https://{}/repos/{}/{}/{}",
            self.api_host, self.owner, self.repo, path
        )
    }
}

fn pr_data_from_octocrab(pr: &octocrab::models::pulls::PullRequest) -> PrData {
    PrData {
        id: Some(pr.id.0),
        number: Some(pr.number),
        head_ref: Some(pr.head.ref_field.clone()),
        head_sha: Some(pr.head.sha.clone()),
        base_ref: Some(pr.base.ref_field.clone()),
        title: pr.title.clone(),
        body: pr.body.clone(),
        mergeable: pr.mergeable,
        merged: Some(pr.merged_at.is_some()),
        draft: pr.draft,
        in_queue: None,
    }
}

fn review_state_string(state: &octocrab::models::pulls::ReviewState) -> String {
    match state {
        octocrab::models::pulls::ReviewState::Approved => "APPROVED".to_string(),
        other => format!("{other:?}").to_uppercase(),
    }
}

#[async_trait]
impl HostService for GitHubHost {
    async fn list_prs(&self) -> Result<Vec<PrData>> {
        debug!(owner = %self.owner, repo = %self.repo, "listing open PRs");
        let page = self
            .client
            .pulls(&self.owner, &self.repo)
            .list()
            .state(octocrab::params::State::Open)
            .per_page(100)
            .send()
            .await?;

        let prs: Vec<PrData> = page.items.iter().map(pr_data_from_octocrab).collect();
        debug!(count = prs.len(), "listed open PRs");
        Ok(prs)
    }

    async fn get_pr(&self, number: u64) -> Result<PrData> {
        debug!(number, "getting PR");
        let pr = self.client.pulls(&self.owner, &self.repo).get(number).await?;
        Ok(pr_data_from_octocrab(&pr))
    }

    async fn list_reviews(&self, number: u64) -> Result<Vec<Review>> {
        debug!(number, "listing PR reviews");
        let page = self
            .client
            .pulls(&self.owner, &self.repo)
            .list_reviews(number)
            .send()
            .await?;

        Ok(page
            .items
            .iter()
            .map(|review| Review {
                state: review.state.as_ref().map(review_state_string),
            })
            .collect())
    }

    async fn get_combined_status(&self, head_sha: &str) -> Result<CombinedStatus> {
        #[derive(Deserialize)]
        struct RawCombinedStatus {
            state: Option<String>,
            total_count: Option<u64>,
        }

        debug!(head_sha, "getting combined status");
        let url = self.rest_url(&format!("commits/{head_sha}/status"));
        let response = self
            .http_client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await
            .map_err(|e| Error::HostApi(format!("failed to fetch combined status: {e}")))?;

        if !response.status().is_success() {
            debug!(
                status = %response.status(),
                "combined status returned non-success, treating as absent"
            );
            return Ok(CombinedStatus::default());
        }

        let raw: RawCombinedStatus = response
            .json()
            .await
            .map_err(|e| Error::HostApi(format!("failed to parse combined status: {e}")))?;

        Ok(CombinedStatus {
            state: raw.state,
            total_count: raw.total_count,
        })
    }

    async fn edit_pr(&self, number: u64, update: PrUpdate) -> Result<PrData> {
        debug!(number, ?update, "editing PR");

        // octocrab's update builder cannot move head/base, so edits go
        // through the REST endpoint directly.
        let mut payload = serde_json::Map::new();
        if let Some(state) = update.state {
            payload.insert("state".to_string(), state.into());
        }
        if let Some(title) = update.title {
            payload.insert("title".to_string(), title.into());
        }
        if let Some(body) = update.body {
            payload.insert("body".to_string(), body.into());
        }
        if let Some(draft) = update.draft {
            payload.insert("draft".to_string(), draft.into());
        }
        if let Some(head) = update.head {
            payload.insert("head".to_string(), head.into());
        }
        if let Some(base) = update.base {
            payload.insert("base".to_string(), base.into());
        }

        let url = self.rest_url(&format!("pulls/{number}"));
        let response = self
            .http_client
            .patch(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .json(&serde_json::Value::Object(payload))
            .send()
            .await
            .map_err(|e| Error::HostApi(format!("failed to edit PR #{number}: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::HostApi(format!(
                "editing PR #{number} returned {status}: {body}"
            )));
        }

        let pr: octocrab::models::pulls::PullRequest = response
            .json()
            .await
            .map_err(|e| Error::HostApi(format!("failed to parse edited PR #{number}: {e}")))?;

        debug!(number, "edited PR");
        Ok(pr_data_from_octocrab(&pr))
    }

    async fn merge_pr(&self, number: u64, method: MergeMethod) -> Result<()> {
        debug!(number, %method, "merging PR");
        let octocrab_method = match method {
            MergeMethod::Merge => octocrab::params::pulls::MergeMethod::Merge,
            MergeMethod::Squash => octocrab::params::pulls::MergeMethod::Squash,
            MergeMethod::Rebase => octocrab::params::pulls::MergeMethod::Rebase,
        };

        let result = self
            .client
            .pulls(&self.owner, &self.repo)
            .merge(number)
            .method(octocrab_method)
            .send()
            .await
            .map_err(|e| Error::HostApi(format!("merging PR #{number}: {e}")))?;

        if !result.merged {
            return Err(Error::HostApi(format!(
                "PR #{number} was not merged: {}",
                result.message.unwrap_or_default()
            )));
        }

        debug!(number, "merged PR");
        Ok(())
    }

    async fn create_pr(&self, create: PrCreate) -> Result<PrData> {
        debug!(head = %create.head, base = %create.base, draft = create.draft, "creating PR");
        let pr = self
            .client
            .pulls(&self.owner, &self.repo)
            .create(&create.title, &create.head, &create.base)
            .body(&create.body)
            .draft(create.draft)
            .send()
            .await?;

        let data = pr_data_from_octocrab(&pr);
        debug!(number = ?data.number, "created PR");
        Ok(data)
    }

    async fn comment_pr(&self, number: u64, body: &str) -> Result<()> {
        debug!(number, "commenting on PR");
        self.client
            .issues(&self.owner, &self.repo)
            .create_comment(number, body)
            .await?;
        Ok(())
    }
}
