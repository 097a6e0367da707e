use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::{ChangedFile, CodeHost, ContentStrategy, PullRequest, PullRequestRef, RepoRef};
use crate::config::GitHubConfig;
use crate::error::{Result, ScanError};
use crate::retry::{Backoff, RetryPolicy};

const USER_AGENT: &str = concat!("prscan/", env!("CARGO_PKG_VERSION"));
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
pub(super) const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";
const API_VERSION: &str = "2022-11-28";
const CONTENTS_BACKOFF: Duration = Duration::from_millis(200);

/// GitHub REST API client.
pub struct GitHubClient {
    pub(super) client: reqwest::Client,
    pub(super) api_url: String,
    pub(super) raw_url: String,
    token: Option<String>,
    per_page: u32,
    retry: RetryPolicy,
    pub(super) contents_retry: RetryPolicy,
    strategies: Vec<ContentStrategy>,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Self {
        let config = GitHubConfig {
            token,
            ..GitHubConfig::default()
        };
        Self::from_config(&config)
    }

    pub fn from_config(config: &GitHubConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            raw_url: config.raw_url.trim_end_matches('/').to_string(),
            token: config.token(),
            per_page: config.per_page.max(1),
            retry: RetryPolicy::new(config.max_retries),
            contents_retry: RetryPolicy::new(config.max_retries)
                .with_backoff(Backoff::Linear(CONTENTS_BACKOFF)),
            strategies: ContentStrategy::ALL.to_vec(),
        }
    }

    /// Overrides the content retrieval order.
    pub fn with_strategies(mut self, strategies: Vec<ContentStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    pub(super) fn get(&self, url: &str, accept: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(url)
            .header(ACCEPT, accept)
            .header("X-GitHub-Api-Version", API_VERSION);
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    pub(super) async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| ScanError::from_http(what, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::from_status(what, status));
        }
        Ok(response)
    }

    pub(super) async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        let response = self.send(self.get(url, JSON_MEDIA_TYPE), what).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ScanError::from_http(what, e))?;
        serde_json::from_slice(&bytes).map_err(|e| ScanError::InvalidResponse {
            what: what.to_string(),
            message: e.to_string(),
        })
    }

    pub(super) async fn get_text(&self, request: reqwest::RequestBuilder, what: &str) -> Result<String> {
        let response = self.send(request, what).await?;
        response.text().await.map_err(|e| ScanError::from_http(what, e))
    }

    pub(super) fn repo_url(&self, repo: &RepoRef) -> String {
        format!("{}/repos/{}/{}", self.api_url, repo.owner, repo.repo)
    }
}

#[async_trait]
impl CodeHost for GitHubClient {
    #[instrument(skip(self, pr), fields(pr = %pr))]
    async fn pull_request(&self, pr: &PullRequestRef) -> Result<PullRequest> {
        let url = format!("{}/pulls/{}", self.repo_url(&pr.repo), pr.number);
        let what = format!("pull request {}", pr);
        info!("fetching pull request");

        self.retry.run(&what, || self.get_json(&url, &what)).await
    }

    #[instrument(skip(self, pr), fields(pr = %pr))]
    async fn changed_files(&self, pr: &PullRequestRef) -> Result<Vec<ChangedFile>> {
        let mut files = Vec::new();
        let mut page = 1u32;

        loop {
            let url = format!(
                "{}/pulls/{}/files?per_page={}&page={}",
                self.repo_url(&pr.repo),
                pr.number,
                self.per_page,
                page
            );
            let what = format!("changed files of {} (page {})", pr, page);
            debug!(page, "fetching changed files");

            let batch: Vec<ChangedFile> = self.retry.run(&what, || self.get_json(&url, &what)).await?;
            let len = batch.len();
            files.extend(batch);

            if len < self.per_page as usize {
                break;
            }
            page += 1;
        }

        Ok(files)
    }

    #[instrument(skip(self, repo), fields(repo = %repo))]
    async fn file_content(&self, repo: &RepoRef, path: &str, revision: &str) -> Result<Option<String>> {
        for strategy in &self.strategies {
            debug!(strategy = %strategy, "fetching file content");
            match self.fetch_with(*strategy, repo, path, revision).await {
                Ok(Some(text)) => return Ok(Some(text)),
                Ok(None) => debug!(strategy = %strategy, "file not found"),
                Err(err) => warn!(strategy = %strategy, error = %err, "content retrieval failed"),
            }
        }

        warn!("all content retrieval methods failed");
        Ok(None)
    }
}
