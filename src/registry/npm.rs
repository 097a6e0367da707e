use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{escape_name, PackageRegistry};
use crate::config::RegistryConfig;
use crate::error::{Result, ScanError};
use crate::model::{DownloadPeriod, DownloadStats, PackageMetadata};
use crate::retry::RetryPolicy;

const USER_AGENT: &str = concat!("prscan/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// The public npm registry and its downloads API.
pub struct NpmRegistry {
    client: reqwest::Client,
    registry_url: String,
    downloads_url: String,
    retry: RetryPolicy,
}

impl NpmRegistry {
    pub fn new() -> Self {
        Self::from_config(&RegistryConfig::default())
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            registry_url: config.registry_url.trim_end_matches('/').to_string(),
            downloads_url: config.downloads_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::new(config.max_retries),
        }
    }

    async fn get_bytes(&self, url: &str, what: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScanError::from_http(what, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::from_status(what, status));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ScanError::from_http(what, e))?;
        Ok(bytes.to_vec())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        let bytes = self.get_bytes(url, what).await?;
        serde_json::from_slice(&bytes).map_err(|e| ScanError::InvalidResponse {
            what: what.to_string(),
            message: e.to_string(),
        })
    }
}

impl Default for NpmRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PackageRegistry for NpmRegistry {
    fn name(&self) -> &'static str {
        "npm"
    }

    #[instrument(skip(self))]
    async fn metadata(&self, name: &str) -> Result<PackageMetadata> {
        let url = format!("{}/{}", self.registry_url, escape_name(name));
        let what = format!("package {}", name);
        debug!(url = %url, "fetching metadata");

        self.retry.run(&what, || self.get_json(&url, &what)).await
    }

    #[instrument(skip(self))]
    async fn download_stats(&self, name: &str, period: DownloadPeriod) -> Result<DownloadStats> {
        let url = format!("{}/point/{}/{}", self.downloads_url, period, name);
        let what = format!("download stats for {}", name);
        debug!(url = %url, "fetching download stats");

        self.retry.run(&what, || self.get_json(&url, &what)).await
    }

    #[instrument(skip(self))]
    async fn tarball(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self.get_bytes(url, url).await?;
        debug!(size = bytes.len(), "downloaded tarball");
        Ok(bytes)
    }
}
