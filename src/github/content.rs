//! File content retrieval with a fixed fallback chain.
//!
//! The Contents API is the obvious way to read a file but times out on large
//! lock files, so it sits between the Git Data API (commit, tree walk, blob)
//! and the raw content mirror.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::client::{GitHubClient, RAW_MEDIA_TYPE};
use super::RepoRef;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentStrategy {
    /// Commit → tree walk → blob.
    GitData,
    /// `GET /repos/{owner}/{repo}/contents/{path}`, retried with linear backoff.
    ContentsApi,
    /// `raw.githubusercontent.com`.
    RawMirror,
}

impl ContentStrategy {
    pub const ALL: [ContentStrategy; 3] = [
        ContentStrategy::GitData,
        ContentStrategy::ContentsApi,
        ContentStrategy::RawMirror,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStrategy::GitData => "git-data",
            ContentStrategy::ContentsApi => "contents-api",
            ContentStrategy::RawMirror => "raw-mirror",
        }
    }
}

impl fmt::Display for ContentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct Commit {
    tree: ObjectRef,
}

#[derive(Debug, Deserialize)]
struct ObjectRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct Tree {
    tree: Vec<TreeEntry>,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
}

impl GitHubClient {
    /// One tier of the chain. `Ok(None)` means the tier answered but the
    /// file is not there.
    pub(super) async fn fetch_with(
        &self,
        strategy: ContentStrategy,
        repo: &RepoRef,
        path: &str,
        revision: &str,
    ) -> Result<Option<String>> {
        let result = match strategy {
            ContentStrategy::GitData => self.via_git_data(repo, path, revision).await,
            ContentStrategy::ContentsApi => self.via_contents_api(repo, path, revision).await.map(Some),
            ContentStrategy::RawMirror => self.via_raw_mirror(repo, path, revision).await.map(Some),
        };

        match result {
            Err(err) if err.is_not_found() => Ok(None),
            other => other,
        }
    }

    async fn via_git_data(&self, repo: &RepoRef, path: &str, revision: &str) -> Result<Option<String>> {
        let base = self.repo_url(repo);

        let commit: Commit = self
            .get_json(&format!("{}/git/commits/{}", base, revision), &format!("commit {}", revision))
            .await?;

        let mut tree_sha = commit.tree.sha;
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();

        for (i, part) in parts.iter().enumerate() {
            let tree: Tree = self
                .get_json(&format!("{}/git/trees/{}", base, tree_sha), &format!("tree {}", tree_sha))
                .await?;

            let Some(entry) = tree.tree.into_iter().find(|e| e.path == *part) else {
                debug!(path, part, "path component missing from tree");
                return Ok(None);
            };

            let is_last = i == parts.len() - 1;
            match (is_last, entry.kind.as_str()) {
                (true, "blob") => {
                    let url = format!("{}/git/blobs/{}", base, entry.sha);
                    let text = self
                        .get_text(self.get(&url, RAW_MEDIA_TYPE), &format!("blob {}", entry.sha))
                        .await?;
                    return Ok(Some(text));
                }
                (false, "tree") => tree_sha = entry.sha,
                _ => return Ok(None),
            }
        }

        Ok(None)
    }

    async fn via_contents_api(&self, repo: &RepoRef, path: &str, revision: &str) -> Result<String> {
        let url = format!("{}/contents/{}?ref={}", self.repo_url(repo), path, revision);
        let what = format!("{}/{}@{}", repo, path, revision);

        self.contents_retry
            .run(&what, || self.get_text(self.get(&url, RAW_MEDIA_TYPE), &what))
            .await
    }

    async fn via_raw_mirror(&self, repo: &RepoRef, path: &str, revision: &str) -> Result<String> {
        let url = format!("{}/{}/{}/{}/{}", self.raw_url, repo.owner, repo.repo, revision, path);
        let what = format!("raw {}/{}@{}", repo, path, revision);
        self.get_text(self.get(&url, "*/*"), &what).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GitHubConfig;
    use crate::github::CodeHost;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GitHubClient {
        GitHubClient::from_config(&GitHubConfig {
            api_url: server.uri(),
            raw_url: format!("{}/raw", server.uri()),
            token: Some("secret".to_string()),
            ..GitHubConfig::default()
        })
    }

    fn repo() -> RepoRef {
        RepoRef::new("acme", "web")
    }

    async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_git_data_walks_nested_tree() {
        let server = MockServer::start().await;
        mount_json(&server, "/repos/acme/web/git/commits/head123", json!({ "sha": "head123", "tree": { "sha": "root" } })).await;
        mount_json(
            &server,
            "/repos/acme/web/git/trees/root",
            json!({ "sha": "root", "tree": [
                { "path": "README.md", "type": "blob", "sha": "r1" },
                { "path": "packages", "type": "tree", "sha": "pkgs" }
            ], "truncated": false }),
        )
        .await;
        mount_json(
            &server,
            "/repos/acme/web/git/trees/pkgs",
            json!({ "sha": "pkgs", "tree": [{ "path": "yarn.lock", "type": "blob", "sha": "blob1" }] }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/web/git/blobs/blob1"))
            .and(header("accept", RAW_MEDIA_TYPE))
            .respond_with(ResponseTemplate::new(200).set_body_string("# yarn lockfile v1\n"))
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server)
            .file_content(&repo(), "packages/yarn.lock", "head123")
            .await
            .unwrap();

        assert_eq!(text.as_deref(), Some("# yarn lockfile v1\n"));
    }

    #[tokio::test]
    async fn test_falls_back_to_raw_mirror() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/web/git/commits/head123"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/web/contents/yarn.lock"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/raw/acme/web/head123/yarn.lock"))
            .respond_with(ResponseTemplate::new(200).set_body_string("lock"))
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server)
            .file_content(&repo(), "yarn.lock", "head123")
            .await
            .unwrap();

        assert_eq!(text.as_deref(), Some("lock"));
    }

    #[tokio::test]
    async fn test_contents_api_uses_revision() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/web/contents/pnpm-lock.yaml"))
            .and(query_param("ref", "base456"))
            .and(header("accept", RAW_MEDIA_TYPE))
            .respond_with(ResponseTemplate::new(200).set_body_string("lockfileVersion: '9.0'\n"))
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server)
            .with_strategies(vec![ContentStrategy::ContentsApi])
            .file_content(&repo(), "pnpm-lock.yaml", "base456")
            .await
            .unwrap();

        assert_eq!(text.as_deref(), Some("lockfileVersion: '9.0'\n"));
    }

    #[tokio::test]
    async fn test_missing_everywhere_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let text = client(&server)
            .file_content(&repo(), "yarn.lock", "head123")
            .await
            .unwrap();

        assert!(text.is_none());
    }

    #[tokio::test]
    async fn test_missing_tree_entry_falls_through() {
        let server = MockServer::start().await;
        mount_json(&server, "/repos/acme/web/git/commits/head123", json!({ "tree": { "sha": "root" } })).await;
        mount_json(&server, "/repos/acme/web/git/trees/root", json!({ "tree": [] })).await;

        let text = client(&server)
            .with_strategies(vec![ContentStrategy::GitData])
            .file_content(&repo(), "yarn.lock", "head123")
            .await
            .unwrap();

        assert!(text.is_none());
    }
}
