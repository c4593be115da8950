//! Apify REST API Client
//!
//! Bearer-token client for the platform API v2, used both as the
//! [`MetadataSource`] behind the fetch tools and by the platform sinks.
//! One best-effort attempt per call; no retries beyond the transport's own.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::source::{
    ActorRecord, BuildRecord, MetadataSource, RepositorySnapshot, StoreItem, StoreQuery,
    VersionRecord,
};
use crate::config::PlatformConfig;
use crate::constants::platform;
use crate::types::{ActorId, InspectorError, Result};

const SERVICE: &str = "apify";

/// `{"data": ...}` wrapper used by every API response
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// Paginated list payload
#[derive(Debug, Deserialize)]
struct ListPage<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

/// Apify API client with secure token handling
pub struct ApifyClient {
    api_base: String,
    gateway_url: String,
    token: SecretString,
    client: reqwest::Client,
}

impl std::fmt::Debug for ApifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApifyClient")
            .field("api_base", &self.api_base)
            .field("gateway_url", &self.gateway_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl ApifyClient {
    pub fn new(config: &PlatformConfig, token: SecretString) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                InspectorError::Config(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            gateway_url: config.gateway_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    /// Build a client with the token from `APIFY_TOKEN`
    pub fn from_env(config: &PlatformConfig) -> Result<Self> {
        let token = std::env::var(platform::TOKEN_ENV).map_err(|_| {
            InspectorError::Config(format!(
                "{} environment variable is not set",
                platform::TOKEN_ENV
            ))
        })?;
        Self::new(config, SecretString::from(token))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2{}", self.api_base, path)
    }

    /// GET `path`, `None` on 404
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Option<reqwest::Response>> {
        debug!("GET {}", path);
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(self.token.expose_secret())
            .query(query)
            .send()
            .await
            .map_err(|e| InspectorError::transport(SERVICE, format!("GET {}: {}", path, e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InspectorError::transport(
                SERVICE,
                format!("GET {} returned {}: {}", path, status, body),
            ));
        }
        Ok(Some(response))
    }

    /// GET a `data`-wrapped resource, `None` on 404
    pub(crate) async fn get_data<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>> {
        let Some(response) = self.get(path, query).await? else {
            return Ok(None);
        };
        let envelope: DataEnvelope<T> = response.json().await.map_err(|e| {
            InspectorError::transport(SERVICE, format!("Malformed response for {}: {}", path, e))
        })?;
        Ok(Some(envelope.data))
    }

    /// JSON record of a key-value store, `None` when the record is missing
    pub async fn get_record(&self, store_id: &str, key: &str) -> Result<Option<Value>> {
        let path = format!("/key-value-stores/{}/records/{}", store_id, key);
        let Some(response) = self.get(&path, &[]).await? else {
            return Ok(None);
        };
        let record = response.json().await.map_err(|e| {
            InspectorError::transport(SERVICE, format!("Record {} is not JSON: {}", key, e))
        })?;
        Ok(Some(record))
    }

    /// POST a JSON body, failing on any non-success status
    pub(crate) async fn post_json(&self, path: &str, body: &Value) -> Result<()> {
        debug!("POST {}", path);
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(self.token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| InspectorError::transport(SERVICE, format!("POST {}: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InspectorError::transport(
                SERVICE,
                format!("POST {} returned {}: {}", path, status, body),
            ));
        }
        Ok(())
    }

    async fn repository_exists(&self, repo_url: &str) -> Result<bool> {
        let response = self
            .client
            .get(repo_url)
            .send()
            .await
            .map_err(|e| InspectorError::transport("github", e.to_string()))?;
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl MetadataSource for ApifyClient {
    async fn actor(&self, id: &ActorId) -> Result<Option<ActorRecord>> {
        self.get_data(&format!("/acts/{}", id.api_path()), &[]).await
    }

    async fn default_build(&self, id: &ActorId) -> Result<Option<BuildRecord>> {
        self.get_data(&format!("/acts/{}/builds/default", id.api_path()), &[])
            .await
    }

    async fn versions(&self, id: &ActorId) -> Result<Vec<VersionRecord>> {
        let page: Option<ListPage<VersionRecord>> = self
            .get_data(&format!("/acts/{}/versions", id.api_path()), &[])
            .await?;
        Ok(page.map(|p| p.items).unwrap_or_default())
    }

    async fn search_store(&self, query: &StoreQuery) -> Result<Vec<StoreItem>> {
        let params = [
            ("search", query.search.clone()),
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
        ];
        let page: Option<ListPage<StoreItem>> = self.get_data("/store", &params).await?;
        Ok(page.map(|p| p.items).unwrap_or_default())
    }

    async fn repository(
        &self,
        repo_url: &str,
        max_tokens: usize,
    ) -> Result<Option<RepositorySnapshot>> {
        let Some((public_url, repo_path)) = github_repository(repo_url) else {
            debug!("Skipping non-GitHub repository URL: {}", repo_url);
            return Ok(None);
        };

        if !self.repository_exists(&public_url).await? {
            debug!("Repository not reachable: {}", public_url);
            return Ok(None);
        }

        let url = format!("{}/{}", self.gateway_url, repo_path);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("accept", "application/json".to_string()),
                ("maxTokens", max_tokens.to_string()),
            ])
            .send()
            .await
            .map_err(|e| InspectorError::transport("repository-gateway", e.to_string()))?;

        if !response.status().is_success() {
            return Err(InspectorError::transport(
                "repository-gateway",
                format!("{} returned {}", repo_path, response.status()),
            ));
        }

        let snapshot = response.json().await.map_err(|e| {
            InspectorError::transport("repository-gateway", format!("Malformed response: {}", e))
        })?;
        Ok(Some(snapshot))
    }
}

/// Split a Git URL into its public GitHub URL and `owner/repo` path.
///
/// Platform URLs may carry a `#branch:folder` suffix and a `.git` ending.
fn github_repository(repo_url: &str) -> Option<(String, String)> {
    let url = url::Url::parse(repo_url).ok()?;
    if url.host_str()? != "github.com" {
        return None;
    }

    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?.trim_end_matches(".git");
    if repo.is_empty() {
        return None;
    }

    let path = format!("{}/{}", owner, repo);
    Some((format!("https://github.com/{}", path), path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_repository() {
        assert_eq!(
            github_repository("https://github.com/apify/crawlee.git#master:packages/core"),
            Some((
                "https://github.com/apify/crawlee".to_string(),
                "apify/crawlee".to_string()
            ))
        );
        assert_eq!(
            github_repository("https://github.com/owner/repo/"),
            Some(("https://github.com/owner/repo".to_string(), "owner/repo".to_string()))
        );
    }

    #[test]
    fn test_github_repository_rejects_other_hosts() {
        assert_eq!(github_repository("https://gitlab.com/owner/repo"), None);
        assert_eq!(github_repository("https://github.com/owner"), None);
        assert_eq!(github_repository("not a url"), None);
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = ApifyClient::new(
            &PlatformConfig::default(),
            SecretString::from("apify_api_secret".to_string()),
        )
        .unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("apify_api_secret"));
        assert_eq!(client.url("/store"), "https://api.apify.com/v2/store");
    }

    #[test]
    fn test_envelope_parsing() {
        let page: DataEnvelope<ListPage<StoreItem>> = serde_json::from_value(serde_json::json!({
            "data": {"total": 1, "items": [{"name": "maps", "username": "compass"}]}
        }))
        .unwrap();
        assert_eq!(page.data.items[0].username, "compass");
    }

    /// Serve one canned HTTP response and hand back the request line
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            request.lines().next().unwrap_or_default().to_string()
        });
        (base, handle)
    }

    fn client_for(api_base: String) -> ApifyClient {
        let config = PlatformConfig {
            api_base,
            ..PlatformConfig::default()
        };
        ApifyClient::new(&config, SecretString::from("token".to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_get_record_returns_raw_json() {
        let (base, server) =
            serve_once("200 OK", r#"{"actorName": "owner/pkg", "pedantic": false}"#).await;

        let record = client_for(base).get_record("store-1", "INPUT").await.unwrap();
        assert_eq!(
            record,
            Some(serde_json::json!({"actorName": "owner/pkg", "pedantic": false}))
        );
        assert_eq!(
            server.await.unwrap(),
            "GET /v2/key-value-stores/store-1/records/INPUT HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_missing_record_is_none() {
        let (base, _server) = serve_once("404 Not Found", "{}").await;
        let record = client_for(base).get_record("store-1", "INPUT").await.unwrap();
        assert_eq!(record, None);
    }
}
