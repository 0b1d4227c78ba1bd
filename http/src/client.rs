use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use vpm_index_core::hosting::{
    Asset, Contributor, HostingApi, Languages, Release, RepoId, RepositoryProfile, WeeklyCommits,
};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT_VALUE: &str = "VPM-Builder";
const API_ACCEPT: &str = "application/vnd.github.v3+json";
const RAW_ACCEPT: &str = "application/octet-stream";
const CONTRIBUTORS_PAGE_SIZE: u32 = 10;

/// GitHub REST client. Every request carries the bearer token when one is
/// configured.
pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn request(&self, url: &str) -> RequestBuilder {
        let request = self.client.get(url);
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    fn repo_url(&self, repo: &RepoId, path: &str) -> String {
        format!("{}/repos/{}/{}{}", self.base_url, repo.owner, repo.name, path)
    }

    /// GET an API endpoint. Non-success and `204 No Content` yield `None`.
    async fn get_api(&self, url: &str) -> Result<Option<Response>> {
        let response = self
            .request(url)
            .header(ACCEPT, API_ACCEPT)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() || status == StatusCode::NO_CONTENT {
            debug!("{} returned HTTP {}", url, status);
            return Ok(None);
        }
        Ok(Some(response))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        match self.get_api(url).await? {
            Some(response) => response
                .json()
                .await
                .map(Some)
                .with_context(|| format!("Invalid response from {}", url)),
            None => Ok(None),
        }
    }

    /// Like `get_json`, but an undecodable body also degrades to `None`.
    async fn get_json_lenient<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let Some(response) = self.get_api(url).await? else {
            return Ok(None);
        };
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read response from {}", url))?;
        Ok(serde_json::from_slice(&bytes).ok())
    }

    async fn get_bytes(&self, request: RequestBuilder, url: &str) -> Result<Option<Vec<u8>>> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        if !response.status().is_success() {
            debug!("{} returned HTTP {}", url, response.status());
            return Ok(None);
        }

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;
        Ok(Some(bytes.to_vec()))
    }
}

#[async_trait]
impl HostingApi for GitHubClient {
    async fn repository(&self, repo: &RepoId) -> Result<Option<RepositoryProfile>> {
        let profile: Option<RepositoryProfile> = self.get_json(&self.repo_url(repo, "")).await?;
        if profile.is_none() {
            warn!("Failed to fetch repo info for {}", repo);
        }
        Ok(profile)
    }

    async fn releases(&self, repo: &RepoId) -> Result<Vec<Release>> {
        let releases: Option<Vec<Release>> =
            self.get_json(&self.repo_url(repo, "/releases")).await?;
        if releases.is_none() {
            warn!("Failed to fetch releases for {}", repo);
        }
        Ok(releases.unwrap_or_default())
    }

    async fn languages(&self, repo: &RepoId) -> Result<Languages> {
        Ok(self
            .get_json_lenient(&self.repo_url(repo, "/languages"))
            .await?
            .unwrap_or_default())
    }

    async fn contributors(&self, repo: &RepoId) -> Result<Vec<Contributor>> {
        let path = format!("/contributors?per_page={}", CONTRIBUTORS_PAGE_SIZE);
        Ok(self
            .get_json_lenient(&self.repo_url(repo, &path))
            .await?
            .unwrap_or_default())
    }

    async fn commit_activity(&self, repo: &RepoId) -> Result<Vec<WeeklyCommits>> {
        // 202 Accepted with `{}` while GitHub is still computing statistics
        Ok(self
            .get_json_lenient(&self.repo_url(repo, "/stats/commit_activity"))
            .await?
            .unwrap_or_default())
    }

    async fn asset_content(&self, asset: &Asset) -> Result<Option<Vec<u8>>> {
        let request = self.request(&asset.url).header(ACCEPT, RAW_ACCEPT);
        self.get_bytes(request, &asset.url).await
    }

    async fn download(&self, url: &str) -> Result<Option<Vec<u8>>> {
        self.get_bytes(self.request(url), url).await
    }
}
