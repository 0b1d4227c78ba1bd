//! Source-hosting API surface consumed by the builder.
//!
//! The wire types mirror the subset of the GitHub REST responses the builder
//! reads. [`HostingApi`] is the seam between the build logic and the network.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Repository identifier in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl FromStr for RepoId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(owner, name))
            }
            _ => bail!("invalid repository '{}', expected owner/name", s),
        }
    }
}

impl TryFrom<String> for RepoId {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A file attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub name: String,
    /// API URL; returns raw content when requested as `application/octet-stream`.
    pub url: String,
    pub browser_download_url: String,
}

/// One published release.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositoryOwner {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryLicense {
    #[serde(default)]
    pub spdx_id: Option<String>,
}

/// Repository profile as returned by `GET /repos/{owner}/{repo}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RepositoryProfile {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub clone_url: Option<String>,
    pub default_branch: String,
    pub language: Option<String>,
    pub license: Option<RepositoryLicense>,
    pub owner: Option<RepositoryOwner>,
    pub size: u64,
    pub stargazers_count: u64,
    pub watchers_count: u64,
    pub forks_count: u64,
    pub open_issues_count: u64,
    pub topics: Vec<String>,
    pub archived: bool,
    pub disabled: bool,
    pub has_issues: bool,
    pub has_wiki: bool,
    pub has_discussions: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
}

/// A repository contributor, reduced to what the feed publishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(rename(deserialize = "html_url", serialize = "url"), default)]
    pub url: Option<String>,
    #[serde(default)]
    pub contributions: u64,
}

/// Commits in one week, `week` being the unix timestamp of the week start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyCommits {
    pub week: i64,
    pub total: u64,
}

/// Language name to byte count.
pub type Languages = BTreeMap<String, u64>;

/// Read-only access to a source-hosting service.
///
/// Facet reads return an empty value (or `None`) when the service answers
/// with a non-success status. `Err` is reserved for transport failures and
/// undecodable responses.
#[async_trait]
pub trait HostingApi: Send + Sync {
    async fn repository(&self, repo: &RepoId) -> Result<Option<RepositoryProfile>>;

    async fn releases(&self, repo: &RepoId) -> Result<Vec<Release>>;

    async fn languages(&self, repo: &RepoId) -> Result<Languages>;

    async fn contributors(&self, repo: &RepoId) -> Result<Vec<Contributor>>;

    async fn commit_activity(&self, repo: &RepoId) -> Result<Vec<WeeklyCommits>>;

    /// Raw content of a release asset, `None` on a non-success status.
    async fn asset_content(&self, asset: &Asset) -> Result<Option<Vec<u8>>>;

    /// Full body of a direct download URL, `None` on a non-success status.
    async fn download(&self, url: &str) -> Result<Option<Vec<u8>>>;
}
