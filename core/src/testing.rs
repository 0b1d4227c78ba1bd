//! In-memory hosting API for unit tests.

use crate::hosting::{
    Asset, Contributor, HostingApi, Languages, Release, RepoId, RepositoryProfile, WeeklyCommits,
};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeApi {
    pub profiles: HashMap<String, RepositoryProfile>,
    pub releases: HashMap<String, Vec<Release>>,
    pub languages: HashMap<String, Languages>,
    pub contributors: HashMap<String, Vec<Contributor>>,
    pub activity: HashMap<String, Vec<WeeklyCommits>>,
    /// Content keyed by asset API URL or download URL.
    pub files: HashMap<String, Vec<u8>>,
    /// URLs whose fetch fails at the transport level.
    pub broken: Vec<String>,
    pub downloads: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_releases(mut self, repo: &str, releases: Vec<Release>) -> Self {
        self.releases.insert(repo.to_string(), releases);
        self
    }

    pub fn with_profile(mut self, repo: &str, profile: RepositoryProfile) -> Self {
        self.profiles.insert(repo.to_string(), profile);
        self
    }

    pub fn with_file(mut self, url: &str, data: &[u8]) -> Self {
        self.files.insert(url.to_string(), data.to_vec());
        self
    }

    fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>> {
        if self.broken.iter().any(|b| b == url) {
            bail!("connection reset fetching {}", url);
        }
        self.downloads.lock().unwrap().push(url.to_string());
        Ok(self.files.get(url).cloned())
    }
}

#[async_trait]
impl HostingApi for FakeApi {
    async fn repository(&self, repo: &RepoId) -> Result<Option<RepositoryProfile>> {
        Ok(self.profiles.get(&repo.to_string()).cloned())
    }

    async fn releases(&self, repo: &RepoId) -> Result<Vec<Release>> {
        Ok(self.releases.get(&repo.to_string()).cloned().unwrap_or_default())
    }

    async fn languages(&self, repo: &RepoId) -> Result<Languages> {
        Ok(self.languages.get(&repo.to_string()).cloned().unwrap_or_default())
    }

    async fn contributors(&self, repo: &RepoId) -> Result<Vec<Contributor>> {
        Ok(self.contributors.get(&repo.to_string()).cloned().unwrap_or_default())
    }

    async fn commit_activity(&self, repo: &RepoId) -> Result<Vec<WeeklyCommits>> {
        Ok(self.activity.get(&repo.to_string()).cloned().unwrap_or_default())
    }

    async fn asset_content(&self, asset: &Asset) -> Result<Option<Vec<u8>>> {
        self.fetch(&asset.url)
    }

    async fn download(&self, url: &str) -> Result<Option<Vec<u8>>> {
        self.fetch(url)
    }
}

pub fn asset(name: &str, id: u32) -> Asset {
    Asset {
        name: name.to_string(),
        url: format!("https://api.example/assets/{id}"),
        browser_download_url: format!("https://dl.example/{id}/{name}"),
    }
}

pub fn release(tag: &str, assets: Vec<Asset>) -> Release {
    Release {
        tag_name: tag.to_string(),
        draft: false,
        prerelease: false,
        body: Some(format!("Release {tag}\nDetails")),
        assets,
    }
}
