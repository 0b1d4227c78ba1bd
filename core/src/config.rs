//! Feed configuration, read from the `vpm` section of `source.json`.

use crate::hosting::RepoId;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Feed identity and the repositories to scan.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedConfig {
    pub name: String,
    pub id: String,
    pub url: String,
    pub author: String,
    #[serde(default)]
    pub github_repos: Vec<RepoId>,
}

#[derive(Deserialize)]
struct SourceFile {
    vpm: FeedConfig,
}

impl FeedConfig {
    /// Parse a source document. Keys other than `vpm` are front-end
    /// settings and are ignored.
    pub fn from_json(data: &str) -> Result<Self> {
        let source: SourceFile =
            serde_json::from_str(data).context("Failed to parse source config")?;
        Ok(source.vpm)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&data).with_context(|| format!("Invalid config {}", path.display()))
    }
}
