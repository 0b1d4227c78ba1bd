//! Feed index model and the package accumulator.

use crate::config::FeedConfig;
use crate::descriptor::PackageDescriptor;
use crate::digest::ArchiveDigests;
use crate::hosting::{Contributor, Languages, RepositoryProfile, WeeklyCommits};
use serde::Serialize;
use std::collections::BTreeMap;

/// Field names written by the builder on every version entry.
const COMPUTED_FIELDS: [&str; 3] = ["url", "zipSHA256", "hash"];

/// One installable version of a package.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionEntry {
    #[serde(flatten)]
    pub descriptor: PackageDescriptor,
    pub url: String,
    #[serde(rename = "zipSHA256", skip_serializing_if = "Option::is_none")]
    pub zip_sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<ArchiveDigests>,
}

impl VersionEntry {
    /// Merge a descriptor with the archive URL and digests. Computed fields
    /// replace manifest fields of the same name.
    pub fn new(
        mut descriptor: PackageDescriptor,
        url: impl Into<String>,
        digests: Option<ArchiveDigests>,
    ) -> Self {
        for field in COMPUTED_FIELDS {
            descriptor.details.extra.remove(field);
        }
        Self {
            descriptor,
            url: url.into(),
            zip_sha256: digests.as_ref().map(|d| d.sha256.clone()),
            hash: digests,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnerInfo {
    pub login: Option<String>,
    pub avatar_url: Option<String>,
    pub url: Option<String>,
}

/// Repository-level fields published alongside a package's versions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositoryDetails {
    pub owner: OwnerInfo,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub url: String,
    pub clone_url: Option<String>,
    pub language: Option<String>,
    pub languages: Languages,
    pub size: u64,
    pub stars: u64,
    pub watchers: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub license: Option<String>,
    pub license_url: Option<String>,
    pub readme_url: String,
    pub changelog_url: String,
    pub topics: Vec<String>,
    pub default_branch: String,
    pub archived: bool,
    pub disabled: bool,
    pub has_issues: bool,
    pub has_wiki: bool,
    pub has_discussions: bool,
    pub contributors: Vec<Contributor>,
    pub commit_activity: Vec<WeeklyCommits>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    pub pushed_at: Option<i64>,
}

impl RepositoryDetails {
    pub fn new(
        profile: RepositoryProfile,
        languages: Languages,
        contributors: Vec<Contributor>,
        commit_activity: Vec<WeeklyCommits>,
    ) -> Self {
        let blob = |file: &str| {
            format!(
                "{}/blob/{}/{}",
                profile.html_url, profile.default_branch, file
            )
        };
        let license_url = profile.license.as_ref().map(|_| blob("LICENSE"));
        let readme_url = blob("README.md");
        let changelog_url = blob("CHANGELOG.md");
        let owner = profile.owner.unwrap_or_default();

        Self {
            owner: OwnerInfo {
                login: owner.login,
                avatar_url: owner.avatar_url,
                url: owner.html_url,
            },
            name: profile.name,
            full_name: profile.full_name,
            description: profile.description,
            url: profile.html_url,
            clone_url: profile.clone_url,
            language: profile.language,
            languages,
            size: profile.size,
            stars: profile.stargazers_count,
            watchers: profile.watchers_count,
            forks: profile.forks_count,
            open_issues: profile.open_issues_count,
            license: profile.license.and_then(|l| l.spdx_id),
            license_url,
            readme_url,
            changelog_url,
            topics: profile.topics,
            default_branch: profile.default_branch,
            archived: profile.archived,
            disabled: profile.disabled,
            has_issues: profile.has_issues,
            has_wiki: profile.has_wiki,
            has_discussions: profile.has_discussions,
            contributors,
            commit_activity,
            created_at: profile.created_at.map(|t| t.timestamp()),
            updated_at: profile.updated_at.map(|t| t.timestamp()),
            pushed_at: profile.pushed_at.map(|t| t.timestamp()),
        }
    }
}

/// All known versions of one package, plus optional repository details.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Package {
    #[serde(flatten)]
    pub repository: Option<RepositoryDetails>,
    pub versions: BTreeMap<String, VersionEntry>,
}

impl Package {
    /// Highest version by semver precedence, falling back to string order
    /// for versions that do not parse.
    pub fn latest_version(&self) -> Option<&str> {
        self.versions
            .keys()
            .map(String::as_str)
            .reduce(|best, v| if semver_greater(v, best) { v } else { best })
    }
}

/// Accumulator for packages discovered during a build.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PackageSet {
    packages: BTreeMap<String, Package>,
}

impl PackageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a version entry. Returns `false` if the package already has an
    /// entry for that version; the existing entry is kept.
    pub fn insert_version(&mut self, entry: VersionEntry) -> bool {
        let package = self
            .packages
            .entry(entry.descriptor.name.clone())
            .or_default();
        if package.versions.contains_key(&entry.descriptor.version) {
            return false;
        }
        package
            .versions
            .insert(entry.descriptor.version.clone(), entry);
        true
    }

    /// Attach repository details to a package unless it already carries some.
    pub fn attach_repository(&mut self, name: &str, details: RepositoryDetails) -> bool {
        match self.packages.get_mut(name) {
            Some(package) if package.repository.is_none() => {
                package.repository = Some(details);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Package)> {
        self.packages.iter()
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    pub fn version_count(&self) -> usize {
        self.packages.values().map(|p| p.versions.len()).sum()
    }
}

/// The published feed document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedIndex {
    pub name: String,
    pub id: String,
    pub url: String,
    pub author: String,
    pub packages: PackageSet,
}

impl FeedIndex {
    pub fn new(feed: &FeedConfig, packages: PackageSet) -> Self {
        Self {
            name: feed.name.clone(),
            id: feed.id.clone(),
            url: feed.url.clone(),
            author: feed.author.clone(),
            packages,
        }
    }
}

/// Counts reported at the end of a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    pub packages: usize,
    pub versions: usize,
}

impl From<&PackageSet> for BuildSummary {
    fn from(set: &PackageSet) -> Self {
        Self {
            packages: set.package_count(),
            versions: set.version_count(),
        }
    }
}

fn semver_greater(a: &str, b: &str) -> bool {
    match (semver::Version::parse(a), semver::Version::parse(b)) {
        (Ok(va), Ok(vb)) => va > vb,
        _ => a > b,
    }
}
