//! Build orchestration: repositories are processed one at a time, with the
//! five repository reads issued concurrently.

use crate::config::FeedConfig;
use crate::digest::fetch_archive_digests;
use crate::hosting::{HostingApi, RepoId};
use crate::index::{BuildSummary, FeedIndex, PackageSet, RepositoryDetails, VersionEntry};
use crate::resolver::{resolve_release, Resolution};
use crate::storage::IndexStorage;
use anyhow::{Context, Result};
use tracing::{debug, info, warn};

/// Process one repository, recording its versions into `packages`.
///
/// Returns the last package name resolved for the repository, which is the
/// package that receives the repository details.
pub async fn process_repository<A: HostingApi + ?Sized>(
    api: &A,
    repo: &RepoId,
    packages: &mut PackageSet,
) -> Result<Option<String>> {
    info!("Processing {}...", repo);

    let (profile, releases, languages, contributors, commit_activity) = tokio::join!(
        api.repository(repo),
        api.releases(repo),
        api.languages(repo),
        api.contributors(repo),
        api.commit_activity(repo),
    );
    let profile = profile.with_context(|| format!("Failed to fetch repository {}", repo))?;
    let releases = releases.with_context(|| format!("Failed to fetch releases for {}", repo))?;
    let languages = languages.with_context(|| format!("Failed to fetch languages for {}", repo))?;
    let contributors =
        contributors.with_context(|| format!("Failed to fetch contributors for {}", repo))?;
    let commit_activity =
        commit_activity.with_context(|| format!("Failed to fetch commit activity for {}", repo))?;

    let mut current_package = None;

    for release in &releases {
        let (descriptor, archive) = match resolve_release(api, repo, release).await? {
            Resolution::Resolved {
                descriptor,
                archive,
            } => (descriptor, archive),
            Resolution::Skipped(reason) => {
                info!("  Skipping {}: {}", release.tag_name, reason);
                continue;
            }
        };

        let digests = fetch_archive_digests(api, &archive.browser_download_url).await;
        let hashed = digests.is_some();
        let name = descriptor.name.clone();
        let version = descriptor.version.clone();

        if packages.insert_version(VersionEntry::new(
            descriptor,
            archive.browser_download_url.as_str(),
            digests,
        )) {
            info!(
                "  Added {}@{}{}",
                name,
                version,
                if hashed { " (hashed)" } else { "" }
            );
        } else {
            warn!(
                "  Ignoring {}: {}@{} already recorded",
                release.tag_name, name, version
            );
        }

        current_package = Some(name);
    }

    match (&current_package, profile) {
        (Some(name), Some(profile)) => {
            let details = RepositoryDetails::new(profile, languages, contributors, commit_activity);
            if !packages.attach_repository(name, details) {
                debug!("{} already carries repository details", name);
            }
        }
        (Some(name), None) => {
            warn!("No repository profile for {}, {} left without details", repo, name);
        }
        (None, _) => {}
    }

    Ok(current_package)
}

/// Build the package set for every configured repository.
pub async fn build_packages<A: HostingApi + ?Sized>(
    api: &A,
    repos: &[RepoId],
) -> Result<PackageSet> {
    let mut packages = PackageSet::new();
    for repo in repos {
        process_repository(api, repo, &mut packages).await?;
    }
    Ok(packages)
}

/// Build the full feed index from configuration.
pub async fn build_index<A: HostingApi + ?Sized>(api: &A, feed: &FeedConfig) -> Result<FeedIndex> {
    let packages = build_packages(api, &feed.github_repos).await?;
    Ok(FeedIndex::new(feed, packages))
}

/// Build the feed and write it to `storage`.
pub async fn run<A: HostingApi + ?Sized>(
    api: &A,
    feed: &FeedConfig,
    storage: &IndexStorage,
) -> Result<BuildSummary> {
    info!("Building VPM index for {} repositories", feed.github_repos.len());

    let index = build_index(api, feed).await?;
    storage.save_index(&index).await?;

    let summary = BuildSummary::from(&index.packages);
    for (name, package) in index.packages.iter() {
        debug!(
            "{}: {} versions, latest {}",
            name,
            package.versions.len(),
            package.latest_version().unwrap_or("-")
        );
    }
    info!("Generated {}", storage.path().display());
    info!("Total packages: {}", summary.packages);
    info!("Total versions: {}", summary.versions);

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::ArchiveDigests;
    use crate::hosting::{RepositoryProfile, WeeklyCommits};
    use crate::testing::{asset, release, FakeApi};

    const MANIFEST: &[u8] =
        br#"{"name":"com.example.pkg","displayName":"Example","version":"1.2.3","unity":"2022.3"}"#;

    fn repo() -> RepoId {
        RepoId::new("alice", "tool")
    }

    fn profile() -> RepositoryProfile {
        RepositoryProfile {
            name: "tool".into(),
            full_name: "alice/tool".into(),
            html_url: "https://github.com/alice/tool".into(),
            default_branch: "main".into(),
            ..Default::default()
        }
    }

    fn api_with_two_versions() -> FakeApi {
        FakeApi::new()
            .with_releases(
                "alice/tool",
                vec![
                    release("v1.1.0", vec![asset("tool-1.1.0.zip", 11)]),
                    release("v1.0.0", vec![asset("tool-1.0.0.zip", 10)]),
                ],
            )
            .with_file("https://dl.example/11/tool-1.1.0.zip", b"zip 1.1.0")
            .with_file("https://dl.example/10/tool-1.0.0.zip", b"zip 1.0.0")
    }

    #[tokio::test]
    async fn test_versions_of_one_repository_share_a_package() {
        let api = api_with_two_versions().with_profile("alice/tool", profile());
        let mut packages = PackageSet::new();
        let current = process_repository(&api, &repo(), &mut packages).await.unwrap();

        assert_eq!(current.as_deref(), Some("com.alice.tool"));
        let pkg = packages.get("com.alice.tool").unwrap();
        assert_eq!(pkg.versions.len(), 2);
        assert_eq!(
            pkg.versions["1.0.0"].hash,
            Some(ArchiveDigests::compute(b"zip 1.0.0"))
        );
        assert_eq!(pkg.repository.as_ref().unwrap().full_name, "alice/tool");
    }

    #[tokio::test]
    async fn test_missing_profile_still_records_versions() {
        let api = api_with_two_versions();
        let mut packages = PackageSet::new();
        process_repository(&api, &repo(), &mut packages).await.unwrap();

        let pkg = packages.get("com.alice.tool").unwrap();
        assert_eq!(pkg.versions.len(), 2);
        assert!(pkg.repository.is_none());
    }

    #[tokio::test]
    async fn test_failed_download_keeps_entry_without_digests() {
        let mut api = FakeApi::new().with_releases(
            "alice/tool",
            vec![
                release("v1.0.0", vec![asset("tool.zip", 1)]),
                release("v0.9.0", vec![asset("tool.zip", 2)]),
            ],
        );
        api.broken.push("https://dl.example/2/tool.zip".into());

        let mut packages = PackageSet::new();
        process_repository(&api, &repo(), &mut packages).await.unwrap();

        let pkg = packages.get("com.alice.tool").unwrap();
        for version in ["1.0.0", "0.9.0"] {
            let entry = &pkg.versions[version];
            assert!(entry.hash.is_none());
            assert!(entry.zip_sha256.is_none());
        }
    }

    #[tokio::test]
    async fn test_skipped_releases_produce_nothing() {
        let mut draft = release("v3.0.0", vec![asset("tool.zip", 3)]);
        draft.draft = true;
        let mut pre = release("v2.0.0-beta", vec![asset("tool.zip", 2)]);
        pre.prerelease = true;
        let no_zip = release("v1.0.0", vec![asset("tool.unitypackage", 1)]);

        let api = FakeApi::new()
            .with_releases("alice/tool", vec![draft, pre, no_zip])
            .with_profile("alice/tool", profile());
        let mut packages = PackageSet::new();
        let current = process_repository(&api, &repo(), &mut packages).await.unwrap();

        assert!(current.is_none());
        assert_eq!(packages.package_count(), 0);
        assert!(api.downloads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_details_attach_to_last_resolved_package() {
        let api = FakeApi::new()
            .with_releases(
                "alice/tool",
                vec![
                    release("v2.0.0", vec![asset("tool.zip", 2)]),
                    release("v1.0.0", vec![asset("tool.zip", 1), asset("package.json", 9)]),
                ],
            )
            .with_file("https://api.example/assets/9", MANIFEST)
            .with_profile("alice/tool", profile());

        let mut packages = PackageSet::new();
        let current = process_repository(&api, &repo(), &mut packages).await.unwrap();

        assert_eq!(current.as_deref(), Some("com.example.pkg"));
        assert!(packages.get("com.alice.tool").unwrap().repository.is_none());
        assert!(packages.get("com.example.pkg").unwrap().repository.is_some());
    }

    #[tokio::test]
    async fn test_repositories_merge_shared_package_names() {
        let api = FakeApi::new()
            .with_releases(
                "alice/tool",
                vec![release("v1.0.0", vec![asset("tool.zip", 1), asset("package.json", 9)])],
            )
            .with_releases(
                "bob/fork",
                vec![release("v1.0.0", vec![asset("fork.zip", 2), asset("package.json", 8)])],
            )
            .with_file("https://api.example/assets/9", MANIFEST)
            .with_file(
                "https://api.example/assets/8",
                br#"{"name":"com.example.pkg","version":"1.3.0"}"#,
            );

        let repos = vec![RepoId::new("alice", "tool"), RepoId::new("bob", "fork")];
        let packages = build_packages(&api, &repos).await.unwrap();

        assert_eq!(packages.package_count(), 1);
        let pkg = packages.get("com.example.pkg").unwrap();
        assert_eq!(pkg.versions.keys().collect::<Vec<_>>(), ["1.2.3", "1.3.0"]);
    }

    #[tokio::test]
    async fn test_rebuild_is_identical() {
        let mut api = api_with_two_versions().with_profile("alice/tool", profile());
        api.activity.insert(
            "alice/tool".into(),
            vec![WeeklyCommits { week: 1_700_000_000, total: 4 }],
        );
        let feed = FeedConfig {
            name: "Alice Packages".into(),
            id: "com.alice.vpm".into(),
            url: "https://alice.example/vpm.json".into(),
            author: "Alice".into(),
            github_repos: vec![repo()],
        };

        let first = serde_json::to_string_pretty(&build_index(&api, &feed).await.unwrap()).unwrap();
        let second = serde_json::to_string_pretty(&build_index(&api, &feed).await.unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_run_writes_index_and_reports_counts() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = IndexStorage::new(tmp.path().join("out").join("vpm.json"));
        let api = api_with_two_versions();
        let feed = FeedConfig {
            name: "Alice Packages".into(),
            id: "com.alice.vpm".into(),
            url: "https://alice.example/vpm.json".into(),
            author: "Alice".into(),
            github_repos: vec![repo()],
        };

        let summary = run(&api, &feed, &storage).await.unwrap();
        assert_eq!(summary, BuildSummary { packages: 1, versions: 2 });

        let data = tokio::fs::read_to_string(storage.path()).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&data).unwrap();
        assert_eq!(
            json["packages"]["com.alice.tool"]["versions"]["1.1.0"]["url"],
            "https://dl.example/11/tool-1.1.0.zip"
        );
    }
}
