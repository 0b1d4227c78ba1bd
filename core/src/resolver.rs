//! Release resolution: decide whether a release is installable and which
//! package descriptor it publishes.

use crate::descriptor::{PackageDescriptor, PackageManifest};
use crate::hosting::{Asset, HostingApi, Release, RepoId};
use anyhow::Result;
use std::fmt;

/// Reserved name of the manifest asset.
pub const MANIFEST_ASSET: &str = "package.json";
/// Extension identifying the installable archive.
pub const ARCHIVE_EXTENSION: &str = ".zip";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Draft,
    Prerelease,
    NoArchive,
    InvalidPackage,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::Draft => "draft release",
            SkipReason::Prerelease => "prerelease",
            SkipReason::NoArchive => "no zip asset",
            SkipReason::InvalidPackage => "invalid package data",
        };
        f.write_str(reason)
    }
}

/// Outcome of resolving one release.
#[derive(Debug)]
pub enum Resolution<'r> {
    Skipped(SkipReason),
    Resolved {
        descriptor: PackageDescriptor,
        archive: &'r Asset,
    },
}

pub fn find_archive(release: &Release) -> Option<&Asset> {
    release
        .assets
        .iter()
        .find(|a| a.name.ends_with(ARCHIVE_EXTENSION))
}

pub fn find_manifest(release: &Release) -> Option<&Asset> {
    release.assets.iter().find(|a| a.name == MANIFEST_ASSET)
}

/// Fetch and parse a manifest asset. Refused downloads and malformed
/// content both count as absent.
async fn fetch_manifest<A: HostingApi + ?Sized>(
    api: &A,
    asset: &Asset,
) -> Result<Option<PackageManifest>> {
    Ok(api
        .asset_content(asset)
        .await?
        .and_then(|bytes| PackageManifest::parse(&bytes)))
}

/// Resolve a release to a descriptor and its archive asset.
pub async fn resolve_release<'r, A: HostingApi + ?Sized>(
    api: &A,
    repo: &RepoId,
    release: &'r Release,
) -> Result<Resolution<'r>> {
    if release.draft {
        return Ok(Resolution::Skipped(SkipReason::Draft));
    }
    if release.prerelease {
        return Ok(Resolution::Skipped(SkipReason::Prerelease));
    }

    let Some(archive) = find_archive(release) else {
        return Ok(Resolution::Skipped(SkipReason::NoArchive));
    };

    let manifest = match find_manifest(release) {
        Some(asset) => fetch_manifest(api, asset).await?,
        None => None,
    };
    let manifest = manifest.unwrap_or_else(|| PackageManifest::fallback(repo, release));

    Ok(match manifest.into_descriptor() {
        Some(descriptor) => Resolution::Resolved {
            descriptor,
            archive,
        },
        None => Resolution::Skipped(SkipReason::InvalidPackage),
    })
}
