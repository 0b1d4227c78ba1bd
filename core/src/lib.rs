//! Core library for the VPM index builder.
//!
//! Resolves GitHub releases into VPM package versions, digests their
//! archives and assembles the feed document.

pub mod builder;
pub mod config;
pub mod descriptor;
pub mod digest;
pub mod hosting;
pub mod index;
pub mod resolver;
mod storage;

#[cfg(test)]
mod testing;

pub use builder::{build_index, build_packages, process_repository, run};
pub use config::FeedConfig;
pub use descriptor::{PackageDescriptor, PackageManifest};
pub use digest::ArchiveDigests;
pub use hosting::{HostingApi, RepoId};
pub use index::{BuildSummary, FeedIndex, PackageSet, VersionEntry};
pub use storage::IndexStorage;
