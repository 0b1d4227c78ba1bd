use crate::hosting::HostingApi;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use tracing::debug;

/// Hex-encoded message digests of a release archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveDigests {
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
    pub sha512: String,
}

impl ArchiveDigests {
    pub fn compute(data: &[u8]) -> Self {
        Self {
            md5: hex::encode(Md5::digest(data)),
            sha1: hex::encode(Sha1::digest(data)),
            sha256: hex::encode(Sha256::digest(data)),
            sha512: hex::encode(Sha512::digest(data)),
        }
    }
}

/// Download an archive and digest it.
///
/// Any failure yields `None`; the caller records the version without digests.
pub async fn fetch_archive_digests<A: HostingApi + ?Sized>(
    api: &A,
    url: &str,
) -> Option<ArchiveDigests> {
    match api.download(url).await {
        Ok(Some(data)) => Some(ArchiveDigests::compute(&data)),
        Ok(None) => {
            debug!("Archive download refused: {}", url);
            None
        }
        Err(e) => {
            debug!("Archive download failed for {}: {:#}", url, e);
            None
        }
    }
}
