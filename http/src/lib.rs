//! GitHub REST implementation of the hosting API used by the index builder.

mod client;

pub use client::{GitHubClient, DEFAULT_API_URL};
