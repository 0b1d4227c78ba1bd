use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vpm_index_core::{FeedConfig, IndexStorage};
use vpm_index_http::{GitHubClient, DEFAULT_API_URL};

/// Build a VPM package index from GitHub releases.
#[derive(Debug, Parser)]
#[command(name = "vpm-index", version, about)]
struct Cli {
    /// Source configuration with a `vpm` section
    #[arg(short, long, default_value = "source.json")]
    config: PathBuf,

    /// Where to write the generated index
    #[arg(short, long, default_value = "out/vpm.json")]
    output: PathBuf,

    /// GitHub REST API base URL
    #[arg(long, env = "VPM_GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Token sent as a bearer credential; raises the API rate limit
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("Building VPM index.json");
    info!("Config: {}", cli.config.display());

    let feed = FeedConfig::load(&cli.config).await?;
    let client = GitHubClient::new(&cli.api_url, cli.token)?;
    if !client.has_token() {
        info!("GITHUB_TOKEN not set, using unauthenticated rate limits");
    }

    let storage = IndexStorage::new(cli.output);
    let summary = vpm_index_core::run(&client, &feed, &storage).await?;

    println!(
        "{}: {} packages, {} versions",
        storage.path().display(),
        summary.packages,
        summary.versions
    );

    Ok(())
}
