//! capyprobe entry point.

mod app;
mod config;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting capyprobe");

    let config = config::Config::load()?;
    tracing::info!(
        base_url = %config.base_url,
        users = config.num_users,
        chunk_size = config.chunk_size,
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(app::run(config))?;

    println!("{report}");
    Ok(())
}
