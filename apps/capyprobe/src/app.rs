//! Wires the configured transport, fault policy and payload into a load run.

use std::sync::Arc;

use anyhow::Context;
use capyprobe_load::{LoadHarness, LoadReport, RandomInterruptions};
use capyprobe_transfer::{PayloadSource, ensure_payload_file};
use capyprobe_upload_api::HttpTransport;

use crate::config::Config;

/// Prepares the payload and runs every simulated user to completion.
pub async fn run(config: Config) -> anyhow::Result<LoadReport> {
    let payload = prepare_payload(&config).await?;

    let endpoint = config.endpoint();
    let transport = HttpTransport::new(&endpoint, &config.token, config.request_timeout())
        .context("building upload client")?;
    let faults = RandomInterruptions::new(config.interruption_probability);

    tracing::info!(
        endpoint = %endpoint,
        users = config.num_users,
        interruption_probability = faults.probability(),
        "starting resumable upload test"
    );

    let harness = LoadHarness::new(
        config.harness_config(),
        Arc::new(transport),
        Arc::new(faults),
        payload,
    );
    Ok(harness.run().await)
}

/// Generates the payload file if needed and opens it for chunked reads.
async fn prepare_payload(config: &Config) -> anyhow::Result<PayloadSource> {
    let path = config.payload_path.clone();
    let size = config.payload_size;
    let payload = tokio::task::spawn_blocking(move || {
        ensure_payload_file(&path, size)?;
        PayloadSource::from_file(&path)
    })
    .await
    .context("payload preparation task failed")?
    .with_context(|| format!("preparing payload {}", config.payload_path.display()))?;

    tracing::info!(
        path = %config.payload_path.display(),
        bytes = payload.len(),
        "payload ready"
    );
    Ok(payload)
}
