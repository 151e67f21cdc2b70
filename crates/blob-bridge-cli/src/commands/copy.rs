use anyhow::{bail, Context, Result};
use blob_bridge_core::{
    create_backend, instrument, BlobCopy, CopyJobConfig, EnumerationFilter, StorageBackendConfig,
    StorageMetrics,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Flags accepted by `copy` when no job file is given
pub struct CopyArgs {
    pub from: Option<String>,
    pub to: Option<String>,
    pub stop_after: i64,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub token: Option<String>,
}

/// A resolved copy job, from a file or from flags
pub struct CopyJob {
    config: CopyJobConfig,
}

impl CopyJob {
    pub fn from_file(path: &str, token: Option<String>) -> Result<Self> {
        info!("Loading copy job from: {}", path);
        let mut config = CopyJobConfig::from_file(path)?;
        if token.is_some() {
            config.continuation_token = token;
        }
        Ok(Self { config })
    }

    pub fn from_args(args: CopyArgs) -> Result<Self> {
        let from = args.from.context("--from is required without --config")?;
        let to = args.to.context("--to is required without --config")?;

        let filter = if args.prefix.is_some()
            || args.suffix.is_some()
            || args.min_size.is_some()
            || args.max_size.is_some()
        {
            let defaults = EnumerationFilter::default();
            let filter = EnumerationFilter::new()
                .with_prefix(args.prefix.unwrap_or_default())
                .with_suffix(args.suffix.unwrap_or_default())
                .with_size_range(
                    args.min_size.unwrap_or(defaults.minimum_size),
                    args.max_size.unwrap_or(defaults.maximum_size),
                )?;
            Some(filter)
        } else {
            None
        };

        let config = CopyJobConfig {
            source: StorageBackendConfig::from_url(&from)?,
            destination: StorageBackendConfig::from_url(&to)?,
            stop_after: args.stop_after,
            filter,
            continuation_token: args.token,
        };
        config.validate()?;
        Ok(Self { config })
    }
}

pub async fn run(job: CopyJob, show_metrics: bool) -> Result<()> {
    let config = job.config;
    let metrics = Arc::new(StorageMetrics::new());

    let mut source = create_backend(&config.source)?;
    let mut destination = create_backend(&config.destination)?;
    let source_name = source.name().to_string();
    let destination_name = destination.name().to_string();
    if show_metrics {
        source = instrument(source, metrics.clone());
        destination = instrument(destination, metrics.clone());
    }

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current blob");
            signal_cancel.cancel();
        }
    });

    let mut copy = BlobCopy::new(source, destination).with_logger(|line| println!("{}", line));
    if let Some(token) = &config.continuation_token {
        copy = copy.with_continuation_token(token.clone());
    }

    let stats = copy
        .start(config.stop_after, config.filter.clone(), &cancel)
        .await?;
    metrics.record_copy(&source_name, &destination_name, &stats);

    println!();
    println!("Blobs enumerated: {} ({} bytes)", stats.blobs_enumerated, stats.bytes_enumerated);
    println!("Blobs read:       {} ({} bytes)", stats.blobs_read, stats.bytes_read);
    println!("Blobs written:    {} ({} bytes)", stats.blobs_written, stats.bytes_written);
    if let Some(duration) = stats.time.duration() {
        println!("Duration:         {} ms", duration.num_milliseconds());
    }
    if let Some(token) = &stats.continuation_token {
        println!("Resume with:      --token {}", token);
    }
    if show_metrics {
        println!();
        print!("{}", metrics.encode());
    }

    if !stats.success {
        match &stats.error {
            Some(e) => bail!("Copy failed: {}", e),
            None => bail!("Copy failed"),
        }
    }
    Ok(())
}
