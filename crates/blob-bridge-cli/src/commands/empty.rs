use anyhow::{bail, Result};
use blob_bridge_core::{create_backend_from_url, empty};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn run(target: &str, yes: bool) -> Result<()> {
    if !yes {
        bail!(
            "Refusing to delete every blob in {} without --yes",
            target
        );
    }

    let storage = create_backend_from_url(target)?;
    info!("Emptying {}", target);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping drain");
            signal_cancel.cancel();
        }
    });

    let result = empty(storage.as_ref(), &cancel).await;
    println!(
        "Deleted {} blobs ({} bytes)",
        result.count(),
        result.bytes()
    );

    if let Some(e) = result.error {
        bail!("Empty failed: {}", e);
    }
    Ok(())
}
