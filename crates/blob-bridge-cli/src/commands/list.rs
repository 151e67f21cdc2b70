use anyhow::Result;
use blob_bridge_core::storage::list_all;
use blob_bridge_core::{create_backend_from_url, BlobMetadata, EnumerationFilter, EnumerationResult};
use tracing::info;

use super::OutputFormat;

pub async fn run(
    target: &str,
    prefix: Option<&str>,
    suffix: Option<&str>,
    token: Option<&str>,
    all: bool,
    format: OutputFormat,
) -> Result<()> {
    let storage = create_backend_from_url(target)?;
    let filter = EnumerationFilter::new()
        .with_prefix(prefix.unwrap_or_default())
        .with_suffix(suffix.unwrap_or_default());

    info!("Listing {}", target);
    let page = if all {
        EnumerationResult::new(list_all(storage.as_ref(), &filter).await?, None)
    } else {
        storage.enumerate(&filter, token).await?
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        OutputFormat::Text => {
            if page.blobs.is_empty() {
                println!("No blobs found in {}", target);
            }
            for blob in &page.blobs {
                println!("{}", format_line(blob));
            }
            println!();
            println!("{} blobs, {} bytes", page.count(), page.bytes());
            if let Some(next) = &page.next_continuation_token {
                println!("Next page: --token {}", next);
            }
        }
    }

    Ok(())
}

fn format_line(blob: &BlobMetadata) -> String {
    let modified = blob
        .last_update_utc
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    let kind = if blob.is_folder { "dir" } else { "obj" };
    format!(
        "{:<3} {:>12} {:<19} {}",
        kind, blob.content_length, modified, blob.key
    )
}
