//! Single-blob commands: get, put, delete, stat and url.

use anyhow::{Context, Result};
use blob_bridge_core::{create_backend_from_url, Error};
use futures::{StreamExt, TryStreamExt};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::info;

use super::OutputFormat;

pub async fn get(target: &str, key: &str, output: Option<&str>) -> Result<()> {
    let storage = create_backend_from_url(target)?;
    let mut blob = storage.get_stream(key).await?;

    let mut written: u64 = 0;
    match output {
        Some(path) => {
            let mut file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create {}", path))?;
            while let Some(chunk) = blob.stream.try_next().await? {
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            info!("Wrote {} ({} bytes) to {}", key, written, path);
        }
        None => {
            let mut stdout = tokio::io::stdout();
            while let Some(chunk) = blob.stream.try_next().await? {
                stdout.write_all(&chunk).await?;
            }
            stdout.flush().await?;
        }
    }

    Ok(())
}

pub async fn put(target: &str, key: &str, file: &str, content_type: Option<&str>) -> Result<()> {
    let storage = create_backend_from_url(target)?;

    let handle = tokio::fs::File::open(file)
        .await
        .with_context(|| format!("Failed to open {}", file))?;
    let length = handle.metadata().await?.len();
    let stream = ReaderStream::new(handle).map_err(Error::from).boxed();

    storage
        .write_stream(key, content_type.unwrap_or_default(), length, stream)
        .await?;

    println!("Uploaded {} ({} bytes) to {}", key, length, storage.generate_url(key));
    Ok(())
}

pub async fn delete(target: &str, key: &str) -> Result<()> {
    let storage = create_backend_from_url(target)?;
    storage.delete(key).await?;
    println!("Deleted {}", key);
    Ok(())
}

pub async fn stat(target: &str, key: &str, format: OutputFormat) -> Result<()> {
    let storage = create_backend_from_url(target)?;
    let meta = storage.get_metadata(key).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&meta)?);
        }
        OutputFormat::Text => {
            println!("Key:           {}", meta.key);
            println!("Folder:        {}", meta.is_folder);
            println!("Size:          {} bytes", meta.content_length);
            if !meta.content_type.is_empty() {
                println!("Content type:  {}", meta.content_type);
            }
            if let Some(etag) = &meta.etag {
                println!("ETag:          {}", etag);
            }
            if let Some(created) = meta.created_utc {
                println!("Created:       {}", created);
            }
            if let Some(modified) = meta.last_update_utc {
                println!("Last modified: {}", modified);
            }
            if let Some(accessed) = meta.last_access_utc {
                println!("Last accessed: {}", accessed);
            }
        }
    }

    Ok(())
}

pub fn url(target: &str, key: &str) -> Result<()> {
    let storage = create_backend_from_url(target)?;
    println!("{}", storage.generate_url(key));
    Ok(())
}
