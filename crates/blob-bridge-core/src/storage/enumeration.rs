//! Lazy enumeration over the paged continuation protocol.

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

use super::StorageClient;
use crate::model::{BlobMetadata, EnumerationFilter};
use crate::Result;

enum Cursor {
    Start(Option<String>),
    Next(String),
    Done,
}

type PageItems = stream::Iter<std::vec::IntoIter<Result<BlobMetadata>>>;

/// Stream every item matching `filter`, fetching pages on demand.
///
/// Pages are requested one at a time; dropping the stream stops the walk.
/// Restarting means calling again with a token from a previous page.
pub fn enumerate_all<'a>(
    client: &'a dyn StorageClient,
    filter: EnumerationFilter,
    continuation_token: Option<String>,
) -> BoxStream<'a, Result<BlobMetadata>> {
    stream::try_unfold(
        (Cursor::Start(continuation_token), filter),
        move |(cursor, filter)| next_page(client, cursor, filter),
    )
    .try_flatten()
    .boxed()
}

async fn next_page(
    client: &dyn StorageClient,
    cursor: Cursor,
    filter: EnumerationFilter,
) -> Result<Option<(PageItems, (Cursor, EnumerationFilter))>> {
    let token = match cursor {
        Cursor::Start(token) => token,
        Cursor::Next(token) => Some(token),
        Cursor::Done => return Ok(None),
    };

    let page = client.enumerate(&filter, token.as_deref()).await?;
    let next = match page.next_continuation_token {
        Some(token) if !token.is_empty() => Cursor::Next(token),
        _ => Cursor::Done,
    };
    let items: Vec<Result<BlobMetadata>> = page.blobs.into_iter().map(Ok).collect();
    Ok(Some((stream::iter(items), (next, filter))))
}

/// Collect every matching item into memory.
pub async fn list_all(
    client: &dyn StorageClient,
    filter: &EnumerationFilter,
) -> Result<Vec<BlobMetadata>> {
    enumerate_all(client, filter.clone(), None)
        .try_collect()
        .await
}
