//! Synthetic offset/count continuation tokens.
//!
//! Backends without an efficient native cursor page through their listing
//! by position. The token is `base64("<start> <count>")` and is handed to the
//! caller as an opaque string. Backends with a native marker return that
//! marker instead and never touch this module.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::{Error, Result};

/// Decoded position of an offset/count cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetCursor {
    pub start: u64,
    pub count: u64,
}

impl OffsetCursor {
    pub fn new(start: u64, count: u64) -> Self {
        Self { start, count }
    }

    pub fn encode(&self) -> String {
        encode(self.start, self.count)
    }

    /// Token for the page after this one, or `None` when `total` is reached.
    pub fn next(&self, total: u64) -> Option<String> {
        next_token(self.start, self.count, total)
    }
}

/// Encode a `(start, count)` pair.
pub fn encode(start: u64, count: u64) -> String {
    STANDARD.encode(format!("{} {}", start, count))
}

/// Decode a token produced by [`encode`].
pub fn decode(token: &str) -> Result<OffsetCursor> {
    let raw = STANDARD
        .decode(token.trim())
        .map_err(|e| unparsable(token, &e.to_string()))?;
    let text = String::from_utf8(raw).map_err(|e| unparsable(token, &e.to_string()))?;

    let parts: Vec<&str> = text.split(' ').collect();
    if parts.len() != 2 {
        return Err(unparsable(token, "expected two space-separated segments"));
    }

    let start = parts[0]
        .parse::<u64>()
        .map_err(|e| unparsable(token, &format!("bad start '{}': {}", parts[0], e)))?;
    let count = parts[1]
        .parse::<u64>()
        .map_err(|e| unparsable(token, &format!("bad count '{}': {}", parts[1], e)))?;
    if count == 0 {
        return Err(unparsable(token, "count must be positive"));
    }

    Ok(OffsetCursor { start, count })
}

/// Token resuming after the page `[start, start + count)`, or `None` if that
/// page reaches `total_items`.
pub fn next_token(start: u64, count: u64, total_items: u64) -> Option<String> {
    let next = start.saturating_add(count);
    if next >= total_items {
        None
    } else {
        Some(encode(next, count))
    }
}

fn unparsable(token: &str, reason: &str) -> Error {
    Error::InvalidArgument(format!(
        "unparsable continuation token '{}': {}",
        token, reason
    ))
}
