//! Helpers for image payloads arriving over HTTP.
//!
//! Browsers hand canvas captures over as data URIs
//! (`data:image/png;base64,....`). The marker must be removed before the
//! base64 body can be decoded.

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;

static DATA_URI_PREFIX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^data:image/[A-Za-z0-9.+-]+;base64,").ok());

/// Strip a leading `data:image/<type>;base64,` marker if present
pub fn strip_data_uri(payload: &str) -> &str {
    match DATA_URI_PREFIX.as_ref().and_then(|re| re.find(payload)) {
        Some(m) => &payload[m.end()..],
        None => payload,
    }
}

/// Decode a base64 image payload into raw bytes.
///
/// Payload size is bounded by the HTTP body limit of the caller.
pub fn decode_image_payload(payload: &str) -> Result<Vec<u8>> {
    let body = strip_data_uri(payload.trim());
    if body.is_empty() {
        return Err(anyhow!("image payload is empty"));
    }

    base64::prelude::BASE64_STANDARD
        .decode(body)
        .context("Failed to decode base64 image")
}

/// Encode raw bytes as standard base64
pub fn encode_base64(bytes: &[u8]) -> String {
    base64::prelude::BASE64_STANDARD.encode(bytes)
}
