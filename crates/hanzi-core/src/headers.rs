//! Response header sets shared across endpoints

use http::{
    HeaderMap, HeaderValue,
    header::{CACHE_CONTROL, CONTENT_TYPE, EXPIRES, PRAGMA},
};

/// MIME type of every audio payload served by the application
pub const AUDIO_MPEG: &str = "audio/mpeg";

/// Headers instructing browsers and proxies never to reuse a response
///
/// The server keeps its own audio cache; clients must always re-fetch so a
/// regenerated pronunciation is picked up immediately.
pub fn no_cache() -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(3);
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store, must-revalidate"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("0"));
    headers
}

/// No-cache headers plus `Content-Type: audio/mpeg`
pub fn audio_response() -> HeaderMap {
    let mut headers = no_cache();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(AUDIO_MPEG));
    headers
}

/// Whether a header map carries the full no-cache directive set
pub fn is_no_cache(headers: &HeaderMap) -> bool {
    no_cache()
        .iter()
        .all(|(name, value)| headers.get(name).is_some_and(|v| v == value))
}
