use std::time::Duration;

use axum::http;
use reqwest::Client;

/// Longest time allowed for establishing a connection to the provider
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client shared by the token provider and the synthesizer
///
/// Every outbound call is bounded by `timeout`, so a stalled provider
/// cannot hang a request indefinitely.
pub fn http_client(timeout: Duration) -> reqwest::Result<Client> {
    let mut headers = http::HeaderMap::new();
    headers.insert(http::header::CONNECTION, http::HeaderValue::from_static("keep-alive"));

    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
        .pool_idle_timeout(Some(Duration::from_secs(5)))
        .tcp_nodelay(true)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .default_headers(headers)
        .build()
}
