use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;
use url::Url;

use crate::{error::TtsError, types::AccessToken};

use super::TokenProvider;

/// Refresh cached tokens this long before the provider says they expire
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Baidu OAuth client-credentials token provider
pub struct BaiduTokenProvider {
    client: Client,
    token_url: Url,
    client_id: SecretString,
    client_secret: SecretString,
    cache: Option<Mutex<Option<CachedToken>>>,
}

struct CachedToken {
    token: AccessToken,
    refresh_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    error_description: Option<String>,
}

impl BaiduTokenProvider {
    pub const fn new(client: Client, token_url: Url, client_id: SecretString, client_secret: SecretString) -> Self {
        Self {
            client,
            token_url,
            client_id,
            client_secret,
            cache: None,
        }
    }

    /// Reuse each token until shortly before its declared expiry
    #[must_use]
    pub fn with_token_cache(mut self) -> Self {
        self.cache = Some(Mutex::new(None));
        self
    }

    async fn request_token(&self) -> crate::error::Result<AccessToken> {
        tracing::debug!(url = %self.token_url, "requesting Baidu access token");

        let response = self
            .client
            .post(self.token_url.clone())
            .query(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.expose_secret()),
                ("client_secret", self.client_secret.expose_secret()),
            ])
            .send()
            .await
            .map_err(|e| {
                // The request URL carries the client secret
                let e = e.without_url();
                tracing::error!("Baidu token request failed: {e}");
                TtsError::ServiceUnavailable(format!("Failed to reach token endpoint: {e}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            let e = e.without_url();
            tracing::error!("Failed to read Baidu token response: {e}");
            TtsError::ServiceUnavailable(format!("Failed to read token response: {e}"))
        })?;

        if !status.is_success() {
            tracing::error!("Baidu token endpoint error ({status}): {body}");
            return Err(TtsError::ServiceUnavailable(format!(
                "Token endpoint returned {status}: {body}"
            )));
        }

        parse_token_response(&body)
    }
}

fn parse_token_response(body: &str) -> crate::error::Result<AccessToken> {
    let parsed: TokenResponse = serde_json::from_str(body).map_err(|e| {
        tracing::error!("Malformed Baidu token response: {e}");
        TtsError::ServiceUnavailable(format!("Malformed token response: {e}"))
    })?;

    match parsed.access_token {
        Some(token) if !token.is_empty() => Ok(AccessToken::new(token, parsed.expires_in.map(Duration::from_secs))),
        _ => {
            let reason = parsed
                .error_description
                .unwrap_or_else(|| "response did not contain an access token".to_string());
            tracing::error!("Baidu token endpoint rejected credentials: {reason}");
            Err(TtsError::ServiceUnavailable(reason))
        }
    }
}

#[async_trait]
impl TokenProvider for BaiduTokenProvider {
    async fn fetch(&self) -> crate::error::Result<AccessToken> {
        let Some(ref cache) = self.cache else {
            return self.request_token().await;
        };

        // Held across the request so concurrent misses share one refresh
        let mut cached = cache.lock().await;

        if let Some(ref entry) = *cached
            && Instant::now() < entry.refresh_at
        {
            return Ok(entry.token.clone());
        }

        let token = self.request_token().await?;

        // Lifetimes too large to represent as an instant are not cached
        *cached = token
            .expires_in()
            .and_then(|lifetime| lifetime.checked_sub(EXPIRY_MARGIN))
            .and_then(|usable| Instant::now().checked_add(usable))
            .map(|refresh_at| CachedToken {
                token: token.clone(),
                refresh_at,
            });

        Ok(token)
    }
}
