//! Test server wrapper that starts hanzi on a random port

use std::net::SocketAddr;

use hanzi_config::Config;
use hanzi_server::Server;
use tokio_util::sync::CancellationToken;

/// A running test server instance
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    client: reqwest::Client,
}

impl TestServer {
    /// Start a test server with the given configuration
    ///
    /// Binds to port 0 for automatic port assignment
    pub async fn start(config: Config) -> anyhow::Result<Self> {
        let server = Server::new(config).await?;
        let shutdown = CancellationToken::new();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                axum::serve(listener, server.into_router())
                    .with_graceful_shutdown(async move { shutdown.cancelled().await })
                    .await
                    .ok();
            }
        });

        Ok(Self {
            addr,
            shutdown,
            client: reqwest::Client::new(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// `GET /api/tts` for `text`
    pub async fn speak(&self, text: &str, skip_cache: bool) -> reqwest::Response {
        let mut query = vec![("text", text)];
        if skip_cache {
            query.push(("skip_cache", "true"));
        }

        self.client
            .get(self.url("/api/tts"))
            .query(&query)
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
