mod cors;
mod health;

use std::net::SocketAddr;

use axum::Router;
use hanzi_config::Config;
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Listen address used when none is configured
pub const DEFAULT_LISTEN_ADDRESS: SocketAddr = SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 5000);

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the server from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the audio cache or the speech client cannot be initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let listen_address = config.server.listen_address.unwrap_or(DEFAULT_LISTEN_ADDRESS);

        let tts_state = tts::build_server(&config).await?;
        let characters_state = characters::build_server(&config);
        let progress_state = progress::build_server(&config);

        let mut app = Router::new()
            .merge(tts::endpoint_router().with_state(tts_state))
            .merge(characters::endpoint_router().with_state(characters_state))
            .merge(progress::endpoint_router().with_state(progress_state));

        if config.server.health.enabled {
            app = app.route(&config.server.health.path, axum::routing::get(health::health_handler));
        }

        // Frontend assets answer every path the API does not claim
        if let Some(ref static_dir) = config.server.static_dir {
            tracing::debug!(dir = %static_dir.display(), "serving static frontend");
            app = app.fallback_service(ServeDir::new(static_dir));
        }

        app = app.layer(TraceLayer::new_for_http());

        if let Some(ref cors_config) = config.server.cors {
            app = app.layer(cors::cors_layer(cors_config));
        }

        Ok(Self {
            router: app,
            listen_address,
        })
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve requests until `shutdown` is cancelled
    ///
    /// In-flight requests are allowed to finish after cancellation.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}
