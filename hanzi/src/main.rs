mod args;

use anyhow::Context;
use args::Args;
use clap::Parser;
use hanzi_config::Config;
use hanzi_server::Server;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config.display()))?;

    if let Some(listen) = args.listen {
        config.server.listen_address = Some(listen);
    }

    if args.check {
        println!("{}: configuration is valid", args.config.display());
        return Ok(());
    }

    let _telemetry_guard = hanzi_telemetry::init(config.telemetry.as_ref(), &args.log_filter)?;

    tracing::info!(config_path = %args.config.display(), "starting hanzi");

    if config.tts.baidu.is_none() {
        tracing::warn!("no [tts.baidu] section, uncached text cannot be synthesized");
    }

    let server = Box::pin(Server::new(config)).await?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    server.serve(shutdown).await?;

    tracing::info!("hanzi stopped");
    Ok(())
}

/// Wait for `SIGINT` or `SIGTERM`
///
/// A handler that cannot be installed never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
