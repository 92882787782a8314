mod config;
mod handler;

use std::sync::Arc;

use eyre::WrapErr;
use pagelang::{source::DirSource, Settings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{config::Config, handler::AppState};

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_error::ErrorLayer::default())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::try_from_env()?;
    let settings = Settings {
        default_language: config.default_language,
        ..Default::default()
    };
    let locales_dir = config.locales_dir.display().to_string();
    let router = crate::handler::create_router(AppState {
        source: DirSource::new(&config.locales_dir),
        settings: Arc::new(settings),
        origin: Arc::from(config.origin.as_str()),
    });

    let listen_addr = &config.listen_addr;
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .wrap_err_with(|| format!("failed to bind `{listen_addr}`"))?;
    tracing::info!(%listen_addr, %locales_dir, "starting http server...");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("http server failed")?;

    Ok(())
}
