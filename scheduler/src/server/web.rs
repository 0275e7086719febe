use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tower_http::LatencyUnit;
use tracing::{info, Level};

use crate::config::ServerConfig;

use super::state::ServerState;

pub struct Server {
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    async fn bind(&self) -> Result<TcpListener> {
        let addr = SocketAddr::new(self.config.host, self.config.port);
        TcpListener::bind(addr).await.with_context(|| format!("unable to bind to {addr}"))
    }

    fn router(&self, state: ServerState) -> Result<Router> {
        let api = Router::new().nest("/api/v1", crate::api::router(state)).layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().include_headers(false).level(Level::DEBUG))
                .on_request(trace::DefaultOnRequest::new().level(Level::TRACE))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO).latency_unit(LatencyUnit::Micros)),
        );
        Ok(api.layer(self.cors_layer()?))
    }

    fn cors_layer(&self) -> Result<CorsLayer> {
        let mut cors = CorsLayer::new().allow_methods([Method::GET, Method::POST, Method::DELETE]);
        if self.config.trusted.iter().any(|origin| origin == "*") {
            cors = cors.allow_origin(Any);
        } else if !self.config.trusted.is_empty() {
            let origins: Result<Vec<HeaderValue>> = self
                .config
                .trusted
                .iter()
                .map(|origin| HeaderValue::from_str(origin).with_context(|| format!("invalid origin `{origin}`")))
                .collect();
            cors = cors.allow_origin(origins?);
        }
        Ok(cors)
    }

    /// Binds and serves the API until a shutdown signal arrives or
    /// `shutdown` is tripped (e.g. by a background loop failing fatally).
    pub async fn run(self, state: ServerState, shutdown: tokio_util::sync::CancellationToken) -> Result<()> {
        let listener = self.bind().await?;
        let addr = listener.local_addr()?;
        let router = self.router(state)?.into_make_service_with_connect_info::<SocketAddr>();

        info!("listening on {addr}");
        axum::serve(listener, router).with_graceful_shutdown(shutdown_signal(shutdown)).await?;
        Ok(())
    }
}

async fn shutdown_signal(shutdown: tokio_util::sync::CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
        _ = shutdown.cancelled() => info!("shutdown requested, shutting down"),
    }
}
