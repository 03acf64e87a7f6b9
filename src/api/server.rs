//! HTTP server setup

use std::sync::Arc;

use axum::http::header::HeaderValue;
use axum::http::Method;
use axum::Router;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::observability::Logger;
use crate::service::{LifecycleService, ServiceError};

use super::routes;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid CORS origin: {0}")]
    InvalidOrigin(String),

    #[error("bind failed on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Build the full application router with middleware layers.
pub fn build_app(service: Arc<LifecycleService>, config: &ServerConfig) -> Result<Router, ServerError> {
    let cors = cors_layer(config)?;

    Ok(routes::router(service)
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

fn cors_layer(config: &ServerConfig) -> Result<CorsLayer, ServerError> {
    if config.cors_origins.is_empty() {
        // Development default
        return Ok(CorsLayer::permissive());
    }

    let mut origins = Vec::with_capacity(config.cors_origins.len());
    for origin in &config.cors_origins {
        let value = origin
            .parse::<HeaderValue>()
            .map_err(|_| ServerError::InvalidOrigin(origin.clone()))?;
        origins.push(value);
    }

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any))
}

/// Open the service and serve HTTP until the process is stopped.
pub async fn serve(config: ServerConfig) -> Result<(), ServerError> {
    let service = Arc::new(LifecycleService::open(&config)?);
    let app = build_app(service, &config)?;

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    Logger::info("server_started", &[("addr", &addr)]);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_build_app_with_default_config() {
        let dir = TempDir::new().unwrap();
        let config = ServerConfig {
            data_dir: dir.path().join("data"),
            ..ServerConfig::default()
        };
        let service = Arc::new(LifecycleService::open(&config).unwrap());

        assert!(build_app(service, &config).is_ok());
    }

    #[test]
    fn test_invalid_cors_origin_rejected() {
        let dir = TempDir::new().unwrap();
        let config = ServerConfig {
            data_dir: dir.path().join("data"),
            cors_origins: vec!["not a header\nvalue".to_string()],
            ..ServerConfig::default()
        };
        let service = Arc::new(LifecycleService::open(&config).unwrap());

        assert!(matches!(
            build_app(service, &config),
            Err(ServerError::InvalidOrigin(_))
        ));
    }
}
