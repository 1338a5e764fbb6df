//! Signaling server listener
//!
//! Binds the HTTP listener, starts the relay loop and serves until shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::error::Result;
use crate::registry::RegistryConfig;
use crate::server::config::ServerConfig;
use crate::server::http::{self, AppState};
use crate::server::relay::Relay;
use crate::stats::Uptime;

/// WebRTC signaling server
pub struct SignalServer {
    config: ServerConfig,
    registry_config: RegistryConfig,
}

impl SignalServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry_config(config, RegistryConfig::default())
    }

    /// Create a new server with custom registry configuration
    pub fn with_registry_config(config: ServerConfig, registry_config: RegistryConfig) -> Self {
        Self {
            config,
            registry_config,
        }
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the server
    ///
    /// This method blocks until the listener fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    ///
    /// Invalid configuration is reported as [`crate::Error::Config`] before
    /// anything is bound.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.config.validate()?;
        self.registry_config.validate()?;

        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.config.validate()?;
        self.registry_config.validate()?;

        let addr = listener.local_addr()?;
        let (relay, relay_task) = Relay::spawn(self.registry_config.clone());

        let permits = if self.config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(self.config.max_connections)))
        } else {
            None
        };

        let state = AppState {
            relay,
            config: Arc::new(self.config.clone()),
            permits,
            uptime: Uptime::start(),
        };

        tracing::info!(
            addr = %addr,
            ws_path = %self.config.ws_path,
            grace_period_secs = self.registry_config.reclaim_grace_period.as_secs(),
            "Signaling server listening"
        );

        let result = axum::serve(
            listener,
            http::app(state).into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await;

        // Stop the relay loop on shutdown
        relay_task.abort();
        tracing::info!("Signaling server stopped");

        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::Error;

    async fn local_listener() -> TcpListener {
        TcpListener::bind("127.0.0.1:0").await.unwrap()
    }

    #[tokio::test]
    async fn test_serve_rejects_shadowed_status_route() {
        let server = SignalServer::new(ServerConfig::default().ws_path("/health"));

        let result = server.serve(local_listener().await, std::future::pending()).await;

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_serve_rejects_zero_cleanup_interval() {
        let server = SignalServer::with_registry_config(
            ServerConfig::default(),
            RegistryConfig::default().cleanup_interval(Duration::ZERO),
        );

        let result = server.serve(local_listener().await, std::future::pending()).await;

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let server = SignalServer::new(ServerConfig::default());

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            server.serve(local_listener().await, async {}),
        )
        .await;

        assert!(matches!(result, Ok(Ok(()))));
    }
}
