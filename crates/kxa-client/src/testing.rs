//! Test utilities for kxa-client
//!
//! Serves an axum router on an ephemeral port so tests can drive the real
//! HTTP client against scripted stream responses.

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::client::{ClientConfig, KxaClient};
use crate::Result;

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: KxaClient,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Create a new test server from an axum Router
    ///
    /// # Example
    ///
    /// ```ignore
    /// use axum::{routing::post, Router};
    /// use kxa_client::testing::TestServer;
    ///
    /// let router = Router::new().route("/stream", post(|| async { "data: [DONE]\n\n" }));
    /// let server = TestServer::start(router).await?;
    ///
    /// let stream = server.client.chat_stream(messages, cancel).await?;
    /// ```
    pub async fn start(router: axum::Router) -> Result<Self> {
        Self::start_with_config(router, ClientConfig::default()).await
    }

    /// Create a new test server whose client uses a custom configuration
    pub async fn start_with_config(router: axum::Router, config: ClientConfig) -> Result<Self> {
        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        // Spawn the server
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        let client = KxaClient::with_config(&format!("http://{}", addr), config)?;

        Ok(Self {
            addr,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get the base URL of the test server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal if not already done
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        // Abort the task if still running
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
