use crate::tools::{BitbucketConfig, BitbucketTools};
use anyhow::Result;
use rmcp::transport::sse_server::SseServer;
use std::net::SocketAddr;

pub struct SseServerApp {
    bind_addr: SocketAddr,
    config: BitbucketConfig,
}

impl SseServerApp {
    /// Creates a new SSE server application instance.
    ///
    /// # Arguments
    ///
    /// * `bind_addr` - The socket address to bind the server to
    /// * `config` - Bitbucket authentication and endpoint configuration
    pub fn new(bind_addr: SocketAddr, config: BitbucketConfig) -> Self {
        Self { bind_addr, config }
    }

    /// Starts the SSE server and serves BitbucketTools over Server-Sent
    /// Events.
    ///
    /// The tools instance is built once and cloned per connection so that
    /// every session shares the same cache and request pacing state. The
    /// method waits for a Ctrl+C signal to shut down gracefully.
    pub async fn serve(self) -> Result<()> {
        tracing::info!("Initializing Bitbucket service before starting SSE server...");
        let tools = BitbucketTools::new(self.config);
        tools.initialize().await?;
        tracing::info!("Bitbucket service initialization complete");

        let sse_server = SseServer::serve(self.bind_addr).await?;
        let cancellation_token = sse_server.with_service(move || tools.clone());

        // Wait for Ctrl+C signal to gracefully shutdown
        tokio::signal::ctrl_c().await?;

        // Cancel the server
        cancellation_token.cancel();

        Ok(())
    }
}
