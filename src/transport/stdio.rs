use crate::tools::{BitbucketConfig, BitbucketTools};
use anyhow::Result;
use rmcp::ServiceExt;
use rmcp::transport::stdio;

/// Runs the MCP server in STDIN/STDOUT mode.
///
/// This mode is used when the server is launched as a subprocess by an MCP
/// client, communicating through standard input/output streams.
pub async fn run_stdio_server(config: BitbucketConfig) -> Result<()> {
    let service = BitbucketTools::new(config);

    // Verify credentials and start the cache sweeper before serving
    service.initialize().await?;

    let server = service.serve(stdio()).await?;

    server.waiting().await?;
    Ok(())
}
