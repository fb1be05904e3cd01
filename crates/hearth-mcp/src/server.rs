//! MCP server setup and lifecycle.
//!
//! Provides [`run_server`] which serves a [`HearthServer`] on stdio and
//! blocks until the client disconnects.

use hearth_core::HearthError;
use rmcp::{model::*, tool_handler, transport::stdio, ServerHandler, ServiceExt};

use crate::tools::HearthServer;

const SERVER_INSTRUCTIONS: &str = "\
Hearth searches the entities of a Home Assistant instance. Use these tools:\n\
- search_entities: Find entities by natural language (semantic), substring (keyword), or both (hybrid)\n\
- reindex_entities: Refresh the embedding index from the current entity states\n\
- index_status: Report how many entities are indexed and with which model\n\
Area filters match the area_id state attribute. Home Assistant does not set it by default, \
so entities without it never match an area filter.";

#[tool_handler]
impl ServerHandler for HearthServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "hearth".to_string(),
                title: Some("Hearth Entity Search".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: Some(
                    "Hybrid semantic and keyword search over Home Assistant entities".to_string(),
                ),
                icons: None,
                website_url: None,
            },
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
        }
    }
}

/// Serve `server` on stdio transport.
///
/// Called by the `hearth mcp` subcommand. Blocks until the client closes
/// stdin. In-flight tool calls are cancelled by dropping their futures.
///
/// # Errors
///
/// Returns [`HearthError::Config`] if the server fails to initialize or
/// hits a transport error.
pub async fn run_server(server: HearthServer) -> Result<(), HearthError> {
    tracing::info!("starting MCP server on stdio");
    let service = server
        .serve(stdio())
        .await
        .map_err(|e| HearthError::Config(format!("MCP server failed to start: {e}")))?;

    service
        .waiting()
        .await
        .map_err(|e| HearthError::Config(format!("MCP server error: {e}")))?;

    Ok(())
}
