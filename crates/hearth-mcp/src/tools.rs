//! Tool implementations for the hearth MCP server.
//!
//! Three tools are exposed: `search_entities`, `reindex_entities`, and
//! `index_status`. Each returns pretty-printed JSON via `CallToolResult`.

use std::sync::Arc;

use hearth_core::{SearchConfig, SearchRequest};
use hearth_hass::EntitySnapshotProvider;
use hearth_index::Indexer;
use hearth_search::{EmbeddingIndex, HybridSearch, SemanticIndex, UnavailableIndex};
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars, tool, tool_router, ErrorData as McpError,
};
use serde::{Deserialize, Serialize};

/// MCP server exposing entity search over a shared snapshot and index.
#[derive(Clone)]
pub struct HearthServer {
    pub(crate) search: Arc<HybridSearch>,
    pub(crate) snapshot: Arc<dyn EntitySnapshotProvider>,
    pub(crate) indexer: Result<Arc<Indexer>, String>,
    pub(crate) tool_router: ToolRouter<Self>,
}

// --- Parameter structs ---

/// Parameters for the `search_entities` tool.
#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct SearchEntitiesParams {
    /// What to look for, e.g. "lights in the living room". Empty lists entities.
    pub query: String,
    /// Restrict results to one domain, e.g. "light" or "sensor".
    pub domain: Option<String>,
    /// Restrict results to one area id, e.g. "kitchen".
    pub area_id: Option<String>,
    /// Maximum results (default: 10).
    pub limit: Option<usize>,
    /// Minimum semantic similarity between 0 and 1 (default: 0.7).
    pub similarity_threshold: Option<f64>,
    /// "semantic", "keyword", or "hybrid" (default: "hybrid").
    pub search_mode: Option<String>,
}

/// Parameters for the `reindex_entities` tool.
#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct ReindexEntitiesParams {
    /// Drop the stored index and embed every entity again (default: false).
    pub rebuild: Option<bool>,
}

/// Response of the `reindex_entities` tool.
#[derive(Debug, Serialize)]
struct ReindexResponse {
    embedded: usize,
    unchanged: usize,
    removed: usize,
    total: usize,
    version: u64,
    rebuilt: bool,
}

fn mcp_err(msg: impl Into<String>) -> McpError {
    McpError::internal_error(msg.into(), None)
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| mcp_err(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[tool_router]
impl HearthServer {
    /// Create a server over `snapshot` and the index maintained by `indexer`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use hearth_core::SearchConfig;
    /// use hearth_hass::StaticSnapshot;
    /// use hearth_index::{EntityStore, HashEmbedder, Indexer, VectorIndex};
    /// use hearth_mcp::tools::HearthServer;
    ///
    /// let indexer = Indexer::new(
    ///     EntityStore::in_memory().unwrap(),
    ///     Arc::new(HashEmbedder::new(64).unwrap()),
    ///     Arc::new(VectorIndex::new()),
    /// );
    /// let server = HearthServer::new(
    ///     Arc::new(StaticSnapshot::new(Vec::new())),
    ///     Arc::new(indexer),
    ///     SearchConfig::default(),
    /// );
    /// ```
    pub fn new(
        snapshot: Arc<dyn EntitySnapshotProvider>,
        indexer: Arc<Indexer>,
        config: SearchConfig,
    ) -> Self {
        let semantic = SemanticIndex::new(indexer.embedder(), indexer.index());
        Self::build(snapshot, Arc::new(semantic), Ok(indexer), config)
    }

    /// Create a server that answers searches from keywords only, because
    /// the semantic index could not be opened. Index tools report `reason`.
    pub fn without_index(
        snapshot: Arc<dyn EntitySnapshotProvider>,
        config: SearchConfig,
        reason: impl Into<String>,
    ) -> Self {
        let reason = reason.into();
        let semantic = UnavailableIndex::new(reason.clone());
        Self::build(snapshot, Arc::new(semantic), Err(reason), config)
    }

    fn build(
        snapshot: Arc<dyn EntitySnapshotProvider>,
        semantic: Arc<dyn EmbeddingIndex>,
        indexer: Result<Arc<Indexer>, String>,
        config: SearchConfig,
    ) -> Self {
        let search = HybridSearch::new(snapshot.clone(), semantic, config);
        Self {
            search: Arc::new(search),
            snapshot,
            indexer,
            tool_router: Self::tool_router(),
        }
    }

    fn indexer(&self) -> Result<&Indexer, McpError> {
        self.indexer
            .as_deref()
            .map_err(|reason| mcp_err(format!("Semantic index unavailable: {reason}")))
    }

    #[tool(
        name = "search_entities",
        description = "Search Home Assistant entities with natural language. Semantic mode ranks by meaning, keyword mode matches substrings of ids, names and attributes, hybrid (default) combines both. Falls back to keyword search when the semantic index is unavailable. Returns live state, similarity and a match reason per entity. The area_id filter matches the entity's area_id state attribute; entities without that attribute never match it."
    )]
    pub async fn search_entities(
        &self,
        Parameters(params): Parameters<SearchEntitiesParams>,
    ) -> Result<CallToolResult, McpError> {
        let request = SearchRequest {
            query: params.query,
            domain: params.domain,
            area_id: params.area_id,
            limit: params.limit,
            similarity_threshold: params.similarity_threshold,
            search_mode: params.search_mode,
        };
        let results = self.search.search(&request).await;
        json_result(&results)
    }

    #[tool(
        name = "reindex_entities",
        description = "Refresh the semantic index from the current Home Assistant entities. Only entities whose description changed are embedded again. Set rebuild to re-embed everything, e.g. after changing the embedding model."
    )]
    pub async fn reindex_entities(
        &self,
        Parameters(params): Parameters<ReindexEntitiesParams>,
    ) -> Result<CallToolResult, McpError> {
        let rebuild = params.rebuild.unwrap_or(false);
        let indexer = self.indexer()?;
        let entities = self
            .snapshot
            .list_entities(None, None, usize::MAX)
            .await
            .map_err(|e| mcp_err(format!("Failed to fetch entities: {e}")))?;

        let report = indexer
            .sync(&entities, rebuild)
            .await
            .map_err(|e| mcp_err(format!("Failed to index entities: {e}")))?;

        json_result(&ReindexResponse {
            embedded: report.embedded,
            unchanged: report.unchanged,
            removed: report.removed,
            total: report.total,
            version: report.version,
            rebuilt: rebuild,
        })
    }

    #[tool(
        name = "index_status",
        description = "Report the published semantic index: version, entity count, dimensions, embedding model and entities per domain."
    )]
    pub async fn index_status(&self) -> Result<CallToolResult, McpError> {
        let status = self.indexer()?.index().snapshot().status();
        json_result(&status)
    }
}
