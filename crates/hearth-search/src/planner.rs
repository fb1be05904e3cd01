//! Query planning: mode validation, retrieval, fallback, and merging.
//!
//! ```text
//! ValidatingMode ──invalid──▶ error body
//!       │
//!       ├─ blank text ───────▶ listing (keyword, score 1.0)
//!       ├─ keyword ──────────▶ substring search
//!       └─ semantic/hybrid ──▶ vector lookup (+ substring search for hybrid)
//!                                 │ failure or timeout
//!                                 └──────────▶ substring search, mode "keyword"
//!                     all paths ──▶ merge ──▶ format
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use hearth_core::{
    Candidate, EntityRecord, QueryDescriptor, ResultSet, RetrievalFailure, SearchConfig,
    SearchError, SearchMode, SearchRequest,
};
use hearth_hass::EntitySnapshotProvider;

use crate::formatter::format_results;
use crate::scorer::{keyword_candidate, keyword_explanation, EMPTY_QUERY_EXPLANATION};
use crate::semantic::EmbeddingIndex;

/// The search entry point.
///
/// Holds its collaborators explicitly; construct one per process and share
/// it by reference or `Arc`.
pub struct HybridSearch {
    snapshot: Arc<dyn EntitySnapshotProvider>,
    semantic: Arc<dyn EmbeddingIndex>,
    config: SearchConfig,
}

/// Candidates plus the live records fetched along the way.
struct Retrieved {
    semantic: Vec<Candidate>,
    keyword: Vec<Candidate>,
    records: HashMap<String, EntityRecord>,
    mode_used: SearchMode,
}

impl Retrieved {
    fn keyword(records: Vec<EntityRecord>, explanation: &str) -> Self {
        let keyword = records
            .iter()
            .map(|record| keyword_candidate(record, explanation))
            .collect();
        Self {
            semantic: Vec::new(),
            keyword,
            records: index_records(records),
            mode_used: SearchMode::Keyword,
        }
    }
}

impl HybridSearch {
    /// Create a search engine over the given collaborators.
    pub fn new(
        snapshot: Arc<dyn EntitySnapshotProvider>,
        semantic: Arc<dyn EmbeddingIndex>,
        config: SearchConfig,
    ) -> Self {
        Self {
            snapshot,
            semantic,
            config,
        }
    }

    /// Search defaults and timeouts.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Validate and run a raw request. Never fails; problems are reported
    /// in [`ResultSet::error`].
    pub async fn search(&self, request: &SearchRequest) -> ResultSet {
        match QueryDescriptor::from_request(request, &self.config) {
            Ok(query) => self.run(&query).await,
            Err(err) => {
                tracing::warn!(error = %err, "rejected search request");
                ResultSet::failed(
                    request.query.clone(),
                    request.search_mode.clone().unwrap_or_default(),
                    err.to_string(),
                )
            }
        }
    }

    /// Run a validated query.
    pub async fn run(&self, query: &QueryDescriptor) -> ResultSet {
        tracing::debug!(query = %query.text, mode = %query.mode, "search");

        let retrieved = match self.retrieve(query).await {
            Ok(retrieved) => retrieved,
            Err(err) => {
                tracing::warn!(error = %err, "search failed");
                return ResultSet::failed(
                    query.text.clone(),
                    SearchMode::Keyword.as_str(),
                    err.to_string(),
                );
            }
        };

        let merged = merge(retrieved.semantic, retrieved.keyword, query);
        format_results(
            merged,
            &retrieved.records,
            &query.text,
            retrieved.mode_used,
            query.domain_filter.as_deref(),
        )
    }

    async fn retrieve(&self, query: &QueryDescriptor) -> Result<Retrieved, SearchError> {
        if query.is_blank() {
            let records = self
                .keyword_lookup(query, None)
                .await
                .map_err(SearchError::KeywordRetrieval)?;
            return Ok(Retrieved::keyword(records, EMPTY_QUERY_EXPLANATION));
        }

        let text = query.text.trim();
        match query.mode {
            SearchMode::Keyword => {
                let records = self
                    .keyword_lookup(query, Some(text))
                    .await
                    .map_err(SearchError::KeywordRetrieval)?;
                Ok(Retrieved::keyword(records, &keyword_explanation(text)))
            }
            SearchMode::Semantic => match self.semantic_lookup(query, text).await {
                Ok(semantic) => Ok(self.with_live_records(text, semantic, Vec::new(), SearchMode::Semantic).await),
                Err(failure) => self.fall_back(query, text, failure, None).await,
            },
            SearchMode::Hybrid => {
                let (semantic, keyword) = tokio::join!(
                    self.semantic_lookup(query, text),
                    self.keyword_lookup(query, Some(text)),
                );
                match (semantic, keyword) {
                    (Ok(semantic), Ok(keyword)) => {
                        Ok(self.with_live_records(text, semantic, keyword, SearchMode::Hybrid).await)
                    }
                    (Ok(semantic), Err(failure)) => {
                        tracing::warn!(error = %failure, "keyword half of hybrid search failed");
                        Ok(self.with_live_records(text, semantic, Vec::new(), SearchMode::Hybrid).await)
                    }
                    (Err(failure), keyword) => self.fall_back(query, text, failure, Some(keyword)).await,
                }
            }
        }
    }

    /// Degrade a failed semantic lookup to keyword search, reusing a keyword
    /// result that is already in hand.
    async fn fall_back(
        &self,
        query: &QueryDescriptor,
        text: &str,
        failure: RetrievalFailure,
        keyword: Option<Result<Vec<EntityRecord>, RetrievalFailure>>,
    ) -> Result<Retrieved, SearchError> {
        tracing::warn!(error = %failure, "semantic search unavailable, falling back to keyword search");

        let records = match keyword {
            Some(result) => result,
            None => self.keyword_lookup(query, Some(text)).await,
        }
        .map_err(SearchError::KeywordRetrieval)?;

        let explanation = format!(
            "{} ({})",
            keyword_explanation(text),
            SearchError::Retrieval(failure)
        );
        Ok(Retrieved::keyword(records, &explanation))
    }

    async fn semantic_lookup(
        &self,
        query: &QueryDescriptor,
        text: &str,
    ) -> Result<Vec<Candidate>, RetrievalFailure> {
        with_timeout(
            "semantic",
            self.config.semantic_timeout(),
            self.semantic.similarity_search(
                text,
                query.domain_filter.as_deref(),
                query.area_filter.as_deref(),
                query.limit,
                query.similarity_threshold,
            ),
        )
        .await
    }

    async fn keyword_lookup(
        &self,
        query: &QueryDescriptor,
        text: Option<&str>,
    ) -> Result<Vec<EntityRecord>, RetrievalFailure> {
        // The provider cannot filter by area, so take everything and let the
        // merge guard trim.
        let limit = if query.area_filter.is_some() {
            usize::MAX
        } else {
            query.limit
        };
        with_timeout(
            "keyword",
            self.config.keyword_timeout(),
            self.snapshot
                .list_entities(query.domain_filter.as_deref(), text, limit),
        )
        .await
    }

    /// Attach live records to semantic candidates.
    ///
    /// Candidates whose entity is gone from a successfully fetched snapshot
    /// are dropped. If the snapshot cannot be fetched, candidates are kept
    /// and rendered from index metadata.
    async fn with_live_records(
        &self,
        text: &str,
        mut semantic: Vec<Candidate>,
        keyword_records: Vec<EntityRecord>,
        mode_used: SearchMode,
    ) -> Retrieved {
        let explanation = keyword_explanation(text);
        let keyword: Vec<Candidate> = keyword_records
            .iter()
            .map(|record| keyword_candidate(record, &explanation))
            .collect();
        let mut records = index_records(keyword_records);

        let missing: Vec<String> = semantic
            .iter()
            .filter(|c| !records.contains_key(&c.entity_id))
            .map(|c| c.entity_id.clone())
            .collect();

        if !missing.is_empty() {
            let joined = with_timeout(
                "keyword",
                self.config.keyword_timeout(),
                self.snapshot.entities_by_id(&missing),
            )
            .await;

            match joined {
                Ok(found) => {
                    records.extend(index_records(found));
                    semantic.retain(|c| records.contains_key(&c.entity_id));
                }
                Err(failure) => {
                    tracing::warn!(error = %failure, "could not fetch live state for semantic matches");
                }
            }
        }

        Retrieved {
            semantic,
            keyword,
            records,
            mode_used,
        }
    }
}

/// Deduplicate (semantic wins), re-apply filters, order, and truncate.
fn merge(semantic: Vec<Candidate>, keyword: Vec<Candidate>, query: &QueryDescriptor) -> Vec<Candidate> {
    let mut by_id: HashMap<String, Candidate> = HashMap::new();
    for candidate in keyword {
        by_id.insert(candidate.entity_id.clone(), candidate);
    }
    for candidate in semantic {
        by_id.insert(candidate.entity_id.clone(), candidate);
    }

    let mut merged: Vec<Candidate> = by_id
        .into_values()
        .filter(|c| {
            query
                .domain_filter
                .as_deref()
                .map_or(true, |d| c.domain() == d)
        })
        .filter(|c| {
            query
                .area_filter
                .as_deref()
                .map_or(true, |a| c.area_id() == Some(a))
        })
        .collect();

    merged.sort_by(|a, b| {
        b.similarity_score
            .total_cmp(&a.similarity_score)
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });
    merged.truncate(query.limit);
    merged
}

fn index_records(records: Vec<EntityRecord>) -> HashMap<String, EntityRecord> {
    records
        .into_iter()
        .map(|record| (record.entity_id.clone(), record))
        .collect()
}

async fn with_timeout<T>(
    stage: &'static str,
    after: Duration,
    lookup: impl Future<Output = Result<T, RetrievalFailure>>,
) -> Result<T, RetrievalFailure> {
    tokio::time::timeout(after, lookup)
        .await
        .unwrap_or(Err(RetrievalFailure::Timeout { stage, after }))
}
