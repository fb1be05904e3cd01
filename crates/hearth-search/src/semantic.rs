//! The semantic retrieval path.

use std::sync::Arc;

use async_trait::async_trait;
use hearth_core::{Candidate, RetrievalFailure};
use hearth_index::{Embedder, NearestFilter, VectorIndex};

use crate::scorer::semantic_candidate;

/// Similarity lookup over embedded entities.
#[async_trait]
pub trait EmbeddingIndex: Send + Sync {
    /// Up to `limit` candidates scoring at least `threshold`, best first
    /// with ties broken by entity id.
    ///
    /// Fails with [`RetrievalFailure`] if the query cannot be embedded or
    /// the index cannot be searched.
    async fn similarity_search(
        &self,
        query: &str,
        domain: Option<&str>,
        area: Option<&str>,
        limit: usize,
        threshold: f64,
    ) -> Result<Vec<Candidate>, RetrievalFailure>;
}

/// [`EmbeddingIndex`] over an [`Embedder`] and a published [`VectorIndex`].
pub struct SemanticIndex<E: ?Sized> {
    embedder: Arc<E>,
    index: Arc<VectorIndex>,
}

impl<E: Embedder + ?Sized> SemanticIndex<E> {
    /// Search `index` with query vectors from `embedder`.
    pub fn new(embedder: Arc<E>, index: Arc<VectorIndex>) -> Self {
        Self { embedder, index }
    }
}

#[async_trait]
impl<E: Embedder + ?Sized> EmbeddingIndex for SemanticIndex<E> {
    async fn similarity_search(
        &self,
        query: &str,
        domain: Option<&str>,
        area: Option<&str>,
        limit: usize,
        threshold: f64,
    ) -> Result<Vec<Candidate>, RetrievalFailure> {
        let snapshot = self.index.snapshot();
        if snapshot.is_empty() {
            return Err(RetrievalFailure::IndexUnavailable(
                "no entities have been indexed".into(),
            ));
        }
        if snapshot.model() != self.embedder.model() {
            return Err(RetrievalFailure::IndexUnavailable(format!(
                "index holds {} vectors but queries use {}",
                snapshot.model(),
                self.embedder.model()
            )));
        }

        let vector = self.embedder.embed_query(query).await?;
        // Rank the whole filtered pool: the cut must happen on rounded scores.
        let neighbors = snapshot
            .nearest(&vector, snapshot.len(), NearestFilter { domain, area })
            .map_err(|e| RetrievalFailure::IndexUnavailable(e.to_string()))?;

        tracing::debug!(
            version = snapshot.version(),
            hits = neighbors.len(),
            "vector lookup"
        );

        let mut candidates: Vec<Candidate> = neighbors
            .into_iter()
            .map(semantic_candidate)
            .filter(|candidate| candidate.similarity_score >= threshold)
            .collect();
        candidates.sort_by(|a, b| {
            b.similarity_score
                .total_cmp(&a.similarity_score)
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });
        candidates.truncate(limit);
        Ok(candidates)
    }
}

/// [`EmbeddingIndex`] standing in for a semantic side that could not be
/// set up. Every lookup fails as unavailable, so searches run on keywords.
#[derive(Debug, Clone)]
pub struct UnavailableIndex {
    reason: String,
}

impl UnavailableIndex {
    /// An index that reports `reason` on every lookup.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl EmbeddingIndex for UnavailableIndex {
    async fn similarity_search(
        &self,
        _query: &str,
        _domain: Option<&str>,
        _area: Option<&str>,
        _limit: usize,
        _threshold: f64,
    ) -> Result<Vec<Candidate>, RetrievalFailure> {
        Err(RetrievalFailure::IndexUnavailable(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use hearth_core::{EntityRecord, HearthError};
    use hearth_index::{EntityStore, HashEmbedder, IndexEntry, Indexer};

    use super::*;

    async fn indexed(records: Vec<EntityRecord>) -> SemanticIndex<HashEmbedder> {
        let embedder = Arc::new(HashEmbedder::new(256).unwrap());
        let index = Arc::new(VectorIndex::new());
        Indexer::new(EntityStore::in_memory().unwrap(), embedder.clone(), index.clone())
            .sync(&records, false)
            .await
            .unwrap();
        SemanticIndex::new(embedder, index)
    }

    fn home() -> Vec<EntityRecord> {
        vec![
            EntityRecord::new("light.living_room", "on")
                .with_attribute("friendly_name", "Living Room Lights")
                .with_attribute("area_id", "living_room"),
            EntityRecord::new("light.kitchen", "off")
                .with_attribute("friendly_name", "Kitchen Lights")
                .with_attribute("area_id", "kitchen"),
            EntityRecord::new("cover.garage_door", "closed")
                .with_attribute("friendly_name", "Garage Door"),
        ]
    }

    #[tokio::test]
    async fn best_match_comes_first() {
        let semantic = indexed(home()).await;
        let hits = semantic
            .similarity_search("living room lights", None, None, 10, 0.0)
            .await
            .unwrap();
        assert_eq!(hits[0].entity_id, "light.living_room");
        assert!(hits.windows(2).all(|w| w[0].similarity_score >= w[1].similarity_score));
        assert!(hits.iter().all(|h| (0.0..=1.0).contains(&h.similarity_score)));
    }

    #[tokio::test]
    async fn threshold_drops_weak_matches() {
        let semantic = indexed(home()).await;
        let hits = semantic
            .similarity_search("living room lights", None, None, 10, 0.99)
            .await
            .unwrap();
        assert!(hits.iter().all(|h| h.similarity_score >= 0.99));
        assert!(hits.len() < 3);
    }

    #[tokio::test]
    async fn filters_before_or_after_scoring_agree() {
        let semantic = indexed(home()).await;
        let filtered = semantic
            .similarity_search("lights", Some("light"), Some("kitchen"), 10, 0.0)
            .await
            .unwrap();
        let unfiltered = semantic
            .similarity_search("lights", None, None, 10, 0.0)
            .await
            .unwrap();
        let post: Vec<_> = unfiltered
            .into_iter()
            .filter(|c| c.domain() == "light" && c.area_id() == Some("kitchen"))
            .collect();
        assert_eq!(filtered, post);
    }

    struct AxisEmbedder;

    #[async_trait]
    impl Embedder for AxisEmbedder {
        fn model(&self) -> &str {
            "axis"
        }

        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, HearthError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        async fn embed_query(&self, _: &str) -> Result<Vec<f32>, HearthError> {
            Ok(vec![1.0, 0.0])
        }
    }

    fn at_cosine(entity_id: &str, cosine: f32) -> IndexEntry {
        IndexEntry {
            entity_id: entity_id.into(),
            domain: "light".into(),
            area_id: None,
            friendly_name: entity_id.into(),
            description_hash: entity_id.into(),
            vector: vec![cosine, (1.0 - cosine * cosine).sqrt()],
        }
    }

    #[tokio::test]
    async fn rounded_ties_are_cut_by_entity_id() {
        let index = Arc::new(VectorIndex::new());
        index
            .publish("axis", vec![at_cosine("light.b", 0.9004), at_cosine("light.a", 0.9001)])
            .unwrap();
        let semantic = SemanticIndex::new(Arc::new(AxisEmbedder), index);

        let all = semantic.similarity_search("q", None, None, 10, 0.0).await.unwrap();
        let top = semantic.similarity_search("q", None, None, 1, 0.0).await.unwrap();

        assert_eq!(all[0].similarity_score, all[1].similarity_score);
        assert_eq!(all[0].entity_id, "light.a");
        assert_eq!(top.len(), 1);
        assert_eq!(top[0], all[0]);
    }

    #[tokio::test]
    async fn empty_index_is_unavailable() {
        let semantic = SemanticIndex::new(
            Arc::new(HashEmbedder::new(8).unwrap()),
            Arc::new(VectorIndex::new()),
        );
        let err = semantic
            .similarity_search("anything", None, None, 5, 0.5)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalFailure::IndexUnavailable(_)));
    }

    #[tokio::test]
    async fn unembeddable_query_is_an_embedding_failure() {
        let semantic = indexed(home()).await;
        let err = semantic
            .similarity_search("?!", None, None, 5, 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalFailure::Embedding(_)));
    }

    #[tokio::test]
    async fn model_mismatch_is_unavailable() {
        let index = Arc::new(VectorIndex::new());
        Indexer::new(
            EntityStore::in_memory().unwrap(),
            Arc::new(HashEmbedder::new(32).unwrap()),
            index.clone(),
        )
        .sync(&home(), false)
        .await
        .unwrap();

        let semantic = SemanticIndex::new(Arc::new(HashEmbedder::new(64).unwrap()), index);
        let err = semantic
            .similarity_search("garage", None, None, 5, 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalFailure::IndexUnavailable(_)));
    }
}
