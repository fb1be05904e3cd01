//! Bounded similarity scores and match explanations.

use hearth_core::{Attributes, Candidate, EntityRecord, MatchSource};
use hearth_index::Neighbor;
use serde_json::Value;

/// Explanation attached to every result of an empty query.
pub const EMPTY_QUERY_EXPLANATION: &str = "Keyword match (empty query)";

/// Score assigned to keyword-sourced candidates.
pub const KEYWORD_SCORE: f64 = 1.0;

/// A scored explanation.
#[derive(Debug, Clone, PartialEq)]
pub struct Explained {
    /// Similarity clamped into `[0, 1]` and rounded to 3 decimals.
    pub score: f64,
    /// Human-readable reason.
    pub explanation: String,
}

/// Clamp a raw similarity into `[0, 1]` and round it to 3 decimals.
///
/// NaN maps to 0.
///
/// # Examples
///
/// ```
/// use hearth_search::scorer::bounded_score;
///
/// assert_eq!(bounded_score(0.94567), 0.946);
/// assert_eq!(bounded_score(-0.3), 0.0);
/// assert_eq!(bounded_score(1.2), 1.0);
/// ```
pub fn bounded_score(raw: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    (raw.clamp(0.0, 1.0) * 1000.0).round() / 1000.0
}

/// Score and explain a semantic hit.
///
/// # Examples
///
/// ```
/// use hearth_search::scorer::explain;
///
/// let explained = explain("Living Room Lights", "light", 0.9512);
/// assert_eq!(explained.score, 0.951);
/// assert_eq!(
///     explained.explanation,
///     "'Living Room Lights' (light) matched with 95% similarity"
/// );
/// ```
pub fn explain(display_name: &str, domain: &str, raw_score: f64) -> Explained {
    let score = bounded_score(raw_score);
    let percent = (score * 100.0).round() as u32;
    Explained {
        score,
        explanation: format!("'{display_name}' ({domain}) matched with {percent}% similarity"),
    }
}

/// Explanation for a substring match on `query`.
pub fn keyword_explanation(query: &str) -> String {
    format!("Keyword match: '{query}'")
}

/// Build a semantic candidate from a vector-index hit.
pub fn semantic_candidate(neighbor: Neighbor) -> Candidate {
    let explained = explain(&neighbor.friendly_name, &neighbor.domain, neighbor.score);
    Candidate {
        entity_id: neighbor.entity_id,
        similarity_score: explained.score,
        explanation: explained.explanation,
        metadata: neighbor.metadata,
        source: MatchSource::Semantic,
    }
}

/// Build a keyword candidate (score 1.0) from a live record.
pub fn keyword_candidate(record: &EntityRecord, explanation: &str) -> Candidate {
    let mut metadata = Attributes::new();
    metadata.insert("domain".into(), Value::from(record.domain()));
    metadata.insert("friendly_name".into(), Value::from(record.friendly_name()));
    if let Some(area) = record.area_id() {
        metadata.insert("area_id".into(), Value::from(area));
    }

    Candidate {
        entity_id: record.entity_id.clone(),
        similarity_score: KEYWORD_SCORE,
        explanation: explanation.to_string(),
        metadata,
        source: MatchSource::Keyword,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_are_bounded_and_rounded() {
        assert_eq!(bounded_score(f64::NAN), 0.0);
        assert_eq!(bounded_score(0.0004), 0.0);
        assert_eq!(bounded_score(0.9996), 1.0);
        assert_eq!(bounded_score(0.12345), 0.123);
    }

    #[test]
    fn negative_similarity_reads_as_zero_percent() {
        let explained = explain("Garage Door", "cover", -0.4);
        assert_eq!(explained.score, 0.0);
        assert!(explained.explanation.ends_with("matched with 0% similarity"));
    }

    #[test]
    fn keyword_candidates_carry_full_score() {
        let record = EntityRecord::new("switch.porch", "on")
            .with_attribute("friendly_name", "Porch Switch")
            .with_attribute("area_id", "porch");
        let candidate = keyword_candidate(&record, &keyword_explanation("porch"));

        assert_eq!(candidate.similarity_score, 1.0);
        assert_eq!(candidate.explanation, "Keyword match: 'porch'");
        assert_eq!(candidate.area_id(), Some("porch"));
        assert_eq!(candidate.source, MatchSource::Keyword);
    }

    #[test]
    fn semantic_candidate_uses_neighbor_metadata() {
        let mut metadata = Attributes::new();
        metadata.insert("area_id".into(), Value::from("kitchen"));
        let candidate = semantic_candidate(Neighbor {
            entity_id: "light.kitchen".into(),
            friendly_name: "Kitchen".into(),
            domain: "light".into(),
            score: 0.87654,
            metadata,
        });

        assert_eq!(candidate.similarity_score, 0.877);
        assert_eq!(candidate.area_id(), Some("kitchen"));
        assert_eq!(
            candidate.explanation,
            "'Kitchen' (light) matched with 88% similarity"
        );
    }
}
