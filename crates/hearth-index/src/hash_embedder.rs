//! Deterministic offline embedder using signed FNV-1a feature hashing.
//!
//! Each normalized token and each adjacent-token bigram is hashed into one
//! of `dimensions` buckets with a hash-derived sign, then the vector is
//! L2-normalized. Texts sharing words land close together; no model files
//! or network access are needed.

use async_trait::async_trait;
use hearth_core::HearthError;

use crate::embedding::Embedder;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;
const BIGRAM_WEIGHT: f32 = 0.5;

/// Feature-hashing embedder.
///
/// # Examples
///
/// ```
/// use hearth_index::hash_embedder::HashEmbedder;
///
/// let embedder = HashEmbedder::new(64).unwrap();
/// let v = embedder.embed_text("Living Room Lights").unwrap();
/// assert_eq!(v.len(), 64);
/// ```
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    model: String,
    dimensions: usize,
}

impl HashEmbedder {
    /// Create an embedder named `hash-<dimensions>`.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Config`] if `dimensions` is zero.
    pub fn new(dimensions: usize) -> Result<Self, HearthError> {
        Self::with_model(&format!("hash-{dimensions}"), dimensions)
    }

    /// Create an embedder with an explicit model name.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Config`] if `dimensions` is zero.
    pub fn with_model(model: &str, dimensions: usize) -> Result<Self, HearthError> {
        if dimensions == 0 {
            return Err(HearthError::Config(
                "embedding.dimensions must be greater than zero".into(),
            ));
        }
        Ok(Self {
            model: model.to_string(),
            dimensions,
        })
    }

    /// Number of vector components.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed one text synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Embedding`] if the text contains no tokens.
    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>, HearthError> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Err(HearthError::Embedding(format!(
                "text has no indexable tokens: {text:?}"
            )));
        }

        let mut vector = vec![0.0f32; self.dimensions];
        for token in &tokens {
            self.accumulate(&mut vector, token, 1.0);
        }
        for pair in tokens.windows(2) {
            self.accumulate(&mut vector, &format!("{} {}", pair[0], pair[1]), BIGRAM_WEIGHT);
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        Ok(vector)
    }

    fn accumulate(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let hash = fnv1a(feature);
        let bucket = (hash % self.dimensions as u64) as usize;
        let sign = if (hash >> 32) & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, HearthError> {
        texts.iter().map(|text| self.embed_text(text)).collect()
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, HearthError> {
        self.embed_text(text)
    }
}

fn fnv1a(s: &str) -> u64 {
    let mut hash = FNV_OFFSET;
    for byte in s.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Lowercase alphanumeric tokens with plural suffixes folded.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| fold_plural(&t.to_lowercase()))
        .collect()
}

fn fold_plural(token: &str) -> String {
    let len = token.chars().count();
    if len > 4 && ["ches", "shes", "sses", "xes"].iter().any(|s| token.ends_with(s)) {
        return token[..token.len() - 2].to_string();
    }
    if len > 3 && token.ends_with('s') && !token.ends_with("ss") && !token.ends_with("us") {
        return token[..token.len() - 1].to_string();
    }
    token.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn vectors_are_unit_length() {
        let embedder = HashEmbedder::new(128).unwrap();
        let v = embedder.embed_text("Kitchen ceiling light").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn embedding_is_deterministic() {
        let embedder = HashEmbedder::new(128).unwrap();
        assert_eq!(
            embedder.embed_text("porch light").unwrap(),
            embedder.embed_text("porch light").unwrap()
        );
    }

    #[test]
    fn shared_words_score_higher_than_unrelated_text() {
        let embedder = HashEmbedder::new(256).unwrap();
        let query = embedder.embed_text("living room lights").unwrap();
        let close = embedder
            .embed_text("Living Room Light light living room")
            .unwrap();
        let far = embedder.embed_text("Garage door opener cover").unwrap();
        assert!(cosine(&query, &close) > cosine(&query, &far));
        assert!(cosine(&query, &close) > 0.5);
    }

    #[test]
    fn plurals_fold_to_singular() {
        assert_eq!(tokenize("Lights, switches & glass boxes"), [
            "light", "switch", "glass", "box"
        ]);
        assert_eq!(tokenize("status bus"), ["status", "bus"]);
    }

    #[test]
    fn punctuation_only_text_cannot_be_embedded() {
        let embedder = HashEmbedder::new(16).unwrap();
        assert!(matches!(
            embedder.embed_text("?!  --"),
            Err(HearthError::Embedding(_))
        ));
    }

    #[test]
    fn zero_dimensions_rejected() {
        assert!(HashEmbedder::new(0).is_err());
    }

    #[test]
    fn fnv1a_matches_reference_values() {
        assert_eq!(fnv1a(""), FNV_OFFSET);
        assert_eq!(fnv1a("a"), 0xaf63_dc4c_8601_ec8c);
    }
}
