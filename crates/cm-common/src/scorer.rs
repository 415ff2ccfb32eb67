use std::collections::HashSet;

use tracing::warn;

use crate::similarity::cosine_similarity;
use crate::skills::{candidate_skills, normalizer::canonical_skill};
use crate::Candidate;

/// Candidate-to-candidate similarity strategy. Two interchangeable
/// implementations exist; callers pick one by data availability rather than
/// branching at every call site.
pub trait SimilarityScorer: Send + Sync {
    /// Strategy name recorded in logs.
    fn name(&self) -> &'static str;

    /// Similarity in [0, 1], or `None` when the pair cannot be scored by
    /// this strategy.
    fn score(&self, anchor: &Candidate, other: &Candidate) -> Option<f64>;
}

/// Cosine similarity over stored embedding vectors.
pub struct EmbeddingScorer;

impl SimilarityScorer for EmbeddingScorer {
    fn name(&self) -> &'static str {
        "embedding"
    }

    fn score(&self, anchor: &Candidate, other: &Candidate) -> Option<f64> {
        let a = anchor.embedding.as_deref()?;
        let b = other.embedding.as_deref()?;

        match cosine_similarity(a, b) {
            Ok(sim) => Some(f64::from(sim)),
            Err(err) => {
                warn!(
                    anchor_id = anchor.id,
                    other_id = other.id,
                    error = %err,
                    "skipping candidate pair with mismatched embeddings"
                );
                None
            }
        }
    }
}

/// Jaccard overlap of canonicalized skill tokens. Rule-based fallback for
/// candidates that have no embedding yet.
pub struct KeywordScorer;

fn canonical_set(candidate: &Candidate) -> HashSet<String> {
    candidate_skills(candidate)
        .iter()
        .map(|token| canonical_skill(token))
        .collect()
}

impl SimilarityScorer for KeywordScorer {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn score(&self, anchor: &Candidate, other: &Candidate) -> Option<f64> {
        let a = canonical_set(anchor);
        if a.is_empty() {
            return None;
        }
        let b = canonical_set(other);
        if b.is_empty() {
            return Some(0.0);
        }

        let intersection = a.intersection(&b).count();
        let union = a.union(&b).count();
        Some(intersection as f64 / union as f64)
    }
}
