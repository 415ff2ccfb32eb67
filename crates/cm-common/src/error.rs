use thiserror::Error;

use crate::cache::CacheError;
use crate::similarity::DimensionMismatch;
use crate::store::StoreError;

/// Errors that abort a whole ranking call. Per-candidate analysis failures
/// never surface here; they degrade into `AiAnalysis::degraded` results.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error(transparent)]
    Dimension(#[from] DimensionMismatch),
    #[error("{entity} {id} has no embedding")]
    MissingEmbedding { entity: &'static str, id: i64 },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

impl MatchError {
    pub fn job_not_found(id: i64) -> Self {
        MatchError::NotFound { entity: "job", id }
    }

    pub fn candidate_not_found(id: i64) -> Self {
        MatchError::NotFound {
            entity: "candidate",
            id,
        }
    }

    pub fn missing_job_embedding(id: i64) -> Self {
        MatchError::MissingEmbedding { entity: "job", id }
    }
}
