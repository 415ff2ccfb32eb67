use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use cm_common::{MatchingResult, SimilarCandidate};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::SharedState;

const DEFAULT_MATCH_LIMIT: usize = 50;
const MAX_MATCH_LIMIT: usize = 200;

fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_MATCH_LIMIT).clamp(1, MAX_MATCH_LIMIT)
}

#[derive(Debug, Default, Deserialize)]
pub struct MatchJobRequest {
    pub limit: Option<usize>,
    #[serde(default)]
    pub force_rematch: bool,
}

#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct InvalidateRequest {
    pub job_id: Option<i64>,
    pub candidate_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    pub deleted: u64,
}

/// Rank candidates for a job. Serves the cached ranking when one is live;
/// `force_rematch` recomputes unconditionally.
pub async fn match_job(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(job_id): Path<i64>,
    request: Option<Json<MatchJobRequest>>,
) -> Result<Json<Vec<MatchingResult>>, ApiError> {
    let Json(request) = request.unwrap_or_default();
    let limit = clamp_limit(request.limit);

    let results = state
        .service
        .find_best_candidates_for_job(job_id, auth.organization_id, limit, request.force_rematch)
        .await?;

    Ok(Json(results))
}

/// Candidates most similar to the given candidate.
pub async fn similar_candidates(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(candidate_id): Path<i64>,
    Query(query): Query<SimilarQuery>,
) -> Result<Json<Vec<SimilarCandidate>>, ApiError> {
    let limit = clamp_limit(query.limit);

    let results = state
        .service
        .find_similar_candidates(candidate_id, auth.organization_id, limit)
        .await?;

    Ok(Json(results))
}

/// Cached detail for one (job, candidate) pair. Pure lookup; a miss is a 404
/// and never triggers computation.
pub async fn get_match(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path((job_id, candidate_id)): Path<(i64, i64)>,
) -> Result<Json<MatchingResult>, ApiError> {
    let result = state
        .service
        .get_cached_result(job_id, candidate_id, auth.organization_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "no cached match for job {job_id} and candidate {candidate_id}"
            ))
        })?;

    Ok(Json(result))
}

/// Drop cached results after a job or candidate edit. At least one filter is
/// required; an unfiltered call would silently clear the whole organization.
pub async fn invalidate_matches(
    State(state): State<SharedState>,
    auth: AuthUser,
    Json(request): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>, ApiError> {
    if request.job_id.is_none() && request.candidate_id.is_none() {
        return Err(ApiError::BadRequest(
            "job_id or candidate_id is required".into(),
        ));
    }

    let deleted = state
        .service
        .invalidate(auth.organization_id, request.job_id, request.candidate_id)
        .await?;

    Ok(Json(InvalidateResponse { deleted }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(clamp_limit(None), 50);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(10)), 10);
        assert_eq!(clamp_limit(Some(10_000)), 200);
    }
}
