use chrono::{DateTime, Utc};
use deadpool_postgres::PoolError;
use serde_json::Value;
use tokio_postgres::types::{Json, ToSql};
use tokio_postgres::Error as PgError;
use tokio_postgres::Row;
use tracing::instrument;

use crate::db::PgPool;
use crate::{AiAnalysis, MatchingResult, SkillMatchResult};

#[derive(Debug, thiserror::Error)]
pub enum MatchCacheStorageError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
    #[error("failed to map matching result row: {0}")]
    Mapping(String),
}

const RESULT_COLUMNS: &str = "candidate_id, job_id, organization_id, score, \
     embedding_similarity, skill_matches, ai_analysis, calculated_at, expires_at";

fn result_from_row(row: &Row) -> Result<MatchingResult, MatchCacheStorageError> {
    let skill_matches: SkillMatchResult =
        serde_json::from_value(row.get::<_, Value>("skill_matches"))
            .map_err(|e| MatchCacheStorageError::Mapping(e.to_string()))?;

    let ai_analysis: Option<AiAnalysis> = row
        .get::<_, Option<Value>>("ai_analysis")
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| MatchCacheStorageError::Mapping(e.to_string()))?;

    Ok(MatchingResult {
        candidate_id: row.get("candidate_id"),
        job_id: row.get("job_id"),
        organization_id: row.get("organization_id"),
        score: row.get("score"),
        embedding_similarity: row.get("embedding_similarity"),
        skill_matches,
        ai_analysis,
        calculated_at: row.get::<_, DateTime<Utc>>("calculated_at"),
        expires_at: row.get::<_, DateTime<Utc>>("expires_at"),
    })
}

/// Live (unexpired) results for a job, best score first.
#[instrument(skip(pool))]
pub async fn fetch_results_for_job(
    pool: &PgPool,
    job_id: i64,
    organization_id: i64,
    limit: i64,
) -> Result<Vec<MatchingResult>, MatchCacheStorageError> {
    let client = pool.get().await?;

    let query = format!(
        "SELECT {RESULT_COLUMNS} FROM ats.matching_results \
         WHERE job_id = $1 AND organization_id = $2 AND expires_at > NOW() \
         ORDER BY score DESC \
         LIMIT $3"
    );
    let rows = client
        .query(&query, &[&job_id, &organization_id, &limit])
        .await?;

    rows.iter().map(result_from_row).collect()
}

#[instrument(skip(pool))]
pub async fn fetch_result(
    pool: &PgPool,
    job_id: i64,
    candidate_id: i64,
    organization_id: i64,
) -> Result<Option<MatchingResult>, MatchCacheStorageError> {
    let client = pool.get().await?;

    let query = format!(
        "SELECT {RESULT_COLUMNS} FROM ats.matching_results \
         WHERE job_id = $1 AND candidate_id = $2 \
           AND organization_id = $3 AND expires_at > NOW()"
    );
    let row = client
        .query_opt(&query, &[&job_id, &candidate_id, &organization_id])
        .await?;

    row.as_ref().map(result_from_row).transpose()
}

/// Write one computed result; a rematch for the same (job, candidate) pair
/// replaces the old row and resets its expiry.
#[instrument(skip(pool, result))]
pub async fn upsert_result(
    pool: &PgPool,
    result: &MatchingResult,
) -> Result<(), MatchCacheStorageError> {
    let client = pool.get().await?;

    let skill_matches = serde_json::to_value(&result.skill_matches)
        .map_err(|e| MatchCacheStorageError::Mapping(e.to_string()))?;
    let ai_analysis = result
        .ai_analysis
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| MatchCacheStorageError::Mapping(e.to_string()))?;

    let stmt = client
        .prepare(
            "INSERT INTO ats.matching_results (
                candidate_id,
                job_id,
                organization_id,
                score,
                embedding_similarity,
                skill_matches,
                ai_analysis,
                calculated_at,
                expires_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9
            )
            ON CONFLICT (job_id, candidate_id) DO UPDATE SET
                organization_id = EXCLUDED.organization_id,
                score = EXCLUDED.score,
                embedding_similarity = EXCLUDED.embedding_similarity,
                skill_matches = EXCLUDED.skill_matches,
                ai_analysis = EXCLUDED.ai_analysis,
                calculated_at = EXCLUDED.calculated_at,
                expires_at = EXCLUDED.expires_at;",
        )
        .await?;

    client
        .execute(
            &stmt,
            &[
                &result.candidate_id,
                &result.job_id,
                &result.organization_id,
                &result.score,
                &result.embedding_similarity,
                &Json(&skill_matches),
                &ai_analysis.as_ref().map(Json),
                &result.calculated_at,
                &result.expires_at,
            ],
        )
        .await?;

    Ok(())
}

/// Delete cached results in the given scope. `None` filters widen the scope;
/// `delete_results(pool, org, None, None)` clears the whole organization.
#[instrument(skip(pool))]
pub async fn delete_results(
    pool: &PgPool,
    organization_id: i64,
    job_id: Option<i64>,
    candidate_id: Option<i64>,
) -> Result<u64, MatchCacheStorageError> {
    let client = pool.get().await?;

    let mut conditions = vec!["organization_id = $1".to_string()];
    let mut params: Vec<&(dyn ToSql + Sync)> = vec![&organization_id];

    if let Some(job_id) = &job_id {
        params.push(job_id);
        conditions.push(format!("job_id = ${}", params.len()));
    }
    if let Some(candidate_id) = &candidate_id {
        params.push(candidate_id);
        conditions.push(format!("candidate_id = ${}", params.len()));
    }

    let query = format!(
        "DELETE FROM ats.matching_results WHERE {}",
        conditions.join(" AND ")
    );
    let deleted = client.execute(&query, &params).await?;

    Ok(deleted)
}

/// Remove rows past their expiry. Idempotent; the sweeper calls this on an
/// interval so expired rows never pile up.
#[instrument(skip(pool))]
pub async fn delete_expired(pool: &PgPool) -> Result<u64, MatchCacheStorageError> {
    let client = pool.get().await?;

    let deleted = client
        .execute(
            "DELETE FROM ats.matching_results WHERE expires_at <= NOW()",
            &[],
        )
        .await?;

    Ok(deleted)
}
