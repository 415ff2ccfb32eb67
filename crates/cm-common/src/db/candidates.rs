use deadpool_postgres::PoolError;
use serde_json::Value;
use tokio_postgres::Error as PgError;
use tokio_postgres::Row;
use tracing::instrument;

use crate::db::PgPool;
use crate::{Candidate, CandidateStatus};

#[derive(Debug, thiserror::Error)]
pub enum CandidateFetchError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
    #[error("failed to map candidate row: {0}")]
    Mapping(String),
}

const CANDIDATE_COLUMNS: &str =
    "id, organization_id, full_name, status, summary, skills, embedding";

fn candidate_from_row(row: &Row) -> Result<Candidate, CandidateFetchError> {
    let raw_status: String = row.get("status");
    let status = CandidateStatus::parse(&raw_status)
        .ok_or_else(|| CandidateFetchError::Mapping(format!("unknown status '{raw_status}'")))?;

    Ok(Candidate {
        id: row.get("id"),
        organization_id: row.get("organization_id"),
        full_name: row.get("full_name"),
        status,
        summary: row.get("summary"),
        skills: row.get::<_, Option<Value>>("skills"),
        embedding: row.get::<_, Option<Vec<f32>>>("embedding"),
    })
}

#[instrument(skip(pool))]
pub async fn fetch_candidate(
    pool: &PgPool,
    candidate_id: i64,
    organization_id: i64,
) -> Result<Option<Candidate>, CandidateFetchError> {
    let client = pool.get().await?;

    let query = format!(
        "SELECT {CANDIDATE_COLUMNS} FROM ats.candidates \
         WHERE id = $1 AND organization_id = $2"
    );
    let row = client
        .query_opt(&query, &[&candidate_id, &organization_id])
        .await?;

    row.as_ref().map(candidate_from_row).transpose()
}

/// Candidates eligible for embedding-based ranking: not rejected or
/// blacklisted, and already embedded.
#[instrument(skip(pool))]
pub async fn fetch_rankable_candidates(
    pool: &PgPool,
    organization_id: i64,
) -> Result<Vec<Candidate>, CandidateFetchError> {
    let client = pool.get().await?;

    let query = format!(
        "SELECT {CANDIDATE_COLUMNS} FROM ats.candidates \
         WHERE organization_id = $1 \
           AND status NOT IN ('rejected', 'blacklisted') \
           AND embedding IS NOT NULL \
         ORDER BY id"
    );
    let rows = client.query(&query, &[&organization_id]).await?;

    rows.iter().map(candidate_from_row).collect()
}

/// All non-rejected candidates, embedded or not. Feeds the keyword-overlap
/// path of similar-candidate search.
#[instrument(skip(pool))]
pub async fn fetch_candidates(
    pool: &PgPool,
    organization_id: i64,
) -> Result<Vec<Candidate>, CandidateFetchError> {
    let client = pool.get().await?;

    let query = format!(
        "SELECT {CANDIDATE_COLUMNS} FROM ats.candidates \
         WHERE organization_id = $1 \
           AND status NOT IN ('rejected', 'blacklisted') \
         ORDER BY id"
    );
    let rows = client.query(&query, &[&organization_id]).await?;

    rows.iter().map(candidate_from_row).collect()
}
