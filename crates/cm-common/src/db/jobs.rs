use deadpool_postgres::PoolError;
use serde_json::Value;
use tokio_postgres::Error as PgError;
use tokio_postgres::Row;
use tracing::instrument;

use crate::db::PgPool;
use crate::Job;

#[derive(Debug, thiserror::Error)]
pub enum JobFetchError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
}

const JOB_COLUMNS: &str =
    "id, organization_id, title, description, requirements, skills, embedding";

fn job_from_row(row: &Row) -> Job {
    Job {
        id: row.get("id"),
        organization_id: row.get("organization_id"),
        title: row.get("title"),
        description: row.get("description"),
        requirements: row.get("requirements"),
        skills: row.get::<_, Option<Value>>("skills"),
        embedding: row.get::<_, Option<Vec<f32>>>("embedding"),
    }
}

#[instrument(skip(pool))]
pub async fn fetch_job(
    pool: &PgPool,
    job_id: i64,
    organization_id: i64,
) -> Result<Option<Job>, JobFetchError> {
    let client = pool.get().await?;

    let query = format!(
        "SELECT {JOB_COLUMNS} FROM ats.jobs WHERE id = $1 AND organization_id = $2"
    );
    let row = client.query_opt(&query, &[&job_id, &organization_id]).await?;

    Ok(row.as_ref().map(job_from_row))
}
