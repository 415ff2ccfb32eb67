use deadpool_postgres::PoolError;
use thiserror::Error;
use tokio_postgres::Error as PgError;
use tracing::{info, instrument};

use crate::db::{DbPoolError, PgPool};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("failed to run migration: {0}")]
    Postgres(#[from] PgError),
    #[error("failed to build pool: {0}")]
    PoolBuild(#[from] DbPoolError),
}

struct Migration {
    id: i32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        id: 1,
        description: "base schema: jobs, candidates, matching_results",
        sql: r#"
CREATE TABLE IF NOT EXISTS ats.jobs (
    id BIGSERIAL PRIMARY KEY,
    organization_id BIGINT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    requirements TEXT,
    skills JSONB,
    embedding REAL[],
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_jobs_org ON ats.jobs(organization_id);

CREATE TABLE IF NOT EXISTS ats.candidates (
    id BIGSERIAL PRIMARY KEY,
    organization_id BIGINT NOT NULL,
    full_name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    summary TEXT,
    skills JSONB,
    embedding REAL[],
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_candidates_org_status
    ON ats.candidates(organization_id, status);

CREATE TABLE IF NOT EXISTS ats.matching_results (
    id BIGSERIAL PRIMARY KEY,
    job_id BIGINT NOT NULL,
    candidate_id BIGINT NOT NULL,
    organization_id BIGINT NOT NULL,
    score DOUBLE PRECISION NOT NULL,
    embedding_similarity DOUBLE PRECISION NOT NULL,
    skill_matches JSONB NOT NULL DEFAULT '{}'::jsonb,
    ai_analysis JSONB,
    calculated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    expires_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT uq_matching_results_pair UNIQUE (job_id, candidate_id)
);

CREATE INDEX IF NOT EXISTS idx_matching_results_job_score
    ON ats.matching_results(organization_id, job_id, score DESC);
CREATE INDEX IF NOT EXISTS idx_matching_results_expiry
    ON ats.matching_results(expires_at);
"#,
    },
    Migration {
        id: 2,
        description: "safety checks for candidate status + score ranges",
        sql: r#"
DO $$
BEGIN
    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'chk_candidate_status'
    ) THEN
        ALTER TABLE ats.candidates
            ADD CONSTRAINT chk_candidate_status
            CHECK (status IN (
                'active', 'screening', 'interviewing',
                'offered', 'hired', 'rejected', 'blacklisted'
            ));
    END IF;

    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'chk_similarity_range'
    ) THEN
        ALTER TABLE ats.matching_results
            ADD CONSTRAINT chk_similarity_range
            CHECK (embedding_similarity >= -1.0 AND embedding_similarity <= 1.0);
    END IF;
END $$;
"#,
    },
];

#[instrument(skip(pool))]
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    let mut client = pool.get().await?;
    client
        .batch_execute(
            "CREATE SCHEMA IF NOT EXISTS ats;
             CREATE TABLE IF NOT EXISTS ats.schema_migrations (
                id INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
             );",
        )
        .await?;

    for migration in MIGRATIONS {
        let already_applied: bool = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM ats.schema_migrations WHERE id = $1)",
                &[&migration.id],
            )
            .await?
            .get(0);

        if already_applied {
            continue;
        }

        let tx = client.transaction().await?;
        tx.batch_execute(migration.sql).await?;
        tx.execute(
            "INSERT INTO ats.schema_migrations (id, description) VALUES ($1, $2)",
            &[&migration.id, &migration.description],
        )
        .await?;
        tx.commit().await?;

        info!(
            id = migration.id,
            description = migration.description,
            "applied migration"
        );
    }

    Ok(())
}
