pub mod candidates;
pub mod jobs;
pub mod match_cache;
pub mod migrations;
pub mod pool;

use async_trait::async_trait;

use crate::cache::{CacheError, ResultCache};
use crate::store::{MatchStore, StoreError};
use crate::{Candidate, Job, MatchingResult};

// Keep re-exports unique so downstream crates see a single symbol per helper.
pub use candidates::{
    fetch_candidate, fetch_candidates, fetch_rankable_candidates, CandidateFetchError,
};
pub use jobs::{fetch_job, JobFetchError};
pub use match_cache::{
    delete_expired, delete_results, fetch_result, fetch_results_for_job, upsert_result,
    MatchCacheStorageError,
};
pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool_from_url, ping, DbPoolError, PgPool};

/// Postgres-backed job/candidate store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MatchStore for PgStore {
    async fn get_job(&self, job_id: i64, organization_id: i64) -> Result<Option<Job>, StoreError> {
        fetch_job(&self.pool, job_id, organization_id)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn get_candidate(
        &self,
        candidate_id: i64,
        organization_id: i64,
    ) -> Result<Option<Candidate>, StoreError> {
        fetch_candidate(&self.pool, candidate_id, organization_id)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn list_rankable_candidates(
        &self,
        organization_id: i64,
    ) -> Result<Vec<Candidate>, StoreError> {
        fetch_rankable_candidates(&self.pool, organization_id)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn list_candidates(&self, organization_id: i64) -> Result<Vec<Candidate>, StoreError> {
        fetch_candidates(&self.pool, organization_id)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

/// Postgres-backed result cache over `ats.matching_results`.
#[derive(Clone)]
pub struct PgResultCache {
    pool: PgPool,
}

impl PgResultCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultCache for PgResultCache {
    async fn get_many(
        &self,
        job_id: i64,
        organization_id: i64,
        limit: usize,
    ) -> Result<Vec<MatchingResult>, CacheError> {
        fetch_results_for_job(&self.pool, job_id, organization_id, limit as i64)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn get_one(
        &self,
        job_id: i64,
        candidate_id: i64,
        organization_id: i64,
    ) -> Result<Option<MatchingResult>, CacheError> {
        fetch_result(&self.pool, job_id, candidate_id, organization_id)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn upsert(&self, result: &MatchingResult) -> Result<(), CacheError> {
        upsert_result(&self.pool, result)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn invalidate(
        &self,
        organization_id: i64,
        job_id: Option<i64>,
        candidate_id: Option<i64>,
    ) -> Result<u64, CacheError> {
        delete_results(&self.pool, organization_id, job_id, candidate_id)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn sweep_expired(&self) -> Result<u64, CacheError> {
        delete_expired(&self.pool)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }
}
