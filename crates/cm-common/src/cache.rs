use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use crate::MatchingResult;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Cache of computed matching results keyed by (job_id, candidate_id).
/// Entries are derived values, never the source of truth: losing the whole
/// cache only costs latency. Reads must exclude expired entries.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Live results for a job, ordered by score descending.
    async fn get_many(
        &self,
        job_id: i64,
        organization_id: i64,
        limit: usize,
    ) -> Result<Vec<MatchingResult>, CacheError>;

    async fn get_one(
        &self,
        job_id: i64,
        candidate_id: i64,
        organization_id: i64,
    ) -> Result<Option<MatchingResult>, CacheError>;

    /// Idempotent write; a second upsert for the same key replaces the row
    /// and resets its expiry.
    async fn upsert(&self, result: &MatchingResult) -> Result<(), CacheError>;

    /// Delete entries matching the given scope. Returns the count deleted.
    async fn invalidate(
        &self,
        organization_id: i64,
        job_id: Option<i64>,
        candidate_id: Option<i64>,
    ) -> Result<u64, CacheError>;

    /// Delete all expired entries. Idempotent; returns the count deleted.
    async fn sweep_expired(&self) -> Result<u64, CacheError>;
}

/// In-memory cache used by tests and cache-only deployments without
/// Postgres.
#[derive(Default)]
pub struct InMemoryResultCache {
    entries: Mutex<HashMap<(i64, i64), MatchingResult>>,
}

impl InMemoryResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResultCache for InMemoryResultCache {
    async fn get_many(
        &self,
        job_id: i64,
        organization_id: i64,
        limit: usize,
    ) -> Result<Vec<MatchingResult>, CacheError> {
        let now = Utc::now();
        let mut results: Vec<MatchingResult> = self
            .entries
            .lock()
            .unwrap()
            .values()
            .filter(|r| {
                r.job_id == job_id && r.organization_id == organization_id && !r.is_expired(now)
            })
            .cloned()
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);
        Ok(results)
    }

    async fn get_one(
        &self,
        job_id: i64,
        candidate_id: i64,
        organization_id: i64,
    ) -> Result<Option<MatchingResult>, CacheError> {
        let now = Utc::now();
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(&(job_id, candidate_id))
            .filter(|r| r.organization_id == organization_id && !r.is_expired(now))
            .cloned())
    }

    async fn upsert(&self, result: &MatchingResult) -> Result<(), CacheError> {
        self.entries
            .lock()
            .unwrap()
            .insert((result.job_id, result.candidate_id), result.clone());
        Ok(())
    }

    async fn invalidate(
        &self,
        organization_id: i64,
        job_id: Option<i64>,
        candidate_id: Option<i64>,
    ) -> Result<u64, CacheError> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();

        entries.retain(|_, r| {
            let in_scope = r.organization_id == organization_id
                && job_id.map_or(true, |id| r.job_id == id)
                && candidate_id.map_or(true, |id| r.candidate_id == id);
            !in_scope
        });

        Ok((before - entries.len()) as u64)
    }

    async fn sweep_expired(&self) -> Result<u64, CacheError> {
        let now = Utc::now();
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, r| !r.is_expired(now));
        Ok((before - entries.len()) as u64)
    }
}
