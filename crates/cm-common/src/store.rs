use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::{Candidate, Job};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Read access to job/candidate records. Every accessor takes the
/// organization id; implementations must scope every query by it and never
/// trust a bare record id.
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn get_job(&self, job_id: i64, organization_id: i64) -> Result<Option<Job>, StoreError>;

    async fn get_candidate(
        &self,
        candidate_id: i64,
        organization_id: i64,
    ) -> Result<Option<Candidate>, StoreError>;

    /// Candidates eligible for ranking: embedded, and neither rejected nor
    /// blacklisted.
    async fn list_rankable_candidates(
        &self,
        organization_id: i64,
    ) -> Result<Vec<Candidate>, StoreError>;

    /// All non-rejected candidates of the organization, embedded or not.
    /// Used by the keyword-scorer path of similar-candidate search.
    async fn list_candidates(&self, organization_id: i64) -> Result<Vec<Candidate>, StoreError>;
}

/// In-memory store used by tests and demo setups.
#[derive(Default)]
pub struct InMemoryStore {
    jobs: Mutex<HashMap<i64, Job>>,
    candidates: Mutex<HashMap<i64, Candidate>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_job(&self, job: Job) {
        self.jobs.lock().unwrap().insert(job.id, job);
    }

    pub fn insert_candidate(&self, candidate: Candidate) {
        self.candidates
            .lock()
            .unwrap()
            .insert(candidate.id, candidate);
    }
}

#[async_trait]
impl MatchStore for InMemoryStore {
    async fn get_job(&self, job_id: i64, organization_id: i64) -> Result<Option<Job>, StoreError> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .get(&job_id)
            .filter(|job| job.organization_id == organization_id)
            .cloned())
    }

    async fn get_candidate(
        &self,
        candidate_id: i64,
        organization_id: i64,
    ) -> Result<Option<Candidate>, StoreError> {
        Ok(self
            .candidates
            .lock()
            .unwrap()
            .get(&candidate_id)
            .filter(|candidate| candidate.organization_id == organization_id)
            .cloned())
    }

    async fn list_rankable_candidates(
        &self,
        organization_id: i64,
    ) -> Result<Vec<Candidate>, StoreError> {
        Ok(self
            .candidates
            .lock()
            .unwrap()
            .values()
            .filter(|c| {
                c.organization_id == organization_id
                    && c.status.is_rankable()
                    && c.embedding.is_some()
            })
            .cloned()
            .collect())
    }

    async fn list_candidates(&self, organization_id: i64) -> Result<Vec<Candidate>, StoreError> {
        Ok(self
            .candidates
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.organization_id == organization_id && c.status.is_rankable())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CandidateStatus;

    fn candidate(id: i64, org: i64, status: CandidateStatus, embedded: bool) -> Candidate {
        Candidate {
            id,
            organization_id: org,
            full_name: format!("candidate-{id}"),
            status,
            embedding: embedded.then(|| vec![1.0, 0.0]),
            ..Candidate::default()
        }
    }

    #[tokio::test]
    async fn org_scope_is_enforced_on_lookups() {
        let store = InMemoryStore::new();
        store.insert_job(Job {
            id: 1,
            organization_id: 10,
            title: "Engineer".into(),
            ..Job::default()
        });

        assert!(store.get_job(1, 10).await.unwrap().is_some());
        assert!(store.get_job(1, 99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rankable_listing_excludes_rejected_blacklisted_and_unembedded() {
        let store = InMemoryStore::new();
        store.insert_candidate(candidate(1, 10, CandidateStatus::Active, true));
        store.insert_candidate(candidate(2, 10, CandidateStatus::Rejected, true));
        store.insert_candidate(candidate(3, 10, CandidateStatus::Blacklisted, true));
        store.insert_candidate(candidate(4, 10, CandidateStatus::Active, false));
        store.insert_candidate(candidate(5, 11, CandidateStatus::Active, true));

        let rankable = store.list_rankable_candidates(10).await.unwrap();

        assert_eq!(rankable.len(), 1);
        assert_eq!(rankable[0].id, 1);
    }
}
