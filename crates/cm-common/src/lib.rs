pub mod analysis;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod providers;
pub mod ranker;
pub mod scorer;
pub mod similarity;
pub mod skills;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use analysis::{AiAnalysis, Recommendation};
pub use config::MatchConfig;
pub use error::MatchError;
pub use skills::matcher::SkillMatchResult;

/// Candidate pipeline status. `Rejected` and `Blacklisted` candidates are
/// excluded from ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Active,
    Screening,
    Interviewing,
    Offered,
    Hired,
    Rejected,
    Blacklisted,
}

impl CandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateStatus::Active => "active",
            CandidateStatus::Screening => "screening",
            CandidateStatus::Interviewing => "interviewing",
            CandidateStatus::Offered => "offered",
            CandidateStatus::Hired => "hired",
            CandidateStatus::Rejected => "rejected",
            CandidateStatus::Blacklisted => "blacklisted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(CandidateStatus::Active),
            "screening" => Some(CandidateStatus::Screening),
            "interviewing" => Some(CandidateStatus::Interviewing),
            "offered" => Some(CandidateStatus::Offered),
            "hired" => Some(CandidateStatus::Hired),
            "rejected" => Some(CandidateStatus::Rejected),
            "blacklisted" => Some(CandidateStatus::Blacklisted),
            _ => None,
        }
    }

    pub fn is_rankable(&self) -> bool {
        !matches!(self, CandidateStatus::Rejected | CandidateStatus::Blacklisted)
    }
}

// Commonly used data models for matching functions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub organization_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub requirements: Option<String>,
    /// Raw skills payload as stored by the CRUD layer; normalized once at
    /// ingestion via `skills::extract_skills`.
    pub skills: Option<Value>,
    pub embedding: Option<Vec<f32>>,
}

impl Job {
    /// Free text fed to the fallback vocabulary scan and the analysis prompt.
    pub fn summary_text(&self) -> String {
        let mut parts = vec![self.title.clone()];
        if let Some(description) = &self.description {
            parts.push(description.clone());
        }
        if let Some(requirements) = &self.requirements {
            parts.push(requirements.clone());
        }
        parts.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    pub organization_id: i64,
    pub full_name: String,
    pub status: CandidateStatus,
    pub summary: Option<String>,
    pub skills: Option<Value>,
    pub embedding: Option<Vec<f32>>,
}

impl Default for Candidate {
    fn default() -> Self {
        Self {
            id: 0,
            organization_id: 0,
            full_name: String::new(),
            status: CandidateStatus::Active,
            summary: None,
            skills: None,
            embedding: None,
        }
    }
}

impl Candidate {
    pub fn summary_text(&self) -> String {
        let mut parts = vec![self.full_name.clone()];
        if let Some(summary) = &self.summary {
            parts.push(summary.clone());
        }
        parts.join("\n")
    }
}

/// A computed match between one job and one candidate. Upserted into the
/// result cache keyed by (job_id, candidate_id); at most one live row per
/// pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingResult {
    pub candidate_id: i64,
    pub job_id: i64,
    pub organization_id: i64,
    /// Blended composite score on a 0..100 scale.
    pub score: f64,
    /// Raw cosine similarity, [-1, 1] (practically [0, 1] for these
    /// embeddings).
    pub embedding_similarity: f64,
    pub skill_matches: SkillMatchResult,
    pub ai_analysis: Option<AiAnalysis>,
    pub calculated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl MatchingResult {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// One candidate-to-candidate similarity entry. Never cached and never
/// enriched with analysis, so it carries no job or expiry fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarCandidate {
    pub candidate_id: i64,
    pub organization_id: i64,
    /// Similarity on the 0..100 score scale.
    pub score: f64,
    /// Raw similarity from the active scorer strategy.
    pub similarity: f64,
    pub skill_matches: SkillMatchResult,
}
