pub mod extract;
pub mod matcher;
pub mod normalizer;
pub mod vocabulary;

use std::collections::HashSet;

pub use extract::{extract_skills, SkillsPayload};
pub use matcher::{match_skill_sets, skills_match, SkillMatchResult};
pub use normalizer::{canonical_skill, normalize_skill_set, normalize_token};
pub use vocabulary::scan_vocabulary;

use crate::{Candidate, Job};

/// Set of lowercase, trimmed skill tokens.
pub type SkillSet = HashSet<String>;

/// Required skills for a job. Structured extraction wins; the free-text
/// vocabulary scan is a fallback only and is never merged with structured
/// results.
pub fn job_required_skills(job: &Job) -> SkillSet {
    let structured = extract_skills(job.skills.as_ref());
    if !structured.is_empty() {
        return structured;
    }

    scan_vocabulary(&job.summary_text())
}

pub fn candidate_skills(candidate: &Candidate) -> SkillSet {
    extract_skills(candidate.skills.as_ref())
}
