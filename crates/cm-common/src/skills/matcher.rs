use serde::{Deserialize, Serialize};

use super::normalizer::canonical_skill;
use super::SkillSet;

/// Outcome of comparing a job's required skills against a candidate's.
/// Invariants: `matched ∪ missing = required` and `matched ∩ missing = ∅`
/// under the variant-aware equality; `additional` holds candidate tokens that
/// match no required token. All lists are sorted for deterministic output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillMatchResult {
    pub required: Vec<String>,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    pub additional: Vec<String>,
}

/// Two tokens name the same skill when they are equal or share a variant
/// group. Symmetric by construction; not transitive beyond group membership.
pub fn skills_match(a: &str, b: &str) -> bool {
    canonical_skill(a) == canonical_skill(b)
}

pub fn match_skill_sets(required: &SkillSet, candidate: &SkillSet) -> SkillMatchResult {
    let mut matched = Vec::new();
    let mut missing = Vec::new();

    for token in required {
        if candidate.iter().any(|c| skills_match(token, c)) {
            matched.push(token.clone());
        } else {
            missing.push(token.clone());
        }
    }

    let mut additional: Vec<String> = candidate
        .iter()
        .filter(|c| !required.iter().any(|r| skills_match(r, c)))
        .cloned()
        .collect();

    let mut required: Vec<String> = required.iter().cloned().collect();
    required.sort();
    matched.sort();
    missing.sort();
    additional.sort();

    SkillMatchResult {
        required,
        matched,
        missing,
        additional,
    }
}
