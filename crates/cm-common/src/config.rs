use std::time::Duration as StdDuration;

use chrono::Duration;

/// Tunables of the composite ranker. The blend weights and the recommend
/// threshold are deliberate constants of the design; they can be overridden
/// through the environment but should not be changed without stakeholder
/// sign-off.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Weight of the embedding similarity in the blended score.
    pub embedding_weight: f64,
    /// Weight of the analysis provider's overall match in the blended score.
    pub analysis_weight: f64,
    /// Similarity above which a degraded analysis recommends the candidate.
    pub recommend_threshold: f64,
    /// Shortlist over-fetch multiplier applied to the requested limit.
    pub shortlist_factor: usize,
    /// Lifetime of a cached matching result.
    pub cache_ttl: Duration,
    /// Wall-clock bound on a single analysis provider call.
    pub analysis_timeout: StdDuration,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            embedding_weight: 0.4,
            analysis_weight: 0.6,
            recommend_threshold: 0.7,
            shortlist_factor: 2,
            cache_ttl: Duration::hours(24),
            analysis_timeout: StdDuration::from_secs(20),
        }
    }
}

fn parse_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<f64>().ok())
        .unwrap_or(default)
}

fn parse_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<i64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

impl MatchConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            embedding_weight: parse_f64("CM_EMBEDDING_WEIGHT", defaults.embedding_weight),
            analysis_weight: parse_f64("CM_ANALYSIS_WEIGHT", defaults.analysis_weight),
            recommend_threshold: parse_f64("CM_RECOMMEND_THRESHOLD", defaults.recommend_threshold),
            shortlist_factor: parse_i64("CM_SHORTLIST_FACTOR", 2) as usize,
            cache_ttl: Duration::hours(parse_i64("CM_CACHE_TTL_HOURS", 24)),
            analysis_timeout: StdDuration::from_secs(
                parse_i64("CM_ANALYSIS_TIMEOUT_SECONDS", 20) as u64
            ),
        }
    }
}
