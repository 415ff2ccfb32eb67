use serde::{Deserialize, Serialize};
use serde_json::Value;

const MAX_LIST_ITEMS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    HighlyRecommended,
    Recommended,
    Consider,
    NotRecommended,
}

impl Recommendation {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "highly_recommended" | "highly recommended" => Some(Recommendation::HighlyRecommended),
            "recommended" => Some(Recommendation::Recommended),
            "consider" => Some(Recommendation::Consider),
            "not_recommended" | "not recommended" => Some(Recommendation::NotRecommended),
            _ => None,
        }
    }

    /// Banding used when the provider omits an explicit recommendation.
    pub fn from_overall(overall: f64) -> Self {
        match overall {
            o if o >= 85.0 => Recommendation::HighlyRecommended,
            o if o >= 70.0 => Recommendation::Recommended,
            o if o >= 50.0 => Recommendation::Consider,
            _ => Recommendation::NotRecommended,
        }
    }
}

/// Qualitative assessment of a job/candidate pair. Provider-owned shape;
/// `degraded` marks results synthesized locally after a provider failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub overall_match: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub reasoning: String,
    pub recommendation: Recommendation,
    #[serde(default)]
    pub degraded: bool,
}

impl AiAnalysis {
    /// Fallback analysis derived purely from the embedding similarity, used
    /// when the provider fails, times out, or returns unparseable output.
    /// The ranking call itself never fails because of one candidate.
    pub fn degraded_from_similarity(similarity: f64, recommend_threshold: f64) -> Self {
        let overall = (similarity * 100.0).round().clamp(0.0, 100.0);
        let recommendation = if similarity > recommend_threshold {
            Recommendation::Recommended
        } else {
            Recommendation::Consider
        };

        Self {
            overall_match: overall,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            reasoning: "analysis unavailable; score derived from embedding similarity".into(),
            recommendation,
            degraded: true,
        }
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| item.as_str().map(|s| s.to_string()))
        .take(MAX_LIST_ITEMS)
        .collect()
}

/// Build an `AiAnalysis` from a parsed provider payload with field-level
/// defaulting: a missing or out-of-range `overall_match` falls back to the
/// similarity hint, lists are truncated to three entries, and a missing
/// recommendation is derived from the overall score. Never fails on shape.
pub fn analysis_from_value(payload: &Value, similarity_hint: f64) -> AiAnalysis {
    let hint_overall = (similarity_hint * 100.0).round().clamp(0.0, 100.0);

    let overall_match = payload
        .get("overall_match")
        .and_then(Value::as_f64)
        .filter(|v| (0.0..=100.0).contains(v))
        .unwrap_or(hint_overall);

    let recommendation = payload
        .get("recommendation")
        .and_then(Value::as_str)
        .and_then(Recommendation::parse)
        .unwrap_or_else(|| Recommendation::from_overall(overall_match));

    let reasoning = payload
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or("no reasoning provided")
        .to_string();

    AiAnalysis {
        overall_match,
        strengths: string_list(payload.get("strengths")),
        weaknesses: string_list(payload.get("weaknesses")),
        reasoning,
        recommendation,
        degraded: false,
    }
}
