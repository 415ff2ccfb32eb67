use serde::Deserialize;
use serde_json::Value;

use super::normalizer::normalize_skill_set;
use super::SkillSet;

/// Shapes the CRUD layer stores in the `skills` column. The payload is
/// normalized exactly once at ingestion; downstream code only ever sees a
/// `SkillSet`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SkillsPayload {
    List(Vec<String>),
    Buckets(SkillBuckets),
    Raw(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SkillBuckets {
    #[serde(default)]
    pub technical: Vec<String>,
    #[serde(default)]
    pub soft: Vec<String>,
    #[serde(default)]
    pub languages: Vec<LanguageSkill>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageSkill {
    pub language: String,
    #[serde(default)]
    pub proficiency: Option<String>,
}

impl SkillsPayload {
    fn into_tokens(self) -> Vec<String> {
        match self {
            SkillsPayload::List(tokens) => tokens,
            SkillsPayload::Buckets(buckets) => {
                let mut tokens = buckets.technical;
                tokens.extend(buckets.soft);
                // The languages bucket contributes only the language name.
                tokens.extend(buckets.languages.into_iter().map(|l| l.language));
                tokens
            }
            SkillsPayload::Raw(raw) => split_raw_tokens(&raw),
        }
    }
}

fn split_raw_tokens(raw: &str) -> Vec<String> {
    raw.split([',', ';', '|', '/'])
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Extract a `SkillSet` from whatever shape the stored payload has. A string
/// payload may itself be JSON-encoded; unknown or unparseable input yields
/// the empty set rather than failing.
pub fn extract_skills(raw: Option<&Value>) -> SkillSet {
    let Some(value) = raw else {
        return SkillSet::new();
    };

    let tokens = match value {
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(inner @ (Value::Array(_) | Value::Object(_))) => decode_tokens(&inner),
            _ => split_raw_tokens(text),
        },
        other => decode_tokens(other),
    };

    normalize_skill_set(tokens)
}

fn decode_tokens(value: &Value) -> Vec<String> {
    serde_json::from_value::<SkillsPayload>(value.clone())
        .map(SkillsPayload::into_tokens)
        .unwrap_or_default()
}
