use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{AnalysisProvider, ProviderError};
use crate::analysis::{analysis_from_value, AiAnalysis};

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider: String,
    pub model: String,
    pub analyze_endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            analyze_endpoint: "http://localhost:8080/v1/analyze".into(),
            api_key: String::new(),
            timeout: Duration::from_secs(20),
        }
    }
}

impl ProviderConfig {
    pub fn from_env() -> Self {
        fn var_or(key: &str, default: String) -> String {
            std::env::var(key).unwrap_or(default)
        }

        fn parse_u64(key: &str, default: u64) -> u64 {
            std::env::var(key)
                .ok()
                .and_then(|raw| raw.parse::<u64>().ok())
                .unwrap_or(default)
        }

        let defaults = Self::default();
        Self {
            provider: var_or("CM_ANALYSIS_PROVIDER", defaults.provider),
            model: var_or("CM_ANALYSIS_MODEL", defaults.model),
            analyze_endpoint: var_or("CM_ANALYSIS_ENDPOINT", defaults.analyze_endpoint),
            api_key: std::env::var("CM_ANALYSIS_API_KEY").unwrap_or_default(),
            timeout: Duration::from_secs(parse_u64("CM_ANALYSIS_TIMEOUT_SECONDS", 20)),
        }
    }
}

/// Analysis provider speaking a JSON-over-HTTP contract: POST the pair
/// summaries, get the `AiAnalysis` shape back. Responses are parsed with
/// field-level defaulting; any shape deviation is a soft `Malformed` error
/// the caller turns into a degraded result.
pub struct HttpAnalysisProvider {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl HttpAnalysisProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ProviderError::Http(err.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, ProviderError> {
        Self::new(ProviderConfig::from_env())
    }
}

/// Some providers wrap the analysis object; accept `{"analysis": {...}}` and
/// `{"result": {...}}` envelopes as well as the bare object.
fn unwrap_envelope(body: &Value) -> &Value {
    for key in ["analysis", "result"] {
        if let Some(inner @ Value::Object(_)) = body.get(key) {
            return inner;
        }
    }
    body
}

#[async_trait]
impl AnalysisProvider for HttpAnalysisProvider {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn analyze(
        &self,
        job_summary: &str,
        candidate_summary: &str,
        similarity_hint: f64,
    ) -> Result<AiAnalysis, ProviderError> {
        let body = json!({
            "model": self.config.model,
            "job": job_summary,
            "candidate": candidate_summary,
            "similarity_hint": similarity_hint,
        });

        let mut request = self.client.post(&self.config.analyze_endpoint).json(&body);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Http(err.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|err| ProviderError::Malformed(err.to_string()))?;

        let analysis = unwrap_envelope(&payload);
        if !analysis.is_object() {
            return Err(ProviderError::Malformed(
                "response body is not a JSON object".into(),
            ));
        }

        debug!(provider = %self.config.provider, "analysis provider responded");
        Ok(analysis_from_value(analysis, similarity_hint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_known_envelopes() {
        let wrapped = json!({"analysis": {"overall_match": 70.0}});
        let bare = json!({"overall_match": 70.0});

        assert_eq!(unwrap_envelope(&wrapped), &bare);
        assert_eq!(unwrap_envelope(&bare), &bare);
    }

    #[test]
    fn non_object_envelope_values_are_ignored() {
        let body = json!({"analysis": "nope", "overall_match": 55.0});

        assert_eq!(unwrap_envelope(&body), &body);
    }

    #[test]
    fn default_config_is_sane() {
        let config = ProviderConfig::default();

        assert_eq!(config.timeout, Duration::from_secs(20));
        assert!(config.analyze_endpoint.starts_with("http"));
    }
}
