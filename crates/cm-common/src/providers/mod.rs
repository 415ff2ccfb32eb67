pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::analysis::AiAnalysis;

pub use http::{HttpAnalysisProvider, ProviderConfig};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(String),
    #[error("provider call timed out")]
    Timeout,
    #[error("provider returned status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// External qualitative-analysis provider. Callers bound every invocation
/// with a timeout and degrade per candidate on any error; implementations
/// never need retry loops of their own.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Implementation name recorded in logs.
    fn name(&self) -> &'static str;

    async fn analyze(
        &self,
        job_summary: &str,
        candidate_summary: &str,
        similarity_hint: f64,
    ) -> Result<AiAnalysis, ProviderError>;
}

/// External embedding provider. Vector generation lives upstream of the
/// matching core; this seam exists so deployments can regenerate on demand.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Embedding dimensionality; all vectors in one deployment share it.
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}
