use std::collections::HashMap;

use axum::async_trait;
use axum::extract::FromRef;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;

/// API-key registry. Every key belongs to exactly one organization; the
/// authenticated organization id scopes every query downstream, so a caller
/// can never reach another tenant's data by guessing record ids.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    keys: HashMap<String, i64>,
}

impl AuthConfig {
    /// Parse the `CM_API_KEYS` format: comma separated `key:organization_id`
    /// pairs, e.g. `acme-key:1,globex-key:2`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut keys = HashMap::new();

        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, org) = entry
                .split_once(':')
                .ok_or_else(|| format!("entry '{entry}' is not key:organization_id"))?;

            let key = key.trim();
            if key.is_empty() {
                return Err(format!("entry '{entry}' has an empty key"));
            }

            let organization_id: i64 = org
                .trim()
                .parse()
                .map_err(|_| format!("entry '{entry}' has a non-numeric organization id"))?;

            if keys.insert(key.to_string(), organization_id).is_some() {
                return Err(format!("duplicate API key '{key}'"));
            }
        }

        if keys.is_empty() {
            return Err("CM_API_KEYS must contain at least one key:organization_id pair".into());
        }

        Ok(Self { keys })
    }

    fn organization_for(&self, key: &str) -> Option<i64> {
        self.keys.get(key).copied()
    }
}

/// Authenticated caller. Extracted from the `X-API-Key` header on every
/// protected route.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub organization_id: i64,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AuthConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AuthConfig::from_ref(state);

        let provided = parts
            .headers
            .get("x-api-key")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing X-API-Key header".into()))?;

        let organization_id = config
            .organization_for(provided)
            .ok_or_else(|| ApiError::Unauthorized("invalid API key".into()))?;

        Ok(AuthUser { organization_id })
    }
}
