use crate::config::IdentityConfig;
use crate::error::{CerebroError, Result};
use crate::model::Identity;

/// Verifies bearer tokens against the hosted identity service.
///
/// Token verification is delegated entirely: the service's
/// `GET {url}/auth/v1/user` endpoint either returns the user the token
/// belongs to or rejects it.
pub struct IdentityService {
    base_url: String,
    service_key: Option<String>,
    http: reqwest::Client,
}

impl std::fmt::Debug for IdentityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityService")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl IdentityService {
    pub fn from_config(config: &IdentityConfig) -> Result<Self> {
        let base_url = config
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| CerebroError::Config("SUPABASE_URL missing".to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .map_err(|e| CerebroError::Config(format!("failed to build HTTP client: {e}")))?,
        })
    }

    /// Resolve a bearer token to the identity it was issued for.
    ///
    /// A token the service rejects (any 4xx but 429) is `Unauthorized`; an
    /// unreachable, rate-limited or failing service is an `Identity` error.
    pub async fn verify(&self, token: &str) -> Result<Identity> {
        let url = format!("{}/auth/v1/user", self.base_url);

        let mut req = self.http.get(&url).bearer_auth(token);
        if let Some(ref key) = self.service_key {
            req = req.header("apikey", key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| CerebroError::Identity(format!("identity request failed: {e}")))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CerebroError::Identity(
                "identity service rate limited the request".into(),
            ));
        }
        if status.is_client_error() {
            tracing::debug!(%status, "identity service rejected token");
            return Err(CerebroError::Unauthorized("Invalid token".into()));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CerebroError::Identity(format!(
                "identity service error {status}: {text}"
            )));
        }

        let identity: Identity = resp
            .json()
            .await
            .map_err(|e| CerebroError::Identity(format!("identity response parse error: {e}")))?;

        if identity.id.is_empty() {
            return Err(CerebroError::Unauthorized("Invalid token".into()));
        }
        Ok(identity)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
