//! Protected API caller
//!
//! Acquires an access token silently from the token provider and performs a
//! single bearer-authenticated GET. No retries.

use crate::auth::{AuthError, TokenProvider};
use crate::models::Account;

/// Fallback shown when a failed call carries no message.
const API_CALL_FAILED: &str = "API call failed";

/// Why a protected API call failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    #[error("No signed-in account.")]
    NoAccount,
    #[error(transparent)]
    Token(#[from] AuthError),
    #[error("API responded with status {0}")]
    Status(u16),
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Body(String),
}

impl CallError {
    /// Message for inline display.
    pub fn user_message(&self) -> String {
        let msg = self.to_string();
        if msg.trim().is_empty() {
            API_CALL_FAILED.to_string()
        } else {
            msg
        }
    }

    /// The cached session cannot be renewed without signing in again.
    pub fn needs_sign_in(&self) -> bool {
        match self {
            Self::Token(e) => e.needs_interaction(),
            _ => false,
        }
    }
}

/// Caller for one configured protected endpoint.
pub struct ProtectedApi {
    http: reqwest::Client,
    endpoint: String,
    scopes: Vec<String>,
}

impl ProtectedApi {
    pub fn new(endpoint: String, scopes: Vec<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            scopes,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Call the endpoint on behalf of `account` and return the response body
    /// as pretty-printed JSON.
    pub async fn call(
        &self,
        provider: &dyn TokenProvider,
        account: Option<&Account>,
    ) -> Result<String, CallError> {
        let account = account.ok_or(CallError::NoAccount)?;

        let token = provider.acquire_token_silent(&self.scopes, account).await?;

        tracing::debug!("Protected API GET {}", self.endpoint);
        let resp = self
            .http
            .get(&self.endpoint)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;

        let resp = check_response(resp)?;
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| CallError::Body(e.to_string()))?;

        serde_json::to_string_pretty(&body).map_err(|e| CallError::Body(e.to_string()))
    }
}

/// Reject non-success HTTP statuses.
fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, CallError> {
    let status = resp.status();
    if !status.is_success() {
        tracing::warn!("Protected API returned HTTP {}", status.as_u16());
        return Err(CallError::Status(status.as_u16()));
    }
    Ok(resp)
}
