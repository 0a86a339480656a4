//! Token storage and management

use serde::{Deserialize, Serialize};

use super::OIDC_SCOPES;

/// Tokens this close to expiry (seconds) are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 300;

/// Stored access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    /// Unix seconds
    pub expires_at: Option<i64>,
    /// Scopes granted with the token
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl StoredToken {
    pub fn new(token: String, expires_in_secs: Option<u64>, scopes: Vec<String>) -> Self {
        let expires_at =
            expires_in_secs.map(|secs| chrono::Utc::now().timestamp() + secs as i64);

        Self {
            token,
            expires_at,
            scopes,
        }
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => chrono::Utc::now().timestamp() + EXPIRY_SKEW_SECS >= exp,
            None => false,
        }
    }

    /// Whether every requested resource scope was granted.
    ///
    /// OpenID Connect scopes do not select a resource and are skipped.
    pub fn covers(&self, requested: &[String]) -> bool {
        requested
            .iter()
            .filter(|s| !OIDC_SCOPES.contains(&s.as_str()))
            .all(|s| self.scopes.iter().any(|granted| granted.eq_ignore_ascii_case(s)))
    }
}

/// Token store trait for different storage backends
pub trait TokenStore {
    fn get_access_token(&self) -> Option<StoredToken>;
    fn set_access_token(&mut self, token: StoredToken);
    fn get_refresh_token(&self) -> Option<String>;
    fn set_refresh_token(&mut self, token: String);
    fn get_id_token(&self) -> Option<String>;
    fn set_id_token(&mut self, token: String);
    fn clear_tokens(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scopes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fresh_token_not_expired() {
        let token = StoredToken::new("t".into(), Some(3600), Vec::new());
        assert!(!token.is_expired());
    }

    #[test]
    fn test_token_inside_skew_is_expired() {
        let token = StoredToken::new("t".into(), Some(60), Vec::new());
        assert!(token.is_expired());
    }

    #[test]
    fn test_token_without_expiry_never_expires() {
        let token = StoredToken::new("t".into(), None, Vec::new());
        assert!(!token.is_expired());
    }

    #[test]
    fn test_covers_ignores_oidc_scopes() {
        let token = StoredToken::new(
            "t".into(),
            Some(3600),
            scopes(&["User.Read", "profile", "openid"]),
        );
        assert!(token.covers(&scopes(&["openid", "profile"])));
        assert!(token.covers(&scopes(&["user.read"])));
        assert!(!token.covers(&scopes(&["api://backend/Data.Read"])));
    }
}
