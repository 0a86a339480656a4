//! Authentication against Microsoft Entra ID
//!
//! The `TokenProvider` trait is the seam between the dashboard and the
//! identity platform. `EntraTokenProvider` implements it with the OAuth2
//! device code flow and a persisted token cache.

pub mod id_token;
pub mod oauth;
pub mod roles;
pub mod state;
pub mod tokens;

use async_trait::async_trait;

use crate::config::Settings;
use crate::models::Account;

pub use oauth::{login, logout, status, EntraTokenProvider};
pub use roles::RoleGuard;
pub use state::AuthState;
pub use tokens::{StoredToken, TokenStore};

/// Fallback shown when a sign-in failure carries no message.
const LOGIN_FAILED: &str = "Login failed";

/// Scopes that identify the user rather than a resource.
pub const OIDC_SCOPES: &[&str] = &["openid", "profile", "email", "offline_access"];

/// Errors surfaced by a token provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Silent renewal is impossible; the user has to sign in again.
    #[error("{0}")]
    InteractionRequired(String),
    #[error("{0}")]
    Provider(String),
    #[error("Token cache error: {0}")]
    Cache(String),
}

impl AuthError {
    /// Message for display after a failed sign-in.
    pub fn user_message(&self) -> String {
        let msg = self.to_string();
        if msg.trim().is_empty() {
            LOGIN_FAILED.to_string()
        } else {
            msg
        }
    }

    pub fn needs_interaction(&self) -> bool {
        matches!(self, Self::InteractionRequired(_))
    }
}

/// What the user has to do in a browser to finish signing in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInPrompt {
    pub verification_uri: String,
    pub user_code: String,
    /// Seconds until the user code expires.
    pub expires_in: u64,
}

/// Identity platform client: interactive sign-in, silent token acquisition,
/// and sign-out over a private token cache.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Accounts held in the cache. The first one is the active account.
    fn accounts(&self) -> Vec<Account>;

    /// Interactive sign-in. `prompt` is called once the user has something
    /// to do in the browser.
    async fn sign_in(
        &self,
        scopes: &[String],
        prompt: &(dyn Fn(SignInPrompt) + Send + Sync),
    ) -> Result<Account, AuthError>;

    /// Access token for `scopes` without user interaction, renewing an
    /// expired cached token when possible.
    async fn acquire_token_silent(
        &self,
        scopes: &[String],
        account: &Account,
    ) -> Result<String, AuthError>;

    /// Forget the cached session.
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Entra ID client configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// OAuth2 client ID (public client)
    pub client_id: String,
    /// Authority URL, e.g. `https://login.microsoftonline.com/<tenant>`
    pub authority: String,
    /// Scopes requested at sign-in
    pub login_scopes: Vec<String>,
}

impl AuthConfig {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        if settings.client_id.trim().is_empty() {
            anyhow::bail!(
                "No client ID configured. Set SECURE_DASHBOARD_CLIENT_ID or `client_id` in config.toml."
            );
        }
        Ok(Self {
            client_id: settings.client_id.clone(),
            authority: format!(
                "{}/{}",
                settings.authority_host.trim_end_matches('/'),
                settings.tenant_id
            ),
            login_scopes: settings.login_scopes.clone(),
        })
    }

    pub fn authorize_url(&self) -> String {
        format!("{}/oauth2/v2.0/authorize", self.authority)
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority)
    }

    pub fn device_code_url(&self) -> String {
        format!("{}/oauth2/v2.0/devicecode", self.authority)
    }

    /// Browser end-session endpoint.
    pub fn logout_url(&self) -> String {
        format!("{}/oauth2/v2.0/logout", self.authority)
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted token provider for tests.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    pub struct StubProvider {
        accounts: Mutex<Vec<Account>>,
        sign_in_result: Result<Account, AuthError>,
        token_result: Result<String, AuthError>,
        pub silent_calls: AtomicUsize,
    }

    impl StubProvider {
        pub fn new(
            sign_in_result: Result<Account, AuthError>,
            token_result: Result<String, AuthError>,
        ) -> Self {
            Self {
                accounts: Mutex::new(Vec::new()),
                sign_in_result,
                token_result,
                silent_calls: AtomicUsize::new(0),
            }
        }

        pub fn signed_in(account: Account, token_result: Result<String, AuthError>) -> Self {
            let stub = Self::new(Ok(account.clone()), token_result);
            stub.accounts
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(account);
            stub
        }

        pub fn silent_calls(&self) -> usize {
            self.silent_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenProvider for StubProvider {
        fn accounts(&self) -> Vec<Account> {
            self.accounts
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
        }

        async fn sign_in(
            &self,
            _scopes: &[String],
            prompt: &(dyn Fn(SignInPrompt) + Send + Sync),
        ) -> Result<Account, AuthError> {
            prompt(SignInPrompt {
                verification_uri: "https://microsoft.com/devicelogin".to_string(),
                user_code: "ABCD-EFGH".to_string(),
                expires_in: 900,
            });
            let account = self.sign_in_result.clone()?;
            *self.accounts.lock().unwrap_or_else(|e| e.into_inner()) = vec![account.clone()];
            Ok(account)
        }

        async fn acquire_token_silent(
            &self,
            _scopes: &[String],
            _account: &Account,
        ) -> Result<String, AuthError> {
            self.silent_calls.fetch_add(1, Ordering::SeqCst);
            self.token_result.clone()
        }

        async fn sign_out(&self) -> Result<(), AuthError> {
            self.accounts
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clear();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_falls_back_when_empty() {
        assert_eq!(
            AuthError::Provider(String::new()).user_message(),
            "Login failed"
        );
        assert_eq!(
            AuthError::Provider("access_denied".into()).user_message(),
            "access_denied"
        );
    }

    #[test]
    fn test_auth_config_endpoints() {
        let settings = Settings {
            client_id: "client-123".to_string(),
            tenant_id: "contoso.onmicrosoft.com".to_string(),
            authority_host: "https://login.microsoftonline.com/".to_string(),
            ..Settings::default()
        };
        let config = AuthConfig::from_settings(&settings).unwrap();
        assert_eq!(
            config.token_url(),
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/token"
        );
        assert_eq!(
            config.device_code_url(),
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/devicecode"
        );
    }

    #[test]
    fn test_auth_config_requires_client_id() {
        assert!(AuthConfig::from_settings(&Settings::default()).is_err());
    }
}
