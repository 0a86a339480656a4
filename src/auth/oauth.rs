//! OAuth2 device code flow and silent token renewal for Entra ID

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use oauth2::basic::{
    BasicErrorResponse, BasicErrorResponseType, BasicRevocationErrorResponse,
    BasicTokenIntrospectionResponse, BasicTokenType,
};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, Client, ClientId, DeviceAuthorizationUrl, ErrorResponse, ExtraTokenFields,
    RefreshToken, RequestTokenError, Scope, StandardDeviceAuthorizationResponse,
    StandardRevocableToken, StandardTokenResponse, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};

use super::id_token::account_from_id_token;
use super::{AuthConfig, AuthError, SignInPrompt, StoredToken, TokenProvider, TokenStore};
use crate::config::Config;
use crate::models::{Account, IdentitySummary};

/// Server error codes meaning the user must sign in interactively.
const INTERACTION_ERRORS: &[&str] = &["interaction_required", "login_required", "consent_required"];

const NO_ID_TOKEN: &str = "Identity provider did not return an ID token";

/// Scopes always added to token requests: an ID token and a refresh token.
const SESSION_SCOPES: &[&str] = &["openid", "offline_access"];

/// Entra ID returns the ID token next to the access token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdTokenFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl ExtraTokenFields for IdTokenFields {}

type EntraTokenResponse = StandardTokenResponse<IdTokenFields, BasicTokenType>;

type EntraClient = Client<
    BasicErrorResponse,
    EntraTokenResponse,
    BasicTokenType,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
>;

/// Build the OAuth2 client from an AuthConfig
fn build_client(auth_config: &AuthConfig) -> Result<EntraClient, AuthError> {
    let invalid = |e: url::ParseError| AuthError::Provider(format!("Invalid authority URL: {}", e));
    let auth_url = AuthUrl::new(auth_config.authorize_url()).map_err(invalid)?;
    let token_url = TokenUrl::new(auth_config.token_url()).map_err(invalid)?;
    let device_url = DeviceAuthorizationUrl::new(auth_config.device_code_url()).map_err(invalid)?;

    Ok(EntraClient::new(
        ClientId::new(auth_config.client_id.clone()),
        None,
        auth_url,
        Some(token_url),
    )
    .set_device_authorization_url(device_url))
}

/// Requested scopes plus the session scopes, without duplicates.
fn with_session_scopes(scopes: &[String]) -> Vec<String> {
    let mut all: Vec<String> = Vec::with_capacity(scopes.len() + SESSION_SCOPES.len());
    for scope in scopes
        .iter()
        .map(String::as_str)
        .chain(SESSION_SCOPES.iter().copied())
    {
        if !all.iter().any(|s| s == scope) {
            all.push(scope.to_string());
        }
    }
    all
}

/// First line of the server's description, or the bare error code.
fn server_message(code: &str, description: Option<&String>) -> String {
    description
        .and_then(|d| d.lines().next())
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(code)
        .to_string()
}

fn describe_transport<RE, T>(err: &RequestTokenError<RE, T>) -> String
where
    RE: std::error::Error + 'static,
    T: ErrorResponse + 'static,
{
    match err {
        RequestTokenError::ServerResponse(_) => "Identity provider rejected the request".to_string(),
        RequestTokenError::Request(e) => format!("Request to identity provider failed: {}", e),
        RequestTokenError::Parse(e, _) => format!("Unreadable identity provider response: {}", e),
        RequestTokenError::Other(msg) => msg.clone(),
    }
}

fn describe_basic_error<RE>(err: &RequestTokenError<RE, BasicErrorResponse>) -> String
where
    RE: std::error::Error + 'static,
{
    match err {
        RequestTokenError::ServerResponse(resp) => {
            server_message(resp.error().as_ref(), resp.error_description())
        }
        other => describe_transport(other),
    }
}

/// Classify a failed refresh: does the user have to come back interactively?
fn classify_refresh_error<RE>(err: RequestTokenError<RE, BasicErrorResponse>) -> AuthError
where
    RE: std::error::Error + 'static,
{
    let needs_interaction = match &err {
        RequestTokenError::ServerResponse(resp) => match resp.error() {
            BasicErrorResponseType::InvalidGrant => true,
            BasicErrorResponseType::Extension(code) => INTERACTION_ERRORS.contains(&code.as_str()),
            _ => false,
        },
        _ => false,
    };

    let message = describe_basic_error(&err);
    if needs_interaction {
        AuthError::InteractionRequired(message)
    } else {
        AuthError::Provider(message)
    }
}

/// What the token cache currently holds.
pub struct CacheSnapshot {
    pub account: Option<Account>,
    pub access_token: Option<StoredToken>,
    pub has_refresh_token: bool,
}

/// Token provider backed by Entra ID and the config-file token cache.
pub struct EntraTokenProvider {
    auth_config: AuthConfig,
    cache: Mutex<Config>,
    /// Where the cache is persisted. `None` keeps it in memory only.
    cache_path: Option<PathBuf>,
}

impl EntraTokenProvider {
    pub fn new(auth_config: AuthConfig, config: Config, cache_path: Option<PathBuf>) -> Self {
        Self {
            auth_config,
            cache: Mutex::new(config),
            cache_path,
        }
    }

    /// Provider persisting its cache to the default config file.
    pub fn from_config(config: Config) -> Result<Self> {
        let auth_config = AuthConfig::from_settings(&config.settings)?;
        let path = Config::config_path()?;
        Ok(Self::new(auth_config, config, Some(path)))
    }

    pub fn auth_config(&self) -> &AuthConfig {
        &self.auth_config
    }

    fn with_cache<T>(&self, f: impl FnOnce(&mut Config) -> T) -> T {
        let mut guard = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    fn persist(&self) -> Result<(), AuthError> {
        let Some(path) = &self.cache_path else {
            return Ok(());
        };
        self.with_cache(|config| config.save_to(path))
            .map_err(|e| AuthError::Cache(format!("{:#}", e)))
    }

    fn cached_account(&self) -> Option<Account> {
        let id_token = self.with_cache(|c| c.get_id_token())?;
        match account_from_id_token(&id_token) {
            Ok(account) => Some(account),
            Err(e) => {
                tracing::warn!("Ignoring unreadable cached ID token: {}", e);
                None
            }
        }
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let (access_token, has_refresh_token) =
            self.with_cache(|c| (c.get_access_token(), c.get_refresh_token().is_some()));
        CacheSnapshot {
            account: self.cached_account(),
            access_token,
            has_refresh_token,
        }
    }

    /// Cache a token response. Returns the account of the new ID token, if any.
    fn store_response(
        &self,
        response: &EntraTokenResponse,
        requested: &[String],
    ) -> Result<Option<Account>, AuthError> {
        let granted: Vec<String> = match response.scopes() {
            Some(scopes) => scopes.iter().map(|s| s.as_str().to_string()).collect(),
            None => requested.to_vec(),
        };
        let account = match &response.extra_fields().id_token {
            Some(raw) => Some(account_from_id_token(raw)?),
            None => None,
        };

        let previous = self.with_cache(|config| {
            let previous = (
                config.access_token.clone(),
                config.refresh_token.clone(),
                config.id_token.clone(),
            );
            config.set_access_token(StoredToken::new(
                response.access_token().secret().to_string(),
                response.expires_in().map(|d| d.as_secs()),
                granted,
            ));
            if let Some(refresh_token) = response.refresh_token() {
                config.set_refresh_token(refresh_token.secret().to_string());
            }
            if let Some(raw) = &response.extra_fields().id_token {
                config.set_id_token(raw.clone());
            }
            previous
        });

        // An unsaved response must not outlive the call that failed to save it
        if let Err(e) = self.persist() {
            tracing::warn!("Token cache not saved, keeping the previous session: {}", e);
            self.with_cache(|config| {
                (config.access_token, config.refresh_token, config.id_token) = previous;
            });
            return Err(e);
        }

        Ok(account)
    }
}

#[async_trait]
impl TokenProvider for EntraTokenProvider {
    fn accounts(&self) -> Vec<Account> {
        self.cached_account().into_iter().collect()
    }

    async fn sign_in(
        &self,
        scopes: &[String],
        prompt: &(dyn Fn(SignInPrompt) + Send + Sync),
    ) -> Result<Account, AuthError> {
        let client = build_client(&self.auth_config)?;
        let requested = with_session_scopes(scopes);

        tracing::info!("Initiating device code flow...");

        let mut request = client
            .exchange_device_code()
            .map_err(|e| AuthError::Provider(e.to_string()))?;
        for scope in &requested {
            request = request.add_scope(Scope::new(scope.clone()));
        }
        let details: StandardDeviceAuthorizationResponse = request
            .request_async(async_http_client)
            .await
            .map_err(|e| AuthError::Provider(describe_basic_error(&e)))?;

        prompt(SignInPrompt {
            verification_uri: details.verification_uri().as_str().to_string(),
            user_code: details.user_code().secret().to_string(),
            expires_in: details.expires_in().as_secs(),
        });

        tracing::info!("Waiting for authentication...");

        let response = client
            .exchange_device_access_token(&details)
            .request_async(async_http_client, tokio::time::sleep, None)
            .await
            .map_err(|e| {
                AuthError::Provider(match &e {
                    RequestTokenError::ServerResponse(resp) => {
                        server_message(resp.error().as_ref(), resp.error_description())
                    }
                    other => describe_transport(other),
                })
            })?;

        // Nothing is cached for a response that cannot identify the user
        let no_id_token = || AuthError::Provider(NO_ID_TOKEN.to_string());
        if response.extra_fields().id_token.is_none() {
            return Err(no_id_token());
        }
        let account = self
            .store_response(&response, &requested)?
            .ok_or_else(no_id_token)?;
        tracing::info!("Signed in");
        Ok(account)
    }

    async fn acquire_token_silent(
        &self,
        scopes: &[String],
        account: &Account,
    ) -> Result<String, AuthError> {
        match self.cached_account() {
            Some(cached) if cached.home_account_id() == account.home_account_id() => {}
            _ => {
                return Err(AuthError::InteractionRequired(
                    "Account is not in the token cache. Sign in again.".to_string(),
                ))
            }
        }

        let (cached_token, refresh_token) =
            self.with_cache(|c| (c.get_access_token(), c.get_refresh_token()));

        if let Some(token) = cached_token {
            if !token.is_expired() && token.covers(scopes) {
                tracing::debug!("Using cached access token");
                return Ok(token.token);
            }
        }

        let Some(refresh_token) = refresh_token else {
            return Err(AuthError::InteractionRequired(
                "No refresh token cached. Sign in again.".to_string(),
            ));
        };

        tracing::info!("Refreshing access token...");

        let client = build_client(&self.auth_config)?;
        let refresh_token = RefreshToken::new(refresh_token);
        let requested = with_session_scopes(scopes);
        let mut request = client.exchange_refresh_token(&refresh_token);
        for scope in &requested {
            request = request.add_scope(Scope::new(scope.clone()));
        }
        let response = request
            .request_async(async_http_client)
            .await
            .map_err(classify_refresh_error)?;

        self.store_response(&response, &requested)?;
        tracing::info!("Token refresh complete");
        Ok(response.access_token().secret().to_string())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.with_cache(|config| config.clear_tokens());
        self.persist()
    }
}

/// Sign in from the command line, reusing a cached session unless `force`.
pub async fn login(provider: &dyn TokenProvider, scopes: &[String], force: bool) -> Result<()> {
    if !force {
        if let Some(account) = provider.accounts().into_iter().next() {
            match provider.acquire_token_silent(scopes, &account).await {
                Ok(_) => {
                    println!(
                        "Already signed in as {}. Use --force to re-authenticate.",
                        IdentitySummary::project(Some(&account)).name
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Cached session unusable, signing in again: {}", e);
                }
            }
        }
    }

    let prompt = |p: SignInPrompt| {
        println!();
        println!("To sign in, visit: {}", p.verification_uri);
        println!("Enter code:        {}", p.user_code);
        println!();
    };
    let account = provider
        .sign_in(scopes, &prompt)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("Sign-in failed")?;

    println!(
        "Signed in as {}.",
        IdentitySummary::project(Some(&account)).name
    );
    Ok(())
}

/// Clear the cached session
pub async fn logout(provider: &EntraTokenProvider) -> Result<()> {
    provider.sign_out().await.context("Failed to sign out")?;
    println!("Signed out.");
    println!(
        "To end the browser session too, visit: {}",
        provider.auth_config().logout_url()
    );
    Ok(())
}

/// Display the token cache status
pub fn status(provider: &EntraTokenProvider) {
    let snapshot = provider.snapshot();

    match &snapshot.account {
        Some(account) => println!(
            "Account:      {}",
            account.username.as_deref().unwrap_or("(unknown)")
        ),
        None => println!("Account:      none"),
    }

    match &snapshot.access_token {
        Some(token) if !token.is_expired() => {
            println!("Access token: valid");
            if let Some(exp) = token.expires_at {
                println!("  expires_at: {}", exp);
            }
            if !token.scopes.is_empty() {
                println!("  scopes:     {}", token.scopes.join(" "));
            }
        }
        Some(_) => println!("Access token: expired"),
        None => println!("Access token: none"),
    }

    if snapshot.has_refresh_token {
        println!("Refresh tok:  present");
    } else {
        println!("Refresh tok:  none");
    }

    if snapshot.account.is_none() {
        println!("\nRun 'secure-dashboard login' to authenticate.");
    }
}
