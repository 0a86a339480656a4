//! Authentication state driving what the dashboard shows

use super::{AuthError, SignInPrompt};
use crate::models::Account;

/// Where the user is in the sign-in lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// No active account. Carries the message of the last failed attempt.
    Unauthenticated { error: Option<String> },
    /// A sign-in attempt is in flight.
    Authenticating { prompt: Option<SignInPrompt> },
    /// The first cached account is the active one.
    Authenticated(Account),
}

impl Default for AuthState {
    fn default() -> Self {
        Self::Unauthenticated { error: None }
    }
}

impl AuthState {
    /// Initial state from the provider's cached accounts.
    pub fn from_accounts(accounts: Vec<Account>) -> Self {
        match accounts.into_iter().next() {
            Some(account) => Self::Authenticated(account),
            None => Self::default(),
        }
    }

    pub fn account(&self) -> Option<&Account> {
        match self {
            Self::Authenticated(account) => Some(account),
            _ => None,
        }
    }

    pub fn is_authenticating(&self) -> bool {
        matches!(self, Self::Authenticating { .. })
    }

    /// Start a sign-in attempt. Returns false (and changes nothing) unless
    /// currently unauthenticated, so at most one attempt runs at a time.
    pub fn begin_sign_in(&mut self) -> bool {
        if !matches!(self, Self::Unauthenticated { .. }) {
            return false;
        }
        *self = Self::Authenticating { prompt: None };
        true
    }

    /// Record the device code prompt of the attempt in flight.
    pub fn show_prompt(&mut self, new_prompt: SignInPrompt) {
        if let Self::Authenticating { prompt } = self {
            *prompt = Some(new_prompt);
        }
    }

    /// Finish the attempt in flight. Results arriving in any other state are
    /// ignored.
    pub fn finish_sign_in(&mut self, result: Result<Account, AuthError>) {
        if !self.is_authenticating() {
            return;
        }
        *self = match result {
            Ok(account) => Self::Authenticated(account),
            Err(e) => Self::Unauthenticated {
                error: Some(e.user_message()),
            },
        };
    }

    /// Replace the active account with a newer copy of its claims. Ignored
    /// unless signed in.
    pub fn refresh_account(&mut self, account: Account) {
        if let Self::Authenticated(current) = self {
            *current = account;
        }
    }

    pub fn signed_out(&mut self) {
        *self = Self::default();
    }
}
