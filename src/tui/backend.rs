//! Async backend: bridges the TUI event loop with the token provider and
//! the protected API.
//!
//! Uses an mpsc channel pair. The TUI sends `BackendCommand` values, and a
//! background tokio task executes them and sends `BackendResponse` values back.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::api::{CallError, ProtectedApi};
use crate::auth::{AuthError, SignInPrompt, TokenProvider};
use crate::models::Account;

/// Commands sent from the TUI event loop to the async backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendCommand {
    SignIn,
    CallApi,
    SignOut,
}

/// Responses from the async backend to the TUI.
#[derive(Debug)]
pub enum BackendResponse {
    /// The sign-in in flight needs the user in a browser.
    Prompt(SignInPrompt),
    SignedIn(Result<Account, AuthError>),
    /// Result of a protected API call, with the provider's active account
    /// read back afterwards.
    ApiResult {
        result: Result<String, CallError>,
        account: Option<Account>,
    },
    SignedOut(Result<(), AuthError>),
}

/// Everything the backend needs, constructed once in `main`.
pub struct BackendContext {
    pub provider: Arc<dyn TokenProvider>,
    pub api: ProtectedApi,
    pub login_scopes: Vec<String>,
}

/// Handle for interacting with the backend from the TUI side.
pub struct Backend {
    cmd_tx: mpsc::UnboundedSender<BackendCommand>,
    resp_rx: mpsc::UnboundedReceiver<BackendResponse>,
}

impl Backend {
    /// Start the backend. Spawns a tokio task that processes commands.
    pub fn start(ctx: Arc<BackendContext>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (resp_tx, resp_rx) = mpsc::unbounded_channel();

        tokio::spawn(backend_loop(cmd_rx, resp_tx, ctx));

        Self { cmd_tx, resp_rx }
    }

    /// Send a command to the backend (non-blocking).
    pub fn send(&self, cmd: BackendCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::error!("Backend channel closed -- command dropped");
        }
    }

    /// Receive a response from the backend.
    ///
    /// Returns `None` only when the backend channel is permanently closed.
    /// Designed to be used inside `tokio::select!`.
    pub async fn recv(&mut self) -> Option<BackendResponse> {
        self.resp_rx.recv().await
    }
}

async fn backend_loop(
    mut cmd_rx: mpsc::UnboundedReceiver<BackendCommand>,
    resp_tx: mpsc::UnboundedSender<BackendResponse>,
    ctx: Arc<BackendContext>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        let ctx = Arc::clone(&ctx);
        let resp_tx = resp_tx.clone();

        // Each command runs on its own task so a pending sign-in does not
        // block other commands.
        tokio::spawn(async move {
            execute(cmd, &ctx, &resp_tx).await;
        });
    }
}

/// Run one command to completion, reporting every response on `resp_tx`.
pub async fn execute(
    cmd: BackendCommand,
    ctx: &BackendContext,
    resp_tx: &mpsc::UnboundedSender<BackendResponse>,
) {
    let response = match cmd {
        BackendCommand::SignIn => {
            let prompt_tx = resp_tx.clone();
            let prompt = move |p: SignInPrompt| {
                let _ = prompt_tx.send(BackendResponse::Prompt(p));
            };
            let result = ctx.provider.sign_in(&ctx.login_scopes, &prompt).await;
            if let Err(e) = &result {
                tracing::warn!("Sign-in failed: {}", e);
            }
            BackendResponse::SignedIn(result)
        }
        BackendCommand::CallApi => {
            let accounts = ctx.provider.accounts();
            let result = ctx.api.call(ctx.provider.as_ref(), accounts.first()).await;
            if let Err(e) = &result {
                tracing::warn!("Protected API call failed: {}", e);
            }
            BackendResponse::ApiResult {
                result,
                account: ctx.provider.accounts().into_iter().next(),
            }
        }
        BackendCommand::SignOut => BackendResponse::SignedOut(ctx.provider.sign_out().await),
    };

    let _ = resp_tx.send(response);
}
