//! Command-line entry points for the dashboard and the protected API

pub mod client;

use anyhow::{bail, Result};

use crate::auth::{AuthState, TokenProvider};
use crate::models::IdentitySummary;
use crate::views::{self, ApiPanel};

pub use client::{CallError, ProtectedApi};

/// Print the identity summary of the active account.
pub fn whoami(provider: &dyn TokenProvider) -> Result<()> {
    let accounts = provider.accounts();
    let Some(account) = accounts.first() else {
        bail!("Not signed in. Run 'secure-dashboard login'.");
    };
    let summary = IdentitySummary::project(Some(account));

    println!();
    println!("Name:         {}", summary.name);
    println!("Email:        {}", summary.email);
    println!("Tenant ID:    {}", summary.tenant_id);
    println!("Object ID:    {}", summary.object_id);
    if summary.roles.is_empty() {
        println!("Roles:        (no app roles assigned)");
    } else {
        println!("Roles:        {}", summary.roles.join(", "));
    }

    Ok(())
}

/// Print the dashboard as plain text.
pub fn dashboard(provider: &dyn TokenProvider) {
    let state = AuthState::from_accounts(provider.accounts());
    let sections = views::compose(&state, &ApiPanel::default());
    print!("{}", views::render_text(&sections));
}

/// Call the protected API once and print the JSON response.
pub async fn call_api(provider: &dyn TokenProvider, api: &ProtectedApi) -> Result<()> {
    let accounts = provider.accounts();
    tracing::info!("Calling {}...", api.endpoint());

    match api.call(provider, accounts.first()).await {
        Ok(body) => {
            println!("{}", body);
            Ok(())
        }
        Err(e) if e.needs_sign_in() => {
            bail!("{} Run 'secure-dashboard login'.", e.user_message())
        }
        Err(e) => bail!("{}", e.user_message()),
    }
}
