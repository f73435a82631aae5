//! Commands that query the auth service with the stored token.

use crate::{
    auth::{AuthClient, RecordingNavigator},
    session::SessionStore,
};
use anyhow::{anyhow, Result};
use std::io::Write;

type Client<S> = AuthClient<S, RecordingNavigator>;

/// Reports where the page would have been sent, if anywhere.
fn report_redirect<S: SessionStore>(client: &Client<S>, out: &mut impl Write) -> Result<()> {
    if let Some(route) = client.navigator().last() {
        writeln!(out, "redirect: {route}")?;
    }
    Ok(())
}

/// Refreshes the current user and prints it.
///
/// # Errors
/// Returns an error when there is no session or the service rejects it; in
/// the latter case the session has already been cleared.
pub async fn whoami<S: SessionStore>(client: &Client<S>, out: &mut impl Write) -> Result<()> {
    match client.refresh_current_user().await {
        Ok(Some(user)) => {
            writeln!(out, "{}", serde_json::to_string_pretty(&user)?)?;
            Ok(())
        }
        Ok(None) => Err(anyhow!("no active session")),
        Err(err) => {
            report_redirect(client, out)?;
            Err(err.into())
        }
    }
}

/// Prints `allowed` or `denied`. Denial is an answer, not a failure.
///
/// # Errors
/// Returns an error only if output cannot be written.
pub async fn check<S: SessionStore>(
    client: &Client<S>,
    module: &str,
    permission: &str,
    out: &mut impl Write,
) -> Result<()> {
    let allowed = client.check_permission(module, permission).await;
    writeln!(
        out,
        "{module}:{permission} {}",
        if allowed { "allowed" } else { "denied" }
    )?;
    Ok(())
}

/// # Errors
/// Returns an error only if output cannot be written.
pub async fn modules<S: SessionStore>(client: &Client<S>, out: &mut impl Write) -> Result<()> {
    let modules = client.list_accessible_modules().await;
    if modules.is_empty() {
        writeln!(out, "no modules")?;
    }
    for module in modules {
        writeln!(out, "{}\t{}", module.code, module.name)?;
    }
    Ok(())
}

/// # Errors
/// Returns an error only if output cannot be written.
pub async fn logout<S: SessionStore>(client: &Client<S>, out: &mut impl Write) -> Result<()> {
    client.terminate_session().await;
    writeln!(out, "logged out")?;
    report_redirect(client, out)
}
