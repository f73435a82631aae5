//! Local session commands. None of them contact the auth service.

use crate::session::SessionStore;
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::io::Write;
use tracing::info;

/// Stores the token handed over by the login flow.
///
/// # Errors
/// Returns an error if the session cannot be written.
pub fn set_token<S: SessionStore>(store: &S, token: SecretString, out: &mut impl Write) -> Result<()> {
    store.set_token(token).context("failed to store access token")?;
    info!("access token stored");
    writeln!(out, "token stored")?;
    Ok(())
}

/// Prints the cached user record; the token itself is never printed.
///
/// # Errors
/// Returns an error if the session cannot be read.
pub fn show<S: SessionStore>(store: &S, out: &mut impl Write) -> Result<()> {
    let token = store.token().context("failed to read session")?;
    let user = store.user().context("failed to read session")?;

    writeln!(
        out,
        "token: {}",
        if token.is_some() { "present" } else { "absent" }
    )?;
    match user {
        Some(user) => writeln!(out, "{}", serde_json::to_string_pretty(&user)?)?,
        None => writeln!(out, "user: not cached")?,
    }
    Ok(())
}

/// # Errors
/// Returns an error if the session cannot be cleared.
pub fn clear<S: SessionStore>(store: &S, out: &mut impl Write) -> Result<()> {
    store.clear().context("failed to clear session")?;
    writeln!(out, "session cleared")?;
    Ok(())
}

/// Reports whether a session exists, from the token alone.
///
/// # Errors
/// Returns an error if there is no session, so scripts can branch on the exit
/// status.
pub fn status<S: SessionStore>(store: &S, out: &mut impl Write) -> Result<()> {
    if store.token().context("failed to read session")?.is_some() {
        writeln!(out, "authenticated")?;
        Ok(())
    } else {
        writeln!(out, "anonymous")?;
        anyhow::bail!("no active session")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::UserRecord, session::MemorySessionStore};
    use std::collections::BTreeSet;

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[test]
    fn set_token_then_status() -> Result<()> {
        let store = MemorySessionStore::new();
        let mut buf = Vec::new();

        assert!(status(&store, &mut buf).is_err());
        set_token(&store, SecretString::from("abc".to_string()), &mut buf)?;
        status(&store, &mut buf)?;

        assert_eq!(output(buf), "anonymous\ntoken stored\nauthenticated\n");
        Ok(())
    }

    #[test]
    fn show_hides_token() -> Result<()> {
        let store = MemorySessionStore::with_token("super-secret");
        store.set_user(&UserRecord {
            id: 7,
            display_name: "Ana".to_string(),
            email: None,
            is_admin: false,
            is_active: true,
            profiles: BTreeSet::from(["gestor".to_string()]),
            primary_profile: "gestor".to_string(),
        })?;

        let mut buf = Vec::new();
        show(&store, &mut buf)?;
        let printed = output(buf);

        assert!(printed.starts_with("token: present\n"));
        assert!(printed.contains("\"nome_completo\": \"Ana\""));
        assert!(!printed.contains("super-secret"));
        Ok(())
    }

    #[test]
    fn clear_removes_everything() -> Result<()> {
        let store = MemorySessionStore::with_token("abc");
        let mut buf = Vec::new();
        clear(&store, &mut buf)?;

        assert!(store.token()?.is_none());
        assert!(store.user()?.is_none());
        assert_eq!(output(buf), "session cleared\n");
        Ok(())
    }
}
