pub mod reconcile;
pub mod remote;
pub mod session;

// The match over `Action` lives in `run` so this file stays a list of actions.
mod run;

use crate::{
    auth::{AuthClient, RecordingNavigator},
    cli::globals::GlobalArgs,
    session::FileSessionStore,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;

/// Auth client used by every remote action: file-backed session, and a
/// navigator that records where the page would have been sent.
pub type CliClient = AuthClient<FileSessionStore, RecordingNavigator>;

#[derive(Debug)]
pub enum Action {
    SetToken { token: SecretString },
    ShowSession,
    ClearSession,
    Status,
    Whoami,
    Check { module: String, permission: String },
    Modules,
    Logout,
    Reconcile {
        document: PathBuf,
        output: Option<PathBuf>,
    },
}

impl Action {
    /// Actions that talk to the auth service.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Whoami | Self::Check { .. } | Self::Modules | Self::Logout | Self::Reconcile { .. }
        )
    }

    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self, globals: &GlobalArgs) -> Result<()> {
        run::execute(self, globals).await
    }
}

/// Builds the auth client over the configured session file.
///
/// # Errors
/// Returns an error if the API base URL is missing or invalid.
pub fn client(globals: &GlobalArgs) -> Result<CliClient> {
    AuthClient::new(
        &globals.config,
        FileSessionStore::new(&globals.session_file),
        RecordingNavigator::new(),
    )
    .context("failed to build auth client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_actions() {
        assert!(Action::Whoami.is_remote());
        assert!(Action::Logout.is_remote());
        assert!(!Action::Status.is_remote());
        assert!(!Action::ShowSession.is_remote());
        assert!(!Action::SetToken {
            token: SecretString::from("t".to_string())
        }
        .is_remote());
    }

    #[test]
    fn client_requires_api_url() {
        let globals = GlobalArgs::new(PathBuf::from("session.json"));
        assert!(client(&globals).is_err());
    }
}
