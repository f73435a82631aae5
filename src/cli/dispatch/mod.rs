//! Maps validated CLI matches to an action plus the global settings every
//! action shares.

use crate::cli::actions::Action;
use crate::cli::commands::{
    ARG_ANONYMOUS_ROUTE, ARG_API_URL, ARG_CONCURRENCY, ARG_SESSION_FILE, ARG_TIMEOUT,
};
use crate::cli::globals::GlobalArgs;
use crate::config::normalize_value;
use crate::rules::{Reason, Rule};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};

/// Reads the global arguments.
///
/// # Errors
/// Returns an error if the session file argument is missing.
pub fn globals(matches: &clap::ArgMatches) -> Result<GlobalArgs> {
    let session_file = matches
        .get_one::<String>(ARG_SESSION_FILE)
        .map(PathBuf::from)
        .context("missing required argument: --session-file")?;

    let mut globals = GlobalArgs::new(session_file);

    if let Some(url) = matches
        .get_one::<String>(ARG_API_URL)
        .and_then(|url| normalize_value(url))
    {
        globals.config.api_base_url = url;
    }
    if let Some(route) = matches
        .get_one::<String>(ARG_ANONYMOUS_ROUTE)
        .and_then(|route| normalize_value(route))
    {
        globals.config.anonymous_route = route;
    }
    if let Some(concurrency) = matches.get_one::<u16>(ARG_CONCURRENCY) {
        globals.config.concurrency = usize::from(*concurrency);
    }
    if let Some(timeout) = matches.get_one::<u64>(ARG_TIMEOUT) {
        globals.config.request_timeout = Duration::from_secs(*timeout);
    }

    Ok(globals)
}

/// Maps the chosen subcommand to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or malformed.
pub fn handler(matches: &clap::ArgMatches, globals: &GlobalArgs) -> Result<Action> {
    let action = match matches.subcommand() {
        Some(("session", sub_m)) => match sub_m.subcommand() {
            Some(("set-token", token_m)) => {
                let token = token_m
                    .get_one::<String>("token")
                    .and_then(|token| normalize_value(token))
                    .context("missing required argument: <token>")?;
                Action::SetToken {
                    token: SecretString::from(token),
                }
            }
            Some(("show", _)) => Action::ShowSession,
            Some(("clear", _)) => Action::ClearSession,
            _ => return Err(anyhow!("unknown session command")),
        },
        Some(("status", _)) => Action::Status,
        Some(("whoami", _)) => Action::Whoami,
        Some(("check", sub_m)) => {
            let value = sub_m
                .get_one::<String>("permission")
                .context("missing required argument: <permission>")?;
            match Rule::parse(Reason::Permission, value) {
                Some(Rule::RequirePermission { module, permission }) => {
                    Action::Check { module, permission }
                }
                _ => return Err(anyhow!("expected <module>:<permission>, got \"{value}\"")),
            }
        }
        Some(("modules", _)) => Action::Modules,
        Some(("logout", _)) => Action::Logout,
        Some(("reconcile", sub_m)) => Action::Reconcile {
            document: sub_m
                .get_one::<String>("document")
                .map(PathBuf::from)
                .context("missing required argument: --document")?,
            output: sub_m.get_one::<String>("output").map(PathBuf::from),
        },
        _ => return Err(anyhow!("unknown command")),
    };

    if action.is_remote() && !globals.has_api_url() {
        return Err(anyhow!("missing required argument: --{ARG_API_URL}"));
    }

    Ok(action)
}
