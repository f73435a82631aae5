//! # Permgate (client-side session and visibility control)
//!
//! `permgate` keeps the bearer-token session of the current user and hides
//! document elements that declare access rules the user does not satisfy.
//!
//! ## Session
//!
//! A single [`session::SessionStore`] holds the access token and the last
//! fetched [`auth::UserRecord`]. The token is written by an external login
//! flow; this crate only reads it, refreshes the cached user, and clears both
//! on logout or when the remote service stops recognizing the session.
//!
//! ## Declarative rules
//!
//! Elements opt in through attributes:
//!
//! - `data-require-permission="<module>:<permission>"`
//! - `data-require-profile="<profile>"`
//! - `data-require-admin="true"`
//! - `data-hide-for-profiles="<csv>"`
//! - `data-show-for-profiles="<csv>"`
//!
//! The [`bootstrap::Bootstrapper`] runs one phase per attribute, in that
//! order, and finally adds the `permissions-checked` class to the document
//! root. Hiding is monotone inside a pass: a hidden element is never revealed
//! again by a later phase.
//!
//! ## Caveat
//!
//! Hiding sets `display: none` and stamps a marker attribute. The element is
//! still present and inspectable. The remote service remains the only
//! authority; this layer only avoids flashing UI the user cannot use.

pub mod auth;
pub mod bootstrap;
#[cfg(not(target_arch = "wasm32"))]
pub mod cli;
pub mod config;
pub mod controls;
pub mod dom;
pub mod error;
pub mod reconcile;
pub mod rules;
pub mod session;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use error::Error;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
