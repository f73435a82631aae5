//! Durable storage for the bearer token and the cached user record.
//!
//! There is one session per profile. The token is written by an external
//! login flow; the auth client overwrites the cached user on refresh and
//! clears both entries on logout. `clear` must never leave the token without
//! the user or the other way round.

#[cfg(not(target_arch = "wasm32"))]
mod file;
mod memory;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

use crate::{auth::UserRecord, Error};
use secrecy::SecretString;
use std::rc::Rc;

/// Storage key holding the bearer token.
pub const TOKEN_KEY: &str = "access_token";
/// Storage key holding the JSON-encoded user record.
pub const USER_KEY: &str = "user";

pub trait SessionStore {
    /// Returns the bearer token, if a session exists.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn token(&self) -> Result<Option<SecretString>, Error>;

    /// # Errors
    /// Returns an error if the backing storage cannot be read or the cached
    /// record is not valid JSON.
    fn user(&self) -> Result<Option<UserRecord>, Error>;

    /// Creates the session. Called by the login flow, never by the reconciler.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn set_token(&self, token: SecretString) -> Result<(), Error>;

    /// Overwrites the cached user record.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn set_user(&self, user: &UserRecord) -> Result<(), Error>;

    /// Removes token and user together.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written; in that case
    /// both entries are still present.
    fn clear(&self) -> Result<(), Error>;
}

impl<S: SessionStore + ?Sized> SessionStore for &S {
    fn token(&self) -> Result<Option<SecretString>, Error> {
        (**self).token()
    }

    fn user(&self) -> Result<Option<UserRecord>, Error> {
        (**self).user()
    }

    fn set_token(&self, token: SecretString) -> Result<(), Error> {
        (**self).set_token(token)
    }

    fn set_user(&self, user: &UserRecord) -> Result<(), Error> {
        (**self).set_user(user)
    }

    fn clear(&self) -> Result<(), Error> {
        (**self).clear()
    }
}

impl<S: SessionStore + ?Sized> SessionStore for Rc<S> {
    fn token(&self) -> Result<Option<SecretString>, Error> {
        (**self).token()
    }

    fn user(&self) -> Result<Option<UserRecord>, Error> {
        (**self).user()
    }

    fn set_token(&self, token: SecretString) -> Result<(), Error> {
        (**self).set_token(token)
    }

    fn set_user(&self, user: &UserRecord) -> Result<(), Error> {
        (**self).set_user(user)
    }

    fn clear(&self) -> Result<(), Error> {
        (**self).clear()
    }
}
