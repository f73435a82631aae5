use super::SessionStore;
use crate::{auth::UserRecord, Error};
use secrecy::{ExposeSecret, SecretString};
use std::cell::RefCell;

#[derive(Default)]
struct Entries {
    token: Option<String>,
    user: Option<UserRecord>,
}

/// In-process session, used in tests and for one-shot runs that must not
/// touch persistent storage.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RefCell<Entries>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: &str) -> Self {
        let store = Self::default();
        store.entries.borrow_mut().token = Some(token.to_string());
        store
    }
}

impl SessionStore for MemorySessionStore {
    fn token(&self) -> Result<Option<SecretString>, Error> {
        Ok(self
            .entries
            .borrow()
            .token
            .clone()
            .filter(|token| !token.is_empty())
            .map(SecretString::from))
    }

    fn user(&self) -> Result<Option<UserRecord>, Error> {
        Ok(self.entries.borrow().user.clone())
    }

    fn set_token(&self, token: SecretString) -> Result<(), Error> {
        self.entries.borrow_mut().token = Some(token.expose_secret().to_string());
        Ok(())
    }

    fn set_user(&self, user: &UserRecord) -> Result<(), Error> {
        self.entries.borrow_mut().user = Some(user.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        *self.entries.borrow_mut() = Entries::default();
        Ok(())
    }
}
