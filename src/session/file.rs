//! File-backed session that survives restarts. The file is a flat JSON object
//! with the same keys a browser would keep in `localStorage`: `access_token`
//! holds the token and `user` holds the JSON-encoded user record.
//!
//! Every mutation rewrites the whole file through a temporary sibling and a
//! rename, so readers observe either the old or the new pair, never half of a
//! `clear`.

use super::{SessionStore, TOKEN_KEY, USER_KEY};
use crate::{auth::UserRecord, Error};
use secrecy::{ExposeSecret, SecretString};
use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::debug;

type Entries = BTreeMap<String, String>;

pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Entries, Error> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(Entries::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Entries::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, entries: &Entries) -> Result<(), Error> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;

        debug!("session file updated: {}", self.path.display());

        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut Entries) -> Result<(), Error>) -> Result<(), Error> {
        let mut entries = self.read()?;
        apply(&mut entries)?;
        self.write(&entries)
    }
}

impl SessionStore for FileSessionStore {
    fn token(&self) -> Result<Option<SecretString>, Error> {
        Ok(self
            .read()?
            .remove(TOKEN_KEY)
            .filter(|token| !token.is_empty())
            .map(SecretString::from))
    }

    fn user(&self) -> Result<Option<UserRecord>, Error> {
        match self.read()?.get(USER_KEY) {
            Some(encoded) => Ok(Some(serde_json::from_str(encoded)?)),
            None => Ok(None),
        }
    }

    fn set_token(&self, token: SecretString) -> Result<(), Error> {
        self.update(|entries| {
            entries.insert(TOKEN_KEY.to_string(), token.expose_secret().to_string());
            Ok(())
        })
    }

    fn set_user(&self, user: &UserRecord) -> Result<(), Error> {
        let encoded = serde_json::to_string(user)?;
        self.update(|entries| {
            entries.insert(USER_KEY.to_string(), encoded);
            Ok(())
        })
    }

    fn clear(&self) -> Result<(), Error> {
        self.update(|entries| {
            entries.remove(TOKEN_KEY);
            entries.remove(USER_KEY);
            Ok(())
        })
    }
}
