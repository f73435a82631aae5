//! Payloads returned by the remote auth service. The user record is cached
//! verbatim in the session store and overwritten on every refresh.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The current user as returned by `GET /api/auth/me`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    #[serde(rename = "nome_completo", default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(rename = "perfis", default)]
    pub profiles: BTreeSet<String>,
    #[serde(rename = "perfil_principal", default)]
    pub primary_profile: String,
}

const fn default_active() -> bool {
    true
}

impl UserRecord {
    /// Returns true when `profile` is one of the user's profiles or the
    /// primary profile. Comparison ignores case and surrounding whitespace.
    #[must_use]
    pub fn holds_profile(&self, profile: &str) -> bool {
        let wanted = normalize_profile(profile);
        if wanted.is_empty() {
            return false;
        }
        normalize_profile(&self.primary_profile) == wanted
            || self
                .profiles
                .iter()
                .any(|held| normalize_profile(held) == wanted)
    }

    /// Exact membership, as profile lists compare: `profile` is one of the
    /// user's profiles or the primary profile, byte for byte.
    #[must_use]
    pub fn lists_profile(&self, profile: &str) -> bool {
        self.primary_profile == profile || self.profiles.contains(profile)
    }
}

#[must_use]
pub fn normalize_profile(profile: &str) -> String {
    profile.trim().to_lowercase()
}

/// A module the user can reach, from `GET /api/auth/my-modules`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Module {
    pub id: i64,
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "descricao", default)]
    pub description: Option<String>,
    #[serde(rename = "icone", default)]
    pub icon: Option<String>,
    #[serde(rename = "ordem", default)]
    pub order: i64,
    #[serde(rename = "categoria", default)]
    pub category: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct PermissionResponse {
    pub has_permission: bool,
}
