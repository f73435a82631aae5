//! Client for the remote auth service. Every call presents the bearer token
//! from the session store and resolves to a typed value; only the current-user
//! refresh can fail, and that failure ends the session.
//!
//! Flow overview: `refresh_current_user` hits `/api/auth/me` and caches the
//! record; a non-success answer clears the session and sends the user to the
//! anonymous route. Permission and module lookups default to deny on any
//! failure and never touch the session. `terminate_session` notifies the
//! service best-effort and always clears local state.
//!
//! Tokens are never logged.

mod navigator;
mod types;

pub use navigator::{Navigator, RecordingNavigator};
pub use types::{normalize_profile, Module, UserRecord};

use crate::{config::Config, session::SessionStore, Error};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};
use types::PermissionResponse;
use url::Url;

const ME_PATH: &[&str] = &["api", "auth", "me"];
const CHECK_PERMISSION_PATH: &[&str] = &["api", "auth", "check-permission"];
const MODULES_PATH: &[&str] = &["api", "auth", "my-modules"];
const LOGOUT_PATH: &[&str] = &["api", "auth", "logout"];

/// Maximum number of error body characters kept in [`Error::Http`].
const MAX_ERROR_CHARS: usize = 200;

/// Answers the two questions the reconciler asks of the remote service.
#[allow(async_fn_in_trait)]
pub trait Authority {
    /// Fetches and caches the current user. `Ok(None)` means there is no
    /// session to ask about.
    ///
    /// # Errors
    /// Returns [`Error::InvalidSession`] when the service rejects the token
    /// or cannot be reached. The session has been cleared by then.
    async fn refresh_current_user(&self) -> Result<Option<UserRecord>, Error>;

    /// Returns whether the user holds `module:permission`. Failures deny.
    async fn check_permission(&self, module: &str, permission: &str) -> bool;
}

pub struct AuthClient<S, N> {
    http: Client,
    base_url: Url,
    anonymous_route: String,
    store: S,
    navigator: N,
}

impl<S: SessionStore, N: Navigator> AuthClient<S, N> {
    /// # Errors
    /// Returns an error if the API base URL is missing or invalid, or the
    /// HTTP client cannot be built.
    pub fn new(config: &Config, store: S, navigator: N) -> Result<Self, Error> {
        let base = config.api_base_url.trim();
        if base.is_empty() {
            return Err(Error::Config("API base URL is not configured.".to_string()));
        }

        let base_url = Url::parse(base)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("API base URL cannot hold paths: {base}")));
        }

        #[cfg(not(target_arch = "wasm32"))]
        let builder = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(config.request_timeout);
        #[cfg(target_arch = "wasm32")]
        let builder = Client::builder();

        Ok(Self {
            http: builder.build()?,
            base_url,
            anonymous_route: config.anonymous_route.clone(),
            store,
            navigator,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn anonymous_route(&self) -> &str {
        &self.anonymous_route
    }

    /// Returns true when a token is present; otherwise sends the user to the
    /// anonymous route. No network call is made.
    pub fn check_auth(&self) -> bool {
        if self.token().is_some() {
            return true;
        }
        debug!("no access token, leaving protected page");
        self.navigator.navigate(&self.anonymous_route);
        false
    }

    /// Returns the cached user record without contacting the service.
    pub fn stored_user(&self) -> Option<UserRecord> {
        match self.store.user() {
            Ok(user) => user,
            Err(err) => {
                warn!("failed to read cached user: {}", err);
                None
            }
        }
    }

    /// Admin flag of the cached user; false when nothing is cached.
    pub fn is_cached_admin(&self) -> bool {
        self.stored_user().is_some_and(|user| user.is_admin)
    }

    /// Fetches `/api/auth/me` and overwrites the cached record.
    ///
    /// # Errors
    /// Returns [`Error::InvalidSession`] on any non-success response or
    /// transport failure, after clearing the session and navigating to the
    /// anonymous route.
    #[instrument(skip(self))]
    pub async fn refresh_current_user(&self) -> Result<Option<UserRecord>, Error> {
        let Some(token) = self.token() else {
            debug!("no access token, skipping user refresh");
            return Ok(None);
        };

        match self.get_json::<UserRecord>(ME_PATH, &token).await {
            Ok(user) => {
                if let Err(err) = self.store.set_user(&user) {
                    warn!("failed to cache user record: {}", err);
                }
                debug!("user {} refreshed", user.id);
                Ok(Some(user))
            }
            Err(err) => {
                error!("session validation failed: {}", err);
                self.end_session();
                Err(Error::InvalidSession(err.to_string()))
            }
        }
    }

    /// Asks the service whether the user holds `module:permission`.
    #[instrument(skip(self))]
    pub async fn check_permission(&self, module: &str, permission: &str) -> bool {
        let Some(token) = self.token() else {
            return false;
        };

        let mut segments: Vec<&str> = CHECK_PERMISSION_PATH.to_vec();
        segments.extend([module, permission]);

        match self.get_json::<PermissionResponse>(&segments, &token).await {
            Ok(response) => response.has_permission,
            Err(err) => {
                warn!("permission check {}:{} failed: {}", module, permission, err);
                false
            }
        }
    }

    /// Lists the modules the user can reach; empty on any failure.
    #[instrument(skip(self))]
    pub async fn list_accessible_modules(&self) -> Vec<Module> {
        let Some(token) = self.token() else {
            return Vec::new();
        };

        match self.get_json::<Vec<Module>>(MODULES_PATH, &token).await {
            Ok(modules) => modules,
            Err(err) => {
                warn!("failed to list modules: {}", err);
                Vec::new()
            }
        }
    }

    /// Notifies the service, then clears the session and navigates to the
    /// anonymous route whether or not the notification succeeded.
    #[instrument(skip(self))]
    pub async fn terminate_session(&self) {
        if let Some(token) = self.token() {
            if let Err(err) = self.post_empty(LOGOUT_PATH, &token).await {
                warn!("logout request failed: {}", err);
            }
        }
        self.end_session();
        info!("session terminated");
    }

    fn end_session(&self) {
        if let Err(err) = self.store.clear() {
            error!("failed to clear session: {}", err);
        }
        self.navigator.navigate(&self.anonymous_route);
    }

    fn token(&self) -> Option<SecretString> {
        match self.store.token() {
            Ok(token) => token,
            Err(err) => {
                warn!("failed to read access token: {}", err);
                None
            }
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| Error::Config("API base URL cannot hold paths".to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        token: &SecretString,
    ) -> Result<T, Error> {
        let url = self.endpoint(segments)?;
        let span = info_span!("auth.get", http.method = "GET", url = %url);
        let response = self
            .http
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .instrument(span)
            .await?;

        handle_json_response(response).await
    }

    async fn post_empty(&self, segments: &[&str], token: &SecretString) -> Result<(), Error> {
        let url = self.endpoint(segments)?;
        let span = info_span!("auth.post", http.method = "POST", url = %url);
        let response = self
            .http
            .post(url)
            .bearer_auth(token.expose_secret())
            .send()
            .instrument(span)
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(Error::Http {
                status,
                message: sanitize_body(&body),
            })
        }
    }
}

impl<S: SessionStore, N: Navigator> Authority for AuthClient<S, N> {
    async fn refresh_current_user(&self) -> Result<Option<UserRecord>, Error> {
        AuthClient::refresh_current_user(self).await
    }

    async fn check_permission(&self, module: &str, permission: &str) -> bool {
        AuthClient::check_permission(self, module, permission).await
    }
}

/// Decodes JSON on success and keeps a sanitized body otherwise.
async fn handle_json_response<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
    let status = response.status();
    if status.is_success() {
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(Error::Http {
            status: status.as_u16(),
            message: sanitize_body(&body),
        })
    }
}

fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use anyhow::Result;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn user_json() -> serde_json::Value {
        json!({
            "id": 9,
            "nome_completo": "Dora Lima",
            "email": "dora@example.com",
            "is_admin": false,
            "is_active": true,
            "perfis": ["gestor"],
            "perfil_principal": "gestor"
        })
    }

    fn client<'a>(
        base: &str,
        store: &'a MemorySessionStore,
        navigator: &'a RecordingNavigator,
    ) -> Result<AuthClient<&'a MemorySessionStore, &'a RecordingNavigator>> {
        Ok(AuthClient::new(&Config::new(base), store, navigator)?)
    }

    #[test]
    fn new_rejects_missing_base_url() {
        let store = MemorySessionStore::new();
        let navigator = RecordingNavigator::new();
        let result = AuthClient::new(&Config::default(), &store, &navigator);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn sanitize_body_trims_and_truncates() {
        assert_eq!(sanitize_body("   "), "Request failed.");
        assert_eq!(sanitize_body(" nope "), "nope");
        assert_eq!(sanitize_body(&"x".repeat(500)).len(), MAX_ERROR_CHARS);
    }

    #[test]
    fn endpoint_keeps_base_path_and_encodes_segments() -> Result<()> {
        let store = MemorySessionStore::new();
        let navigator = RecordingNavigator::new();
        let client = client("https://erp.example/app/", &store, &navigator)?;

        let url = client.endpoint(&["api", "auth", "check-permission", "mod 2", "a/b"])?;
        assert_eq!(
            url.as_str(),
            "https://erp.example/app/api/auth/check-permission/mod%202/a%2Fb"
        );
        Ok(())
    }

    #[test]
    fn check_auth_without_token_navigates_to_anonymous_route() -> Result<()> {
        let store = MemorySessionStore::new();
        let navigator = RecordingNavigator::new();
        let client = client("http://127.0.0.1:1", &store, &navigator)?;

        assert!(!client.check_auth());
        assert_eq!(navigator.routes(), vec!["/".to_string()]);
        Ok(())
    }

    #[test]
    fn check_auth_with_token_stays() -> Result<()> {
        let store = MemorySessionStore::with_token("tok");
        let navigator = RecordingNavigator::new();
        let client = client("http://127.0.0.1:1", &store, &navigator)?;

        assert!(client.check_auth());
        assert!(navigator.routes().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn refresh_current_user_caches_record() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
            .expect(1)
            .mount(&server)
            .await;

        let store = MemorySessionStore::with_token("tok");
        let navigator = RecordingNavigator::new();
        let client = client(&server.uri(), &store, &navigator)?;

        let user = client.refresh_current_user().await?;

        assert_eq!(user.as_ref().map(|u| u.id), Some(9));
        assert_eq!(store.user()?.map(|u| u.display_name), Some("Dora Lima".to_string()));
        assert!(navigator.routes().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn refresh_current_user_rejected_clears_session() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
            .mount(&server)
            .await;

        let store = MemorySessionStore::with_token("tok");
        let navigator = RecordingNavigator::new();
        let client = client(&server.uri(), &store, &navigator)?;

        let result = client.refresh_current_user().await;

        assert!(matches!(result, Err(Error::InvalidSession(_))));
        assert!(store.token()?.is_none());
        assert!(store.user()?.is_none());
        assert_eq!(navigator.routes(), vec!["/".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn refresh_current_user_unreachable_clears_session() -> Result<()> {
        let store = MemorySessionStore::with_token("tok");
        let navigator = RecordingNavigator::new();
        let client = client("http://127.0.0.1:1", &store, &navigator)?;

        let result = client.refresh_current_user().await;

        assert!(matches!(result, Err(Error::InvalidSession(_))));
        assert!(store.token()?.is_none());
        assert_eq!(navigator.last().as_deref(), Some("/"));
        Ok(())
    }

    #[tokio::test]
    async fn refresh_current_user_without_token_skips_network() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
            .expect(0)
            .mount(&server)
            .await;

        let store = MemorySessionStore::new();
        let navigator = RecordingNavigator::new();
        let client = client(&server.uri(), &store, &navigator)?;

        assert!(client.refresh_current_user().await?.is_none());
        assert!(navigator.routes().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn check_permission_reads_flag() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/auth/check-permission/modulo2/edit"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "has_permission": true })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/auth/check-permission/modulo2/delete"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "has_permission": false })),
            )
            .mount(&server)
            .await;

        let store = MemorySessionStore::with_token("tok");
        let navigator = RecordingNavigator::new();
        let client = client(&server.uri(), &store, &navigator)?;

        assert!(client.check_permission("modulo2", "edit").await);
        assert!(!client.check_permission("modulo2", "delete").await);
        Ok(())
    }

    #[tokio::test]
    async fn check_permission_failures_deny_without_logout() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/auth/check-permission/modulo2/edit"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/auth/check-permission/modulo2/view"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let store = MemorySessionStore::with_token("tok");
        let navigator = RecordingNavigator::new();
        let client = client(&server.uri(), &store, &navigator)?;

        assert!(!client.check_permission("modulo2", "edit").await);
        assert!(!client.check_permission("modulo2", "view").await);
        assert!(store.token()?.is_some());
        assert!(navigator.routes().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn check_permission_without_token_skips_network() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "has_permission": true })),
            )
            .expect(0)
            .mount(&server)
            .await;

        let store = MemorySessionStore::new();
        let navigator = RecordingNavigator::new();
        let client = client(&server.uri(), &store, &navigator)?;

        assert!(!client.check_permission("modulo2", "edit").await);
        Ok(())
    }

    #[tokio::test]
    async fn list_accessible_modules_decodes_and_defaults_to_empty() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/auth/my-modules"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "codigo": "modulo1", "nome": "Notas", "ordem": 1 },
                { "id": 2, "codigo": "modulo2", "nome": "Postos", "ordem": 2 }
            ])))
            .mount(&server)
            .await;

        let store = MemorySessionStore::with_token("tok");
        let navigator = RecordingNavigator::new();
        let client = client(&server.uri(), &store, &navigator)?;

        let modules = client.list_accessible_modules().await;
        let codes: Vec<&str> = modules.iter().map(|m| m.code.as_str()).collect();
        assert_eq!(codes, vec!["modulo1", "modulo2"]);

        let offline = MemorySessionStore::with_token("tok");
        let unreachable = self::client("http://127.0.0.1:1", &offline, &navigator)?;
        assert!(unreachable.list_accessible_modules().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn terminate_session_notifies_and_clears() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/auth/logout"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = MemorySessionStore::with_token("tok");
        let navigator = RecordingNavigator::new();
        let client = client(&server.uri(), &store, &navigator)?;

        client.terminate_session().await;

        assert!(store.token()?.is_none());
        assert_eq!(navigator.routes(), vec!["/".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn terminate_session_clears_even_when_service_fails() -> Result<()> {
        let store = MemorySessionStore::with_token("tok");
        let navigator = RecordingNavigator::new();
        let client = client("http://127.0.0.1:1", &store, &navigator)?;

        client.terminate_session().await;

        assert!(store.token()?.is_none());
        assert!(store.user()?.is_none());
        assert_eq!(navigator.routes(), vec!["/".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn cached_admin_reads_store_only() -> Result<()> {
        let store = MemorySessionStore::with_token("tok");
        let navigator = RecordingNavigator::new();
        let client = client("http://127.0.0.1:1", &store, &navigator)?;

        assert!(!client.is_cached_admin());

        let mut user: UserRecord = serde_json::from_value(user_json())?;
        user.is_admin = true;
        store.set_user(&user)?;

        assert!(client.is_cached_admin());
        assert_eq!(client.stored_user().map(|u| u.id), Some(9));
        Ok(())
    }
}
