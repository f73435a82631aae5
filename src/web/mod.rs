//! Browser adapters: `localStorage` session, `web-sys` document and
//! `window.location` navigation. The page entry point runs one pass as soon as
//! the module starts, deferring to `DOMContentLoaded` while the document is
//! still loading.
//!
//! Runtime settings are read from `window.PERMGATE_CONFIG` (if present); the
//! API base defaults to the page origin.
//!
//! Pages that manage elements by hand get the session helpers and controls as
//! exports too (`getCurrentUser`, `hasPermission`, `toggleElementForAdmin`,
//! ...), plus `runPermissionPhase` for content inserted after load.

use crate::{
    auth::{AuthClient, Navigator, UserRecord},
    bootstrap::Bootstrapper,
    config::{apply_overrides, normalize_value, Config, RuntimeOverrides},
    controls,
    dom::{Document, ReadyState},
    reconcile::VisibilityReconciler,
    rules::Reason,
    session::{SessionStore, TOKEN_KEY, USER_KEY},
    Error,
};
use js_sys::{Object, Promise, Reflect};
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, warn};
use wasm_bindgen::{prelude::*, JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{
    AddEventListenerOptions, CssStyleDeclaration, Element, HtmlElement, Storage, SvgElement,
};

fn js_error(context: &str, err: &JsValue) -> Error {
    Error::Document(format!("{context}: {err:?}"))
}

fn storage_error(err: &JsValue) -> Error {
    Error::Storage(format!("{err:?}"))
}

fn window() -> Result<web_sys::Window, Error> {
    web_sys::window().ok_or_else(|| Error::Config("no window available".to_string()))
}

pub struct LocalStorageSessionStore {
    storage: Storage,
}

impl LocalStorageSessionStore {
    /// # Errors
    /// Returns an error if `localStorage` is unavailable.
    pub fn new() -> Result<Self, Error> {
        let storage = window()?
            .local_storage()
            .map_err(|err| storage_error(&err))?
            .ok_or_else(|| Error::Storage("localStorage is unavailable".to_string()))?;
        Ok(Self { storage })
    }

    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.storage.get_item(key).map_err(|err| storage_error(&err))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.storage
            .set_item(key, value)
            .map_err(|err| storage_error(&err))
    }
}

impl SessionStore for LocalStorageSessionStore {
    fn token(&self) -> Result<Option<SecretString>, Error> {
        Ok(self
            .get(TOKEN_KEY)?
            .filter(|token| !token.is_empty())
            .map(SecretString::from))
    }

    fn user(&self) -> Result<Option<UserRecord>, Error> {
        match self.get(USER_KEY)? {
            Some(encoded) => Ok(Some(serde_json::from_str(&encoded)?)),
            None => Ok(None),
        }
    }

    fn set_token(&self, token: SecretString) -> Result<(), Error> {
        self.set(TOKEN_KEY, token.expose_secret())
    }

    fn set_user(&self, user: &UserRecord) -> Result<(), Error> {
        self.set(USER_KEY, &serde_json::to_string(user)?)
    }

    // Storage calls are synchronous and nothing else runs on the page thread
    // in between, so no reader can see one key without the other.
    fn clear(&self) -> Result<(), Error> {
        self.storage
            .remove_item(TOKEN_KEY)
            .and_then(|()| self.storage.remove_item(USER_KEY))
            .map_err(|err| storage_error(&err))
    }
}

pub struct WindowNavigator;

impl Navigator for WindowNavigator {
    fn navigate(&self, route: &str) {
        match window() {
            Ok(window) => {
                if let Err(err) = window.location().set_href(route) {
                    error!("failed to navigate to {}: {:?}", route, err);
                }
            }
            Err(err) => error!("failed to navigate to {}: {}", route, err),
        }
    }
}

pub struct WebDocument {
    document: web_sys::Document,
}

impl WebDocument {
    /// # Errors
    /// Returns an error outside a browsing context.
    pub fn new() -> Result<Self, Error> {
        let document = window()?
            .document()
            .ok_or_else(|| Error::Document("no document available".to_string()))?;
        Ok(Self { document })
    }

    fn select(&self, selector: &str) -> Vec<Element> {
        let list = match self.document.query_selector_all(selector) {
            Ok(list) => list,
            Err(err) => {
                warn!("invalid selector {}: {:?}", selector, err);
                return Vec::new();
            }
        };
        (0..list.length())
            .filter_map(|index| list.item(index))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn body(&self) -> Result<HtmlElement, Error> {
        self.document
            .body()
            .ok_or_else(|| Error::Document("document has no body".to_string()))
    }
}

/// Inline style of HTML and SVG elements; other namespaces have none.
fn inline_style(element: &Element) -> Option<CssStyleDeclaration> {
    if let Some(html) = element.dyn_ref::<HtmlElement>() {
        return Some(html.style());
    }
    element.dyn_ref::<SvgElement>().map(SvgElement::style)
}

fn append_style_attribute(element: &Element, declaration: &str) -> Result<(), JsValue> {
    let style = match element.get_attribute("style") {
        Some(existing) if !existing.trim().is_empty() => {
            format!("{}; {declaration}", existing.trim().trim_end_matches(';'))
        }
        _ => declaration.to_string(),
    };
    element.set_attribute("style", &style)
}

impl Document for WebDocument {
    type Element = Element;

    fn query_attribute(&self, name: &str) -> Vec<Element> {
        self.select(&format!("[{name}]"))
    }

    fn query_attribute_value(&self, name: &str, value: &str) -> Vec<Element> {
        self.select(&format!("[{name}=\"{value}\"]"))
    }

    fn attribute(&self, element: &Element, name: &str) -> Option<String> {
        element.get_attribute(name)
    }

    fn hide(&self, element: &Element, marker: &str) -> Result<(), Error> {
        let had_marker = element.has_attribute(marker);
        element
            .set_attribute(marker, "true")
            .map_err(|err| js_error("set marker", &err))?;

        let styled = match inline_style(element) {
            Some(style) => style.set_property("display", "none"),
            None => append_style_attribute(element, "display: none"),
        };
        if let Err(err) = styled {
            if !had_marker {
                let _ = element.remove_attribute(marker);
            }
            return Err(js_error("set display", &err));
        }
        Ok(())
    }

    fn is_hidden(&self, element: &Element) -> bool {
        match inline_style(element) {
            Some(style) => style
                .get_property_value("display")
                .is_ok_and(|display| display == "none"),
            None => element
                .get_attribute("style")
                .is_some_and(|style| style.replace(' ', "").contains("display:none")),
        }
    }

    fn element_by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn set_text(&self, element: &Element, text: &str) -> Result<(), Error> {
        element.set_text_content(Some(text));
        Ok(())
    }

    fn add_class(&self, element: &Element, class: &str) -> Result<(), Error> {
        element
            .class_list()
            .add_1(class)
            .map_err(|err| js_error("add class", &err))
    }

    fn remove_class(&self, element: &Element, class: &str) -> Result<(), Error> {
        element
            .class_list()
            .remove_1(class)
            .map_err(|err| js_error("remove class", &err))
    }

    fn add_root_class(&self, class: &str) -> Result<(), Error> {
        self.body()?
            .class_list()
            .add_1(class)
            .map_err(|err| js_error("add root class", &err))
    }

    fn has_root_class(&self, class: &str) -> bool {
        self.document
            .body()
            .is_some_and(|body| body.class_list().contains(class))
    }

    fn ready_state(&self) -> ReadyState {
        ReadyState::parse(&self.document.ready_state())
    }

    async fn content_loaded(&self) {
        let document = self.document.clone();
        let promise = Promise::new(&mut |resolve, _reject| {
            let options = AddEventListenerOptions::new();
            options.set_once(true);
            let callback = Closure::once_into_js(move || {
                let _ = resolve.call0(&JsValue::NULL);
            });
            if let Err(err) = document.add_event_listener_with_callback_and_add_event_listener_options(
                "DOMContentLoaded",
                callback.unchecked_ref(),
                &options,
            ) {
                error!("failed to wait for DOMContentLoaded: {:?}", err);
            }
        });
        let _ = JsFuture::from(promise).await;
    }
}

/// Builds the page configuration from the origin and `window.PERMGATE_CONFIG`.
///
/// # Errors
/// Returns an error outside a browsing context.
pub fn load_config() -> Result<Config, Error> {
    let origin = window()?
        .location()
        .origin()
        .map_err(|err| js_error("read origin", &err))?;
    let mut config = Config::new(&origin);
    if let Some(runtime) = runtime_overrides() {
        apply_overrides(&mut config, runtime);
    }
    Ok(config)
}

fn runtime_overrides() -> Option<RuntimeOverrides> {
    let window = web_sys::window()?;
    let config = Reflect::get(&window, &JsValue::from_str("PERMGATE_CONFIG")).ok()?;
    if config.is_null() || config.is_undefined() {
        return None;
    }
    let object = Object::from(config);

    Some(RuntimeOverrides {
        api_base_url: read_runtime_value(&object, "api_base_url"),
        anonymous_route: read_runtime_value(&object, "anonymous_route"),
        concurrency: Reflect::get(&object, &JsValue::from_str("concurrency"))
            .ok()
            .and_then(|value| value.as_f64())
            .filter(|value| *value >= 1.0)
            .map(|value| value as usize),
    })
}

fn read_runtime_value(object: &Object, key: &str) -> Option<String> {
    let value = Reflect::get(object, &JsValue::from_str(key))
        .ok()?
        .as_string()?;
    normalize_value(&value)
}

fn page_client() -> Result<AuthClient<LocalStorageSessionStore, WindowNavigator>, Error> {
    let config = load_config()?;
    AuthClient::new(&config, LocalStorageSessionStore::new()?, WindowNavigator)
}

fn to_js(err: &Error) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Hands a serializable value to the page as a plain JS object.
fn to_js_value<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let encoded = serde_json::to_string(value).map_err(|err| to_js(&err.into()))?;
    js_sys::JSON::parse(&encoded)
}

async fn run_page() -> Result<(), Error> {
    let config = load_config()?;
    let client = AuthClient::new(&config, LocalStorageSessionStore::new()?, WindowNavigator)?;
    let document = WebDocument::new()?;
    let reconciler =
        VisibilityReconciler::new(&document, &client).with_concurrency(config.concurrency);
    Bootstrapper::new(reconciler).start().await?;
    Ok(())
}

/// Runs one reconciliation pass over the current page.
#[wasm_bindgen(js_name = initPermissions)]
pub fn init_permissions() {
    spawn_local(async {
        if let Err(err) = run_page().await {
            warn!("permission pass aborted: {}", err);
        }
    });
}

#[wasm_bindgen(start)]
pub fn start() {
    init_permissions();
}

/// Runs a single phase (`permission`, `profile`, `admin`, `blacklist` or
/// `whitelist`) over the current page, for content added after load.
///
/// # Errors
/// Rejects on an unknown phase name or an invalid session.
#[wasm_bindgen(js_name = runPermissionPhase)]
pub async fn run_permission_phase(phase: String) -> Result<(), JsValue> {
    let reason = Reason::from_name(&phase)
        .ok_or_else(|| JsValue::from_str(&format!("unknown phase: {phase}")))?;
    let config = load_config().map_err(|err| to_js(&err))?;
    let store = LocalStorageSessionStore::new().map_err(|err| to_js(&err))?;
    let client = AuthClient::new(&config, store, WindowNavigator).map_err(|err| to_js(&err))?;
    let document = WebDocument::new().map_err(|err| to_js(&err))?;
    VisibilityReconciler::new(&document, &client)
        .with_concurrency(config.concurrency)
        .run_phase(reason)
        .await
        .map_err(|err| to_js(&err))?;
    Ok(())
}

/// Returns false and leaves the page when there is no session.
///
/// # Errors
/// Rejects when the client cannot be built.
#[wasm_bindgen(js_name = checkAuth)]
pub fn check_auth() -> Result<bool, JsValue> {
    let client = page_client().map_err(|err| to_js(&err))?;
    Ok(client.check_auth())
}

/// The stored access token, if any.
///
/// # Errors
/// Rejects when `localStorage` is unavailable.
#[wasm_bindgen(js_name = getToken)]
pub fn get_token() -> Result<Option<String>, JsValue> {
    let token = LocalStorageSessionStore::new()
        .and_then(|store| store.token())
        .map_err(|err| to_js(&err))?;
    Ok(token.map(|token| token.expose_secret().to_string()))
}

/// The cached user record, without a network call.
///
/// # Errors
/// Rejects when the client cannot be built.
#[wasm_bindgen(js_name = getStoredUser)]
pub fn get_stored_user() -> Result<JsValue, JsValue> {
    let client = page_client().map_err(|err| to_js(&err))?;
    match client.stored_user() {
        Some(user) => to_js_value(&user),
        None => Ok(JsValue::NULL),
    }
}

/// Refreshes the user from the service. An invalid session ends it and
/// leaves the page.
///
/// # Errors
/// Rejects when the client cannot be built or the session is invalid.
#[wasm_bindgen(js_name = getCurrentUser)]
pub async fn get_current_user() -> Result<JsValue, JsValue> {
    let client = page_client().map_err(|err| to_js(&err))?;
    match client.refresh_current_user().await.map_err(|err| to_js(&err))? {
        Some(user) => to_js_value(&user),
        None => Ok(JsValue::NULL),
    }
}

/// # Errors
/// Rejects when the client cannot be built.
#[wasm_bindgen(js_name = hasPermission)]
pub async fn has_permission(module: String, permission: String) -> Result<bool, JsValue> {
    let client = page_client().map_err(|err| to_js(&err))?;
    Ok(client.check_permission(&module, &permission).await)
}

/// # Errors
/// Rejects when the client cannot be built.
#[wasm_bindgen(js_name = getMyModules)]
pub async fn get_my_modules() -> Result<JsValue, JsValue> {
    let client = page_client().map_err(|err| to_js(&err))?;
    to_js_value(&client.list_accessible_modules().await)
}

/// Admin flag of the cached user.
///
/// # Errors
/// Rejects when the client cannot be built.
#[wasm_bindgen(js_name = isAdmin)]
pub fn is_admin() -> Result<bool, JsValue> {
    let client = page_client().map_err(|err| to_js(&err))?;
    Ok(client.is_cached_admin())
}

/// # Errors
/// Rejects when the client or document is unavailable, or the session is
/// invalid.
#[wasm_bindgen(js_name = displayUserInfo)]
pub async fn display_user_info(element_id: String) -> Result<(), JsValue> {
    let client = page_client().map_err(|err| to_js(&err))?;
    let document = WebDocument::new().map_err(|err| to_js(&err))?;
    controls::display_user_info(&document, &client, &element_id)
        .await
        .map_err(|err| to_js(&err))
}

/// # Errors
/// Rejects when the client or document is unavailable.
#[wasm_bindgen(js_name = toggleElementByPermission)]
pub async fn toggle_element_by_permission(
    element_id: String,
    module: String,
    permission: String,
) -> Result<(), JsValue> {
    let client = page_client().map_err(|err| to_js(&err))?;
    let document = WebDocument::new().map_err(|err| to_js(&err))?;
    controls::toggle_element_by_permission(&document, &client, &element_id, &module, &permission)
        .await
        .map_err(|err| to_js(&err))
}

/// # Errors
/// Rejects when the client or document is unavailable.
#[wasm_bindgen(js_name = toggleElementForAdmin)]
pub fn toggle_element_for_admin(element_id: &str) -> Result<(), JsValue> {
    let client = page_client().map_err(|err| to_js(&err))?;
    let document = WebDocument::new().map_err(|err| to_js(&err))?;
    controls::toggle_element_for_admin(&document, &client, element_id).map_err(|err| to_js(&err))
}

/// Ends the session locally and on the server, then leaves the page.
///
/// # Errors
/// Rejects when the client cannot be built.
#[wasm_bindgen]
pub async fn logout() -> Result<(), JsValue> {
    let client = page_client().map_err(|err| to_js(&err))?;
    client.terminate_session().await;
    Ok(())
}
