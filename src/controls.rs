//! Imperative helpers for pages that manage single elements by id. Unlike a
//! reconciliation pass these may reveal an element again: they toggle the
//! `hidden` class instead of stamping markers.

use crate::{
    auth::{AuthClient, Navigator},
    dom::{Document, HIDDEN_CLASS},
    session::SessionStore,
    Error,
};
use tracing::debug;

/// Refreshes the user and writes the display name into element `element_id`.
///
/// # Errors
/// Returns [`Error::InvalidSession`] when the refresh is rejected, or a
/// document error if the text cannot be written.
pub async fn display_user_info<D, S, N>(
    document: &D,
    client: &AuthClient<S, N>,
    element_id: &str,
) -> Result<(), Error>
where
    D: Document,
    S: SessionStore,
    N: Navigator,
{
    let Some(user) = client.refresh_current_user().await? else {
        return Ok(());
    };
    match document.element_by_id(element_id) {
        Some(element) => document.set_text(&element, &user.display_name),
        None => {
            debug!("no element #{} to show the user in", element_id);
            Ok(())
        }
    }
}

/// Shows element `element_id` when the user holds `module:permission` and
/// hides it otherwise.
///
/// # Errors
/// Returns a document error if the class list cannot be changed.
pub async fn toggle_element_by_permission<D, S, N>(
    document: &D,
    client: &AuthClient<S, N>,
    element_id: &str,
    module: &str,
    permission: &str,
) -> Result<(), Error>
where
    D: Document,
    S: SessionStore,
    N: Navigator,
{
    let allowed = client.check_permission(module, permission).await;
    toggle(document, element_id, allowed)
}

/// Shows element `element_id` only for administrators, judged from the cached
/// user record.
///
/// # Errors
/// Returns a document error if the class list cannot be changed.
pub fn toggle_element_for_admin<D, S, N>(
    document: &D,
    client: &AuthClient<S, N>,
    element_id: &str,
) -> Result<(), Error>
where
    D: Document,
    S: SessionStore,
    N: Navigator,
{
    toggle(document, element_id, client.is_cached_admin())
}

fn toggle<D: Document>(document: &D, element_id: &str, visible: bool) -> Result<(), Error> {
    let Some(element) = document.element_by_id(element_id) else {
        return Ok(());
    };
    if visible {
        document.remove_class(&element, HIDDEN_CLASS)
    } else {
        document.add_class(&element, HIDDEN_CLASS)
    }
}
