//! Minimal document surface the reconciler needs: query by attribute, read
//! attributes, hide with a marker, and a few helpers for imperative controls.
//! Implementations exist for a headless in-memory tree and, on wasm32, for the
//! browser DOM.

mod memory;

pub use memory::{ElementNode, ElementRef, MemoryDocument};

use crate::Error;
use serde::{Deserialize, Serialize};

/// Class added to the document root once a pass completes.
pub const PERMISSIONS_CHECKED_CLASS: &str = "permissions-checked";
/// Class toggled by the imperative controls.
pub const HIDDEN_CLASS: &str = "hidden";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    Loading,
    Interactive,
    #[default]
    Complete,
}

impl ReadyState {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "loading" => ReadyState::Loading,
            "interactive" => ReadyState::Interactive,
            _ => ReadyState::Complete,
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait Document {
    type Element: Clone;

    /// Elements carrying attribute `name`, in document order.
    fn query_attribute(&self, name: &str) -> Vec<Self::Element>;

    /// Elements whose attribute `name` equals `value`, in document order.
    fn query_attribute_value(&self, name: &str, value: &str) -> Vec<Self::Element>;

    fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;

    /// Sets `display: none` and `marker="true"` as one step.
    ///
    /// # Errors
    /// Returns an error if the element cannot be mutated; neither change is
    /// left behind in that case.
    fn hide(&self, element: &Self::Element, marker: &str) -> Result<(), Error>;

    fn is_hidden(&self, element: &Self::Element) -> bool;

    fn element_by_id(&self, id: &str) -> Option<Self::Element>;

    /// # Errors
    /// Returns an error if the element cannot be mutated.
    fn set_text(&self, element: &Self::Element, text: &str) -> Result<(), Error>;

    /// # Errors
    /// Returns an error if the class list cannot be changed.
    fn add_class(&self, element: &Self::Element, class: &str) -> Result<(), Error>;

    /// # Errors
    /// Returns an error if the class list cannot be changed.
    fn remove_class(&self, element: &Self::Element, class: &str) -> Result<(), Error>;

    /// # Errors
    /// Returns an error if the root class list cannot be changed.
    fn add_root_class(&self, class: &str) -> Result<(), Error>;

    fn has_root_class(&self, class: &str) -> bool;

    fn ready_state(&self) -> ReadyState;

    /// Resolves once the document content has loaded.
    async fn content_loaded(&self);
}
