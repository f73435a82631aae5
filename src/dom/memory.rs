//! Headless document used by tests and by the CLI. The tree is kept flat:
//! elements are stored in document order and addressed by index, which is all
//! attribute selectors and id lookups need.
//!
//! The JSON form is what `permgate reconcile` reads and writes:
//!
//! ```json
//! {
//!   "ready_state": "complete",
//!   "root_classes": [],
//!   "elements": [
//!     { "id": "edit", "attributes": { "data-require-permission": "modulo2:edit" } }
//!   ]
//! }
//! ```

use super::{Document, ReadyState};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    future::poll_fn,
    task::{Poll, Waker},
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub classes: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub style: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
}

impl ElementNode {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.insert(class.to_string());
        self
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.style.get("display").is_some_and(|value| value == "none")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ElementRef(usize);

#[derive(Debug, Default, Serialize, Deserialize)]
struct DocumentState {
    #[serde(default)]
    ready_state: ReadyState,
    #[serde(default)]
    root_classes: BTreeSet<String>,
    #[serde(default)]
    elements: Vec<ElementNode>,
}

#[derive(Default)]
pub struct MemoryDocument {
    state: RefCell<DocumentState>,
    waiters: RefCell<Vec<Waker>>,
}

impl MemoryDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A document that is still parsing; [`Document::content_loaded`] waits
    /// until [`MemoryDocument::finish_loading`] is called.
    #[must_use]
    pub fn loading() -> Self {
        let document = Self::default();
        document.state.borrow_mut().ready_state = ReadyState::Loading;
        document
    }

    /// # Errors
    /// Returns an error if `json` is not a valid document.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let state: DocumentState = serde_json::from_str(json)?;
        Ok(Self {
            state: RefCell::new(state),
            waiters: RefCell::default(),
        })
    }

    /// # Errors
    /// Returns an error if the document cannot be encoded.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(&*self.state.borrow())?)
    }

    pub fn push(&self, node: ElementNode) -> ElementRef {
        let mut state = self.state.borrow_mut();
        state.elements.push(node);
        ElementRef(state.elements.len() - 1)
    }

    #[must_use]
    pub fn node(&self, element: ElementRef) -> Option<ElementNode> {
        self.state.borrow().elements.get(element.0).cloned()
    }

    #[must_use]
    pub fn elements(&self) -> Vec<ElementNode> {
        self.state.borrow().elements.clone()
    }

    /// Indices of hidden elements, in document order.
    #[must_use]
    pub fn hidden(&self) -> Vec<ElementRef> {
        self.state
            .borrow()
            .elements
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_hidden())
            .map(|(index, _)| ElementRef(index))
            .collect()
    }

    /// Marks parsing as done and wakes anything waiting on it.
    pub fn finish_loading(&self) {
        self.state.borrow_mut().ready_state = ReadyState::Interactive;
        for waker in self.waiters.borrow_mut().drain(..) {
            waker.wake();
        }
    }

    fn with_node<T>(
        &self,
        element: ElementRef,
        apply: impl FnOnce(&mut ElementNode) -> T,
    ) -> Result<T, Error> {
        let mut state = self.state.borrow_mut();
        let node = state
            .elements
            .get_mut(element.0)
            .ok_or_else(|| Error::Document(format!("no element at index {}", element.0)))?;
        Ok(apply(node))
    }

    fn select(&self, matches: impl Fn(&ElementNode) -> bool) -> Vec<ElementRef> {
        self.state
            .borrow()
            .elements
            .iter()
            .enumerate()
            .filter(|(_, node)| matches(node))
            .map(|(index, _)| ElementRef(index))
            .collect()
    }
}

impl Document for MemoryDocument {
    type Element = ElementRef;

    fn query_attribute(&self, name: &str) -> Vec<ElementRef> {
        self.select(|node| node.attributes.contains_key(name))
    }

    fn query_attribute_value(&self, name: &str, value: &str) -> Vec<ElementRef> {
        self.select(|node| node.attributes.get(name).is_some_and(|v| v == value))
    }

    fn attribute(&self, element: &ElementRef, name: &str) -> Option<String> {
        self.state
            .borrow()
            .elements
            .get(element.0)
            .and_then(|node| node.attributes.get(name).cloned())
    }

    fn hide(&self, element: &ElementRef, marker: &str) -> Result<(), Error> {
        self.with_node(*element, |node| {
            node.style.insert("display".to_string(), "none".to_string());
            node.attributes.insert(marker.to_string(), "true".to_string());
        })
    }

    fn is_hidden(&self, element: &ElementRef) -> bool {
        self.state
            .borrow()
            .elements
            .get(element.0)
            .is_some_and(ElementNode::is_hidden)
    }

    fn element_by_id(&self, id: &str) -> Option<ElementRef> {
        self.select(|node| node.id.as_deref() == Some(id))
            .into_iter()
            .next()
    }

    fn set_text(&self, element: &ElementRef, text: &str) -> Result<(), Error> {
        self.with_node(*element, |node| node.text = text.to_string())
    }

    fn add_class(&self, element: &ElementRef, class: &str) -> Result<(), Error> {
        self.with_node(*element, |node| {
            node.classes.insert(class.to_string());
        })
    }

    fn remove_class(&self, element: &ElementRef, class: &str) -> Result<(), Error> {
        self.with_node(*element, |node| {
            node.classes.remove(class);
        })
    }

    fn add_root_class(&self, class: &str) -> Result<(), Error> {
        self.state.borrow_mut().root_classes.insert(class.to_string());
        Ok(())
    }

    fn has_root_class(&self, class: &str) -> bool {
        self.state.borrow().root_classes.contains(class)
    }

    fn ready_state(&self) -> ReadyState {
        self.state.borrow().ready_state
    }

    async fn content_loaded(&self) {
        poll_fn(|cx| {
            if self.state.borrow().ready_state == ReadyState::Loading {
                self.waiters.borrow_mut().push(cx.waker().clone());
                Poll::Pending
            } else {
                Poll::Ready(())
            }
        })
        .await;
    }
}
