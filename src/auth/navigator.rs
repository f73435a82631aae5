use std::{cell::RefCell, rc::Rc};
use tracing::info;

/// Moves the user to another route. In the browser this sets
/// `window.location`; elsewhere the request is recorded.
pub trait Navigator {
    fn navigate(&self, route: &str);
}

impl<N: Navigator + ?Sized> Navigator for &N {
    fn navigate(&self, route: &str) {
        (**self).navigate(route);
    }
}

impl<N: Navigator + ?Sized> Navigator for Rc<N> {
    fn navigate(&self, route: &str) {
        (**self).navigate(route);
    }
}

/// Keeps every requested route so headless callers can act on it.
#[derive(Default)]
pub struct RecordingNavigator {
    routes: RefCell<Vec<String>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn routes(&self) -> Vec<String> {
        self.routes.borrow().clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<String> {
        self.routes.borrow().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        info!("navigating to {}", route);
        self.routes.borrow_mut().push(route.to_string());
    }
}
