//! Runs a full reconciliation pass once per page load.
//!
//! The five phases run strictly one after another in [`Reason::PASS_ORDER`].
//! After the last one the document root gets the `permissions-checked` class,
//! which stylesheets use to stop default-hiding protected content. If the
//! session turns out to be invalid the pass stops where it is and the class is
//! not added; the user is already on the way to the anonymous route.

use crate::{
    auth::Authority,
    dom::{Document, ReadyState, PERMISSIONS_CHECKED_CLASS},
    reconcile::{PhaseReport, VisibilityReconciler},
    rules::Reason,
    Error,
};
use tracing::{debug, info, instrument};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
    pub phases: Vec<PhaseReport>,
}

impl PassReport {
    #[must_use]
    pub fn hidden(&self) -> usize {
        self.phases.iter().map(|phase| phase.hidden).sum()
    }

    #[must_use]
    pub fn matched(&self) -> usize {
        self.phases.iter().map(|phase| phase.matched).sum()
    }
}

pub struct Bootstrapper<'a, D, A> {
    reconciler: VisibilityReconciler<'a, D, A>,
}

impl<'a, D: Document, A: Authority> Bootstrapper<'a, D, A> {
    #[must_use]
    pub fn new(reconciler: VisibilityReconciler<'a, D, A>) -> Self {
        Self { reconciler }
    }

    /// Waits for the document content when it is still loading, then runs
    /// the pass.
    ///
    /// # Errors
    /// See [`Bootstrapper::run`].
    pub async fn start(&self) -> Result<PassReport, Error> {
        let document = self.reconciler.document();
        if document.ready_state() == ReadyState::Loading {
            debug!("document still loading, deferring pass");
            document.content_loaded().await;
        }
        self.run().await
    }

    /// Runs the five phases in order and marks the document as checked.
    ///
    /// # Errors
    /// Returns [`Error::InvalidSession`] when the session is rejected; later
    /// phases do not run and the document is not marked.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<PassReport, Error> {
        let mut report = PassReport::default();

        for reason in Reason::PASS_ORDER {
            let phase = self.reconciler.run_phase(reason).await?;
            report.phases.push(phase);
        }

        self.reconciler
            .document()
            .add_root_class(PERMISSIONS_CHECKED_CLASS)?;

        info!(
            "permissions checked: {} of {} element(s) hidden",
            report.hidden(),
            report.matched()
        );

        Ok(report)
    }
}
