//! Applies one rule class at a time to a document.
//!
//! A phase selects every element declaring its attribute, resolves the rule
//! for each one and hides the elements that fail it. Hiding sets
//! `display: none` and stamps the class marker; nothing is ever revealed, so an
//! element hidden by an earlier phase stays hidden whatever later phases
//! decide.
//!
//! Element checks inside a phase may run concurrently (bounded by the
//! configured limit, order preserving). Mutation happens afterwards, element by
//! element, in document order.

use crate::{
    auth::{Authority, UserRecord},
    dom::Document,
    rules::{evaluate, Reason, Rule, VisibilityOutcome},
    Error,
};
use futures_util::stream::{self, StreamExt};
use tracing::{debug, instrument, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseReport {
    pub reason: Reason,
    pub matched: usize,
    pub hidden: usize,
    /// Elements that failed the rule but could not be hidden.
    pub failed: usize,
}

impl PhaseReport {
    const fn empty(reason: Reason) -> Self {
        Self {
            reason,
            matched: 0,
            hidden: 0,
            failed: 0,
        }
    }
}

pub struct VisibilityReconciler<'a, D, A> {
    document: &'a D,
    authority: &'a A,
    concurrency: usize,
}

impl<'a, D: Document, A: Authority> VisibilityReconciler<'a, D, A> {
    #[must_use]
    pub fn new(document: &'a D, authority: &'a A) -> Self {
        Self {
            document,
            authority,
            concurrency: 1,
        }
    }

    /// Caps how many element checks of one phase may be in flight.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn document(&self) -> &'a D {
        self.document
    }

    /// Runs the phase for rule class `reason`.
    ///
    /// The user record is fetched once for the phase, and only when the phase
    /// has matching elements and needs it.
    ///
    /// # Errors
    /// Returns [`Error::InvalidSession`] when the user refresh fails; the
    /// session is already cleared and no element of this phase is touched.
    /// An element that cannot be hidden is logged and counted in
    /// [`PhaseReport::failed`]; the other elements are still processed.
    #[instrument(skip(self), fields(phase = %reason))]
    pub async fn run_phase(&self, reason: Reason) -> Result<PhaseReport, Error> {
        let attribute = reason.rule_attribute();
        let elements = match reason.required_value() {
            Some(value) => self.document.query_attribute_value(attribute, value),
            None => self.document.query_attribute(attribute),
        };

        if elements.is_empty() {
            debug!("no elements declare {}", attribute);
            return Ok(PhaseReport::empty(reason));
        }

        let user = if reason.needs_user() {
            self.authority.refresh_current_user().await?
        } else {
            None
        };

        let declarations: Vec<(D::Element, Option<Rule>)> = elements
            .into_iter()
            .map(|element| {
                let value = self.document.attribute(&element, attribute).unwrap_or_default();
                let rule = Rule::parse(reason, &value);
                if rule.is_none() {
                    warn!("malformed {}=\"{}\", hiding element", attribute, value);
                }
                (element, rule)
            })
            .collect();

        let outcomes = self.resolve(reason, user.as_ref(), &declarations).await;

        let (mut hidden, mut failed) = (0, 0);
        for ((element, _), outcome) in declarations.iter().zip(outcomes) {
            if outcome.visible {
                continue;
            }
            match self.document.hide(element, reason.marker_attribute()) {
                Ok(()) => hidden += 1,
                Err(err) => {
                    warn!("failed to hide element declaring {}: {}", attribute, err);
                    failed += 1;
                }
            }
        }

        debug!("{} of {} element(s) hidden", hidden, declarations.len());

        Ok(PhaseReport {
            reason,
            matched: declarations.len(),
            hidden,
            failed,
        })
    }

    async fn resolve(
        &self,
        reason: Reason,
        user: Option<&UserRecord>,
        declarations: &[(D::Element, Option<Rule>)],
    ) -> Vec<VisibilityOutcome> {
        let authority = self.authority;
        stream::iter(declarations.iter().map(|(_, rule)| rule.as_ref()))
            .map(|rule| async move {
                match rule {
                    Some(rule) => evaluate(authority, user, rule).await,
                    None => VisibilityOutcome::denied(reason),
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}
