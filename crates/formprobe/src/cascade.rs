//! Selector cascade: try each candidate of a [`LocatorSet`] in order.
//!
//! Each candidate gets the full [`WaitSpec`] timeout, so the worst case is
//! `len × timeout`. The first candidate that satisfies the predicate wins.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::locator::LocatorSet;
use crate::result::ProbeResult;
use crate::session::Session;
use crate::wait::{ActionabilityWaiter, NotFound, Predicate, ResolvedElement, WaitSpec};

/// Outcome of a cascade: the winning element or the list of failed attempts
pub type Resolution<E> = Result<ResolvedElement<E>, CascadeExhausted>;

/// Every candidate of a set failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no candidate for `{target}` matched after {} attempts in {}ms", .attempts.len(), .elapsed.as_millis())]
pub struct CascadeExhausted {
    /// Logical element name
    pub target: String,
    /// One entry per candidate, in the order tried
    pub attempts: Vec<NotFound>,
    /// Total time spent
    pub elapsed: Duration,
}

impl CascadeExhausted {
    /// One line per attempt, for reports
    #[must_use]
    pub fn summary(&self) -> String {
        self.attempts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Resolves a logical element through its ordered candidates
#[derive(Debug, Clone, Default)]
pub struct SelectorCascade<C = SystemClock> {
    waiter: ActionabilityWaiter<C>,
}

impl<C: Clock> SelectorCascade<C> {
    /// Create a cascade over `waiter`
    pub const fn new(waiter: ActionabilityWaiter<C>) -> Self {
        Self { waiter }
    }

    /// Underlying waiter
    pub const fn waiter(&self) -> &ActionabilityWaiter<C> {
        &self.waiter
    }

    /// Try each candidate in order with `spec`; first success short-circuits.
    pub fn resolve<S: Session>(
        &self,
        session: &S,
        locators: &LocatorSet,
        spec: &WaitSpec,
    ) -> ProbeResult<Resolution<S::Element>> {
        let clock = self.waiter.clock();
        let start = clock.now();
        let mut attempts = Vec::with_capacity(locators.len());

        for (index, candidate) in locators.iter().enumerate() {
            match self.waiter.wait(session, candidate, spec)? {
                Ok(resolved) => {
                    info!(
                        target_name = locators.target(),
                        %candidate,
                        index,
                        elapsed_ms = clock.since(start).as_millis() as u64,
                        "resolved"
                    );
                    return Ok(Ok(resolved));
                }
                Err(not_found) => {
                    debug!(target_name = locators.target(), %not_found, "candidate failed");
                    attempts.push(not_found);
                }
            }
        }

        let exhausted = CascadeExhausted {
            target: locators.target().to_string(),
            attempts,
            elapsed: clock.since(start),
        };
        warn!(%exhausted, "cascade exhausted");
        Ok(Err(exhausted))
    }

    /// Zero-wait probe of each candidate for `Present`; first hit wins.
    pub fn resolve_first_present<S: Session>(
        &self,
        session: &S,
        locators: &LocatorSet,
    ) -> ProbeResult<Option<ResolvedElement<S::Element>>> {
        self.resolve_first_now(session, locators, Predicate::Present)
    }

    /// Zero-wait probe of each candidate for `predicate`; first hit wins.
    pub fn resolve_first_now<S: Session>(
        &self,
        session: &S,
        locators: &LocatorSet,
        predicate: Predicate,
    ) -> ProbeResult<Option<ResolvedElement<S::Element>>> {
        for candidate in locators {
            if let Some(element) = self.waiter.check(session, candidate, predicate)? {
                return Ok(Some(ResolvedElement::new(
                    element,
                    candidate.clone(),
                    Duration::ZERO,
                )));
            }
        }
        Ok(None)
    }
}
