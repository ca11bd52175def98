//! Page readiness: interstitial first, then every required element.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::cascade::{CascadeExhausted, SelectorCascade};
use crate::clock::{Clock, SystemClock};
use crate::interstitial::{InterstitialHandler, InterstitialOutcome};
use crate::locator::LocatorSet;
use crate::result::ProbeResult;
use crate::session::Session;
use crate::wait::{Predicate, ResolvedElement, WaitSpec};

/// Readiness of the page as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    /// Not yet inspected
    Unknown,
    /// The permission interstitial was up on entry
    InterstitialPresent,
    /// Resolving required elements
    Resolving,
    /// Every required element resolved and nothing blocks the page
    Ready,
    /// Something is missing or blocked
    Degraded,
}

impl PageState {
    /// Ready or Degraded
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Degraded)
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::InterstitialPresent => "interstitial_present",
            Self::Resolving => "resolving",
            Self::Ready => "ready",
            Self::Degraded => "degraded",
        };
        f.write_str(s)
    }
}

/// Verdict of one readiness check
#[derive(Debug, Clone)]
pub struct ReadinessReport<E> {
    /// Terminal state
    pub state: PageState,
    /// States visited, in order
    pub trace: Vec<PageState>,
    /// What the interstitial handler did
    pub interstitial: InterstitialOutcome,
    /// Elements that resolved, in the order they were required
    pub resolved: Vec<(String, ResolvedElement<E>)>,
    /// Elements that did not
    pub missing: Vec<CascadeExhausted>,
    /// Human-readable reasons for a degraded verdict
    pub reasons: Vec<String>,
    /// Total time spent
    pub elapsed: Duration,
}

impl<E> ReadinessReport<E> {
    /// Verdict is `Ready`
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == PageState::Ready
    }

    /// Resolved element by logical name
    #[must_use]
    pub fn element(&self, name: &str) -> Option<&ResolvedElement<E>> {
        self.resolved
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }
}

/// Runs the interstitial handler once, then resolves every required element
#[derive(Debug, Clone)]
pub struct PageReadinessOrchestrator<C = SystemClock> {
    cascade: SelectorCascade<C>,
    interstitial: InterstitialHandler<C>,
}

impl<C: Clock> PageReadinessOrchestrator<C> {
    /// Create an orchestrator
    pub const fn new(cascade: SelectorCascade<C>, interstitial: InterstitialHandler<C>) -> Self {
        Self {
            cascade,
            interstitial,
        }
    }

    /// Interstitial handler in use
    pub const fn interstitial(&self) -> &InterstitialHandler<C> {
        &self.interstitial
    }

    /// Produce one readiness verdict.
    ///
    /// Required elements are resolved in order with the `Clickable` tier of
    /// `spec`. There is no retry: a degraded verdict is returned as is.
    pub fn ensure_ready<S: Session>(
        &self,
        session: &S,
        required: &[LocatorSet],
        spec: &WaitSpec,
    ) -> ProbeResult<ReadinessReport<S::Element>> {
        let clock = self.cascade.waiter().clock();
        let start = clock.now();
        let mut trace = vec![PageState::Unknown];
        let mut reasons = Vec::new();

        let interstitial = self.interstitial.handle(session, spec)?;
        if interstitial.was_present() {
            trace.push(PageState::InterstitialPresent);
        }
        if let InterstitialOutcome::Unresolved(report) = &interstitial {
            reasons.push(format!(
                "interstitial unresolved: {}",
                report.reason.as_deref().unwrap_or("markers still present")
            ));
        }

        trace.push(PageState::Resolving);
        let spec = spec.with_predicate(Predicate::Clickable);
        let mut resolved = Vec::with_capacity(required.len());
        let mut missing = Vec::new();
        for set in required {
            match self.cascade.resolve(session, set, &spec)? {
                Ok(element) => resolved.push((set.target().to_string(), element)),
                Err(exhausted) => {
                    reasons.push(exhausted.to_string());
                    missing.push(exhausted);
                }
            }
        }

        let state = if reasons.is_empty() {
            PageState::Ready
        } else {
            PageState::Degraded
        };
        trace.push(state);
        let elapsed = clock.since(start);

        if state == PageState::Ready {
            info!(
                elements = resolved.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "page ready"
            );
        } else {
            warn!(
                resolved = resolved.len(),
                missing = missing.len(),
                reasons = %reasons.join("; "),
                "page degraded"
            );
        }

        Ok(ReadinessReport {
            state,
            trace,
            interstitial,
            resolved,
            missing,
            reasons,
            elapsed,
        })
    }
}
