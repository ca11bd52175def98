//! Actionability waits.
//!
//! One abstraction owns all timing policy: [`ActionabilityWaiter::wait`] polls a
//! session for a single candidate until a [`Predicate`] holds or the
//! [`WaitSpec`] timeout elapses. Not finding the element is an ordinary
//! outcome ([`NotFound`]), not an error.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::locator::LocatorCandidate;
use crate::result::{ProbeError, ProbeResult};
use crate::session::{ElementHandle, Session};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default per-candidate timeout (10 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval (500ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

// =============================================================================
// PREDICATE
// =============================================================================

/// Graduated readiness of an element for interaction.
///
/// Ordered by strength; each predicate implies every weaker one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Predicate {
    /// Exists in the DOM
    Present,
    /// Present and rendered
    Visible,
    /// Visible and not disabled
    Enabled,
    /// Enabled and not covered by another element at its hit-point
    Clickable,
}

impl Predicate {
    /// All predicates, weakest first
    pub const ALL: [Self; 4] = [Self::Present, Self::Visible, Self::Enabled, Self::Clickable];

    /// Lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Visible => "visible",
            Self::Enabled => "enabled",
            Self::Clickable => "clickable",
        }
    }

    /// Evaluate this predicate against an element that is already present.
    ///
    /// Checks run weakest first and stop at the first one that fails.
    pub fn holds_for<E: ElementHandle>(self, element: &E) -> ProbeResult<bool> {
        if self >= Self::Visible && !element.is_displayed()? {
            return Ok(false);
        }
        if self >= Self::Enabled && !element.is_enabled()? {
            return Ok(false);
        }
        if self >= Self::Clickable && element.is_obscured()? {
            return Ok(false);
        }
        Ok(true)
    }
}

impl Default for Predicate {
    fn default() -> Self {
        Self::Clickable
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// WAIT SPEC
// =============================================================================

/// Timing and predicate for one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSpec {
    timeout_ms: u64,
    poll_interval_ms: u64,
    predicate: Predicate,
}

impl WaitSpec {
    /// Create a wait spec.
    ///
    /// Both durations must be positive and the poll interval may not exceed
    /// the timeout.
    pub fn new(timeout_ms: u64, poll_interval_ms: u64, predicate: Predicate) -> ProbeResult<Self> {
        if timeout_ms == 0 {
            return Err(ProbeError::InvalidWaitSpec {
                message: "timeout_ms must be greater than zero".into(),
            });
        }
        if poll_interval_ms == 0 {
            return Err(ProbeError::InvalidWaitSpec {
                message: "poll_interval_ms must be greater than zero".into(),
            });
        }
        if poll_interval_ms > timeout_ms {
            return Err(ProbeError::InvalidWaitSpec {
                message: format!(
                    "poll_interval_ms ({poll_interval_ms}) exceeds timeout_ms ({timeout_ms})"
                ),
            });
        }
        Ok(Self {
            timeout_ms,
            poll_interval_ms,
            predicate,
        })
    }

    /// Same timing, different predicate
    #[must_use]
    pub const fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    /// Timeout in milliseconds
    #[must_use]
    pub const fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Poll interval in milliseconds
    #[must_use]
    pub const fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    /// Predicate to satisfy
    #[must_use]
    pub const fn predicate(&self) -> Predicate {
        self.predicate
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for WaitSpec {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            predicate: Predicate::Clickable,
        }
    }
}

// =============================================================================
// OUTCOMES
// =============================================================================

/// A live element plus the candidate that found it
#[derive(Debug, Clone)]
pub struct ResolvedElement<E> {
    element: E,
    locator: LocatorCandidate,
    elapsed: Duration,
}

impl<E> ResolvedElement<E> {
    /// Wrap a handle found through `locator`
    pub fn new(element: E, locator: LocatorCandidate, elapsed: Duration) -> Self {
        Self {
            element,
            locator,
            elapsed,
        }
    }

    /// The live handle
    pub const fn element(&self) -> &E {
        &self.element
    }

    /// Candidate that produced the handle
    pub const fn locator(&self) -> &LocatorCandidate {
        &self.locator
    }

    /// Time spent polling before the predicate held
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Unwrap the handle
    pub fn into_element(self) -> E {
        self.element
    }
}

/// One candidate did not satisfy its predicate in time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{locator} not {predicate} after {}ms ({probes} probes)", .elapsed.as_millis())]
pub struct NotFound {
    /// Candidate that was polled
    pub locator: LocatorCandidate,
    /// Predicate that never held
    pub predicate: Predicate,
    /// Time spent polling
    pub elapsed: Duration,
    /// Number of probes made
    pub probes: u32,
}

// =============================================================================
// WAITER
// =============================================================================

/// Polls one candidate until a predicate holds or time runs out
#[derive(Debug, Clone, Default)]
pub struct ActionabilityWaiter<C = SystemClock> {
    clock: C,
}

impl<C: Clock> ActionabilityWaiter<C> {
    /// Create a waiter on the given clock
    pub const fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Clock used for polling
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Poll `locator` until `spec.predicate()` holds.
    ///
    /// The first probe happens immediately. The last sleep is cut to the
    /// remaining budget, so the final probe lands at the deadline and the
    /// wait never runs past it. Fatal session errors are returned as `Err`;
    /// any other probe error counts as "not yet".
    pub fn wait<S: Session>(
        &self,
        session: &S,
        locator: &LocatorCandidate,
        spec: &WaitSpec,
    ) -> ProbeResult<Result<ResolvedElement<S::Element>, NotFound>> {
        let start = self.clock.now();
        let timeout = spec.timeout();
        let mut probes = 0u32;

        loop {
            probes += 1;
            if let Some(element) = self.check(session, locator, spec.predicate())? {
                let elapsed = self.clock.since(start);
                debug!(
                    %locator,
                    predicate = %spec.predicate(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    probes,
                    "element satisfied predicate"
                );
                return Ok(Ok(ResolvedElement::new(element, locator.clone(), elapsed)));
            }

            let elapsed = self.clock.since(start);
            if elapsed >= timeout {
                debug!(%locator, predicate = %spec.predicate(), probes, "wait timed out");
                return Ok(Err(NotFound {
                    locator: locator.clone(),
                    predicate: spec.predicate(),
                    elapsed,
                    probes,
                }));
            }
            self.clock.sleep(spec.poll_interval().min(timeout - elapsed));
        }
    }

    /// One probe, no waiting.
    ///
    /// Returns the element when it is present and `predicate` holds.
    pub fn check<S: Session>(
        &self,
        session: &S,
        locator: &LocatorCandidate,
        predicate: Predicate,
    ) -> ProbeResult<Option<S::Element>> {
        let element = match session.find_element(locator) {
            Ok(Some(element)) => element,
            Ok(None) => return Ok(None),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                trace!(%locator, error = %e, "lookup failed, retrying");
                return Ok(None);
            }
        };

        match predicate.holds_for(&element) {
            Ok(true) => Ok(Some(element)),
            Ok(false) => Ok(None),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                trace!(%locator, error = %e, "predicate check failed, retrying");
                Ok(None)
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::mock::{MockElement, MockSession};

    fn waiter() -> (ActionabilityWaiter<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        (ActionabilityWaiter::new(clock.clone()), clock)
    }

    mod predicate_tests {
        use super::*;

        #[test]
        fn test_predicate_ordering() {
            assert!(Predicate::Present < Predicate::Visible);
            assert!(Predicate::Visible < Predicate::Enabled);
            assert!(Predicate::Enabled < Predicate::Clickable);
        }

        #[test]
        fn test_predicate_display() {
            assert_eq!(Predicate::Clickable.to_string(), "clickable");
            assert_eq!(Predicate::default(), Predicate::Clickable);
        }

        #[test]
        fn test_clickable_element_satisfies_every_weaker_predicate() {
            let (waiter, clock) = waiter();
            let session = MockSession::new(clock);
            let locator = LocatorCandidate::name("email");
            session.add_element(MockElement::input(locator.clone()));

            for predicate in Predicate::ALL {
                assert!(
                    waiter.check(&session, &locator, predicate).unwrap().is_some(),
                    "expected {predicate} to hold"
                );
            }
        }

        #[test]
        fn test_hidden_element_only_present() {
            let (waiter, clock) = waiter();
            let session = MockSession::new(clock);
            let locator = LocatorCandidate::name("email");
            session.add_element(MockElement::input(locator.clone()).hidden());

            assert!(waiter.check(&session, &locator, Predicate::Present).unwrap().is_some());
            assert!(waiter.check(&session, &locator, Predicate::Visible).unwrap().is_none());
            assert!(waiter.check(&session, &locator, Predicate::Clickable).unwrap().is_none());
        }

        #[test]
        fn test_disabled_element_visible_not_enabled() {
            let (waiter, clock) = waiter();
            let session = MockSession::new(clock);
            let locator = LocatorCandidate::tag("button");
            session.add_element(MockElement::button(locator.clone()).disabled());

            assert!(waiter.check(&session, &locator, Predicate::Visible).unwrap().is_some());
            assert!(waiter.check(&session, &locator, Predicate::Enabled).unwrap().is_none());
        }

        #[test]
        fn test_obscured_element_enabled_not_clickable() {
            let (waiter, clock) = waiter();
            let session = MockSession::new(clock);
            let locator = LocatorCandidate::tag("button");
            session.add_element(MockElement::button(locator.clone()).obscured());

            assert!(waiter.check(&session, &locator, Predicate::Enabled).unwrap().is_some());
            assert!(waiter.check(&session, &locator, Predicate::Clickable).unwrap().is_none());
        }
    }

    mod wait_spec_tests {
        use super::*;

        #[test]
        fn test_wait_spec_default() {
            let spec = WaitSpec::default();
            assert_eq!(spec.timeout_ms(), DEFAULT_TIMEOUT_MS);
            assert_eq!(spec.poll_interval_ms(), DEFAULT_POLL_INTERVAL_MS);
            assert_eq!(spec.predicate(), Predicate::Clickable);
        }

        #[test]
        fn test_wait_spec_validation() {
            assert!(WaitSpec::new(0, 1, Predicate::Present).is_err());
            assert!(WaitSpec::new(100, 0, Predicate::Present).is_err());
            assert!(WaitSpec::new(100, 200, Predicate::Present).is_err());
            assert!(WaitSpec::new(100, 100, Predicate::Present).is_ok());
        }

        #[test]
        fn test_with_predicate_keeps_timing() {
            let spec = WaitSpec::new(2_000, 100, Predicate::Present).unwrap();
            let clickable = spec.with_predicate(Predicate::Clickable);
            assert_eq!(clickable.timeout(), Duration::from_secs(2));
            assert_eq!(clickable.poll_interval(), Duration::from_millis(100));
            assert_eq!(clickable.predicate(), Predicate::Clickable);
        }
    }

    mod waiter_tests {
        use super::*;
        use crate::result::ProbeError;

        #[test]
        fn test_immediate_match_does_not_sleep() {
            let (waiter, clock) = waiter();
            let session = MockSession::new(clock.clone());
            let locator = LocatorCandidate::name("email");
            session.add_element(MockElement::input(locator.clone()));

            let spec = WaitSpec::new(1_000, 100, Predicate::Clickable).unwrap();
            let resolved = waiter.wait(&session, &locator, &spec).unwrap().unwrap();

            assert_eq!(resolved.locator(), &locator);
            assert_eq!(resolved.elapsed(), Duration::ZERO);
            assert_eq!(clock.sleep_count(), 0);
        }

        #[test]
        fn test_waits_for_late_element() {
            let (waiter, clock) = waiter();
            let session = MockSession::new(clock.clone());
            let locator = LocatorCandidate::name("email");
            session.add_element(MockElement::input(locator.clone()).appears_after_ms(350));

            let spec = WaitSpec::new(1_000, 100, Predicate::Present).unwrap();
            let resolved = waiter.wait(&session, &locator, &spec).unwrap().unwrap();

            // First probe at or after 350ms on a 100ms grid
            assert_eq!(resolved.elapsed(), Duration::from_millis(400));
        }

        #[test]
        fn test_timeout_is_exact_on_manual_clock() {
            let (waiter, clock) = waiter();
            let session = MockSession::new(clock.clone());
            let locator = LocatorCandidate::name("missing");

            let spec = WaitSpec::new(1_000, 300, Predicate::Present).unwrap();
            let not_found = waiter.wait(&session, &locator, &spec).unwrap().unwrap_err();

            assert_eq!(not_found.elapsed, Duration::from_millis(1_000));
            assert_eq!(clock.now_ms(), 1_000);
            // probes at 0, 300, 600, 900, 1000
            assert_eq!(not_found.probes, 5);
            assert_eq!(not_found.predicate, Predicate::Present);
            assert_eq!(not_found.locator, locator);
        }

        #[test]
        fn test_predicate_becoming_true_later() {
            let (waiter, clock) = waiter();
            let session = MockSession::new(clock.clone());
            let locator = LocatorCandidate::tag("button");
            session.add_element(MockElement::button(locator.clone()).enabled_after_ms(500));

            let spec = WaitSpec::new(2_000, 250, Predicate::Enabled).unwrap();
            let resolved = waiter.wait(&session, &locator, &spec).unwrap().unwrap();
            assert_eq!(resolved.elapsed(), Duration::from_millis(500));
        }

        #[test]
        fn test_transient_errors_keep_polling() {
            let (waiter, clock) = waiter();
            let session = MockSession::new(clock.clone());
            let locator = LocatorCandidate::name("email");
            session.add_element(MockElement::input(locator.clone()));
            session.fail_next_lookup(ProbeError::StaleElement);
            session.fail_next_lookup(ProbeError::StaleElement);

            let spec = WaitSpec::new(1_000, 100, Predicate::Present).unwrap();
            let resolved = waiter.wait(&session, &locator, &spec).unwrap().unwrap();
            assert_eq!(resolved.elapsed(), Duration::from_millis(200));
        }

        #[test]
        fn test_fatal_error_propagates() {
            let (waiter, clock) = waiter();
            let session = MockSession::new(clock.clone());
            let locator = LocatorCandidate::name("email");
            session.fail_next_lookup(ProbeError::session_lost("browser exited"));

            let spec = WaitSpec::new(1_000, 100, Predicate::Present).unwrap();
            let err = waiter.wait(&session, &locator, &spec).unwrap_err();
            assert!(err.is_fatal());
            assert_eq!(clock.now_ms(), 0);
        }

        #[test]
        fn test_not_found_display() {
            let nf = NotFound {
                locator: LocatorCandidate::name("email"),
                predicate: Predicate::Visible,
                elapsed: Duration::from_millis(1500),
                probes: 4,
            };
            assert_eq!(nf.to_string(), "name=email not visible after 1500ms (4 probes)");
        }
    }
}
