//! Permission interstitial detection and dismissal.
//!
//! Some login pages first render a full-page notice ("To proceed to the login
//! page please allow notifications") instead of the form. The handler detects
//! it by marker text in the page source and runs exactly one dismissal cycle:
//!
//! ```text
//! Unknown ──markers──► InterstitialPresent ──► Dismissing ──┬──► Resolved
//!    │                                                      └──► Unresolved
//!    └──no markers──► (NothingToDo)
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::action::{Action, ActionExecutor, ActionResult};
use crate::cascade::SelectorCascade;
use crate::clock::{Clock, SystemClock};
use crate::locator::LocatorSet;
use crate::result::ProbeResult;
use crate::session::Session;
use crate::wait::{Predicate, WaitSpec};

/// Default marker texts
pub const DEFAULT_MARKERS: [&str; 3] = [
    "To proceed to the login page please allow",
    "notifications",
    "Notifications",
];

/// Default pause after clicking through the interstitial (2 seconds)
pub const DEFAULT_SETTLE_MS: u64 = 2_000;

/// Where the dismissal state machine ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterstitialState {
    /// Not yet inspected
    Unknown,
    /// Markers found in the page source
    InterstitialPresent,
    /// Clicking through
    Dismissing,
    /// Markers gone after the cycle
    Resolved,
    /// Markers still present after the cycle
    Unresolved,
}

impl fmt::Display for InterstitialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::InterstitialPresent => "interstitial_present",
            Self::Dismissing => "dismissing",
            Self::Resolved => "resolved",
            Self::Unresolved => "unresolved",
        };
        f.write_str(s)
    }
}

/// Marker and timing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterstitialConfig {
    /// Case-sensitive substrings whose presence in the page source means the interstitial is up
    pub markers: Vec<String>,
    /// Pause after clicking through, before re-checking
    pub settle_ms: u64,
}

impl Default for InterstitialConfig {
    fn default() -> Self {
        Self {
            markers: DEFAULT_MARKERS.iter().map(ToString::to_string).collect(),
            settle_ms: DEFAULT_SETTLE_MS,
        }
    }
}

impl InterstitialConfig {
    /// Replace the marker list
    #[must_use]
    pub fn with_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// Set the settle pause
    #[must_use]
    pub const fn with_settle_ms(mut self, settle_ms: u64) -> Self {
        self.settle_ms = settle_ms;
        self
    }

    /// Any marker occurs in `source`
    #[must_use]
    pub fn matches(&self, source: &str) -> bool {
        self.markers.iter().any(|m| !m.is_empty() && source.contains(m.as_str()))
    }
}

/// What one dismissal cycle did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DismissalReport {
    /// States visited, in order
    pub trace: Vec<InterstitialState>,
    /// Result of clicking "allow", if it resolved
    pub allow: Option<ActionResult>,
    /// Result of clicking "continue", if it resolved
    pub continue_click: Option<ActionResult>,
    /// Why the cycle did not clear the interstitial
    pub reason: Option<String>,
    /// Time spent in the cycle
    pub elapsed: Duration,
}

impl DismissalReport {
    /// Terminal state of the cycle
    #[must_use]
    pub fn state(&self) -> InterstitialState {
        self.trace
            .last()
            .copied()
            .unwrap_or(InterstitialState::Unknown)
    }
}

/// Result of [`InterstitialHandler::handle`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InterstitialOutcome {
    /// No markers on entry; nothing was touched
    NothingToDo,
    /// Markers gone after the cycle
    Resolved(DismissalReport),
    /// Markers still present after the cycle
    Unresolved(DismissalReport),
}

impl InterstitialOutcome {
    /// Terminal state; `Unknown` when there was nothing to do
    #[must_use]
    pub fn state(&self) -> InterstitialState {
        match self {
            Self::NothingToDo => InterstitialState::Unknown,
            Self::Resolved(r) | Self::Unresolved(r) => r.state(),
        }
    }

    /// The interstitial was up on entry
    #[must_use]
    pub const fn was_present(&self) -> bool {
        !matches!(self, Self::NothingToDo)
    }

    /// The interstitial is still blocking the page
    #[must_use]
    pub const fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved(_))
    }

    /// Cycle details, if a cycle ran
    #[must_use]
    pub const fn report(&self) -> Option<&DismissalReport> {
        match self {
            Self::NothingToDo => None,
            Self::Resolved(r) | Self::Unresolved(r) => Some(r),
        }
    }
}

/// Detects and dismisses the permission interstitial
#[derive(Debug, Clone)]
pub struct InterstitialHandler<C = SystemClock> {
    cascade: SelectorCascade<C>,
    executor: ActionExecutor,
    config: InterstitialConfig,
    allow: LocatorSet,
    continue_set: Option<LocatorSet>,
}

impl<C: Clock> InterstitialHandler<C> {
    /// Create a handler that clicks through `allow`
    pub const fn new(cascade: SelectorCascade<C>, allow: LocatorSet) -> Self {
        Self {
            cascade,
            executor: ActionExecutor::new(),
            config: InterstitialConfig {
                markers: Vec::new(),
                settle_ms: DEFAULT_SETTLE_MS,
            },
            allow,
            continue_set: None,
        }
    }

    /// Set markers and settle pause
    #[must_use]
    pub fn with_config(mut self, config: InterstitialConfig) -> Self {
        self.config = config;
        self
    }

    /// Optional second control clicked after "allow" (e.g., a reload link)
    #[must_use]
    pub fn with_continue(mut self, continue_set: LocatorSet) -> Self {
        self.continue_set = Some(continue_set);
        self
    }

    /// Use a custom executor
    #[must_use]
    pub const fn with_executor(mut self, executor: ActionExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Active configuration
    pub const fn config(&self) -> &InterstitialConfig {
        &self.config
    }

    /// Whether the interstitial is up right now.
    ///
    /// A page source that cannot be read counts as "not present".
    pub fn detect<S: Session>(&self, session: &S) -> ProbeResult<bool> {
        match session.page_source() {
            Ok(source) => Ok(self.config.matches(&source)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                debug!(error = %e, "page source unavailable, assuming no interstitial");
                Ok(false)
            }
        }
    }

    /// Run at most one dismissal cycle.
    ///
    /// `spec` times the cascades over the "allow" and "continue" sets; both are
    /// resolved with [`Predicate::Clickable`].
    pub fn handle<S: Session>(&self, session: &S, spec: &WaitSpec) -> ProbeResult<InterstitialOutcome> {
        if !self.detect(session)? {
            return Ok(InterstitialOutcome::NothingToDo);
        }

        let clock = self.cascade.waiter().clock();
        let start = clock.now();
        let spec = spec.with_predicate(Predicate::Clickable);
        let mut trace = vec![
            InterstitialState::Unknown,
            InterstitialState::InterstitialPresent,
            InterstitialState::Dismissing,
        ];
        info!("permission interstitial detected, dismissing");

        let mut reasons = Vec::new();
        let mut allow = None;
        let mut continue_click = None;

        match self.cascade.resolve(session, &self.allow, &spec)? {
            Ok(resolved) => {
                let result = self.executor.perform(session, resolved.element(), &Action::Click)?;
                let clicked = result.is_effective();
                if let Some(reason) = result.reason.as_ref().filter(|_| !clicked) {
                    reasons.push(format!("allow click failed: {reason}"));
                }
                allow = Some(result);

                // continue is tried even when the allow click had no effect
                if let Some(set) = &self.continue_set {
                    if let Ok(resolved) = self.cascade.resolve(session, set, &spec)? {
                        continue_click =
                            Some(self.executor.perform(session, resolved.element(), &Action::Click)?);
                    } else {
                        debug!("no continue control, skipping");
                    }
                }
                let continued = continue_click.as_ref().is_some_and(ActionResult::is_effective);
                if clicked || continued {
                    clock.sleep(Duration::from_millis(self.config.settle_ms));
                }
            }
            Err(exhausted) => reasons.push(exhausted.to_string()),
        }

        let still_present = self.detect(session)?;
        let elapsed = clock.since(start);
        if still_present {
            trace.push(InterstitialState::Unresolved);
            reasons.push("interstitial markers still present after one dismissal cycle".into());
            let report = DismissalReport {
                trace,
                allow,
                continue_click,
                reason: Some(reasons.join("; ")),
                elapsed,
            };
            warn!(reason = ?report.reason, "interstitial unresolved");
            Ok(InterstitialOutcome::Unresolved(report))
        } else {
            trace.push(InterstitialState::Resolved);
            info!(elapsed_ms = elapsed.as_millis() as u64, "interstitial dismissed");
            Ok(InterstitialOutcome::Resolved(DismissalReport {
                trace,
                allow,
                continue_click,
                reason: None,
                elapsed,
            }))
        }
    }
}
