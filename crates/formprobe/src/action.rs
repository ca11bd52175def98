//! Performing actions on resolved elements.
//!
//! Clicks go through the element's native API first. When a native click is
//! refused (typically an overlay intercepting it) the executor dispatches one
//! scripted `click()` on the same element and reports that it did so.

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::result::{ProbeError, ProbeResult};
use crate::session::{ElementHandle, Session};

/// Script used for the fallback click
pub const SCRIPT_CLICK: &str = "arguments[0].click();";

/// An interaction with one element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Click
    Click,
    /// Clear the field, then type the text
    Type(String),
    /// Clear the field
    Clear,
    /// Press Enter in the field
    PressEnter,
}

impl Action {
    /// Short name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Type(_) => "type",
            Self::Clear => "clear",
            Self::PressEnter => "press_enter",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How an action ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Native strategy worked
    Success,
    /// Native strategy failed, scripted fallback worked
    FallbackUsed,
    /// Nothing worked
    Failed,
}

/// Outcome of an action plus the reason when it was not a plain success
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    /// How the action ended
    pub outcome: ActionOutcome,
    /// Why the primary (and fallback) strategy failed
    pub reason: Option<String>,
}

impl ActionResult {
    /// Plain success
    #[must_use]
    pub const fn success() -> Self {
        Self {
            outcome: ActionOutcome::Success,
            reason: None,
        }
    }

    /// Fallback worked after the primary strategy failed with `reason`
    #[must_use]
    pub fn fallback_used(reason: impl Into<String>) -> Self {
        Self {
            outcome: ActionOutcome::FallbackUsed,
            reason: Some(reason.into()),
        }
    }

    /// Failed with `reason`
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            outcome: ActionOutcome::Failed,
            reason: Some(reason.into()),
        }
    }

    /// The action took effect, by either strategy
    #[must_use]
    pub const fn is_effective(&self) -> bool {
        !matches!(self.outcome, ActionOutcome::Failed)
    }
}

/// Performs actions with a native primary strategy and a scripted click fallback
#[derive(Debug, Clone, Copy)]
pub struct ActionExecutor {
    script_fallback: bool,
}

impl Default for ActionExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionExecutor {
    /// Executor with the scripted click fallback enabled
    #[must_use]
    pub const fn new() -> Self {
        Self {
            script_fallback: true,
        }
    }

    /// Enable or disable the scripted click fallback
    #[must_use]
    pub const fn with_script_fallback(mut self, enabled: bool) -> Self {
        self.script_fallback = enabled;
        self
    }

    /// Perform `action` on `element`.
    ///
    /// At most two attempts are made (native, then scripted for clicks).
    /// Fatal session errors propagate; any other failure becomes
    /// [`ActionOutcome::Failed`].
    pub fn perform<S: Session>(
        &self,
        session: &S,
        element: &S::Element,
        action: &Action,
    ) -> ProbeResult<ActionResult> {
        let primary = match action {
            Action::Click => element.click(),
            Action::Type(text) => element.clear().and_then(|()| {
                if text.is_empty() {
                    Ok(())
                } else {
                    element.send_keys(text)
                }
            }),
            Action::Clear => element.clear(),
            Action::PressEnter => element.send_keys("\n"),
        };

        let primary_err = match primary {
            Ok(()) => {
                debug!(%action, "action succeeded");
                return Ok(ActionResult::success());
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => e,
        };

        if !matches!(action, Action::Click) || !self.script_fallback {
            warn!(%action, error = %primary_err, "action failed");
            return Ok(ActionResult::failed(primary_err.to_string()));
        }

        debug!(error = %primary_err, "native click refused, dispatching scripted click");
        match session.execute_script(SCRIPT_CLICK, &[element]) {
            Ok(_) => {
                warn!(error = %primary_err, "click needed scripted fallback");
                Ok(ActionResult::fallback_used(primary_err.to_string()))
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(fallback_err) => {
                warn!(primary = %primary_err, fallback = %fallback_err, "click failed");
                Ok(ActionResult::failed(join_reasons(&primary_err, &fallback_err)))
            }
        }
    }
}

fn join_reasons(primary: &ProbeError, fallback: &ProbeError) -> String {
    format!("native: {primary}; script: {fallback}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::locator::LocatorCandidate;
    use crate::mock::{MockElement, MockSession, PageEffect};

    fn session_with(element: MockElement) -> (MockSession, crate::mock::MockElementRef) {
        let session = MockSession::new(ManualClock::new());
        let locator = LocatorCandidate::tag("button");
        session.add_element(element);
        let handle = session.find_element(&locator).unwrap().unwrap();
        (session, handle)
    }

    mod click_tests {
        use super::*;

        #[test]
        fn test_native_click_success() {
            let (session, button) = session_with(MockElement::button(LocatorCandidate::tag("button")));
            let result = ActionExecutor::new()
                .perform(&session, &button, &Action::Click)
                .unwrap();

            assert_eq!(result, ActionResult::success());
            assert_eq!(session.count_calls("click:"), 1);
            assert_eq!(session.count_calls("script_click:"), 0);
        }

        #[test]
        fn test_intercepted_click_uses_fallback_once() {
            let (session, button) = session_with(
                MockElement::button(LocatorCandidate::tag("button"))
                    .click_intercepted()
                    .on_click(PageEffect::SetUrl("https://app/home".into())),
            );
            let result = ActionExecutor::new()
                .perform(&session, &button, &Action::Click)
                .unwrap();

            assert_eq!(result.outcome, ActionOutcome::FallbackUsed);
            assert!(result.reason.unwrap().contains("intercepted"));
            assert_eq!(session.count_calls("script_click:"), 1);
            assert_eq!(session.current_url().unwrap(), "https://app/home");
        }

        #[test]
        fn test_both_strategies_fail() {
            let (session, button) = session_with(
                MockElement::button(LocatorCandidate::tag("button"))
                    .click_intercepted()
                    .script_click_fails(),
            );
            let result = ActionExecutor::new()
                .perform(&session, &button, &Action::Click)
                .unwrap();

            assert_eq!(result.outcome, ActionOutcome::Failed);
            let reason = result.reason.unwrap();
            assert!(reason.contains("native:"));
            assert!(reason.contains("script:"));
            assert_eq!(session.count_calls("click:"), 1);
            assert_eq!(session.count_calls("script_click:"), 1);
        }

        #[test]
        fn test_fallback_disabled() {
            let (session, button) =
                session_with(MockElement::button(LocatorCandidate::tag("button")).click_intercepted());
            let result = ActionExecutor::new()
                .with_script_fallback(false)
                .perform(&session, &button, &Action::Click)
                .unwrap();

            assert_eq!(result.outcome, ActionOutcome::Failed);
            assert_eq!(session.count_calls("script:"), 0);
        }

        #[test]
        fn test_fatal_error_propagates() {
            let (session, button) = session_with(MockElement::button(LocatorCandidate::tag("button")));
            session.disconnect();
            let err = ActionExecutor::new()
                .perform(&session, &button, &Action::Click)
                .unwrap_err();
            assert!(err.is_fatal());
        }
    }

    mod typing_tests {
        use super::*;

        #[test]
        fn test_type_replaces_value() {
            let email = LocatorCandidate::name("email");
            let session = MockSession::new(ManualClock::new());
            session.add_element(MockElement::input(email.clone()).attr("value", "old"));
            let field = session.find_element(&email).unwrap().unwrap();

            let result = ActionExecutor::new()
                .perform(&session, &field, &Action::Type("new@x.io".into()))
                .unwrap();
            assert!(result.is_effective());
            assert_eq!(session.attribute_of(&email, "value").as_deref(), Some("new@x.io"));
        }

        #[test]
        fn test_type_empty_only_clears() {
            let email = LocatorCandidate::name("email");
            let session = MockSession::new(ManualClock::new());
            session.add_element(MockElement::input(email.clone()).attr("value", "old"));
            let field = session.find_element(&email).unwrap().unwrap();

            ActionExecutor::new()
                .perform(&session, &field, &Action::Type(String::new()))
                .unwrap();
            assert_eq!(session.attribute_of(&email, "value").as_deref(), Some(""));
            assert_eq!(session.count_calls("send_keys:"), 0);
        }

        #[test]
        fn test_non_click_failure_has_no_fallback() {
            let email = LocatorCandidate::name("email");
            let session = MockSession::new(ManualClock::new());
            session.add_element(MockElement::input(email.clone()).on_click(PageEffect::Remove(email.clone())));
            let field = session.find_element(&email).unwrap().unwrap();
            field.click().unwrap();

            let result = ActionExecutor::new()
                .perform(&session, &field, &Action::PressEnter)
                .unwrap();
            assert_eq!(result.outcome, ActionOutcome::Failed);
            assert_eq!(session.count_calls("script:"), 0);
        }
    }
}
