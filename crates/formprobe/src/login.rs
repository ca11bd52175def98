//! Login page workflows built on the resolution core.
//!
//! [`LoginLocators`] is the registry of every logical element of the login
//! form and the candidate selectors known for it. [`LoginPage`] borrows a
//! session and exposes the form's operations (enter credentials, toggle
//! password visibility, read error text) in terms of that registry.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::action::{Action, ActionExecutor, ActionResult};
use crate::cascade::SelectorCascade;
use crate::clock::{Clock, SystemClock};
use crate::interstitial::{InterstitialConfig, InterstitialHandler, InterstitialState};
use crate::locator::{LocatorCandidate, LocatorSet};
use crate::readiness::{PageReadinessOrchestrator, ReadinessReport};
use crate::result::{ProbeError, ProbeResult};
use crate::session::{ElementHandle, Session};
use crate::wait::{ActionabilityWaiter, Predicate, WaitSpec};

// =============================================================================
// LOCATOR REGISTRY
// =============================================================================

const PASSWORD_TOGGLE: [&str; 9] = [
    "//button[contains(@class, 'eye') or contains(@class, 'toggle') or contains(@class, 'show')]",
    "//button[.//*[name()='svg']]",
    "//span[contains(@class, 'eye') or contains(@class, 'toggle')]",
    "//i[contains(@class, 'eye') or contains(@class, 'fa-eye')]",
    "//*[contains(@class, 'password')]//*[contains(@class, 'toggle') or contains(@class, 'eye')]",
    "//div[contains(@class, 'password')]//button",
    "//*[@type='button' and contains(@aria-label, 'password') or contains(@title, 'password')]",
    "//*[contains(@class, 'password-toggle')]",
    "//*[contains(@class, 'show-password')]",
];

const EYE_ICON: [&str; 7] = [
    "//*[contains(@class, 'eye')]",
    "//*[contains(@class, 'toggle')]",
    "//*[contains(@class, 'show')]",
    "//*[contains(@class, 'password-toggle')]",
    "//*[contains(@class, 'show-password')]",
    "//*[contains(@aria-label, 'password')]",
    "//*[contains(@title, 'password')]",
];

const ALLOW: [&str; 10] = [
    "//button[contains(text(), 'Allow')]",
    "//button[contains(text(), 'Allow notifications')]",
    "//button[contains(@aria-label, 'Allow')]",
    "//button[contains(@title, 'Allow')]",
    "//div[contains(@class, 'notification')]//button[contains(text(), 'Allow')]",
    "//*[contains(text(), 'Allow') and contains(@role, 'button')]",
    "//*[contains(text(), 'Allow')]",
    "//*[contains(text(), 'Allow')]//ancestor::button",
    "//button[contains(., 'Allow') or contains(., 'allow')]",
    "//*[contains(text(), 'Allow')]//parent::button",
];

const CONTINUE: [&str; 7] = [
    "//button[contains(text(), 'Reload')]",
    "//a[contains(text(), 'Reload')]",
    "//*[contains(text(), 'Reload')]",
    "//*[contains(text(), 'reload')]",
    "//*[contains(text(), 'Reload')]//ancestor::button",
    "//button[contains(., 'Reload') or contains(., 'reload')]",
    "//*[contains(text(), 'Reload')]//parent::button",
];

const LOGIN_ERROR: [&str; 9] = [
    "//p[contains(text(),'Invalid') or contains(text(),'invalid')]",
    "//div[contains(@class, 'error') or contains(@class, 'alert')]",
    "//span[contains(@class, 'error') or contains(@class, 'invalid')]",
    "//*[contains(text(), 'credentials') or contains(text(), 'Credentials')]",
    "//*[contains(text(), 'wrong') or contains(text(), 'incorrect')]",
    "//p[@class='normal-text']",
    "//*[contains(@class, 'message') and (contains(text(), 'Invalid') or contains(text(), 'Error'))]",
    "//*[contains(text(), 'failed') or contains(text(), 'Failed')]",
    "//*[contains(text(), 'not found') or contains(text(), 'Not found')]",
];

const EMPTY_FIELDS_ERROR: [&str; 9] = [
    "//p[contains(text(), 'required') or contains(text(), 'Required')]",
    "//span[contains(text(), 'required') or contains(text(), 'Required')]",
    "//div[contains(text(), 'Please enter') or contains(text(), 'please enter')]",
    "//*[contains(text(), 'field') and contains(text(), 'required')]",
    "//*[contains(text(), 'email') and contains(text(), 'required')]",
    "//*[contains(text(), 'password') and contains(text(), 'required')]",
    "//small[contains(@class, 'error') or contains(@class, 'invalid')]",
    "//*[contains(@class, 'validation') or contains(@class, 'field-error')]",
    "//*[contains(text(), 'cannot be empty') or contains(text(), 'Cannot be empty')]",
];

const EMAIL_VALIDATION_ERROR: [&str; 5] = [
    "//*[contains(text(), 'invalid email') or contains(text(), 'Invalid email')]",
    "//*[contains(text(), 'email format') or contains(text(), 'Email format')]",
    "//*[contains(text(), 'valid email') or contains(text(), 'Valid email')]",
    "//*[contains(@class, 'error') and contains(text(), 'email')]",
    "//*[contains(@class, 'validation') and contains(text(), 'email')]",
];

/// Anything that looks like an error, scanned when no targeted selector matched
pub const GENERIC_ERROR_XPATH: &str = "//*[contains(@class, 'error') or contains(@class, 'alert') \
    or contains(@class, 'message') or contains(@class, 'invalid') or contains(@class, 'validation') \
    or contains(text(), 'Invalid') or contains(text(), 'required') or contains(text(), 'Please')]";

/// Pause before the generic error scan (2 seconds)
pub const GENERIC_SCAN_DELAY_MS: u64 = 2_000;

/// Per-candidate timeout when looking for login / empty-field errors (10 seconds)
pub const ERROR_TIMEOUT_MS: u64 = 10_000;

/// Per-candidate timeout when looking for email validation errors (5 seconds)
pub const VALIDATION_TIMEOUT_MS: u64 = 5_000;

fn xpath_set(target: &str, primary: &str, fallbacks: &[&str]) -> LocatorSet {
    LocatorSet::with_fallbacks(
        target,
        LocatorCandidate::xpath(primary),
        fallbacks.iter().copied().map(LocatorCandidate::xpath),
    )
}

/// Every logical element of the login form and how to find it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginLocators {
    /// Email input
    pub email: LocatorSet,
    /// Password input
    pub password: LocatorSet,
    /// Login button
    pub submit: LocatorSet,
    /// Password visibility toggle
    pub password_toggle: LocatorSet,
    /// Eye icon next to the password field
    pub eye_icon: LocatorSet,
    /// "Allow" control on the permission interstitial
    pub allow: LocatorSet,
    /// "Reload" control shown after allowing
    pub continue_prompt: LocatorSet,
    /// Login failure message
    pub login_error: LocatorSet,
    /// Required-field message
    pub empty_fields_error: LocatorSet,
    /// Email format message
    pub email_validation_error: LocatorSet,
}

impl LoginLocators {
    /// Logical names accepted by [`LoginLocators::get`] and config overrides
    pub const NAMES: [&'static str; 10] = [
        "email",
        "password",
        "submit",
        "password_toggle",
        "eye_icon",
        "allow",
        "continue",
        "login_error",
        "empty_fields_error",
        "email_validation_error",
    ];

    /// Look up a set by logical name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LocatorSet> {
        Some(match name {
            "email" => &self.email,
            "password" => &self.password,
            "submit" => &self.submit,
            "password_toggle" => &self.password_toggle,
            "eye_icon" => &self.eye_icon,
            "allow" => &self.allow,
            "continue" => &self.continue_prompt,
            "login_error" => &self.login_error,
            "empty_fields_error" => &self.empty_fields_error,
            "email_validation_error" => &self.email_validation_error,
            _ => return None,
        })
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut LocatorSet> {
        Some(match name {
            "email" => &mut self.email,
            "password" => &mut self.password,
            "submit" => &mut self.submit,
            "password_toggle" => &mut self.password_toggle,
            "eye_icon" => &mut self.eye_icon,
            "allow" => &mut self.allow,
            "continue" => &mut self.continue_prompt,
            "login_error" => &mut self.login_error,
            "empty_fields_error" => &mut self.empty_fields_error,
            "email_validation_error" => &mut self.email_validation_error,
            _ => return None,
        })
    }

    /// Replace candidate lists by logical name.
    ///
    /// Unknown names and empty lists are rejected.
    pub fn with_overrides(
        mut self,
        overrides: &BTreeMap<String, Vec<LocatorCandidate>>,
    ) -> ProbeResult<Self> {
        for (name, candidates) in overrides {
            let set = LocatorSet::new(name.clone(), candidates.iter().cloned())?;
            let slot = self.slot_mut(name).ok_or_else(|| {
                ProbeError::config(format!(
                    "unknown locator `{name}` (expected one of: {})",
                    Self::NAMES.join(", ")
                ))
            })?;
            *slot = set;
        }
        Ok(self)
    }

    /// Email, password and submit, in that order
    #[must_use]
    pub fn required(&self) -> Vec<LocatorSet> {
        vec![self.email.clone(), self.password.clone(), self.submit.clone()]
    }
}

impl Default for LoginLocators {
    fn default() -> Self {
        Self {
            email: LocatorSet::with_fallbacks(
                "email",
                LocatorCandidate::name("email"),
                [LocatorCandidate::css("input[type='email']")],
            ),
            password: LocatorSet::with_fallbacks(
                "password",
                LocatorCandidate::name("password"),
                [LocatorCandidate::css("input[type='password']")],
            ),
            submit: LocatorSet::with_fallbacks(
                "submit",
                LocatorCandidate::xpath("//button[@type='submit']"),
                [LocatorCandidate::tag("button")],
            ),
            password_toggle: xpath_set(
                "password_toggle",
                PASSWORD_TOGGLE[0],
                &PASSWORD_TOGGLE[1..],
            ),
            eye_icon: xpath_set("eye_icon", EYE_ICON[0], &EYE_ICON[1..]),
            allow: xpath_set("allow", ALLOW[0], &ALLOW[1..]),
            continue_prompt: xpath_set("continue", CONTINUE[0], &CONTINUE[1..]),
            login_error: xpath_set("login_error", LOGIN_ERROR[0], &LOGIN_ERROR[1..]),
            empty_fields_error: xpath_set(
                "empty_fields_error",
                EMPTY_FIELDS_ERROR[0],
                &EMPTY_FIELDS_ERROR[1..],
            ),
            email_validation_error: xpath_set(
                "email_validation_error",
                EMAIL_VALIDATION_ERROR[0],
                &EMAIL_VALIDATION_ERROR[1..],
            ),
        }
    }
}

// =============================================================================
// ERROR TEXT
// =============================================================================

/// What an error lookup found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum ErrorText {
    /// The permission interstitial was up; the handler ran once
    InterstitialBlocking(InterstitialState),
    /// A targeted selector matched
    Found(String),
    /// The generic scan found some error-like text
    Generic(String),
    /// Nothing found, but the browser never left the login page
    RemainedOnLoginPage,
    /// Nothing found
    NotFound,
}

impl ErrorText {
    /// Text for display and keyword matching
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::InterstitialBlocking(_) => {
                "Notification permission required - please allow notifications and reload the page"
            }
            Self::Found(text) | Self::Generic(text) => text,
            Self::RemainedOnLoginPage => "Login failed - remained on login page",
            Self::NotFound => "No specific error message found",
        }
    }

    /// Some error text was read from the page
    #[must_use]
    pub const fn has_text(&self) -> bool {
        matches!(self, Self::Found(_) | Self::Generic(_))
    }

    /// Case-insensitive search for any of `keywords`
    #[must_use]
    pub fn mentions_any(&self, keywords: &[&str]) -> bool {
        let text = self.text().to_lowercase();
        keywords.iter().any(|k| text.contains(&k.to_lowercase()))
    }
}

impl fmt::Display for ErrorText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

// =============================================================================
// LOGIN PAGE
// =============================================================================

/// Login form operations over a borrowed session
#[derive(Debug)]
pub struct LoginPage<'s, S: Session, C: Clock = SystemClock> {
    session: &'s S,
    locators: LoginLocators,
    spec: WaitSpec,
    cascade: SelectorCascade<C>,
    executor: ActionExecutor,
    interstitial: InterstitialHandler<C>,
    orchestrator: PageReadinessOrchestrator<C>,
    base_url: String,
    login_host: String,
}

impl<'s, S: Session> LoginPage<'s, S, SystemClock> {
    /// Login page on the wall clock with default locators and timing
    pub fn new(session: &'s S) -> Self {
        Self::with_waiter(session, ActionabilityWaiter::default())
    }
}

impl<'s, S: Session, C: Clock + Clone> LoginPage<'s, S, C> {
    /// Login page polling through `waiter`
    pub fn with_waiter(session: &'s S, waiter: ActionabilityWaiter<C>) -> Self {
        let locators = LoginLocators::default();
        let cascade = SelectorCascade::new(waiter);
        let interstitial = Self::build_interstitial(&cascade, &locators, InterstitialConfig::default());
        Self {
            session,
            orchestrator: PageReadinessOrchestrator::new(cascade.clone(), interstitial.clone()),
            interstitial,
            cascade,
            executor: ActionExecutor::new(),
            locators,
            spec: WaitSpec::default(),
            base_url: String::new(),
            login_host: String::new(),
        }
    }

    fn build_interstitial(
        cascade: &SelectorCascade<C>,
        locators: &LoginLocators,
        config: InterstitialConfig,
    ) -> InterstitialHandler<C> {
        InterstitialHandler::new(cascade.clone(), locators.allow.clone())
            .with_continue(locators.continue_prompt.clone())
            .with_config(config)
    }

    fn rebuild(mut self, config: InterstitialConfig) -> Self {
        self.interstitial = Self::build_interstitial(&self.cascade, &self.locators, config);
        self.orchestrator =
            PageReadinessOrchestrator::new(self.cascade.clone(), self.interstitial.clone());
        self
    }

    /// Use another locator registry
    #[must_use]
    pub fn with_locators(mut self, locators: LoginLocators) -> Self {
        let config = self.interstitial.config().clone();
        self.locators = locators;
        self.rebuild(config)
    }

    /// Use another interstitial configuration
    #[must_use]
    pub fn with_interstitial(self, config: InterstitialConfig) -> Self {
        self.rebuild(config)
    }

    /// Timing for element resolution
    #[must_use]
    pub const fn with_wait_spec(mut self, spec: WaitSpec) -> Self {
        self.spec = spec;
        self
    }

    /// Site the form lives on, for [`LoginPage::is_on_login_page`]
    #[must_use]
    pub fn with_site(mut self, base_url: impl Into<String>, login_host: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self.login_host = login_host.into();
        self
    }

    /// Active locator registry
    pub const fn locators(&self) -> &LoginLocators {
        &self.locators
    }

    /// Borrowed session
    pub const fn session(&self) -> &'s S {
        self.session
    }

    /// Clock every wait runs on
    pub fn clock(&self) -> &C {
        self.cascade.waiter().clock()
    }

    // -------------------------------------------------------------------------
    // Readiness
    // -------------------------------------------------------------------------

    /// Dismiss the interstitial if needed and resolve email, password and submit
    pub fn wait_for_page_load(&self) -> ProbeResult<ReadinessReport<S::Element>> {
        self.wait_for_elements(&self.locators.required())
    }

    /// Dismiss the interstitial if needed and resolve `required`
    pub fn wait_for_elements(
        &self,
        required: &[LocatorSet],
    ) -> ProbeResult<ReadinessReport<S::Element>> {
        self.orchestrator.ensure_ready(self.session, required, &self.spec)
    }

    /// Reload and wait for the form again
    pub fn reload(&self) -> ProbeResult<ReadinessReport<S::Element>> {
        self.session.reload()?;
        self.wait_for_page_load()
    }

    // -------------------------------------------------------------------------
    // Actions
    // -------------------------------------------------------------------------

    fn act(&self, set: &LocatorSet, action: &Action) -> ProbeResult<ActionResult> {
        match self
            .cascade
            .resolve(self.session, set, &self.spec.with_predicate(Predicate::Clickable))?
        {
            Ok(resolved) => self.executor.perform(self.session, resolved.element(), action),
            Err(exhausted) => Ok(ActionResult::failed(exhausted.to_string())),
        }
    }

    /// Replace the email field's value; empty text clears it
    pub fn enter_email(&self, text: &str) -> ProbeResult<ActionResult> {
        self.act(&self.locators.email, &Action::Type(text.to_string()))
    }

    /// Replace the password field's value; empty text clears it
    pub fn enter_password(&self, text: &str) -> ProbeResult<ActionResult> {
        self.act(&self.locators.password, &Action::Type(text.to_string()))
    }

    /// Click the login button (scripted fallback when intercepted)
    pub fn click_login(&self) -> ProbeResult<ActionResult> {
        self.act(&self.locators.submit, &Action::Click)
    }

    /// Enter both credentials and click login.
    ///
    /// Stops at the first step that fails and returns its result.
    pub fn login(&self, email: &str, password: &str) -> ProbeResult<ActionResult> {
        info!(email, "logging in");
        let result = self.enter_email(email)?;
        if !result.is_effective() {
            return Ok(result);
        }
        let result = self.enter_password(password)?;
        if !result.is_effective() {
            return Ok(result);
        }
        self.click_login()
    }

    /// Press Enter in the password field
    pub fn submit_with_enter_key(&self) -> ProbeResult<ActionResult> {
        self.act(&self.locators.password, &Action::PressEnter)
    }

    /// Clear email and password
    pub fn clear_all_fields(&self) -> ProbeResult<ActionResult> {
        let email = self.enter_email("")?;
        let password = self.enter_password("")?;
        Ok(if email.is_effective() { password } else { email })
    }

    /// Click the first password visibility toggle that becomes clickable.
    ///
    /// `None` when no toggle candidate resolves.
    pub fn toggle_password_visibility(&self) -> ProbeResult<Option<ActionResult>> {
        match self.cascade.resolve(
            self.session,
            &self.locators.password_toggle,
            &self.spec.with_predicate(Predicate::Clickable),
        )? {
            Ok(toggle) => Ok(Some(
                self.executor.perform(self.session, toggle.element(), &Action::Click)?,
            )),
            Err(exhausted) => {
                debug!(%exhausted, "no password toggle");
                Ok(None)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    fn present_attribute(&self, set: &LocatorSet, name: &str) -> ProbeResult<Option<String>> {
        let spec = self.spec.with_predicate(Predicate::Present);
        let Ok(resolved) = self.cascade.resolve(self.session, set, &spec)? else {
            return Ok(None);
        };
        recoverable(resolved.element().attribute(name), None)
    }

    /// Password field's `type` is `password`
    pub fn is_password_masked(&self) -> ProbeResult<bool> {
        Ok(self
            .present_attribute(&self.locators.password, "type")?
            .is_some_and(|t| t == "password"))
    }

    /// Login button is present and not disabled
    pub fn is_login_button_enabled(&self) -> ProbeResult<bool> {
        let spec = self.spec.with_predicate(Predicate::Present);
        let Ok(resolved) = self.cascade.resolve(self.session, &self.locators.submit, &spec)? else {
            return Ok(false);
        };
        recoverable(resolved.element().is_enabled(), false)
    }

    /// Login button is missing or disabled
    pub fn is_login_button_disabled(&self) -> ProbeResult<bool> {
        Ok(!self.is_login_button_enabled()?)
    }

    /// Some eye-icon candidate is displayed right now (no waiting)
    pub fn is_eye_icon_present(&self) -> ProbeResult<bool> {
        Ok(self
            .cascade
            .resolve_first_now(self.session, &self.locators.eye_icon, Predicate::Visible)?
            .is_some())
    }

    /// Email field's value; empty when the field cannot be found
    pub fn email_value(&self) -> ProbeResult<String> {
        Ok(self
            .present_attribute(&self.locators.email, "value")?
            .unwrap_or_default())
    }

    /// Password field's value; empty when the field cannot be found
    pub fn password_value(&self) -> ProbeResult<String> {
        Ok(self
            .present_attribute(&self.locators.password, "value")?
            .unwrap_or_default())
    }

    /// URL is on the login host and is either a login path or the base URL
    pub fn is_on_login_page(&self) -> ProbeResult<bool> {
        let url = self.session.current_url()?;
        let on_host = !self.login_host.is_empty() && url.contains(self.login_host.as_str());
        Ok(on_host && (url.contains("login") || url == self.base_url))
    }

    /// Document title
    pub fn title(&self) -> ProbeResult<String> {
        self.session.title()
    }

    /// Current URL
    pub fn current_url(&self) -> ProbeResult<String> {
        self.session.current_url()
    }

    // -------------------------------------------------------------------------
    // Error text
    // -------------------------------------------------------------------------

    /// Login failure message
    pub fn error_message(&self) -> ProbeResult<ErrorText> {
        self.error_text(&self.locators.login_error, ERROR_TIMEOUT_MS)
    }

    /// Required-field message
    pub fn empty_fields_error(&self) -> ProbeResult<ErrorText> {
        self.error_text(&self.locators.empty_fields_error, ERROR_TIMEOUT_MS)
    }

    /// Email format message
    pub fn email_validation_error(&self) -> ProbeResult<ErrorText> {
        self.error_text(&self.locators.email_validation_error, VALIDATION_TIMEOUT_MS)
    }

    fn error_text(&self, set: &LocatorSet, timeout_ms: u64) -> ProbeResult<ErrorText> {
        if self.interstitial.detect(self.session)? {
            let outcome = self.interstitial.handle(self.session, &self.spec)?;
            return Ok(ErrorText::InterstitialBlocking(outcome.state()));
        }

        let poll = self.spec.poll_interval_ms().min(timeout_ms);
        let spec = WaitSpec::new(timeout_ms, poll, Predicate::Visible)?;
        // a candidate showing empty text does not end the targeted search
        for candidate in set.iter() {
            let Ok(resolved) = self.cascade.waiter().wait(self.session, candidate, &spec)? else {
                continue;
            };
            let text = recoverable(resolved.element().text(), String::new())?;
            let text = text.trim();
            if !text.is_empty() {
                info!(target_name = set.target(), %candidate, "error text found");
                return Ok(ErrorText::Found(text.to_string()));
            }
            debug!(target_name = set.target(), %candidate, "matched without text");
        }

        if let Some(text) = self.scan_for_error_text()? {
            return Ok(ErrorText::Generic(text));
        }

        let url = self.session.current_url()?;
        if url.contains("login") || (!self.login_host.is_empty() && url.contains(self.login_host.as_str())) {
            Ok(ErrorText::RemainedOnLoginPage)
        } else {
            Ok(ErrorText::NotFound)
        }
    }

    /// First non-empty text among error-looking elements, in document order
    fn scan_for_error_text(&self) -> ProbeResult<Option<String>> {
        self.cascade
            .waiter()
            .clock()
            .sleep(Duration::from_millis(GENERIC_SCAN_DELAY_MS));

        let elements = recoverable(
            self.session
                .find_elements(&LocatorCandidate::xpath(GENERIC_ERROR_XPATH)),
            Vec::new(),
        )?;
        for element in elements {
            let text = recoverable(element.text(), String::new())?;
            let text = text.trim();
            if !text.is_empty() {
                return Ok(Some(text.to_string()));
            }
        }
        Ok(None)
    }
}

/// Fatal errors propagate; anything else becomes `fallback`
fn recoverable<T>(result: ProbeResult<T>, fallback: T) -> ProbeResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            debug!(error = %e, "ignoring recoverable error");
            Ok(fallback)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::action::ActionOutcome;
    use crate::clock::ManualClock;
    use crate::mock::{MockElement, MockSession, PageEffect};
    use crate::readiness::PageState;

    const BASE_URL: &str = "https://dash.example.test/";
    const HOST: &str = "dash.example.test";

    fn email() -> LocatorCandidate {
        LocatorCandidate::name("email")
    }

    fn password() -> LocatorCandidate {
        LocatorCandidate::name("password")
    }

    fn submit() -> LocatorCandidate {
        LocatorCandidate::tag("button")
    }

    fn toggle() -> LocatorCandidate {
        LocatorCandidate::xpath(PASSWORD_TOGGLE[0])
    }

    /// A login form with an eye toggle; submitting navigates away
    fn login_form() -> MockSession {
        let session = MockSession::new(ManualClock::new());
        session.set_url(BASE_URL);
        session.set_title("Login");
        session.add_element(MockElement::input(email()));
        session.add_element(MockElement::password(password()));
        session.add_element(
            MockElement::button(submit()).on_click(PageEffect::SetUrl("https://dash.example.test/home".into())),
        );
        session.add_element(
            MockElement::button(toggle())
                .also_matches(LocatorCandidate::xpath(EYE_ICON[0]))
                .on_click(PageEffect::ToggleAttribute {
                    target: password(),
                    name: "type".into(),
                    a: "password".into(),
                    b: "text".into(),
                }),
        );
        session
    }

    fn page(session: &MockSession) -> LoginPage<'_, MockSession, ManualClock> {
        LoginPage::with_waiter(session, ActionabilityWaiter::new(session.clock().clone()))
            .with_wait_spec(WaitSpec::new(1_000, 100, Predicate::Clickable).unwrap())
            .with_site(BASE_URL, HOST)
    }

    mod locator_tests {
        use super::*;

        #[test]
        fn test_default_registry_sizes() {
            let l = LoginLocators::default();
            assert_eq!(l.email.primary(), &email());
            assert_eq!(l.submit.len(), 2);
            assert_eq!(l.password_toggle.len(), 9);
            assert_eq!(l.eye_icon.len(), 7);
            assert_eq!(l.allow.len(), 10);
            assert_eq!(l.continue_prompt.len(), 7);
            assert_eq!(l.login_error.len(), 9);
            assert_eq!(l.empty_fields_error.len(), 9);
            assert_eq!(l.email_validation_error.len(), 5);
        }

        #[test]
        fn test_every_name_resolves() {
            let l = LoginLocators::default();
            for name in LoginLocators::NAMES {
                assert!(l.get(name).is_some(), "{name}");
            }
            assert_eq!(l.get("continue").unwrap().target(), "continue");
            assert!(l.get("nope").is_none());
        }

        #[test]
        fn test_overrides() {
            let mut overrides = BTreeMap::new();
            overrides.insert("submit".to_string(), vec![LocatorCandidate::css("#login")]);
            let l = LoginLocators::default().with_overrides(&overrides).unwrap();
            assert_eq!(l.submit.primary(), &LocatorCandidate::css("#login"));
            assert_eq!(l.submit.len(), 1);
        }

        #[test]
        fn test_override_rejects_unknown_and_empty() {
            let mut unknown = BTreeMap::new();
            unknown.insert("captcha".to_string(), vec![LocatorCandidate::css("#c")]);
            assert!(matches!(
                LoginLocators::default().with_overrides(&unknown),
                Err(ProbeError::Config { .. })
            ));

            let mut empty = BTreeMap::new();
            empty.insert("email".to_string(), Vec::new());
            assert!(matches!(
                LoginLocators::default().with_overrides(&empty),
                Err(ProbeError::EmptyLocatorSet { .. })
            ));
        }
    }

    mod workflow_tests {
        use super::*;

        #[test]
        fn test_wait_for_page_load_ready() {
            let session = login_form();
            let report = page(&session).wait_for_page_load().unwrap();
            assert_eq!(report.state, PageState::Ready);
            assert_eq!(report.resolved.len(), 3);
        }

        #[test]
        fn test_login_navigates_away() {
            let session = login_form();
            let login = page(&session);
            assert!(login.is_on_login_page().unwrap());

            let result = login.login("test@example.com", "secret").unwrap();
            assert_eq!(result.outcome, ActionOutcome::Success);
            assert_eq!(login.email_value().unwrap(), "test@example.com");
            assert_eq!(login.password_value().unwrap(), "secret");
            assert!(!login.is_on_login_page().unwrap());
        }

        #[test]
        fn test_login_stops_at_missing_field() {
            let session = MockSession::new(ManualClock::new());
            session.add_element(MockElement::button(submit()));
            let result = page(&session).login("a@b.c", "x").unwrap();
            assert_eq!(result.outcome, ActionOutcome::Failed);
            assert_eq!(session.count_calls("click:"), 0);
        }

        #[test]
        fn test_enter_email_replaces_previous_value() {
            let session = login_form();
            let login = page(&session);
            login.enter_email("first@x.io").unwrap();
            login.enter_email("second@x.io").unwrap();
            assert_eq!(login.email_value().unwrap(), "second@x.io");
        }

        #[test]
        fn test_clear_all_fields() {
            let session = login_form();
            let login = page(&session);
            login.enter_email("a@b.c").unwrap();
            login.enter_password("pw").unwrap();

            assert!(login.clear_all_fields().unwrap().is_effective());
            assert_eq!(login.email_value().unwrap(), "");
            assert_eq!(login.password_value().unwrap(), "");
        }

        #[test]
        fn test_password_toggle() {
            let session = login_form();
            let login = page(&session);
            assert!(login.is_password_masked().unwrap());

            let result = login.toggle_password_visibility().unwrap().unwrap();
            assert_eq!(result.outcome, ActionOutcome::Success);
            assert!(!login.is_password_masked().unwrap());
        }

        #[test]
        fn test_toggle_missing_is_none() {
            let session = MockSession::new(ManualClock::new());
            session.add_element(MockElement::password(password()));
            assert!(page(&session).toggle_password_visibility().unwrap().is_none());
        }

        #[test]
        fn test_submit_with_enter_key() {
            let session = login_form();
            session.on_submit(PageEffect::SetUrl("https://dash.example.test/home".into()));
            let login = page(&session);
            login.enter_email("a@b.c").unwrap();
            login.enter_password("pw").unwrap();

            assert!(login.submit_with_enter_key().unwrap().is_effective());
            assert!(!login.is_on_login_page().unwrap());
        }

        #[test]
        fn test_login_button_state() {
            let session = MockSession::new(ManualClock::new());
            session.add_element(MockElement::button(submit()).disabled());
            let login = page(&session);
            assert!(!login.is_login_button_enabled().unwrap());
            assert!(login.is_login_button_disabled().unwrap());

            assert!(page(&login_form()).is_login_button_enabled().unwrap());
        }

        #[test]
        fn test_eye_icon_present_without_waiting() {
            let session = login_form();
            assert!(page(&session).is_eye_icon_present().unwrap());
            assert_eq!(session.clock().now_ms(), 0);

            let bare = MockSession::new(ManualClock::new());
            assert!(!page(&bare).is_eye_icon_present().unwrap());
            assert_eq!(bare.clock().now_ms(), 0);
        }

        #[test]
        fn test_reload_clears_fields() {
            let session = login_form();
            let login = page(&session);
            login.enter_email("a@b.c").unwrap();

            assert!(login.reload().unwrap().is_ready());
            assert_eq!(login.email_value().unwrap(), "");
        }

        #[test]
        fn test_on_login_page_needs_host() {
            let session = login_form();
            assert!(page(&session).is_on_login_page().unwrap());

            session.set_url("https://elsewhere.test/login");
            assert!(!page(&session).is_on_login_page().unwrap());

            let no_host = page(&session).with_site(BASE_URL, "");
            assert!(!no_host.is_on_login_page().unwrap());
        }

        #[test]
        fn test_title_and_url() {
            let session = login_form();
            let login = page(&session);
            assert_eq!(login.title().unwrap(), "Login");
            assert_eq!(login.current_url().unwrap(), BASE_URL);
        }
    }

    mod error_text_tests {
        use super::*;

        #[test]
        fn test_targeted_error_found() {
            let session = login_form();
            session.add_element(
                MockElement::new("p", LocatorCandidate::xpath(LOGIN_ERROR[0])).text("  Invalid credentials "),
            );
            let text = page(&session).error_message().unwrap();
            assert_eq!(text, ErrorText::Found("Invalid credentials".into()));
            assert!(text.mentions_any(&["invalid"]));
        }

        #[test]
        fn test_empty_match_moves_to_next_candidate() {
            let session = login_form();
            session.add_element(MockElement::new("div", LocatorCandidate::xpath(LOGIN_ERROR[1])).text(" "));
            session.add_element(
                MockElement::new("span", LocatorCandidate::xpath(LOGIN_ERROR[2])).text("Wrong password"),
            );
            let text = page(&session).error_message().unwrap();
            assert_eq!(text, ErrorText::Found("Wrong password".into()));
            // first candidate times out, the next two match at once
            assert_eq!(session.clock().now_ms(), ERROR_TIMEOUT_MS);
        }

        #[test]
        fn test_generic_scan_fallback() {
            let session = login_form();
            session.add_element(MockElement::new("div", LocatorCandidate::xpath(GENERIC_ERROR_XPATH)).text(""));
            session.add_element(
                MockElement::new("div", LocatorCandidate::xpath(GENERIC_ERROR_XPATH)).text("Please try again"),
            );
            let text = page(&session).empty_fields_error().unwrap();
            assert_eq!(text, ErrorText::Generic("Please try again".into()));
        }

        #[test]
        fn test_remained_on_login_page() {
            let session = login_form();
            let text = page(&session).email_validation_error().unwrap();
            assert_eq!(text, ErrorText::RemainedOnLoginPage);
            // 5 candidates x 5s, then the scan delay
            assert_eq!(session.clock().now_ms(), 5 * 5_000 + GENERIC_SCAN_DELAY_MS);
        }

        #[test]
        fn test_not_found_off_site() {
            let session = login_form();
            session.set_url("https://elsewhere.test/home");
            assert_eq!(page(&session).error_message().unwrap(), ErrorText::NotFound);
        }

        #[test]
        fn test_interstitial_blocks_error_lookup() {
            let session = login_form();
            session.set_source("To proceed to the login page please allow notifications");
            let text = page(&session).error_message().unwrap();
            assert_eq!(text, ErrorText::InterstitialBlocking(InterstitialState::Unresolved));
            assert!(text.mentions_any(&["notification"]));
        }
    }
}
