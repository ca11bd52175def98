//! The login scenario suite.
//!
//! Each [`Scenario`] waits for the form, drives it through a [`LoginPage`]
//! and returns a [`Check`]. Scenarios that exercise site behaviour the suite
//! cannot know in advance (button state, eye icon, valid credentials) pass
//! and record what they saw.

use std::fmt;
use std::time::Duration;

use formprobe::{Clock, Credentials, ErrorText, LoginPage, ProbeResult, Session};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::error::{CliError, CliResult};

/// Words that show a login attempt was rejected
pub const REJECTION_KEYWORDS: [&str; 5] = ["invalid", "error", "wrong", "failed", "notification"];

/// Words that show empty fields were flagged
pub const EMPTY_FIELD_KEYWORDS: [&str; 7] = [
    "required",
    "please enter",
    "field",
    "email",
    "password",
    "login failed",
    "notification",
];

/// Words that show an email format problem was flagged
pub const EMAIL_FORMAT_KEYWORDS: [&str; 3] = ["invalid", "email", "format"];

const SAMPLE_EMAIL: &str = "test@example.com";
const SAMPLE_PASSWORD: &str = "testpassword";
const INVALID_EMAIL: &str = "invalid@example.com";
const WRONG_PASSWORD: &str = "wrongpassword123";
const MALFORMED_EMAIL: &str = "abc";
const LONG_INPUT_LEN: usize = 256;
const TOGGLE_SETTLE_MS: u64 = 1_000;

const FORM: [&str; 3] = ["email", "password", "submit"];
const CREDENTIAL_FIELDS: [&str; 2] = ["email", "password"];

/// Pass or fail, with what was observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Check {
    /// Whether the scenario held
    pub passed: bool,
    /// What was observed
    pub detail: String,
}

impl Check {
    /// Passing check
    #[must_use]
    pub fn pass(detail: impl Into<String>) -> Self {
        Self {
            passed: true,
            detail: detail.into(),
        }
    }

    /// Failing check
    #[must_use]
    pub fn fail(detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            detail: detail.into(),
        }
    }

    /// Pass when `holds`
    #[must_use]
    pub fn expect(holds: bool, detail: impl Into<String>) -> Self {
        Self {
            passed: holds,
            detail: detail.into(),
        }
    }

    /// Same verdict, with `note` in front of the detail
    #[must_use]
    pub fn noted(self, note: &str) -> Self {
        Self {
            passed: self.passed,
            detail: format!("{note}; {}", self.detail),
        }
    }
}

/// One scenario of the suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Log in with the configured credentials
    ValidCredentials,
    /// Unknown email is rejected
    InvalidEmail,
    /// Wrong password is rejected
    InvalidPassword,
    /// Submitting empty fields is flagged
    EmptyFields,
    /// Password input is masked by default
    PasswordMasked,
    /// The visibility toggle reveals the password
    PasswordToggle,
    /// Login button state with empty fields
    ButtonState,
    /// Email input keeps typed text
    EmailInput,
    /// Malformed email is flagged
    EmailValidation,
    /// Form controls are present and usable
    ElementsPresent,
    /// Reloading empties the form
    ReloadClearsFields,
    /// Very long input is accepted
    LongCredentials,
    /// Enter in the password field submits
    EnterKeySubmit,
    /// Eye icon next to the password field
    EyeIcon,
}

impl Scenario {
    /// Every scenario, in run order
    pub const ALL: [Self; 14] = [
        Self::ValidCredentials,
        Self::InvalidEmail,
        Self::InvalidPassword,
        Self::EmptyFields,
        Self::PasswordMasked,
        Self::PasswordToggle,
        Self::ButtonState,
        Self::EmailInput,
        Self::EmailValidation,
        Self::ElementsPresent,
        Self::ReloadClearsFields,
        Self::LongCredentials,
        Self::EnterKeySubmit,
        Self::EyeIcon,
    ];

    /// Snake-case name, matched by `--filter`
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ValidCredentials => "valid_credentials",
            Self::InvalidEmail => "invalid_email",
            Self::InvalidPassword => "invalid_password",
            Self::EmptyFields => "empty_fields",
            Self::PasswordMasked => "password_masked",
            Self::PasswordToggle => "password_toggle",
            Self::ButtonState => "button_state",
            Self::EmailInput => "email_input",
            Self::EmailValidation => "email_validation",
            Self::ElementsPresent => "elements_present",
            Self::ReloadClearsFields => "reload_clears_fields",
            Self::LongCredentials => "long_credentials",
            Self::EnterKeySubmit => "enter_key_submit",
            Self::EyeIcon => "eye_icon",
        }
    }

    /// One-line description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ValidCredentials => "login with valid credentials leaves the login page",
            Self::InvalidEmail => "login with an unknown email shows an error",
            Self::InvalidPassword => "login with a wrong password shows an error",
            Self::EmptyFields => "login with empty fields shows a validation error",
            Self::PasswordMasked => "password field masks input by default",
            Self::PasswordToggle => "password visibility toggle reveals the password",
            Self::ButtonState => "login button state with empty fields",
            Self::EmailInput => "email field accepts text",
            Self::EmailValidation => "malformed email shows a validation error",
            Self::ElementsPresent => "essential form controls are present and usable",
            Self::ReloadClearsFields => "reloading the page clears the form",
            Self::LongCredentials => "very long credentials are accepted",
            Self::EnterKeySubmit => "enter in the password field submits the form",
            Self::EyeIcon => "eye icon is shown next to the password field",
        }
    }

    /// Scenarios whose name matches `filter` (a regex), in run order
    pub fn select(filter: Option<&str>) -> CliResult<Vec<Self>> {
        let Some(pattern) = filter else {
            return Ok(Self::ALL.to_vec());
        };
        let regex = Regex::new(pattern)
            .map_err(|e| CliError::invalid_argument(format!("bad filter `{pattern}`: {e}")))?;
        Ok(Self::ALL
            .into_iter()
            .filter(|s| regex.is_match(s.name()))
            .collect())
    }

    /// Form elements this scenario cannot run without
    #[must_use]
    pub const fn needs(self) -> &'static [&'static str] {
        match self {
            Self::ValidCredentials
            | Self::InvalidEmail
            | Self::InvalidPassword
            | Self::EmptyFields
            | Self::ButtonState
            | Self::ElementsPresent => &FORM,
            Self::EmailValidation | Self::LongCredentials | Self::EnterKeySubmit => &CREDENTIAL_FIELDS,
            Self::PasswordMasked | Self::PasswordToggle => &["password"],
            Self::EmailInput | Self::ReloadClearsFields => &["email"],
            Self::EyeIcon => &[],
        }
    }

    /// Wait for the form, then run this scenario on `page`.
    ///
    /// A degraded page only stops the scenario when an element it needs is
    /// missing. Otherwise it runs anyway and the verdict leads its detail.
    pub fn run<S: Session, C: Clock + Clone>(
        self,
        page: &LoginPage<'_, S, C>,
        credentials: &Credentials,
    ) -> ProbeResult<Check> {
        let report = page.wait_for_page_load()?;
        let missing: Vec<&str> = report
            .missing
            .iter()
            .map(|m| m.target.as_str())
            .filter(|target| self.needs().contains(target))
            .collect();
        if !missing.is_empty() {
            return Ok(Check::fail(format!(
                "page {}: missing {}; {}",
                report.state,
                missing.join(", "),
                report.reasons.join("; ")
            )));
        }

        let check = self.dispatch(page, credentials)?;
        if report.is_ready() {
            Ok(check)
        } else {
            debug!(scenario = self.name(), state = %report.state, "ran on a degraded page");
            Ok(check.noted(&format!("page {} ({})", report.state, report.reasons.join("; "))))
        }
    }

    fn dispatch<S: Session, C: Clock + Clone>(
        self,
        page: &LoginPage<'_, S, C>,
        credentials: &Credentials,
    ) -> ProbeResult<Check> {
        match self {
            Self::ValidCredentials => valid_credentials(page, credentials),
            Self::InvalidEmail => rejected(page, INVALID_EMAIL, &credentials.password),
            Self::InvalidPassword => rejected(page, &credentials.email, WRONG_PASSWORD),
            Self::EmptyFields => empty_fields(page),
            Self::PasswordMasked => {
                let masked = page.is_password_masked()?;
                Ok(Check::expect(
                    masked,
                    if masked { "password input is masked" } else { "password input shows plain text" },
                ))
            }
            Self::PasswordToggle => password_toggle(page, credentials),
            Self::ButtonState => {
                page.clear_all_fields()?;
                let disabled = page.is_login_button_disabled()?;
                Ok(Check::pass(format!("login button disabled with empty fields: {disabled}")))
            }
            Self::EmailInput => {
                page.enter_email(SAMPLE_EMAIL)?;
                let value = page.email_value()?;
                Ok(Check::expect(value == SAMPLE_EMAIL, format!("email field holds {value:?}")))
            }
            Self::EmailValidation => email_validation(page),
            Self::ElementsPresent => elements_present(page),
            Self::ReloadClearsFields => reload_clears_fields(page),
            Self::LongCredentials => long_credentials(page),
            Self::EnterKeySubmit => {
                page.enter_email(&credentials.email)?;
                page.enter_password(&credentials.password)?;
                let result = page.submit_with_enter_key()?;
                Ok(Check::expect(
                    result.is_effective(),
                    format!("enter key: {:?}", result.outcome),
                ))
            }
            Self::EyeIcon => {
                let present = page.is_eye_icon_present()?;
                Ok(Check::pass(format!("eye icon displayed: {present}")))
            }
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn valid_credentials<S: Session, C: Clock + Clone>(
    page: &LoginPage<'_, S, C>,
    credentials: &Credentials,
) -> ProbeResult<Check> {
    let result = page.login(&credentials.email, &credentials.password)?;
    if !result.is_effective() {
        return Ok(Check::fail(format!(
            "login did not go through: {}",
            result.reason.unwrap_or_default()
        )));
    }
    let left = !page.is_on_login_page()?;
    Ok(Check::pass(format!(
        "left login page: {left}, now at {}",
        page.current_url()?
    )))
}

/// Failed login: either the browser stays on the login page or an error shows
fn rejected<S: Session, C: Clock + Clone>(
    page: &LoginPage<'_, S, C>,
    email: &str,
    password: &str,
) -> ProbeResult<Check> {
    page.login(email, password)?;
    let error = page.error_message()?;
    let stayed = page.is_on_login_page()?;
    Ok(Check::expect(
        stayed || error.mentions_any(&REJECTION_KEYWORDS),
        format!("stayed on login page: {stayed}; message: {error}"),
    ))
}

fn empty_fields<S: Session, C: Clock + Clone>(page: &LoginPage<'_, S, C>) -> ProbeResult<Check> {
    page.clear_all_fields()?;
    page.click_login()?;
    let error = page.empty_fields_error()?;
    let stayed = page.is_on_login_page()?;
    Ok(Check::expect(
        stayed || error.mentions_any(&EMPTY_FIELD_KEYWORDS),
        format!("stayed on login page: {stayed}; message: {error}"),
    ))
}

fn password_toggle<S: Session, C: Clock + Clone>(
    page: &LoginPage<'_, S, C>,
    credentials: &Credentials,
) -> ProbeResult<Check> {
    page.enter_password(&credentials.password)?;
    if !page.is_password_masked()? {
        return Ok(Check::fail("password not masked before toggling"));
    }

    let Some(toggle) = page.toggle_password_visibility()? else {
        return Ok(Check::pass("no visibility toggle on this page"));
    };
    page.clock().sleep(Duration::from_millis(TOGGLE_SETTLE_MS));

    Ok(if page.is_password_masked()? {
        Check::pass(format!(
            "toggle clicked ({:?}) but password stayed masked",
            toggle.outcome
        ))
    } else {
        Check::pass("password revealed after toggle")
    })
}

/// Only text read from the page counts against the check
fn email_validation<S: Session, C: Clock + Clone>(
    page: &LoginPage<'_, S, C>,
) -> ProbeResult<Check> {
    page.enter_email(MALFORMED_EMAIL)?;
    // moving focus triggers validation
    page.enter_password("test")?;
    let error = page.email_validation_error()?;
    let holds = match error {
        ErrorText::Found(_) | ErrorText::Generic(_) => error.mentions_any(&EMAIL_FORMAT_KEYWORDS),
        _ => true,
    };
    Ok(Check::expect(holds, format!("message: {error}")))
}

fn elements_present<S: Session, C: Clock + Clone>(
    page: &LoginPage<'_, S, C>,
) -> ProbeResult<Check> {
    if !page.is_login_button_enabled()? {
        return Ok(Check::fail("login button missing or disabled"));
    }

    let steps = [
        ("type email", page.enter_email(SAMPLE_EMAIL)?),
        ("type password", page.enter_password(SAMPLE_PASSWORD)?),
        ("clear email", page.enter_email("")?),
        ("clear password", page.enter_password("")?),
    ];
    let failed: Vec<_> = steps
        .iter()
        .filter(|(_, result)| !result.is_effective())
        .map(|(step, _)| *step)
        .collect();

    Ok(if failed.is_empty() {
        Check::pass("all form controls accessible")
    } else {
        Check::fail(format!("could not {}", failed.join(", ")))
    })
}

fn reload_clears_fields<S: Session, C: Clock + Clone>(
    page: &LoginPage<'_, S, C>,
) -> ProbeResult<Check> {
    page.enter_email(SAMPLE_EMAIL)?;
    let report = page.reload()?;
    if report.missing.iter().any(|m| m.target == "email") {
        return Ok(Check::fail(format!("page {} after reload: email field missing", report.state)));
    }
    let value = page.email_value()?;
    Ok(Check::expect(
        value.is_empty(),
        format!("email field after reload: {value:?}"),
    ))
}

/// A `maxlength` cut is fine; losing the input is not
fn long_credentials<S: Session, C: Clock + Clone>(
    page: &LoginPage<'_, S, C>,
) -> ProbeResult<Check> {
    let domain = "@example.com";
    let email = format!("{}{domain}", "a".repeat(LONG_INPUT_LEN - domain.len()));
    let password = "p".repeat(LONG_INPUT_LEN);

    let typed_email = page.enter_email(&email)?;
    let typed_password = page.enter_password(&password)?;
    if !(typed_email.is_effective() && typed_password.is_effective()) {
        return Ok(Check::fail("long input was rejected by the form controls"));
    }

    let value = page.email_value()?;
    Ok(Check::expect(
        !value.is_empty() && email.starts_with(&value),
        format!("email field kept {} of {} characters", value.len(), email.len()),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod select_tests {
        use super::*;

        #[test]
        fn test_no_filter_selects_all_in_order() {
            assert_eq!(Scenario::select(None).unwrap(), Scenario::ALL.to_vec());
        }

        #[test]
        fn test_regex_filter() {
            let selected = Scenario::select(Some("^invalid_")).unwrap();
            assert_eq!(selected, vec![Scenario::InvalidEmail, Scenario::InvalidPassword]);

            let selected = Scenario::select(Some("password")).unwrap();
            assert_eq!(
                selected,
                vec![
                    Scenario::InvalidPassword,
                    Scenario::PasswordMasked,
                    Scenario::PasswordToggle
                ]
            );
        }

        #[test]
        fn test_bad_regex_is_invalid_argument() {
            let err = Scenario::select(Some("(")).unwrap_err();
            assert!(matches!(err, CliError::InvalidArgument { .. }));
        }

        #[test]
        fn test_names_are_unique() {
            let mut names: Vec<_> = Scenario::ALL.iter().map(|s| s.name()).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), Scenario::ALL.len());
        }
    }

    mod check_tests {
        use super::*;

        #[test]
        fn test_constructors() {
            assert!(Check::pass("ok").passed);
            assert!(!Check::fail("no").passed);
            assert!(!Check::expect(false, "no").passed);
            assert_eq!(Check::expect(true, "seen").detail, "seen");
        }

        #[test]
        fn test_noted_keeps_verdict() {
            let check = Check::fail("no error shown").noted("page degraded");
            assert!(!check.passed);
            assert_eq!(check.detail, "page degraded; no error shown");
        }

        #[test]
        fn test_needs_are_form_elements() {
            for scenario in Scenario::ALL {
                assert!(scenario.needs().iter().all(|n| FORM.contains(n)), "{scenario}");
            }
            assert!(Scenario::EyeIcon.needs().is_empty());
        }
    }

    mod degraded_tests {
        use super::*;
        use formprobe::{
            ActionabilityWaiter, LocatorCandidate, ManualClock, MockElement, MockSession,
        };

        const LOGIN_URL: &str = "https://dev-dash.janitri.in/login";
        const BLOCKED: &str = "<h1>To proceed to the login page please allow notifications</h1>";

        /// Usable login form with the permission notice that never goes away
        fn blocked_form(with_submit: bool) -> MockSession {
            let session = MockSession::new(ManualClock::new());
            session.set_url(LOGIN_URL);
            session.set_source(BLOCKED);
            session.add_element(MockElement::input(LocatorCandidate::name("email")));
            session.add_element(MockElement::password(LocatorCandidate::name("password")));
            if with_submit {
                session.add_element(MockElement::button(LocatorCandidate::xpath(
                    "//button[@type='submit']",
                )));
            }
            session
        }

        fn page(session: &MockSession) -> LoginPage<'_, MockSession, ManualClock> {
            LoginPage::with_waiter(session, ActionabilityWaiter::new(session.clock().clone()))
                .with_site("https://dev-dash.janitri.in/", "dev-dash.janitri.in")
        }

        #[test]
        fn test_unresolved_interstitial_still_fills_form() {
            let session = blocked_form(true);
            let check = Scenario::InvalidEmail
                .run(&page(&session), &Credentials::default())
                .unwrap();

            assert!(check.passed, "{check:?}");
            assert!(check.detail.starts_with("page degraded (interstitial unresolved"));
            assert!(check.detail.contains("stayed on login page: true"));
            assert_eq!(session.count_calls("send_keys:"), 2);
            assert_eq!(session.count_calls("click:"), 1);
        }

        #[test]
        fn test_missing_needed_element_stops_scenario() {
            let session = blocked_form(false);
            let check = Scenario::InvalidEmail
                .run(&page(&session), &Credentials::default())
                .unwrap();

            assert!(!check.passed);
            assert!(check.detail.starts_with("page degraded: missing submit"));
            assert_eq!(session.count_calls("send_keys:"), 0);
        }

        #[test]
        fn test_missing_unneeded_element_is_tolerated() {
            let session = blocked_form(false);
            let check = Scenario::EmailInput
                .run(&page(&session), &Credentials::default())
                .unwrap();

            assert!(check.passed, "{check:?}");
            assert!(check.detail.ends_with("email field holds \"test@example.com\""));
        }
    }
}
