//! formprobe: resilient element resolution and page readiness for login forms
//! you do not control.
//!
//! A logical element ("the login button") is described by an ordered
//! [`LocatorSet`]. The [`SelectorCascade`] tries each candidate with the
//! [`ActionabilityWaiter`], the [`InterstitialHandler`] clicks through a
//! permission notice that hides the form, the [`ActionExecutor`] falls back to
//! a scripted click when a native one is intercepted, and the
//! [`PageReadinessOrchestrator`] turns all of it into one verdict.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    FORMPROBE Architecture                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐        │
//! │   │ Readiness    │──►│ Interstitial │──►│ Cascade      │        │
//! │   │ Orchestrator │   │ Handler      │   │ (per element)│        │
//! │   └──────────────┘   └──────────────┘   └──────┬───────┘        │
//! │                                                ▼                │
//! │   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐        │
//! │   │ Action       │   │ Session      │◄──│ Waiter       │        │
//! │   │ Executor     │──►│ (trait)      │   │ (Clock)      │        │
//! │   └──────────────┘   └──────────────┘   └──────────────┘        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every wait runs on a [`Clock`]; tests use [`ManualClock`] with the scripted
//! [`MockSession`], so timing properties are checked on virtual time.

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

#[allow(clippy::missing_errors_doc)]
mod action;
#[cfg(feature = "browser")]
pub mod browser;
#[allow(clippy::missing_errors_doc)]
mod cascade;
mod clock;
#[allow(clippy::missing_errors_doc)]
mod config;
#[allow(clippy::missing_errors_doc)]
mod interstitial;
mod locator;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod login;
#[allow(clippy::missing_errors_doc)]
mod readiness;
mod result;
mod session;
#[allow(clippy::missing_errors_doc)]
mod wait;

/// Scripted session for tests without a browser
///
/// Elements appear, enable and react to clicks on a shared virtual clock.
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod mock;

pub use action::{Action, ActionExecutor, ActionOutcome, ActionResult, SCRIPT_CLICK};
#[cfg(feature = "browser")]
pub use browser::{ChromiumElement, ChromiumSession};
pub use cascade::{CascadeExhausted, Resolution, SelectorCascade};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    BrowserConfig, Credentials, ProbeConfig, WaitConfig, DEFAULT_CONFIG_FILE, ENV_BASE_URL,
    ENV_CHROMIUM_PATH, ENV_EMAIL, ENV_HEADLESS, ENV_PASSWORD,
};
pub use interstitial::{
    DismissalReport, InterstitialConfig, InterstitialHandler, InterstitialOutcome,
    InterstitialState, DEFAULT_MARKERS, DEFAULT_SETTLE_MS,
};
pub use locator::{LocatorCandidate, LocatorSet, Strategy};
pub use login::{
    ErrorText, LoginLocators, LoginPage, ERROR_TIMEOUT_MS, GENERIC_ERROR_XPATH,
    GENERIC_SCAN_DELAY_MS, VALIDATION_TIMEOUT_MS,
};
pub use mock::{MockElement, MockElementRef, MockSession, PageEffect};
pub use readiness::{PageReadinessOrchestrator, PageState, ReadinessReport};
pub use result::{ProbeError, ProbeResult};
pub use session::{ElementHandle, Session};
pub use wait::{
    ActionabilityWaiter, NotFound, Predicate, ResolvedElement, WaitSpec, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_TIMEOUT_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::action::*;
    pub use super::cascade::*;
    pub use super::clock::*;
    pub use super::interstitial::*;
    pub use super::locator::*;
    pub use super::login::*;
    pub use super::readiness::*;
    pub use super::result::*;
    pub use super::session::*;
    pub use super::wait::*;
}
