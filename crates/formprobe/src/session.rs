//! Session - the driver capability consumed by the core.
//!
//! The core never opens or closes a session. It borrows one for the duration
//! of a single readiness check or action and talks to it only through these
//! two traits, so a real browser and a scripted mock are interchangeable.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  Session (trait)                                               │
//! ├───────────────────────────────────────────────────────────────┤
//! │   ┌───────────────────────┐      ┌───────────────────────┐    │
//! │   │  ChromiumSession      │      │  MockSession          │    │
//! │   │  (feature `browser`)  │      │  (unit tests)         │    │
//! │   │  CDP via chromiumoxide│      │  scripted elements    │    │
//! │   └───────────────────────┘      └───────────────────────┘    │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Calls are synchronous. Implementations must not wait implicitly inside
//! `find_element`; all waiting policy lives in the waiter.

use crate::locator::LocatorCandidate;
use crate::result::ProbeResult;

/// A live element inside a session's current document
pub trait ElementHandle {
    /// Element is rendered with a non-empty box and not hidden
    fn is_displayed(&self) -> ProbeResult<bool>;

    /// Element is not disabled
    fn is_enabled(&self) -> ProbeResult<bool>;

    /// Another element sits on top of this one at its hit-point.
    ///
    /// Drivers that cannot hit-test report `false`.
    fn is_obscured(&self) -> ProbeResult<bool> {
        Ok(false)
    }

    /// Attribute (or DOM property) value
    fn attribute(&self, name: &str) -> ProbeResult<Option<String>>;

    /// Rendered text content
    fn text(&self) -> ProbeResult<String>;

    /// Native click at the element's hit-point
    fn click(&self) -> ProbeResult<()>;

    /// Type text into the element
    fn send_keys(&self, text: &str) -> ProbeResult<()>;

    /// Clear an input's value
    fn clear(&self) -> ProbeResult<()>;
}

/// One interactive browser page
pub trait Session {
    /// Element handle type produced by this session
    type Element: ElementHandle;

    /// Navigate to a URL
    fn navigate(&self, url: &str) -> ProbeResult<()>;

    /// Reload the current page
    fn reload(&self) -> ProbeResult<()>;

    /// Current URL
    fn current_url(&self) -> ProbeResult<String>;

    /// Serialized DOM of the current page
    fn page_source(&self) -> ProbeResult<String>;

    /// Document title
    fn title(&self) -> ProbeResult<String>;

    /// First element matching `locator`, right now
    fn find_element(&self, locator: &LocatorCandidate) -> ProbeResult<Option<Self::Element>>;

    /// Every element matching `locator`, in document order
    fn find_elements(&self, locator: &LocatorCandidate) -> ProbeResult<Vec<Self::Element>>;

    /// Run a script in page context; `arguments[i]` is bound to `args[i]`
    fn execute_script(
        &self,
        script: &str,
        args: &[&Self::Element],
    ) -> ProbeResult<serde_json::Value>;
}
