//! Result and error types for formprobe.
//!
//! Expected outcomes (a selector that did not match, a cascade that ran out of
//! candidates, an interstitial that would not go away) are values, not errors.
//! `ProbeError` is reserved for faults of the session itself and for invalid input.

use thiserror::Error;

/// Result type for formprobe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur in formprobe
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The browser session is gone (process exited, connection dropped)
    #[error("Session lost: {message}")]
    SessionLost {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// An element refused the interaction (intercepted click, not interactable)
    #[error("Element interaction failed: {message}")]
    ElementInteraction {
        /// Error message
        message: String,
    },

    /// The element handle no longer refers to a node in the current document
    #[error("Stale element reference")]
    StaleElement,

    /// Script evaluation error
    #[error("Script execution failed: {message}")]
    Script {
        /// Error message
        message: String,
    },

    /// Any other driver protocol error that leaves the session usable
    #[error("Driver protocol error: {message}")]
    Protocol {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Wait timing is inconsistent
    #[error("Invalid wait spec: {message}")]
    InvalidWaitSpec {
        /// Error message
        message: String,
    },

    /// A locator set was built with no candidates
    #[error("Locator set `{target}` has no candidates")]
    EmptyLocatorSet {
        /// Logical element name
        target: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    /// Create a session-lost error
    #[must_use]
    pub fn session_lost(message: impl Into<String>) -> Self {
        Self::SessionLost {
            message: message.into(),
        }
    }

    /// Create an element interaction error
    #[must_use]
    pub fn interaction(message: impl Into<String>) -> Self {
        Self::ElementInteraction {
            message: message.into(),
        }
    }

    /// Create a protocol error
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a script error
    #[must_use]
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error ends the current readiness check or action.
    ///
    /// Only faults of the session as a whole are fatal; everything an element
    /// or a single probe can raise is recoverable.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::SessionLost { .. } | Self::BrowserLaunch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_session_faults_are_fatal() {
        assert!(ProbeError::session_lost("gone").is_fatal());
        assert!(ProbeError::BrowserLaunch {
            message: "no chromium".into()
        }
        .is_fatal());

        assert!(!ProbeError::interaction("intercepted").is_fatal());
        assert!(!ProbeError::StaleElement.is_fatal());
        assert!(!ProbeError::script("boom").is_fatal());
        assert!(!ProbeError::protocol("eof").is_fatal());
        assert!(!ProbeError::config("bad").is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = ProbeError::EmptyLocatorSet {
            target: "submit".into(),
        };
        assert_eq!(err.to_string(), "Locator set `submit` has no candidates");

        let err = ProbeError::Navigation {
            url: "https://example.com".into(),
            message: "timeout".into(),
        };
        assert!(err.to_string().contains("https://example.com"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ProbeError = io.into();
        assert!(matches!(err, ProbeError::Io(_)));
        assert!(!err.is_fatal());
    }
}
