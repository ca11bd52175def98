//! Chromium session over CDP (feature `browser`).
//!
//! chromiumoxide is async; the core is not. [`ChromiumSession`] owns a private
//! current-thread Tokio runtime and blocks on each CDP call, so every
//! [`Session`] method is an ordinary synchronous call. The CDP handler task
//! only makes progress while a call is in flight, which is all a polling
//! waiter needs.

#![allow(
    clippy::significant_drop_tightening,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions
)]

use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use crate::config::BrowserConfig;
use crate::locator::{LocatorCandidate, Strategy};
use crate::result::{ProbeError, ProbeResult};
use crate::session::{ElementHandle, Session};

const IS_DISPLAYED: &str = "function() { \
    const r = this.getBoundingClientRect(); const s = window.getComputedStyle(this); \
    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; }";

const IS_ENABLED: &str = "function() { return !this.disabled; }";

const IS_OBSCURED: &str = "function() { \
    this.scrollIntoView({ block: 'center', inline: 'center' }); \
    const r = this.getBoundingClientRect(); \
    const hit = document.elementFromPoint(r.left + r.width / 2, r.top + r.height / 2); \
    return !(hit && (hit === this || this.contains(hit))); }";

const CLEAR: &str = "function() { \
    this.focus(); this.value = ''; \
    this.dispatchEvent(new Event('input', { bubbles: true })); \
    this.dispatchEvent(new Event('change', { bubbles: true })); }";

/// Map a CDP error; transport failures end the session
fn cdp_error(e: CdpError) -> ProbeError {
    match e {
        CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
            ProbeError::session_lost(e.to_string())
        }
        other => ProbeError::protocol(other.to_string()),
    }
}

/// Browser session driving one Chromium page
#[derive(Debug)]
pub struct ChromiumSession {
    runtime: Arc<Runtime>,
    browser: Browser,
    page: Page,
    handler: tokio::task::JoinHandle<()>,
    config: BrowserConfig,
}

impl ChromiumSession {
    /// Launch Chromium and open a blank page
    pub fn launch(config: BrowserConfig) -> ProbeResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let mut builder = CdpConfig::builder()
            .request_timeout(Duration::from_millis(config.page_load_timeout_ms))
            .args(config.args.clone());
        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder
            .build()
            .map_err(|message| ProbeError::BrowserLaunch { message })?;

        let (browser, page, handler) = runtime.block_on(async {
            let (browser, mut handler) =
                Browser::launch(cdp_config)
                    .await
                    .map_err(|e| ProbeError::BrowserLaunch {
                        message: e.to_string(),
                    })?;
            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| ProbeError::BrowserLaunch {
                    message: e.to_string(),
                })?;
            Ok::<_, ProbeError>((browser, page, handler))
        })?;

        info!(headless = config.headless, "chromium launched");
        Ok(Self {
            runtime: Arc::new(runtime),
            browser,
            page,
            handler,
            config,
        })
    }

    /// Launch settings
    #[must_use]
    pub const fn config(&self) -> &BrowserConfig {
        &self.config
    }

    /// Close the browser
    pub fn close(mut self) -> ProbeResult<()> {
        let result = self.runtime.block_on(self.browser.close());
        self.handler.abort();
        result.map(|_| ()).map_err(cdp_error)
    }

    fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    fn wrap(&self, element: Element) -> ChromiumElement {
        ChromiumElement {
            runtime: Arc::clone(&self.runtime),
            element,
        }
    }

    fn lookup(&self, locator: &LocatorCandidate) -> ProbeResult<Vec<Element>> {
        let page = &self.page;
        self.block_on(async {
            match (locator.strategy, locator.to_css()) {
                (Strategy::ByXPath, _) | (_, None) => page.find_xpaths(&locator.expression).await,
                (_, Some(css)) => page.find_elements(css).await,
            }
        })
        .map_err(cdp_error)
    }
}

impl Session for ChromiumSession {
    type Element = ChromiumElement;

    fn navigate(&self, url: &str) -> ProbeResult<()> {
        debug!(url, "navigating");
        self.block_on(self.page.goto(url))
            .map(|_| ())
            .map_err(|e| match cdp_error(e) {
                fatal @ ProbeError::SessionLost { .. } => fatal,
                other => ProbeError::Navigation {
                    url: url.to_string(),
                    message: other.to_string(),
                },
            })
    }

    fn reload(&self) -> ProbeResult<()> {
        self.block_on(self.page.reload())
            .map(|_| ())
            .map_err(cdp_error)
    }

    fn current_url(&self) -> ProbeResult<String> {
        Ok(self
            .block_on(self.page.url())
            .map_err(cdp_error)?
            .unwrap_or_default())
    }

    fn page_source(&self) -> ProbeResult<String> {
        self.block_on(self.page.content()).map_err(cdp_error)
    }

    fn title(&self) -> ProbeResult<String> {
        Ok(self
            .block_on(self.page.get_title())
            .map_err(cdp_error)?
            .unwrap_or_default())
    }

    fn find_element(&self, locator: &LocatorCandidate) -> ProbeResult<Option<ChromiumElement>> {
        Ok(self
            .lookup(locator)?
            .into_iter()
            .next()
            .map(|e| self.wrap(e)))
    }

    fn find_elements(&self, locator: &LocatorCandidate) -> ProbeResult<Vec<ChromiumElement>> {
        Ok(self
            .lookup(locator)?
            .into_iter()
            .map(|e| self.wrap(e))
            .collect())
    }

    fn execute_script(
        &self,
        script: &str,
        args: &[&ChromiumElement],
    ) -> ProbeResult<serde_json::Value> {
        match args {
            [] => {
                let wrapped = format!("(function() {{ {script} }})()");
                let result = self
                    .block_on(self.page.evaluate(wrapped))
                    .map_err(cdp_error)?;
                Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
            }
            [element] => {
                let wrapped = format!(
                    "function() {{ return (function() {{ {script} }}).apply(null, [this]); }}"
                );
                element.call(&wrapped)
            }
            _ => Err(ProbeError::script(
                "only one element argument is supported",
            )),
        }
    }
}

/// Element handle inside a [`ChromiumSession`]
#[derive(Debug)]
pub struct ChromiumElement {
    runtime: Arc<Runtime>,
    element: Element,
}

impl ChromiumElement {
    fn call(&self, function: &str) -> ProbeResult<serde_json::Value> {
        let returns = self
            .runtime
            .block_on(self.element.call_js_fn(function, false))
            .map_err(cdp_error)?;
        if let Some(exception) = returns.exception_details {
            return Err(ProbeError::script(exception.text));
        }
        Ok(returns.result.value.unwrap_or(serde_json::Value::Null))
    }

    fn call_bool(&self, function: &str) -> ProbeResult<bool> {
        Ok(self.call(function)?.as_bool().unwrap_or(false))
    }
}

impl ElementHandle for ChromiumElement {
    fn is_displayed(&self) -> ProbeResult<bool> {
        self.call_bool(IS_DISPLAYED)
    }

    fn is_enabled(&self) -> ProbeResult<bool> {
        self.call_bool(IS_ENABLED)
    }

    fn is_obscured(&self) -> ProbeResult<bool> {
        self.call_bool(IS_OBSCURED)
    }

    /// Live DOM property when there is one (`value`, `type`), else the attribute
    fn attribute(&self, name: &str) -> ProbeResult<Option<String>> {
        let name = serde_json::to_string(name).map_err(|e| ProbeError::script(e.to_string()))?;
        let function = format!(
            "function() {{ const n = {name}; \
             const v = (n in this && typeof this[n] !== 'object' && typeof this[n] !== 'function') \
               ? String(this[n]) : this.getAttribute(n); \
             return v; }}"
        );
        Ok(match self.call(&function)? {
            serde_json::Value::String(s) => Some(s),
            _ => None,
        })
    }

    fn text(&self) -> ProbeResult<String> {
        Ok(self
            .runtime
            .block_on(self.element.inner_text())
            .map_err(cdp_error)?
            .unwrap_or_default())
    }

    /// CDP dispatches the mouse event wherever the element is; an overlay
    /// would swallow it silently, so the hit-point is checked first.
    fn click(&self) -> ProbeResult<()> {
        if self.is_obscured()? {
            return Err(ProbeError::interaction(
                "element click intercepted: another element would receive the click",
            ));
        }
        self.runtime
            .block_on(self.element.click())
            .map(|_| ())
            .map_err(cdp_error)
    }

    fn send_keys(&self, text: &str) -> ProbeResult<()> {
        let (typed, enter) = match text.strip_suffix('\n') {
            Some(typed) => (typed, true),
            None => (text, false),
        };
        self.runtime
            .block_on(async {
                if !typed.is_empty() {
                    self.element.type_str(typed).await?;
                }
                if enter {
                    self.element.press_key("Enter").await?;
                }
                Ok::<_, CdpError>(())
            })
            .map_err(cdp_error)
    }

    fn clear(&self) -> ProbeResult<()> {
        self.call(CLEAR).map(|_| ())
    }
}
