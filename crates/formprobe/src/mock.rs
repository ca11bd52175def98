//! Scripted session for testing without a browser.
//!
//! A [`MockSession`] holds a page model (URL, title, source text and a list of
//! [`MockElement`]s) on a shared [`ManualClock`]. Elements can appear late,
//! become enabled late, sit under an overlay, refuse native clicks, and fire
//! [`PageEffect`]s when clicked, which is enough to script interstitials,
//! password toggles and intercepted login buttons. Every call is recorded.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::action::SCRIPT_CLICK;
use crate::clock::ManualClock;
use crate::locator::LocatorCandidate;
use crate::result::{ProbeError, ProbeResult};
use crate::session::{ElementHandle, Session};

/// A change to the page model triggered by an interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEffect {
    /// Replace the page source
    SetSource(String),
    /// Change the URL
    SetUrl(String),
    /// Set an attribute on every element matching `target`
    SetAttribute {
        /// Elements to change
        target: LocatorCandidate,
        /// Attribute name
        name: String,
        /// New value
        value: String,
    },
    /// Flip an attribute between two values on every element matching `target`
    ToggleAttribute {
        /// Elements to change
        target: LocatorCandidate,
        /// Attribute name
        name: String,
        /// First value
        a: String,
        /// Second value
        b: String,
    },
    /// Detach every element matching `target`
    Remove(LocatorCandidate),
    /// Show every element matching `target`
    Reveal(LocatorCandidate),
}

/// Scripted element description (builder)
#[derive(Debug, Clone)]
pub struct MockElement {
    tag: String,
    locators: Vec<LocatorCandidate>,
    attributes: Vec<(String, String)>,
    text: String,
    displayed: bool,
    enabled: bool,
    obscured: bool,
    appears_after_ms: u64,
    enabled_after_ms: u64,
    native_click_fails: bool,
    script_click_fails: bool,
    on_click: Vec<PageEffect>,
    detached: bool,
}

impl MockElement {
    /// Create a visible, enabled element matched by `locator`
    #[must_use]
    pub fn new(tag: impl Into<String>, locator: LocatorCandidate) -> Self {
        Self {
            tag: tag.into(),
            locators: vec![locator],
            attributes: Vec::new(),
            text: String::new(),
            displayed: true,
            enabled: true,
            obscured: false,
            appears_after_ms: 0,
            enabled_after_ms: 0,
            native_click_fails: false,
            script_click_fails: false,
            on_click: Vec::new(),
            detached: false,
        }
    }

    /// Text input
    #[must_use]
    pub fn input(locator: LocatorCandidate) -> Self {
        Self::new("input", locator).attr("type", "text").attr("value", "")
    }

    /// Password input
    #[must_use]
    pub fn password(locator: LocatorCandidate) -> Self {
        Self::new("input", locator)
            .attr("type", "password")
            .attr("value", "")
    }

    /// Button
    #[must_use]
    pub fn button(locator: LocatorCandidate) -> Self {
        Self::new("button", locator)
    }

    /// Also match `locator`
    #[must_use]
    pub fn also_matches(mut self, locator: LocatorCandidate) -> Self {
        self.locators.push(locator);
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.attributes.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.attributes.push((name, value));
        }
        self
    }

    /// Set text content
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Not rendered
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    /// Disabled
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Covered by another element at its hit-point
    #[must_use]
    pub fn obscured(mut self) -> Self {
        self.obscured = true;
        self
    }

    /// Attach to the DOM only once the clock reaches `ms`
    #[must_use]
    pub fn appears_after_ms(mut self, ms: u64) -> Self {
        self.appears_after_ms = ms;
        self
    }

    /// Report disabled until the clock reaches `ms`
    #[must_use]
    pub fn enabled_after_ms(mut self, ms: u64) -> Self {
        self.enabled_after_ms = ms;
        self
    }

    /// Native clicks raise an interception error
    #[must_use]
    pub fn click_intercepted(mut self) -> Self {
        self.native_click_fails = true;
        self
    }

    /// Script-dispatched clicks raise as well
    #[must_use]
    pub fn script_click_fails(mut self) -> Self {
        self.script_click_fails = true;
        self
    }

    /// Apply `effect` whenever the element is clicked (natively or by script)
    #[must_use]
    pub fn on_click(mut self, effect: PageEffect) -> Self {
        self.on_click.push(effect);
        self
    }

    fn matches(&self, locator: &LocatorCandidate) -> bool {
        self.locators.iter().any(|l| l == locator)
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug)]
struct PageModel {
    url: String,
    title: String,
    source: String,
    elements: Vec<MockElement>,
    lookup_errors: VecDeque<ProbeError>,
    on_submit: Vec<PageEffect>,
    disconnected: bool,
    history: Vec<String>,
}

impl PageModel {
    fn attached(&self, index: usize, now_ms: u64) -> bool {
        self.elements
            .get(index)
            .is_some_and(|e| !e.detached && now_ms >= e.appears_after_ms)
    }

    fn apply(&mut self, effects: &[PageEffect]) {
        for effect in effects {
            match effect {
                PageEffect::SetSource(source) => self.source.clone_from(source),
                PageEffect::SetUrl(url) => self.url.clone_from(url),
                PageEffect::SetAttribute {
                    target,
                    name,
                    value,
                } => {
                    for element in self.elements.iter_mut().filter(|e| e.matches(target)) {
                        *element = element.clone().attr(name.clone(), value.clone());
                    }
                }
                PageEffect::ToggleAttribute { target, name, a, b } => {
                    for element in self.elements.iter_mut().filter(|e| e.matches(target)) {
                        let next = if element.attribute(name) == Some(a.as_str()) {
                            b.clone()
                        } else {
                            a.clone()
                        };
                        *element = element.clone().attr(name.clone(), next);
                    }
                }
                PageEffect::Remove(target) => {
                    for element in self.elements.iter_mut().filter(|e| e.matches(target)) {
                        element.detached = true;
                    }
                }
                PageEffect::Reveal(target) => {
                    for element in self.elements.iter_mut().filter(|e| e.matches(target)) {
                        element.displayed = true;
                    }
                }
            }
        }
    }
}

/// Scripted in-memory session
#[derive(Debug, Clone)]
pub struct MockSession {
    clock: ManualClock,
    page: Arc<Mutex<PageModel>>,
}

impl MockSession {
    /// Create an empty page at `about:blank` on `clock`
    #[must_use]
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            page: Arc::new(Mutex::new(PageModel {
                url: "about:blank".to_string(),
                title: String::new(),
                source: String::new(),
                elements: Vec::new(),
                lookup_errors: VecDeque::new(),
                on_submit: Vec::new(),
                disconnected: false,
                history: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PageModel> {
        self.page.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn guard(&self) -> ProbeResult<MutexGuard<'_, PageModel>> {
        let page = self.lock();
        if page.disconnected {
            return Err(ProbeError::session_lost("mock session disconnected"));
        }
        Ok(page)
    }

    /// Clock shared with the session
    #[must_use]
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Add an element to the page
    pub fn add_element(&self, element: MockElement) {
        self.lock().elements.push(element);
    }

    /// Set the page source
    pub fn set_source(&self, source: impl Into<String>) {
        self.lock().source = source.into();
    }

    /// Set the URL without recording a navigation
    pub fn set_url(&self, url: impl Into<String>) {
        self.lock().url = url.into();
    }

    /// Set the title
    pub fn set_title(&self, title: impl Into<String>) {
        self.lock().title = title.into();
    }

    /// Apply `effect` when Enter is pressed in any field
    pub fn on_submit(&self, effect: PageEffect) {
        self.lock().on_submit.push(effect);
    }

    /// Make the next `find_element` / `find_elements` call fail with `error`
    pub fn fail_next_lookup(&self, error: ProbeError) {
        self.lock().lookup_errors.push_back(error);
    }

    /// Simulate the browser going away; every later call is fatal
    pub fn disconnect(&self) {
        self.lock().disconnected = true;
    }

    /// Apply effects directly (e.g., to model the page changing by itself)
    pub fn apply(&self, effects: &[PageEffect]) {
        self.lock().apply(effects);
    }

    /// Call history for verification
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    /// Check if a call with the given prefix was made
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.lock().history.iter().any(|c| c.starts_with(prefix))
    }

    /// Number of calls with the given prefix
    #[must_use]
    pub fn count_calls(&self, prefix: &str) -> usize {
        self.lock()
            .history
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Current value of an attribute on the first element matching `locator`
    #[must_use]
    pub fn attribute_of(&self, locator: &LocatorCandidate, name: &str) -> Option<String> {
        self.lock()
            .elements
            .iter()
            .find(|e| e.matches(locator))
            .and_then(|e| e.attribute(name).map(str::to_string))
    }

    fn handle(&self, index: usize, matched: &LocatorCandidate) -> MockElementRef {
        MockElementRef {
            index,
            label: matched.to_string(),
            clock: self.clock.clone(),
            page: Arc::clone(&self.page),
        }
    }

    fn lookup(&self, locator: &LocatorCandidate, all: bool) -> ProbeResult<Vec<MockElementRef>> {
        let mut page = self.guard()?;
        page.history.push(format!("find:{locator}"));
        if let Some(error) = page.lookup_errors.pop_front() {
            return Err(error);
        }
        let now = self.clock.now_ms();
        let indices: Vec<usize> = (0..page.elements.len())
            .filter(|&i| page.elements[i].matches(locator) && page.attached(i, now))
            .take(if all { usize::MAX } else { 1 })
            .collect();
        drop(page);
        Ok(indices.into_iter().map(|i| self.handle(i, locator)).collect())
    }
}

impl Session for MockSession {
    type Element = MockElementRef;

    fn navigate(&self, url: &str) -> ProbeResult<()> {
        let mut page = self.guard()?;
        page.history.push(format!("navigate:{url}"));
        page.url = url.to_string();
        Ok(())
    }

    fn reload(&self) -> ProbeResult<()> {
        let mut page = self.guard()?;
        page.history.push("reload".to_string());
        for element in &mut page.elements {
            if element.attribute("value").is_some() {
                *element = element.clone().attr("value", "");
            }
        }
        Ok(())
    }

    fn current_url(&self) -> ProbeResult<String> {
        Ok(self.guard()?.url.clone())
    }

    fn page_source(&self) -> ProbeResult<String> {
        let mut page = self.guard()?;
        page.history.push("page_source".to_string());
        Ok(page.source.clone())
    }

    fn title(&self) -> ProbeResult<String> {
        Ok(self.guard()?.title.clone())
    }

    fn find_element(&self, locator: &LocatorCandidate) -> ProbeResult<Option<MockElementRef>> {
        Ok(self.lookup(locator, false)?.into_iter().next())
    }

    fn find_elements(&self, locator: &LocatorCandidate) -> ProbeResult<Vec<MockElementRef>> {
        self.lookup(locator, true)
    }

    fn execute_script(
        &self,
        script: &str,
        args: &[&MockElementRef],
    ) -> ProbeResult<serde_json::Value> {
        {
            let mut page = self.guard()?;
            page.history.push(format!("script:{script}"));
        }
        match (script, args.first()) {
            (SCRIPT_CLICK, Some(element)) => {
                element.script_click()?;
                Ok(serde_json::Value::Null)
            }
            _ => Ok(serde_json::Value::Null),
        }
    }
}

/// Handle to a [`MockElement`] inside a [`MockSession`]
#[derive(Debug, Clone)]
pub struct MockElementRef {
    index: usize,
    label: String,
    clock: ManualClock,
    page: Arc<Mutex<PageModel>>,
}

impl MockElementRef {
    fn with_element<T>(&self, f: impl FnOnce(&MockElement, u64) -> T) -> ProbeResult<T> {
        let page = self.page.lock().unwrap_or_else(PoisonError::into_inner);
        if page.disconnected {
            return Err(ProbeError::session_lost("mock session disconnected"));
        }
        let now = self.clock.now_ms();
        if !page.attached(self.index, now) {
            return Err(ProbeError::StaleElement);
        }
        Ok(f(&page.elements[self.index], now))
    }

    fn interact(
        &self,
        call: &str,
        f: impl FnOnce(&mut PageModel, usize) -> ProbeResult<()>,
    ) -> ProbeResult<()> {
        let mut page = self.page.lock().unwrap_or_else(PoisonError::into_inner);
        if page.disconnected {
            return Err(ProbeError::session_lost("mock session disconnected"));
        }
        page.history.push(format!("{call}:{}", self.label));
        if !page.attached(self.index, self.clock.now_ms()) {
            return Err(ProbeError::StaleElement);
        }
        f(&mut page, self.index)
    }

    fn script_click(&self) -> ProbeResult<()> {
        self.interact("script_click", |page, i| {
            if page.elements[i].script_click_fails {
                return Err(ProbeError::script("click dispatch failed"));
            }
            let effects = page.elements[i].on_click.clone();
            page.apply(&effects);
            Ok(())
        })
    }
}

impl ElementHandle for MockElementRef {
    fn is_displayed(&self) -> ProbeResult<bool> {
        self.with_element(|e, _| e.displayed)
    }

    fn is_enabled(&self) -> ProbeResult<bool> {
        self.with_element(|e, now| e.enabled && now >= e.enabled_after_ms)
    }

    fn is_obscured(&self) -> ProbeResult<bool> {
        self.with_element(|e, _| e.obscured)
    }

    fn attribute(&self, name: &str) -> ProbeResult<Option<String>> {
        self.with_element(|e, _| e.attribute(name).map(str::to_string))
    }

    fn text(&self) -> ProbeResult<String> {
        self.with_element(|e, _| e.text.clone())
    }

    fn click(&self) -> ProbeResult<()> {
        self.interact("click", |page, i| {
            let element = &page.elements[i];
            if element.native_click_fails || element.obscured {
                return Err(ProbeError::interaction(format!(
                    "element click intercepted: <{}> is not clickable at point, other element would receive the click",
                    element.tag
                )));
            }
            let effects = element.on_click.clone();
            page.apply(&effects);
            Ok(())
        })
    }

    fn send_keys(&self, text: &str) -> ProbeResult<()> {
        self.interact("send_keys", |page, i| {
            if let Some(typed) = text.strip_suffix('\n') {
                append_value(&mut page.elements[i], typed);
                let effects = page.on_submit.clone();
                page.apply(&effects);
            } else {
                append_value(&mut page.elements[i], text);
            }
            Ok(())
        })
    }

    fn clear(&self) -> ProbeResult<()> {
        self.interact("clear", |page, i| {
            page.elements[i] = page.elements[i].clone().attr("value", "");
            Ok(())
        })
    }
}

fn append_value(element: &mut MockElement, text: &str) {
    if text.is_empty() {
        return;
    }
    let value = format!("{}{text}", element.attribute("value").unwrap_or_default());
    *element = element.clone().attr("value", value);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn session() -> MockSession {
        MockSession::new(ManualClock::new())
    }

    #[test]
    fn test_find_respects_appearance_time() {
        let s = session();
        let email = LocatorCandidate::name("email");
        s.add_element(MockElement::input(email.clone()).appears_after_ms(100));

        assert!(s.find_element(&email).unwrap().is_none());
        s.clock().advance_ms(100);
        assert!(s.find_element(&email).unwrap().is_some());
    }

    #[test]
    fn test_send_keys_and_clear() {
        let s = session();
        let email = LocatorCandidate::name("email");
        s.add_element(MockElement::input(email.clone()));

        let el = s.find_element(&email).unwrap().unwrap();
        el.send_keys("a@b.c").unwrap();
        assert_eq!(el.attribute("value").unwrap().as_deref(), Some("a@b.c"));
        el.clear().unwrap();
        assert_eq!(el.attribute("value").unwrap().as_deref(), Some(""));
    }

    #[test]
    fn test_enter_triggers_submit_effects() {
        let s = session();
        let pw = LocatorCandidate::name("password");
        s.add_element(MockElement::password(pw.clone()));
        s.on_submit(PageEffect::SetUrl("https://app/dashboard".into()));

        let el = s.find_element(&pw).unwrap().unwrap();
        el.send_keys("\n").unwrap();
        assert_eq!(s.current_url().unwrap(), "https://app/dashboard");
        assert_eq!(el.attribute("value").unwrap().as_deref(), Some(""));
    }

    #[test]
    fn test_click_effects_and_history() {
        let s = session();
        let toggle = LocatorCandidate::css(".eye");
        let pw = LocatorCandidate::name("password");
        s.add_element(MockElement::password(pw.clone()));
        s.add_element(MockElement::button(toggle.clone()).on_click(PageEffect::ToggleAttribute {
            target: pw.clone(),
            name: "type".into(),
            a: "password".into(),
            b: "text".into(),
        }));

        s.find_element(&toggle).unwrap().unwrap().click().unwrap();
        assert_eq!(s.attribute_of(&pw, "type").as_deref(), Some("text"));
        assert_eq!(s.count_calls("click:css=.eye"), 1);
    }

    #[test]
    fn test_intercepted_click_but_script_click_works() {
        let s = session();
        let submit = LocatorCandidate::tag("button");
        s.add_element(
            MockElement::button(submit.clone())
                .click_intercepted()
                .on_click(PageEffect::SetUrl("https://app/home".into())),
        );

        let el = s.find_element(&submit).unwrap().unwrap();
        assert!(matches!(el.click(), Err(ProbeError::ElementInteraction { .. })));
        s.execute_script("arguments[0].click();", &[&el]).unwrap();
        assert_eq!(s.current_url().unwrap(), "https://app/home");
        assert_eq!(s.count_calls("script_click:"), 1);
    }

    #[test]
    fn test_removed_element_is_stale() {
        let s = session();
        let allow = LocatorCandidate::xpath("//button[contains(text(), 'Allow')]");
        s.add_element(MockElement::button(allow.clone()).on_click(PageEffect::Remove(allow.clone())));

        let el = s.find_element(&allow).unwrap().unwrap();
        el.click().unwrap();
        assert!(matches!(el.is_displayed(), Err(ProbeError::StaleElement)));
        assert!(s.find_element(&allow).unwrap().is_none());
    }

    #[test]
    fn test_reload_clears_values() {
        let s = session();
        let email = LocatorCandidate::name("email");
        s.add_element(MockElement::input(email.clone()));
        s.find_element(&email).unwrap().unwrap().send_keys("x").unwrap();

        s.reload().unwrap();
        assert_eq!(s.attribute_of(&email, "value").as_deref(), Some(""));
        assert!(s.was_called("reload"));
    }

    #[test]
    fn test_disconnect_is_fatal() {
        let s = session();
        s.disconnect();
        let err = s.page_source().unwrap_err();
        assert!(err.is_fatal());
    }
}
