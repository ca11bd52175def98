//! Scenario runner: a fresh session per scenario

use std::time::{Duration, Instant};

use formprobe::{ActionabilityWaiter, Clock, LoginPage, ProbeConfig, ProbeResult, Session};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::Reporter;
use crate::scenarios::{Check, Scenario};

/// Opens sessions positioned on the login page
pub trait SessionFactory {
    /// Session type
    type Session: Session;
    /// Clock the session's waits run on
    type Clock: Clock + Clone;

    /// Open a new session on the login page
    fn open(&mut self) -> ProbeResult<Self::Session>;

    /// Waiter to use with `session`
    fn waiter(&self, session: &Self::Session) -> ActionabilityWaiter<Self::Clock>;

    /// Release `session`
    fn close(&mut self, session: Self::Session) -> ProbeResult<()> {
        drop(session);
        Ok(())
    }
}

/// Result of one scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario that ran
    pub scenario: Scenario,
    /// Whether it passed
    pub passed: bool,
    /// What was observed, or the error
    pub detail: String,
    /// Wall time
    pub duration: Duration,
}

impl ScenarioResult {
    fn from_check(scenario: Scenario, check: Check, duration: Duration) -> Self {
        Self {
            scenario,
            passed: check.passed,
            detail: check.detail,
            duration,
        }
    }
}

/// Aggregated scenario results
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioResults {
    /// Individual results, in run order
    pub results: Vec<ScenarioResult>,
    /// Total duration
    pub duration: Duration,
}

impl ScenarioResults {
    /// Number of passed scenarios
    #[must_use]
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    /// Number of failed scenarios
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }

    /// Number of scenarios run
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Check if every scenario passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    /// Failed scenarios
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioResult> {
        self.results.iter().filter(|r| !r.passed).collect()
    }
}

/// Runs scenarios one after another, each in its own session
#[derive(Debug)]
pub struct ScenarioRunner {
    config: CliConfig,
    probe: ProbeConfig,
    reporter: Reporter,
}

impl ScenarioRunner {
    /// Create a runner
    #[must_use]
    pub fn new(config: CliConfig, probe: ProbeConfig) -> Self {
        let reporter = Reporter::new(config.color.should_color(), config.verbosity.is_quiet());
        Self {
            config,
            probe,
            reporter,
        }
    }

    /// Run `scenarios` in order; stops at the first failure with fail-fast
    pub fn run<F: SessionFactory>(
        &mut self,
        factory: &mut F,
        scenarios: &[Scenario],
    ) -> CliResult<ScenarioResults> {
        // fail early on a bad locator override or wait timing
        self.probe.login_locators()?;
        self.probe.wait_spec()?;

        let start = Instant::now();
        let mut results = ScenarioResults::default();

        if scenarios.is_empty() {
            self.reporter.warning("No scenarios match the filter");
            return Ok(results);
        }

        self.reporter.header("Login scenarios");
        self.reporter.start_progress(scenarios.len() as u64, "starting");

        for &scenario in scenarios {
            self.reporter.set_message(scenario.name());
            let result = self.run_one(factory, scenario);

            if result.passed {
                self.reporter
                    .success(&format!("{}: {}", scenario.name(), result.detail));
            } else {
                self.reporter
                    .failure(&format!("{}: {}", scenario.name(), result.detail));
            }
            self.reporter.increment();

            let stop = !result.passed && self.config.fail_fast;
            results.results.push(result);
            if stop {
                warn!(scenario = scenario.name(), "stopping at first failure");
                break;
            }
        }

        self.reporter.finish();
        results.duration = start.elapsed();
        self.reporter
            .summary(results.passed(), results.failed(), results.duration);
        Ok(results)
    }

    fn run_one<F: SessionFactory>(&self, factory: &mut F, scenario: Scenario) -> ScenarioResult {
        let start = Instant::now();
        info!(scenario = scenario.name(), "running");

        let outcome = match factory.open() {
            Ok(session) => {
                let check = self.check(factory, &session, scenario);
                let closed = factory.close(session);
                check.and_then(|check| closed.map(|()| check))
            }
            Err(e) => Err(e),
        };

        let check = outcome.unwrap_or_else(|e| Check::fail(e.to_string()));
        ScenarioResult::from_check(scenario, check, start.elapsed())
    }

    fn check<F: SessionFactory>(
        &self,
        factory: &F,
        session: &F::Session,
        scenario: Scenario,
    ) -> ProbeResult<Check> {
        let page = LoginPage::with_waiter(session, factory.waiter(session))
            .with_locators(self.probe.login_locators()?)
            .with_interstitial(self.probe.interstitial.clone())
            .with_wait_spec(self.probe.wait_spec()?)
            .with_site(&self.probe.base_url, &self.probe.login_host);
        scenario.run(&page, &self.probe.credentials)
    }
}

/// `session` on `url`; when navigation fails the session is released with
/// `close` and the navigation error returned
pub fn navigated<S: Session>(
    session: S,
    url: &str,
    close: impl FnOnce(S) -> ProbeResult<()>,
) -> ProbeResult<S> {
    match session.navigate(url) {
        Ok(()) => Ok(session),
        Err(e) => {
            if let Err(close_err) = close(session) {
                warn!(error = %close_err, "closing session after failed navigation");
            }
            Err(e)
        }
    }
}

/// Launches a Chromium session per scenario
#[cfg(feature = "browser")]
#[derive(Debug)]
pub struct ChromiumFactory {
    probe: ProbeConfig,
}

#[cfg(feature = "browser")]
impl ChromiumFactory {
    /// Factory opening `probe.base_url` with `probe.browser`
    #[must_use]
    pub const fn new(probe: ProbeConfig) -> Self {
        Self { probe }
    }
}

#[cfg(feature = "browser")]
impl SessionFactory for ChromiumFactory {
    type Session = formprobe::ChromiumSession;
    type Clock = formprobe::SystemClock;

    fn open(&mut self) -> ProbeResult<Self::Session> {
        let session = formprobe::ChromiumSession::launch(self.probe.browser.clone())?;
        navigated(session, &self.probe.base_url, formprobe::ChromiumSession::close)
    }

    fn waiter(&self, _session: &Self::Session) -> ActionabilityWaiter<Self::Clock> {
        ActionabilityWaiter::default()
    }

    fn close(&mut self, session: Self::Session) -> ProbeResult<()> {
        session.close()
    }
}
