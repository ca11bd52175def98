//! Subcommand handlers

use std::path::Path;

use formprobe::{
    ActionabilityWaiter, Clock, LoginPage, ProbeConfig, ProbeResult, ReadinessReport, Session,
};
use tracing::warn;

use crate::commands::{CheckArgs, ConfigArgs, ConfigFormat, RunArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::Reporter;
use crate::runner::{ScenarioResults, ScenarioRunner, SessionFactory};
use crate::scenarios::Scenario;

/// Effective probe configuration: defaults, file, environment
pub fn load_probe_config(path: Option<&Path>) -> CliResult<ProbeConfig> {
    Ok(ProbeConfig::load(path)?)
}

// =============================================================================
// config
// =============================================================================

/// Render `probe` in `format`
pub fn render_config(probe: &ProbeConfig, format: ConfigFormat) -> CliResult<String> {
    match format {
        ConfigFormat::Yaml => Ok(probe.to_yaml()?),
        ConfigFormat::Json => serde_json::to_string_pretty(probe)
            .map_err(|e| CliError::config(format!("cannot render config: {e}"))),
    }
}

/// Print the effective configuration
pub fn execute_config(probe: &ProbeConfig, args: &ConfigArgs) -> CliResult<()> {
    println!("{}", render_config(probe, args.format)?);
    Ok(())
}

// =============================================================================
// check
// =============================================================================

/// `probe` with the `check` overrides applied and re-validated
pub fn apply_check_overrides(probe: ProbeConfig, args: &CheckArgs) -> CliResult<ProbeConfig> {
    let mut probe = probe;
    if let Some(ref url) = args.url {
        probe = probe.with_base_url(url.clone());
    }
    if let Some(timeout_ms) = args.timeout_ms {
        let poll_interval_ms = probe.wait.poll_interval_ms;
        probe = probe.with_wait(timeout_ms, poll_interval_ms);
    }
    probe.validate()?;
    Ok(probe)
}

/// Readiness verdict for the login form on `session`
pub fn check_page<S: Session, C: Clock + Clone>(
    session: &S,
    waiter: ActionabilityWaiter<C>,
    probe: &ProbeConfig,
) -> ProbeResult<ReadinessReport<S::Element>> {
    LoginPage::with_waiter(session, waiter)
        .with_locators(probe.login_locators()?)
        .with_interstitial(probe.interstitial.clone())
        .with_wait_spec(probe.wait_spec()?)
        .with_site(&probe.base_url, &probe.login_host)
        .wait_for_page_load()
}

/// Navigate to `probe.base_url` and check readiness, then release the
/// session with `close`. A close error is logged; it never replaces the
/// verdict.
pub fn check_and_close<S: Session, C: Clock + Clone>(
    session: S,
    waiter: ActionabilityWaiter<C>,
    probe: &ProbeConfig,
    close: impl FnOnce(S) -> ProbeResult<()>,
) -> ProbeResult<ReadinessReport<S::Element>> {
    let report = session
        .navigate(&probe.base_url)
        .and_then(|()| check_page(&session, waiter, probe));
    if let Err(e) = close(session) {
        warn!(error = %e, "closing session");
    }
    report
}

/// Print `report`; `Degraded` becomes an error carrying the reasons
pub fn report_readiness<E>(reporter: &Reporter, report: &ReadinessReport<E>) -> CliResult<()> {
    reporter.header("Readiness");
    if report.interstitial.was_present() {
        reporter.warning(&format!("interstitial: {}", report.interstitial.state()));
    }
    for (name, element) in &report.resolved {
        reporter.success(&format!(
            "{name}: {} ({}ms)",
            element.locator(),
            element.elapsed().as_millis()
        ));
    }
    for missing in &report.missing {
        reporter.failure(&format!("{}: {}", missing.target, missing.summary()));
    }

    let verdict = format!(
        "page {} in {:.2}s",
        report.state,
        report.elapsed.as_secs_f64()
    );
    if report.is_ready() {
        reporter.info(&verdict);
        Ok(())
    } else {
        reporter.failure(&verdict);
        Err(CliError::Degraded {
            reasons: report.reasons.clone(),
        })
    }
}

/// Launch Chromium, open the page and report readiness
#[cfg(feature = "browser")]
pub fn execute_check(config: &CliConfig, probe: ProbeConfig, args: &CheckArgs) -> CliResult<()> {
    let probe = apply_check_overrides(probe, args)?;
    let reporter = Reporter::new(config.color.should_color(), config.verbosity.is_quiet());
    reporter.info(&format!("opening {}", probe.base_url));

    let session = formprobe::ChromiumSession::launch(probe.browser.clone())?;
    let waiter = ActionabilityWaiter::new(formprobe::SystemClock::new());
    let report = check_and_close(session, waiter, &probe, formprobe::ChromiumSession::close)?;
    report_readiness(&reporter, &report)
}

/// Without the `browser` feature there is nothing to check against
#[cfg(not(feature = "browser"))]
pub fn execute_check(_config: &CliConfig, probe: ProbeConfig, args: &CheckArgs) -> CliResult<()> {
    apply_check_overrides(probe, args)?;
    Err(CliError::config(
        "built without the `browser` feature; rebuild with --features browser",
    ))
}

// =============================================================================
// run
// =============================================================================

/// Run `scenarios` through `factory`; any failure becomes an error
pub fn run_suite<F: SessionFactory>(
    config: CliConfig,
    probe: ProbeConfig,
    factory: &mut F,
    scenarios: &[Scenario],
) -> CliResult<ScenarioResults> {
    let results = ScenarioRunner::new(config, probe).run(factory, scenarios)?;
    if results.all_passed() {
        Ok(results)
    } else {
        let names: Vec<_> = results.failures().iter().map(|r| r.scenario.name()).collect();
        Err(CliError::scenario_failed(format!(
            "{} of {} scenario(s) failed: {}",
            results.failed(),
            results.total(),
            names.join(", ")
        )))
    }
}

/// Print the selected scenarios without running them
pub fn list_scenarios(scenarios: &[Scenario]) {
    for scenario in scenarios {
        println!("{:<22} {}", scenario.name(), scenario.description());
    }
}

/// Run the scenario suite against Chromium
pub fn execute_run(config: CliConfig, probe: ProbeConfig, args: &RunArgs) -> CliResult<()> {
    let scenarios = Scenario::select(args.filter.as_deref())?;
    if args.list {
        list_scenarios(&scenarios);
        return Ok(());
    }
    let fail_fast = config.fail_fast || args.fail_fast;
    let config = config.with_fail_fast(fail_fast);

    #[cfg(feature = "browser")]
    {
        let mut factory = crate::runner::ChromiumFactory::new(probe.clone());
        run_suite(config, probe, &mut factory, &scenarios).map(|_| ())
    }
    #[cfg(not(feature = "browser"))]
    {
        let _ = (config, probe);
        Err(CliError::config(
            "built without the `browser` feature; rebuild with --features browser",
        ))
    }
}
