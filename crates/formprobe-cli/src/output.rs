//! Terminal output for scenario runs and readiness checks

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Styled status lines on stderr, with an optional spinner
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    spinner: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl Reporter {
    /// Create a new reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            spinner: None,
            use_color,
            quiet,
        }
    }

    /// Start a progress bar over `total` scenarios
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_message(message.to_string());
        self.spinner = Some(pb);
    }

    /// Advance the progress bar
    pub fn increment(&self) {
        if let Some(ref pb) = self.spinner {
            pb.inc(1);
        }
    }

    /// Update progress message
    pub fn set_message(&self, message: &str) {
        if let Some(ref pb) = self.spinner {
            pb.set_message(message.to_string());
        }
    }

    /// Remove the progress bar
    pub fn finish(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }

    fn line(&self, text: &str) {
        match self.spinner {
            Some(ref pb) => pb.suspend(|| {
                let _ = self.term.write_line(text);
            }),
            None => {
                let _ = self.term.write_line(text);
            }
        }
    }

    fn tagged(&self, symbol: &str, plain: &str, style: &Style, message: &str) {
        let prefix = if self.use_color {
            style.apply_to(symbol).to_string()
        } else {
            plain.to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.tagged("✓", "PASS", &Style::new().green().bold(), message);
    }

    /// Print a failure message (also in quiet mode)
    pub fn failure(&self, message: &str) {
        self.tagged("✗", "FAIL", &Style::new().red().bold(), message);
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.tagged("⚠", "WARN", &Style::new().yellow().bold(), message);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.tagged("ℹ", "INFO", &Style::new().blue().bold(), message);
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }
        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        self.line("");
        self.line(&styled);
    }

    /// Print the run summary
    pub fn summary(&self, passed: usize, failed: usize, duration: Duration) {
        if self.quiet && failed == 0 {
            return;
        }

        let total = passed + failed;
        let secs = duration.as_secs_f64();
        let status = if failed > 0 { "FAILED" } else { "PASSED" };
        self.line("");

        if self.use_color {
            let status_style = if failed > 0 {
                Style::new().red().bold()
            } else {
                Style::new().green().bold()
            };
            self.line(&format!(
                "{} {total} scenarios in {secs:.2}s ({} passed, {} failed)",
                status_style.apply_to(status),
                Style::new().green().apply_to(passed),
                Style::new().red().apply_to(failed),
            ));
        } else {
            self.line(&format!(
                "{status} {total} scenarios in {secs:.2}s ({passed} passed, {failed} failed)"
            ));
        }
    }
}
