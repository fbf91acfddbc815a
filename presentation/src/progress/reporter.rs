//! Progress reporting for scans and analyses

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use pitfall_application::{AnalysisPhase, ProgressNotifier};
use std::sync::Mutex;
use std::time::Duration;

/// Reports progress with an indicatif bar per phase, drawn on stderr
pub struct ProgressReporter {
    phase_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            phase_bar: Mutex::new(None),
        }
    }

    fn phase_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressNotifier for ProgressReporter {
    fn on_phase_start(&self, phase: AnalysisPhase, total_tasks: usize) {
        // Single-task phases (one model call) get a spinner instead of a bar
        let pb = if total_tasks <= 1 {
            let pb = ProgressBar::new_spinner();
            pb.set_style(Self::spinner_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            let pb = ProgressBar::new(total_tasks as u64);
            pb.set_style(Self::phase_style());
            pb
        };
        pb.set_prefix(phase.as_str());
        pb.set_message("Starting...");

        if let Ok(mut slot) = self.phase_bar.lock() {
            *slot = Some(pb);
        }
    }

    fn on_task_complete(&self, _phase: AnalysisPhase, label: &str, success: bool) {
        if let Ok(slot) = self.phase_bar.lock()
            && let Some(pb) = slot.as_ref()
        {
            let status = if success {
                format!("{} {}", "v".green(), label)
            } else {
                format!("{} {}", "x".red(), label)
            };
            pb.set_message(status);
            pb.inc(1);
        }
    }

    fn on_phase_complete(&self, _phase: AnalysisPhase) {
        if let Ok(mut slot) = self.phase_bar.lock()
            && let Some(pb) = slot.take()
        {
            pb.finish_with_message(format!("{}", "done".green()));
        }
    }
}

/// Plain line-based progress on stderr, for non-interactive terminals
pub struct SimpleProgress;

impl ProgressNotifier for SimpleProgress {
    fn on_phase_start(&self, phase: AnalysisPhase, total_tasks: usize) {
        eprintln!("{} {} ({} tasks)", "->".cyan(), phase.as_str().bold(), total_tasks);
    }

    fn on_task_complete(&self, _phase: AnalysisPhase, label: &str, success: bool) {
        if success {
            eprintln!("  {} {}", "v".green(), label);
        } else {
            eprintln!("  {} {} (failed)", "x".red(), label);
        }
    }

    fn on_phase_complete(&self, _phase: AnalysisPhase) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reporter_lifecycle_without_terminal() {
        let reporter = ProgressReporter::new();
        reporter.on_phase_start(AnalysisPhase::Scan, 3);
        reporter.on_task_complete(AnalysisPhase::Scan, "package_manager", true);
        reporter.on_task_complete(AnalysisPhase::Scan, "container", false);
        reporter.on_phase_complete(AnalysisPhase::Scan);
        assert!(reporter.phase_bar.lock().unwrap().is_none());
    }
}
