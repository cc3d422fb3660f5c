//! Progress display for provisioning runs
//!
//! The bar length is the total phase weight; each completed phase advances
//! it by its weight.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use provisioning::{Operand, ProgressCallback, Status};

pub struct PhaseProgress {
    bar: ProgressBar,
}

impl PhaseProgress {
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {percent:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn describe(operand: &Operand) -> String {
        match (operand.first(), operand.second()) {
            (Some(from), Some(to)) => format!("{} {} -> {}", to.id, from.version, to.version),
            (None, Some(unit)) | (Some(unit), None) => unit.to_string(),
            (None, None) => String::new(),
        }
    }
}

impl ProgressCallback for PhaseProgress {
    fn on_phase_start(&mut self, phase_id: &str, _weight: u32, total_weight: u32) {
        if self.bar.length() != Some(u64::from(total_weight)) {
            self.bar.set_length(u64::from(total_weight));
        }
        self.bar.set_message(phase_id.to_string());
    }

    fn on_operand(&mut self, phase_id: &str, operand: &Operand) {
        self.bar
            .set_message(format!("{phase_id}: {}", Self::describe(operand)));
    }

    fn on_phase_complete(&mut self, _phase_id: &str, weight: u32) {
        self.bar.inc(u64::from(weight));
    }

    fn on_rollback(&mut self, trigger: &Status) {
        let reason = trigger.message().unwrap_or("failure");
        self.bar
            .set_message(format!("{} ({reason})", "rolling back".yellow()));
    }
}

impl Drop for PhaseProgress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
