//! Progress reporting for council rounds

use colored::Colorize;
use council_application::ProgressNotifier;
use council_domain::{ConsensusRound, MemberId, RoundVerdict};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Reports progress with one bar per round
pub struct ProgressReporter {
    multi: MultiProgress,
    round_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            round_bar: Mutex::new(None),
        }
    }

    fn round_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn verdict_message(round: &ConsensusRound) -> String {
        let score = format!("score {:.2}", round.score());
        match round.verdict {
            RoundVerdict::Consensus => format!("{} {}", "consensus".green(), score),
            RoundVerdict::Negotiate => format!("{} {}", "negotiating".yellow(), score),
            RoundVerdict::Deadlock => format!("{} {}", "deadlock".red(), score),
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressNotifier for ProgressReporter {
    fn on_round_start(&self, round: u32, candidates: usize) {
        let pb = self.multi.add(ProgressBar::new(candidates as u64));
        pb.set_style(Self::round_style());
        pb.set_prefix(format!("Round {}", round + 1));
        pb.set_message("Gathering...");

        if let Ok(mut slot) = self.round_bar.lock() {
            *slot = Some(pb);
        }
    }

    fn on_member_complete(&self, _round: u32, member: &MemberId, success: bool) {
        if let Ok(slot) = self.round_bar.lock()
            && let Some(pb) = slot.as_ref()
        {
            let status = if success {
                format!("{} {}", "v".green(), member)
            } else {
                format!("{} {}", "x".red(), member)
            };
            pb.set_message(status);
            pb.inc(1);
        }
    }

    fn on_round_evaluated(&self, round: &ConsensusRound) {
        if let Ok(mut slot) = self.round_bar.lock()
            && let Some(pb) = slot.take()
        {
            pb.finish_with_message(Self::verdict_message(round));
        }
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl ProgressNotifier for SimpleProgress {
    fn on_round_start(&self, round: u32, candidates: usize) {
        eprintln!(
            "{} {} ({} members)",
            "->".cyan(),
            format!("Round {}", round + 1).bold(),
            candidates
        );
    }

    fn on_member_complete(&self, _round: u32, member: &MemberId, success: bool) {
        if success {
            eprintln!("  {} {}", "v".green(), member);
        } else {
            eprintln!("  {} {} (failed)", "x".red(), member);
        }
    }

    fn on_round_evaluated(&self, round: &ConsensusRound) {
        eprintln!("  {}", ProgressReporter::verdict_message(round));
    }
}
