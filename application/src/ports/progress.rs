//! Progress notification port
//!
//! Defines the interface for reporting progress during a council request.

use council_domain::{ConsensusRound, MemberId};

/// Callback for progress updates during a council request
///
/// Implementations live in the binary and can display progress in
/// various ways (console, web UI, etc.)
pub trait ProgressNotifier: Send + Sync {
    /// Called when a round starts gathering
    fn on_round_start(&self, round: u32, candidates: usize);

    /// Called when one member's call completes within a round
    fn on_member_complete(&self, round: u32, member: &MemberId, success: bool);

    /// Called once a round has been scored
    fn on_round_evaluated(&self, _round: &ConsensusRound) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {
    fn on_round_start(&self, _round: u32, _candidates: usize) {}
    fn on_member_complete(&self, _round: u32, _member: &MemberId, _success: bool) {}
}
