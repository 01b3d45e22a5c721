//! Request context: the per-request state owned by one processing flow.
//!
//! Every request gets its own [`RequestContext`]; nothing in it is reachable
//! from another request. Response slots are guarded by a mutex local to the
//! context, so concurrent requests never contend on a shared lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::time::Instant;

use crate::consensus::phase::SynthesisPhase;
use crate::core::error::DomainError;
use crate::core::ids::RequestId;
use crate::core::member::MemberId;
use crate::core::question::Question;
use crate::request::response::MemberResponse;

#[derive(Debug, Default)]
struct RoundSlots {
    responses: HashMap<MemberId, MemberResponse>,
}

#[derive(Debug)]
struct ContextState {
    phase: SynthesisPhase,
    rounds: BTreeMap<u32, RoundSlots>,
}

/// Per-request state: id, query, deadline, round counter and response slots.
///
/// The deadline is read from the tokio clock, so it moves with a paused
/// test runtime.
#[derive(Debug)]
pub struct RequestContext {
    request_id: RequestId,
    question: Question,
    deadline: Instant,
    round: AtomicU32,
    state: Mutex<ContextState>,
}

impl RequestContext {
    /// Create a context in `GATHERING(round = 0)`
    pub fn new(request_id: RequestId, question: Question, budget: Duration) -> Self {
        Self {
            request_id,
            question,
            deadline: Instant::now() + budget,
            round: AtomicU32::new(0),
            state: Mutex::new(ContextState {
                phase: SynthesisPhase::Gathering,
                rounds: BTreeMap::new(),
            }),
        }
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn question(&self) -> &Question {
        &self.question
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the request deadline (zero once expired)
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Current round number (monotonic, starts at 0)
    pub fn round(&self) -> u32 {
        self.round.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> SynthesisPhase {
        self.lock().phase
    }

    pub fn is_terminal(&self) -> bool {
        self.phase().is_terminal()
    }

    /// Move the state machine to `next`, rejecting illegal transitions
    pub fn transition(&self, next: SynthesisPhase) -> Result<SynthesisPhase, DomainError> {
        let mut state = self.lock();
        let current = state.phase;
        if !current.can_transition_to(next) {
            return Err(DomainError::IllegalTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }
        state.phase = next;
        Ok(current)
    }

    /// Write the response set of `round` into the slots, exactly once.
    ///
    /// The round must be the current one and the request must not be
    /// terminal. A member appearing twice keeps its first response.
    /// Returns the number of filled slots.
    pub fn finalize_round(
        &self,
        round: u32,
        responses: Vec<MemberResponse>,
    ) -> Result<usize, DomainError> {
        let mut state = self.lock();
        if state.phase.is_terminal() {
            return Err(DomainError::RequestTerminal);
        }
        let current = self.round();
        if round != current {
            return Err(DomainError::StaleRound {
                expected: round,
                actual: current,
            });
        }
        if state.rounds.contains_key(&round) {
            return Err(DomainError::RoundAlreadyFinalized(round));
        }

        let mut slots = RoundSlots::default();
        for response in responses.into_iter().filter(|r| r.round == round) {
            slots
                .responses
                .entry(response.member.clone())
                .or_insert(response);
        }
        let filled = slots.responses.len();
        state.rounds.insert(round, slots);
        Ok(filled)
    }

    pub fn is_finalized(&self, round: u32) -> bool {
        self.lock().rounds.contains_key(&round)
    }

    /// Advance from `expected` to `expected + 1` with a single compare-and-set.
    ///
    /// Fails if `expected` is not the current round or has not been
    /// finalized yet; the counter never decreases.
    pub fn advance_round(&self, expected: u32) -> Result<u32, DomainError> {
        if !self.is_finalized(expected) {
            return Err(DomainError::StaleRound {
                expected,
                actual: self.round(),
            });
        }
        self.round
            .compare_exchange(expected, expected + 1, Ordering::AcqRel, Ordering::Acquire)
            .map(|prev| prev + 1)
            .map_err(|actual| DomainError::StaleRound { expected, actual })
    }

    /// Finalized responses of `round`, ordered by member id
    pub fn responses(&self, round: u32) -> Vec<MemberResponse> {
        let state = self.lock();
        let mut responses: Vec<MemberResponse> = state
            .rounds
            .get(&round)
            .map(|slots| slots.responses.values().cloned().collect())
            .unwrap_or_default();
        responses.sort_by(|a, b| a.member.cmp(&b.member));
        responses
    }

    /// A member's own successful answer in `round`, if any
    pub fn answer_of(&self, member: &MemberId, round: u32) -> Option<String> {
        let state = self.lock();
        state
            .rounds
            .get(&round)
            .and_then(|slots| slots.responses.get(member))
            .filter(|r| r.is_success())
            .map(|r| r.content.clone())
    }

    /// Number of finalized rounds
    pub fn rounds_finalized(&self) -> usize {
        self.lock().rounds.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ContextState> {
        // Slot writes never panic while holding the lock; recover the data anyway.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
