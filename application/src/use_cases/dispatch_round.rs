//! Request dispatcher
//!
//! Executes one round: fans the prompt out to the round's candidates in
//! parallel, gathers completions until every slot is filled or the
//! deadline plus grace window has passed, and writes the response set into
//! the request's own [`RequestContext`] exactly once.
//!
//! ```text
//! start ──── calls land, replacements allowed ──── deadline ── grace ── finalize
//!                                                  (no new calls)      (abort the rest)
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use council_domain::{CouncilMember, DomainError, MemberId, MemberResponse, RequestContext};
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DispatchParams;
use crate::health_pool::ProviderHealthPool;
use crate::ports::progress::ProgressNotifier;
use crate::ports::provider_gateway::{GatewayError, ProviderGateway, ProviderRequest};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Failed to finalize round: {0}")]
    Finalize(#[from] DomainError),
}

/// What to ask in one round
#[derive(Debug, Clone)]
pub struct RoundRequest {
    pub round: u32,
    pub candidates: Vec<CouncilMember>,
    pub system_prompt: String,
    /// Prompt for any member without an override (replacements included)
    pub base_prompt: String,
    /// Member-specific prompts (negotiation rounds)
    pub prompts: HashMap<MemberId, String>,
}

impl RoundRequest {
    pub fn new(
        round: u32,
        candidates: Vec<CouncilMember>,
        system_prompt: impl Into<String>,
        base_prompt: impl Into<String>,
    ) -> Self {
        Self {
            round,
            candidates,
            system_prompt: system_prompt.into(),
            base_prompt: base_prompt.into(),
            prompts: HashMap::new(),
        }
    }

    pub fn with_prompt(mut self, member: MemberId, prompt: String) -> Self {
        self.prompts.insert(member, prompt);
        self
    }

    fn prompt_for(&self, member: &MemberId) -> &str {
        self.prompts
            .get(member)
            .map(String::as_str)
            .unwrap_or(&self.base_prompt)
    }
}

/// What happened in one round
#[derive(Debug, Clone, Default)]
pub struct RoundReport {
    pub round: u32,
    /// Slots written into the request context
    pub responses: Vec<MemberResponse>,
    /// Members that produced no response (call timeout or cut off at finalize)
    pub timed_out: Vec<MemberId>,
    /// (failed member, replacement) pairs
    pub replaced: Vec<(MemberId, MemberId)>,
    /// Number of filled slots (never above the candidate count)
    pub filled: usize,
}

enum CallResult {
    Answered(String),
    Failed(GatewayError),
    Cancelled,
}

struct InFlight {
    member: CouncilMember,
    started: Instant,
}

pub struct RequestDispatcher<G: ProviderGateway + 'static> {
    gateway: Arc<G>,
    pool: Arc<ProviderHealthPool>,
    params: DispatchParams,
}

impl<G: ProviderGateway + 'static> RequestDispatcher<G> {
    pub fn new(gateway: Arc<G>, pool: Arc<ProviderHealthPool>, params: DispatchParams) -> Self {
        Self {
            gateway,
            pool,
            params,
        }
    }

    pub fn params(&self) -> &DispatchParams {
        &self.params
    }

    /// Run one round and finalize it into `ctx`.
    ///
    /// Every call outcome is reported to the health pool. Timeouts count as
    /// failures there but leave no slot; explicit provider errors fill their
    /// slot with an error response unless a replacement takes it over.
    pub async fn dispatch(
        &self,
        ctx: &RequestContext,
        request: &RoundRequest,
        progress: &dyn ProgressNotifier,
    ) -> Result<RoundReport, DispatchError> {
        let round = request.round;
        let started = Instant::now();
        let deadline = started + self.params.round_deadline;
        let grace_end = deadline + self.params.grace;
        let expected = request.candidates.len();

        info!(
            request_id = %ctx.request_id(),
            round,
            candidates = expected,
            "Dispatching round"
        );

        let cancel = CancellationToken::new();
        let mut join_set = JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, InFlight> = HashMap::new();
        let mut tried: HashSet<MemberId> = HashSet::new();

        for member in &request.candidates {
            tried.insert(member.id.clone());
            self.spawn_call(ctx, request, member.clone(), &cancel, &mut join_set, &mut in_flight);
        }

        let mut report = RoundReport {
            round,
            ..Default::default()
        };

        while report.responses.len() < expected && !join_set.is_empty() {
            let next = match tokio::time::timeout_at(grace_end, join_set.join_next_with_id()).await {
                Ok(Some(next)) => next,
                Ok(None) => break,
                Err(_) => {
                    debug!(request_id = %ctx.request_id(), round, "Grace window expired");
                    break;
                }
            };

            let (id, result) = match next {
                Ok((id, result)) => (id, result),
                Err(join_error) => {
                    let id = join_error.id();
                    if let Some(call) = in_flight.remove(&id) {
                        warn!(member = %call.member.id, "Provider task failed: {}", join_error);
                        self.pool
                            .record_outcome(&call.member.id, false, call.started.elapsed());
                        report.timed_out.push(call.member.id);
                    }
                    continue;
                }
            };
            let Some(call) = in_flight.remove(&id) else {
                continue;
            };
            let latency = call.started.elapsed();
            let member_id = call.member.id.clone();

            match result {
                CallResult::Answered(content) => {
                    self.pool.record_outcome(&member_id, true, latency);
                    progress.on_member_complete(round, &member_id, true);
                    debug!(member = %member_id, round, latency_ms = latency.as_millis() as u64, "Member answered");
                    report.responses.push(MemberResponse::success(
                        member_id,
                        round,
                        content,
                        latency.as_millis() as u64,
                    ));
                }
                CallResult::Failed(GatewayError::Timeout) => {
                    self.pool.record_outcome(&member_id, false, latency);
                    progress.on_member_complete(round, &member_id, false);
                    warn!(member = %member_id, round, "Member timed out");
                    report.timed_out.push(member_id);
                }
                CallResult::Failed(error) => {
                    self.pool.record_outcome(&member_id, false, latency);
                    progress.on_member_complete(round, &member_id, false);
                    warn!(member = %member_id, round, "Member failed: {}", error);

                    let replacement = if self.params.replace_failed && Instant::now() < deadline {
                        let excluding: Vec<MemberId> = tried.iter().cloned().collect();
                        self.pool.select_candidates(1, &excluding).into_iter().next()
                    } else {
                        None
                    };

                    match replacement {
                        Some(replacement) => {
                            info!(failed = %member_id, replacement = %replacement.id, round, "Replacing failed member");
                            tried.insert(replacement.id.clone());
                            report.replaced.push((member_id, replacement.id.clone()));
                            self.spawn_call(ctx, request, replacement, &cancel, &mut join_set, &mut in_flight);
                        }
                        None => report.responses.push(MemberResponse::failure(
                            member_id,
                            round,
                            error.to_string(),
                            latency.as_millis() as u64,
                        )),
                    }
                }
                CallResult::Cancelled => {}
            }
        }

        // Finalize: whatever is still running is cut off and counted as a timeout
        cancel.cancel();
        join_set.abort_all();
        for (_, call) in in_flight.drain() {
            self.pool
                .record_outcome(&call.member.id, false, call.started.elapsed());
            progress.on_member_complete(round, &call.member.id, false);
            warn!(member = %call.member.id, round, "No response before finalize");
            report.timed_out.push(call.member.id);
        }

        report.filled = ctx.finalize_round(round, report.responses.clone())?;
        report.timed_out.sort();

        info!(
            request_id = %ctx.request_id(),
            round,
            filled = report.filled,
            timed_out = report.timed_out.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Round finalized"
        );
        Ok(report)
    }

    fn spawn_call(
        &self,
        ctx: &RequestContext,
        request: &RoundRequest,
        member: CouncilMember,
        cancel: &CancellationToken,
        join_set: &mut JoinSet<CallResult>,
        in_flight: &mut HashMap<tokio::task::Id, InFlight>,
    ) {
        let prior_round_context = request
            .round
            .checked_sub(1)
            .and_then(|previous| ctx.answer_of(&member.id, previous));

        let provider_request = ProviderRequest {
            member: member.clone(),
            system_prompt: request.system_prompt.clone(),
            prompt: request.prompt_for(&member.id).to_string(),
            prior_round_context,
        };
        let gateway = Arc::clone(&self.gateway);
        let cancel = cancel.clone();
        let call_timeout = self.params.effective_call_timeout();

        let handle = join_set.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => CallResult::Cancelled,
                result = tokio::time::timeout(call_timeout, gateway.call(&provider_request)) => {
                    match result {
                        Ok(Ok(content)) => CallResult::Answered(content),
                        Ok(Err(e)) => CallResult::Failed(e),
                        Err(_) => CallResult::Failed(GatewayError::Timeout),
                    }
                }
            }
        });
        in_flight.insert(
            handle.id(),
            InFlight {
                member,
                started: Instant::now(),
            },
        );
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ports::progress::NoProgress;
    use async_trait::async_trait;
    use council_domain::{HealthPolicy, Question, RequestId};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    // ==================== Test Mocks ====================

    /// Scripted behaviour of one member call
    #[derive(Clone)]
    pub(crate) enum Script {
        Answer(&'static str),
        AnswerAfter(&'static str, Duration),
        Fail(&'static str),
        FailAfter(&'static str, Duration),
        Silent,
    }

    /// Gateway answering from per-member scripts; the last step repeats
    #[derive(Default)]
    pub(crate) struct ScriptedGateway {
        scripts: Mutex<HashMap<String, VecDeque<Script>>>,
        pub(crate) requests: Mutex<Vec<ProviderRequest>>,
    }

    impl ScriptedGateway {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn script(self, member: &str, steps: Vec<Script>) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(member.to_string(), steps.into());
            self
        }

        pub(crate) fn calls_to(&self, member: &str) -> usize {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.member.id.as_str() == member)
                .count()
        }
    }

    #[async_trait]
    impl ProviderGateway for ScriptedGateway {
        async fn call(&self, request: &ProviderRequest) -> Result<String, GatewayError> {
            self.requests.lock().unwrap().push(request.clone());
            let step = {
                let mut scripts = self.scripts.lock().unwrap();
                let queue = scripts
                    .get_mut(request.member.id.as_str())
                    .ok_or_else(|| GatewayError::UnknownBackend(request.member.id.to_string()))?;
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            };
            match step {
                Some(Script::Answer(text)) => Ok(text.to_string()),
                Some(Script::AnswerAfter(text, delay)) => {
                    tokio::time::sleep(delay).await;
                    Ok(text.to_string())
                }
                Some(Script::Fail(msg)) => Err(GatewayError::ProviderError(msg.to_string())),
                Some(Script::FailAfter(msg, delay)) => {
                    tokio::time::sleep(delay).await;
                    Err(GatewayError::ProviderError(msg.to_string()))
                }
                Some(Script::Silent) | None => std::future::pending().await,
            }
        }
    }

    pub(crate) fn members(names: &[&str]) -> Vec<CouncilMember> {
        names.iter().map(|n| CouncilMember::new(*n, "mock")).collect()
    }

    fn params() -> DispatchParams {
        DispatchParams::default()
            .with_round_deadline(Duration::from_secs(10))
            .with_call_timeout(Duration::from_secs(10))
            .with_grace(Duration::from_secs(1))
    }

    fn setup(
        gateway: ScriptedGateway,
        names: &[&str],
        params: DispatchParams,
    ) -> (RequestDispatcher<ScriptedGateway>, Arc<ScriptedGateway>, Arc<ProviderHealthPool>) {
        let gateway = Arc::new(gateway);
        let pool = Arc::new(ProviderHealthPool::with_members(
            HealthPolicy::default(),
            members(names),
        ));
        let dispatcher = RequestDispatcher::new(Arc::clone(&gateway), Arc::clone(&pool), params);
        (dispatcher, gateway, pool)
    }

    fn ctx() -> RequestContext {
        RequestContext::new(
            RequestId::new("req-1"),
            Question::try_new("What is Rust?").unwrap(),
            Duration::from_secs(300),
        )
    }

    fn request(names: &[&str]) -> RoundRequest {
        RoundRequest::new(0, members(names), "system", "prompt")
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_answer_finalizes_early() {
        let gateway = ScriptedGateway::new()
            .script("a", vec![Script::Answer("alpha")])
            .script("b", vec![Script::AnswerAfter("beta", Duration::from_secs(2))]);
        let (dispatcher, _, _) = setup(gateway, &["a", "b"], params());
        let ctx = ctx();

        let started = Instant::now();
        let report = dispatcher.dispatch(&ctx, &request(&["a", "b"]), &NoProgress).await.unwrap();

        assert_eq!(report.filled, 2);
        assert!(report.timed_out.is_empty());
        // Completion barrier, not the deadline
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(ctx.responses(0).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_member_times_out_and_counts_as_failure() {
        let gateway = ScriptedGateway::new()
            .script("a", vec![Script::Answer("alpha")])
            .script("c", vec![Script::Silent]);
        let (dispatcher, _, pool) = setup(gateway, &["a", "c"], params());
        let ctx = ctx();

        let report = dispatcher.dispatch(&ctx, &request(&["a", "c"]), &NoProgress).await.unwrap();

        assert_eq!(report.filled, 1);
        assert_eq!(report.timed_out, vec![MemberId::new("c")]);
        let snapshot = pool.snapshot(&MemberId::new("c")).unwrap();
        assert_eq!(snapshot.failures, 1);
        // Timeouts leave no slot
        assert!(ctx.responses(0).iter().all(|r| r.member.as_str() == "a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_window_accepts_late_completion() {
        // b fails at 5s; its replacement is spawned then and lands at 10.5s,
        // after the 10s deadline but inside the 1s grace window
        let gateway = ScriptedGateway::new()
            .script("a", vec![Script::Answer("alpha")])
            .script("b", vec![Script::FailAfter("overloaded", Duration::from_secs(5))])
            .script("spare", vec![Script::AnswerAfter("late", Duration::from_millis(5_500))]);
        let (dispatcher, _, _) = setup(gateway, &["a", "b", "spare"], params());
        let ctx = ctx();

        let report = dispatcher.dispatch(&ctx, &request(&["a", "b"]), &NoProgress).await.unwrap();
        assert_eq!(report.filled, 2);
        assert!(report.timed_out.is_empty());
        assert!(ctx.answer_of(&MemberId::new("spare"), 0).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_after_grace_is_discarded() {
        let gateway = ScriptedGateway::new()
            .script("a", vec![Script::Answer("alpha")])
            .script("b", vec![Script::FailAfter("overloaded", Duration::from_secs(5))])
            .script("spare", vec![Script::AnswerAfter("too late", Duration::from_millis(6_500))]);
        let (dispatcher, _, pool) = setup(gateway, &["a", "b", "spare"], params());
        let ctx = ctx();

        let started = Instant::now();
        let report = dispatcher.dispatch(&ctx, &request(&["a", "b"]), &NoProgress).await.unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(11) && elapsed < Duration::from_millis(11_500));
        assert_eq!(report.filled, 1);
        assert_eq!(report.timed_out, vec![MemberId::new("spare")]);
        assert_eq!(pool.snapshot(&MemberId::new("spare")).unwrap().failures, 1);
        assert!(ctx.answer_of(&MemberId::new("spare"), 0).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_replacement_after_deadline() {
        let gateway = ScriptedGateway::new()
            .script("a", vec![Script::Answer("alpha")])
            .script("b", vec![Script::FailAfter("overloaded", Duration::from_secs(5))])
            .script("c", vec![Script::FailAfter("overloaded", Duration::from_millis(5_500))])
            .script("d", vec![Script::Answer("delta")]);
        let (dispatcher, gateway, _) = setup(gateway, &["a", "b", "c", "d"], params());
        let ctx = ctx();

        let report = dispatcher.dispatch(&ctx, &request(&["a", "b"]), &NoProgress).await.unwrap();

        // b -> c at 5s; c fails at 10.5s, past the deadline: no call to d
        assert_eq!(report.replaced, vec![(MemberId::new("b"), MemberId::new("c"))]);
        assert_eq!(gateway.calls_to("d"), 0);
        assert_eq!(report.filled, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_error_is_replaced_in_same_slot() {
        let gateway = ScriptedGateway::new()
            .script("a", vec![Script::Answer("alpha")])
            .script("b", vec![Script::Fail("quota exceeded")])
            .script("spare", vec![Script::Answer("spare answer")]);
        let (dispatcher, gateway, _) = setup(gateway, &["a", "b", "spare"], params());
        let ctx = ctx();

        let report = dispatcher.dispatch(&ctx, &request(&["a", "b"]), &NoProgress).await.unwrap();

        assert_eq!(report.replaced, vec![(MemberId::new("b"), MemberId::new("spare"))]);
        assert_eq!(report.filled, 2);
        assert_eq!(gateway.calls_to("spare"), 1);
        let members: Vec<String> = ctx.responses(0).iter().map(|r| r.member.to_string()).collect();
        assert_eq!(members, vec!["a", "spare"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_error_without_replacement_fills_error_slot() {
        let gateway = ScriptedGateway::new()
            .script("a", vec![Script::Answer("alpha")])
            .script("b", vec![Script::Fail("quota exceeded")]);
        let (dispatcher, _, pool) = setup(gateway, &["a", "b"], params());
        let ctx = ctx();

        let report = dispatcher.dispatch(&ctx, &request(&["a", "b"]), &NoProgress).await.unwrap();

        assert!(report.replaced.is_empty());
        assert_eq!(report.filled, 2);
        let b = ctx.responses(0).into_iter().find(|r| r.member.as_str() == "b").unwrap();
        assert!(!b.is_success());
        assert_eq!(pool.snapshot(&MemberId::new("b")).unwrap().failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filled_slots_never_exceed_candidates() {
        // Every spare fails too; replacements chain until the pool runs dry
        let gateway = ScriptedGateway::new()
            .script("a", vec![Script::Fail("boom")])
            .script("b", vec![Script::Fail("boom")])
            .script("c", vec![Script::Fail("boom")])
            .script("d", vec![Script::Answer("delta")]);
        let (dispatcher, _, _) = setup(gateway, &["a", "b", "c", "d"], params());
        let ctx = ctx();

        let report = dispatcher.dispatch(&ctx, &request(&["a", "b"]), &NoProgress).await.unwrap();
        assert!(report.filled <= 2);
        assert_eq!(report.filled, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prior_round_answer_is_passed_along() {
        let gateway = ScriptedGateway::new().script("a", vec![Script::Answer("first"), Script::Answer("second")]);
        let (dispatcher, gateway, _) = setup(gateway, &["a"], params());
        let ctx = ctx();

        dispatcher.dispatch(&ctx, &request(&["a"]), &NoProgress).await.unwrap();
        ctx.transition(council_domain::SynthesisPhase::RoundEval).unwrap();
        ctx.transition(council_domain::SynthesisPhase::Negotiating).unwrap();
        ctx.advance_round(0).unwrap();
        ctx.transition(council_domain::SynthesisPhase::Gathering).unwrap();

        let next = RoundRequest::new(1, members(&["a"]), "system", "base")
            .with_prompt(MemberId::new("a"), "negotiate".to_string());
        dispatcher.dispatch(&ctx, &next, &NoProgress).await.unwrap();

        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests[0].prior_round_context, None);
        assert_eq!(requests[1].prior_round_context.as_deref(), Some("first"));
        assert_eq!(requests[1].prompt, "negotiate");
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_cannot_be_finalized_twice() {
        let gateway = ScriptedGateway::new().script("a", vec![Script::Answer("alpha")]);
        let (dispatcher, _, _) = setup(gateway, &["a"], params());
        let ctx = ctx();

        dispatcher.dispatch(&ctx, &request(&["a"]), &NoProgress).await.unwrap();
        let second = dispatcher.dispatch(&ctx, &request(&["a"]), &NoProgress).await;
        assert!(matches!(
            second,
            Err(DispatchError::Finalize(DomainError::RoundAlreadyFinalized(0)))
        ));
    }
}
