//! Run Council use case
//!
//! Drives one request through the consensus state machine:
//!
//! ```text
//! GATHERING(0) -> ROUND_EVAL -> CONSENSUS   -> SYNTHESIZED
//!                            -> NEGOTIATING -> GATHERING(n + 1)
//!                            -> DEADLOCK    -> ESCALATED
//! ```
//!
//! Each round is dispatched, scored with pairwise similarity and judged
//! against the quorum cluster. Consensus is synthesized with the configured
//! strategy; a deadlock goes to the escalation gate.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use council_domain::consensus::participation;
use council_domain::consensus::strategy::{majority, weighted_merge};
use council_domain::prompt::extract_citations;
use council_domain::{
    ConsensusRound, CouncilAnswer, CouncilEscalation, CouncilOutcome, DomainError, MemberId,
    MemberResponse, PromptTemplate, Question, RequestContext, RequestId, RoundVerdict,
    SimilarityMatrix, Synthesis, SynthesisPhase, SynthesisStrategy,
};
use futures::future::join_all;
use serde_json::json;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{CouncilParams, DispatchParams};
use crate::health_pool::ProviderHealthPool;
use crate::ports::embedding::Embedder;
use crate::ports::metrics::{MetricSignal, MetricsSink, NoMetrics};
use crate::ports::progress::{NoProgress, ProgressNotifier};
use crate::ports::provider_gateway::{ProviderGateway, ProviderRequest};
use crate::ports::round_logger::{NoRoundLogger, RoundEvent, RoundLogger};
use crate::use_cases::dispatch_round::{DispatchError, RequestDispatcher, RoundRequest};
use crate::use_cases::escalate::{EscalationError, EscalationGate};

/// Errors that end a request without a council outcome
#[derive(Error, Debug)]
pub enum RunCouncilError {
    #[error("No council members configured")]
    NoMembers,

    #[error("Invalid request: {0}")]
    Invalid(#[from] DomainError),

    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Escalation failed: {0}")]
    Escalation(EscalationError),

    #[error("Consensus reached but no answer could be synthesized")]
    EmptySynthesis,
}

/// Input for the RunCouncil use case
#[derive(Debug, Clone)]
pub struct RunCouncilInput {
    pub question: Question,
    /// Supplied by the caller, generated otherwise
    pub request_id: Option<RequestId>,
    /// Overrides the configured strategy for this request
    pub strategy: Option<SynthesisStrategy>,
}

impl RunCouncilInput {
    pub fn new(question: Question) -> Self {
        Self {
            question,
            request_id: None,
            strategy: None,
        }
    }

    pub fn with_request_id(mut self, id: RequestId) -> Self {
        self.request_id = Some(id);
        self
    }

    pub fn with_strategy(mut self, strategy: SynthesisStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

/// Use case for running a council request (the consensus synthesizer)
pub struct RunCouncilUseCase<G: ProviderGateway + 'static> {
    gateway: Arc<G>,
    dispatcher: RequestDispatcher<G>,
    pool: Arc<ProviderHealthPool>,
    gate: Arc<EscalationGate>,
    embedder: Option<Arc<dyn Embedder>>,
    metrics: Arc<dyn MetricsSink>,
    round_logger: Arc<dyn RoundLogger>,
    params: CouncilParams,
}

impl<G: ProviderGateway + 'static> RunCouncilUseCase<G> {
    pub fn new(
        gateway: Arc<G>,
        pool: Arc<ProviderHealthPool>,
        gate: Arc<EscalationGate>,
        params: CouncilParams,
        dispatch: DispatchParams,
    ) -> Self {
        let dispatcher = RequestDispatcher::new(Arc::clone(&gateway), Arc::clone(&pool), dispatch);
        Self {
            gateway,
            dispatcher,
            pool,
            gate,
            embedder: None,
            metrics: Arc::new(NoMetrics),
            round_logger: Arc::new(NoRoundLogger),
            params,
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_round_logger(mut self, logger: Arc<dyn RoundLogger>) -> Self {
        self.round_logger = logger;
        self
    }

    pub fn params(&self) -> &CouncilParams {
        &self.params
    }

    /// Execute the use case with default (no-op) progress
    pub async fn execute(&self, input: RunCouncilInput) -> Result<CouncilOutcome, RunCouncilError> {
        self.execute_with_progress(input, &NoProgress).await
    }

    /// Execute the use case with progress callbacks
    pub async fn execute_with_progress(
        &self,
        input: RunCouncilInput,
        progress: &dyn ProgressNotifier,
    ) -> Result<CouncilOutcome, RunCouncilError> {
        if self.params.enabled_members().next().is_none() {
            return Err(RunCouncilError::NoMembers);
        }
        input.question.check_limit(self.params.max_query_chars)?;

        let request_id = input.request_id.unwrap_or_else(RequestId::generate);
        let ctx = RequestContext::new(request_id, input.question, self.params.request_timeout);
        let strategy = input.strategy.unwrap_or(self.params.strategy);
        let max_members = self
            .dispatcher
            .params()
            .max_members
            .unwrap_or(self.params.members.len());

        info!(
            request_id = %ctx.request_id(),
            members = self.params.members.len(),
            strategy = %strategy,
            "Council request started"
        );

        let mut rounds: Vec<ConsensusRound> = Vec::new();

        loop {
            let round = ctx.round();
            let candidates = self.pool.select_candidates(max_members, &[]);
            if candidates.is_empty() {
                warn!(request_id = %ctx.request_id(), round, "No selectable members for round");
            }
            progress.on_round_start(round, candidates.len());

            let request = self.round_request(&ctx, round, candidates, rounds.last());
            self.dispatcher.dispatch(&ctx, &request, progress).await?;

            ctx.transition(SynthesisPhase::RoundEval)?;
            let evaluated = self.evaluate(&ctx, round).await;
            progress.on_round_evaluated(&evaluated);
            let verdict = evaluated.verdict;
            let score = evaluated.score();
            rounds.push(evaluated);

            match verdict {
                RoundVerdict::Consensus => {
                    ctx.transition(SynthesisPhase::Consensus)?;
                    return self.synthesize(&ctx, strategy, rounds).await;
                }
                RoundVerdict::Negotiate if ctx.is_expired() => {
                    let reason = format!("request deadline exceeded, score={:.2}", score);
                    return self.escalate(&ctx, reason, score, rounds).await;
                }
                RoundVerdict::Negotiate => {
                    ctx.transition(SynthesisPhase::Negotiating)?;
                    let next = ctx.advance_round(round)?;
                    ctx.transition(SynthesisPhase::Gathering)?;
                    info!(request_id = %ctx.request_id(), round = next, score, "Negotiating");
                }
                RoundVerdict::Deadlock => {
                    let reason = format!("max rounds exceeded, score={:.2}", score);
                    return self.escalate(&ctx, reason, score, rounds).await;
                }
            }
        }
    }

    /// Build the prompts of `round`: the question in round 0, negotiation
    /// prompts exposing each member's own previous answer afterwards.
    fn round_request(
        &self,
        ctx: &RequestContext,
        round: u32,
        candidates: Vec<council_domain::CouncilMember>,
        previous: Option<&ConsensusRound>,
    ) -> RoundRequest {
        let question = ctx.question().content();
        let Some(previous) = previous else {
            return RoundRequest::new(
                round,
                candidates,
                PromptTemplate::member_system(),
                PromptTemplate::initial_query(question),
            );
        };

        let answers: Vec<(String, String)> = previous
            .responses
            .iter()
            .filter(|r| r.is_success())
            .map(|r| (r.member.to_string(), r.content.clone()))
            .collect();
        let peers_for = |member: &str| -> Vec<(String, String)> {
            if !self.params.share_peer_answers {
                return Vec::new();
            }
            answers
                .iter()
                .filter(|(m, _)| m != member)
                .cloned()
                .collect()
        };

        let base = PromptTemplate::negotiation_prompt(question, round, None, &peers_for(""));
        let mut prompts = HashMap::new();
        for member in &candidates {
            let own = ctx.answer_of(&member.id, previous.round);
            let prompt = PromptTemplate::negotiation_prompt(
                question,
                round,
                own.as_deref(),
                &peers_for(member.id.as_str()),
            );
            prompts.insert(member.id.clone(), prompt);
        }

        let mut request =
            RoundRequest::new(round, candidates, PromptTemplate::member_system(), base);
        request.prompts = prompts;
        request
    }

    /// Score the finalized round
    async fn evaluate(&self, ctx: &RequestContext, round: u32) -> ConsensusRound {
        let responses = ctx.responses(round);
        let present: Vec<&MemberResponse> = responses.iter().filter(|r| r.is_success()).collect();
        let matrix = self.similarity(ctx.request_id(), &present).await;
        let evaluated =
            ConsensusRound::evaluate(round, responses.clone(), matrix, &self.params.consensus);

        info!(
            request_id = %ctx.request_id(),
            round,
            present = evaluated.cluster.present,
            cluster = evaluated.cluster.members.len(),
            score = evaluated.score(),
            method = %evaluated.method(),
            verdict = %evaluated.verdict,
            "Round evaluated"
        );
        self.metrics.record(MetricSignal::consensus_score(
            ctx.request_id(),
            round,
            evaluated.score(),
        ));
        self.round_logger.log(RoundEvent::new(
            "round_evaluated",
            json!({
                "request_id": ctx.request_id(),
                "round": round,
                "method": evaluated.method(),
                "present": evaluated.present(),
                "errored": evaluated.errored(),
                "cluster": evaluated.cluster.members,
                "score": evaluated.score(),
                "verdict": evaluated.verdict,
            }),
        ));
        evaluated
    }

    /// Pairwise similarity of the present responses.
    ///
    /// Embeddings are used when every response can be embedded; otherwise
    /// the whole round falls back to lexical overlap.
    async fn similarity(&self, request_id: &RequestId, present: &[&MemberResponse]) -> SimilarityMatrix {
        let members: Vec<MemberId> = present.iter().map(|r| r.member.clone()).collect();
        let texts: Vec<&str> = present.iter().map(|r| r.content.as_str()).collect();

        if let Some(embedder) = &self.embedder
            && !present.is_empty()
        {
            let results = join_all(texts.iter().map(|t| embedder.embed(t))).await;
            match results.into_iter().collect::<Result<Vec<_>, _>>() {
                Ok(vectors) => {
                    let (matrix, excluded) = SimilarityMatrix::from_embeddings(members, &vectors);
                    for (a, b, e) in excluded {
                        warn!(request_id = %request_id, pair = %format!("{}/{}", a, b), "Pair excluded: {}", e);
                    }
                    return matrix;
                }
                Err(e) => {
                    warn!(request_id = %request_id, "Embedding failed, using lexical similarity: {}", e);
                }
            }
        }
        SimilarityMatrix::lexical(members, &texts)
    }

    async fn synthesize(
        &self,
        ctx: &RequestContext,
        strategy: SynthesisStrategy,
        rounds: Vec<ConsensusRound>,
    ) -> Result<CouncilOutcome, RunCouncilError> {
        let last = rounds.last().ok_or(RunCouncilError::EmptySynthesis)?;
        let weights = self.params.weights();

        let synthesis = match strategy {
            SynthesisStrategy::Majority => majority(last, &weights),
            SynthesisStrategy::Weighted => weighted_merge(last, &weights),
            SynthesisStrategy::Moderator => match self.moderate(ctx, last).await {
                Some(synthesis) => Some(synthesis),
                None => {
                    warn!(request_id = %ctx.request_id(), "Moderator unavailable, falling back to majority");
                    majority(last, &weights)
                }
            },
        }
        .ok_or(RunCouncilError::EmptySynthesis)?;

        ctx.transition(SynthesisPhase::Synthesized)?;
        let score = last.score();
        let members: Vec<MemberId> = self.params.members.iter().map(|m| m.id.clone()).collect();
        let participation = participation::tally(&members, &rounds);

        info!(
            request_id = %ctx.request_id(),
            rounds = rounds.len(),
            strategy = %synthesis.strategy,
            score,
            "Council synthesized"
        );
        self.metrics.record(MetricSignal::rounds_per_request(
            ctx.request_id(),
            rounds.len(),
            "synthesized",
        ));
        self.round_logger.log(RoundEvent::new(
            "request_synthesized",
            json!({
                "request_id": ctx.request_id(),
                "rounds": rounds.len(),
                "strategy": synthesis.strategy,
                "cited": synthesis.cited,
                "score": score,
            }),
        ));

        Ok(CouncilOutcome::Synthesized(CouncilAnswer {
            request_id: ctx.request_id().clone(),
            question: ctx.question().content().to_string(),
            content: synthesis.content,
            strategy: synthesis.strategy,
            cited: synthesis.cited,
            score,
            rounds,
            participation,
        }))
    }

    /// Ask the moderator to compose the answer from the quorum cluster
    async fn moderate(&self, ctx: &RequestContext, round: &ConsensusRound) -> Option<Synthesis> {
        let moderator_id = self.params.moderator.as_ref()?;
        let moderator = self.params.member(moderator_id)?.clone();
        let answers: Vec<(String, String)> = round
            .cluster_responses()
            .iter()
            .map(|r| (r.member.to_string(), r.content.clone()))
            .collect();

        let request = ProviderRequest {
            member: moderator,
            system_prompt: PromptTemplate::synthesis_system().to_string(),
            prompt: PromptTemplate::moderator_prompt(ctx.question().content(), &answers),
            prior_round_context: None,
        };

        let timeout: Duration = self.dispatcher.params().effective_call_timeout();
        let started = Instant::now();
        let result = tokio::time::timeout(timeout, self.gateway.call(&request)).await;
        let latency = started.elapsed();

        match result {
            Ok(Ok(content)) if !content.trim().is_empty() => {
                self.pool.record_outcome(moderator_id, true, latency);
                let mut cited = extract_citations(&content, &round.cluster.members);
                if cited.is_empty() {
                    cited = round.cluster.members.clone();
                }
                cited.sort();
                debug!(request_id = %ctx.request_id(), moderator = %moderator_id, "Moderator composed answer");
                Some(Synthesis {
                    strategy: SynthesisStrategy::Moderator,
                    content,
                    cited,
                })
            }
            Ok(Ok(_)) => {
                self.pool.record_outcome(moderator_id, false, latency);
                warn!(moderator = %moderator_id, "Moderator returned an empty answer");
                None
            }
            Ok(Err(e)) => {
                self.pool.record_outcome(moderator_id, false, latency);
                warn!(moderator = %moderator_id, "Moderator failed: {}", e);
                None
            }
            Err(_) => {
                self.pool.record_outcome(moderator_id, false, latency);
                warn!(moderator = %moderator_id, "Moderator timed out");
                None
            }
        }
    }

    async fn escalate(
        &self,
        ctx: &RequestContext,
        reason: String,
        score: f64,
        rounds: Vec<ConsensusRound>,
    ) -> Result<CouncilOutcome, RunCouncilError> {
        ctx.transition(SynthesisPhase::Deadlock)?;
        warn!(request_id = %ctx.request_id(), reason = %reason, "Council deadlocked");

        let (ticket, persisted) = match self.gate.escalate(ctx.request_id(), &reason).await {
            Ok(ticket) => (ticket, true),
            Err(EscalationError::Persistence { ticket, .. }) => (*ticket, false),
            Err(e) => return Err(RunCouncilError::Escalation(e)),
        };
        ctx.transition(SynthesisPhase::Escalated)?;

        let members: Vec<MemberId> = self.params.members.iter().map(|m| m.id.clone()).collect();
        let participation = participation::tally(&members, &rounds);

        self.metrics.record(MetricSignal::rounds_per_request(
            ctx.request_id(),
            rounds.len(),
            "escalated",
        ));
        self.round_logger.log(RoundEvent::new(
            "request_escalated",
            json!({
                "request_id": ctx.request_id(),
                "rounds": rounds.len(),
                "reason": reason,
                "ticket_id": ticket.id,
                "ticket_status": ticket.status,
                "persisted": persisted,
            }),
        ));

        Ok(CouncilOutcome::Escalated(CouncilEscalation {
            request_id: ctx.request_id().clone(),
            question: ctx.question().content().to_string(),
            reason,
            score,
            ticket,
            persisted,
            rounds,
            participation,
        }))
    }
}
