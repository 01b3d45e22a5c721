//! Consensus round record
//!
//! A [`ConsensusRound`] is the evaluated form of one finalized round: which
//! responses were considered, how similar they were, the quorum cluster and
//! the resulting verdict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::quorum::{ConsensusPolicy, QuorumCluster, RoundVerdict, quorum_cluster};
use super::similarity::{SimilarityMatrix, SimilarityMethod};
use crate::core::member::MemberId;
use crate::request::response::MemberResponse;

/// One evaluated round of the council
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusRound {
    /// Round number (0-indexed)
    pub round: u32,
    /// Every slot filled in the round, errors included
    pub responses: Vec<MemberResponse>,
    /// Pairwise agreement over the present (successful) responses
    pub matrix: SimilarityMatrix,
    pub cluster: QuorumCluster,
    pub verdict: RoundVerdict,
    pub evaluated_at: DateTime<Utc>,
}

impl ConsensusRound {
    /// Evaluate a round given its responses and the similarity matrix of the
    /// successful ones.
    pub fn evaluate(
        round: u32,
        responses: Vec<MemberResponse>,
        matrix: SimilarityMatrix,
        policy: &ConsensusPolicy,
    ) -> Self {
        let cluster = quorum_cluster(&matrix, policy.similarity_threshold);
        let verdict = policy.verdict(round, &cluster);
        Self {
            round,
            responses,
            matrix,
            cluster,
            verdict,
            evaluated_at: Utc::now(),
        }
    }

    pub fn score(&self) -> f64 {
        self.cluster.score
    }

    pub fn method(&self) -> SimilarityMethod {
        self.matrix.method
    }

    /// Members with a successful answer this round
    pub fn present(&self) -> &[MemberId] {
        &self.matrix.members
    }

    /// Members that answered with an explicit error this round
    pub fn errored(&self) -> Vec<&MemberId> {
        self.responses
            .iter()
            .filter(|r| !r.is_success())
            .map(|r| &r.member)
            .collect()
    }

    /// Successful response of `member` in this round
    pub fn response_of(&self, member: &MemberId) -> Option<&MemberResponse> {
        self.responses
            .iter()
            .find(|r| &r.member == member && r.is_success())
    }

    /// Successful responses of the quorum cluster, sorted by member id
    pub fn cluster_responses(&self) -> Vec<&MemberResponse> {
        self.cluster
            .members
            .iter()
            .filter_map(|m| self.response_of(m))
            .collect()
    }
}
