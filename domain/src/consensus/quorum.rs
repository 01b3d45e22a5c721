//! Quorum cluster detection and round verdicts.
//!
//! Pairwise agreement is not transitive, so the consensus score is not an
//! average. Responses become nodes of a graph with an edge wherever
//! similarity reaches the similarity threshold τ; the largest connected
//! component is the *quorum cluster*, and the score is its size divided by
//! the number of present responses.

use serde::{Deserialize, Serialize};

use super::similarity::SimilarityMatrix;
use crate::core::error::DomainError;
use crate::core::member::MemberId;

/// Thresholds and round budget for consensus detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusPolicy {
    /// τ: minimum pairwise similarity for an edge
    pub similarity_threshold: f64,
    /// Minimum quorum-cluster share for consensus
    pub consensus_threshold: f64,
    /// Rounds allowed before deadlock (rounds are numbered from 0)
    pub max_rounds: u32,
    /// Fewer present responses than this never reach consensus. The
    /// default of 1 lets a lone surviving answer stand on its score.
    pub min_responses: usize,
}

impl Default for ConsensusPolicy {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            consensus_threshold: 0.75,
            max_rounds: 3,
            min_responses: 1,
        }
    }
}

impl ConsensusPolicy {
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(DomainError::InvalidConfig(format!(
                "consensus.similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.consensus_threshold) || self.consensus_threshold == 0.0 {
            return Err(DomainError::InvalidConfig(format!(
                "consensus.consensus_threshold must be within (0, 1], got {}",
                self.consensus_threshold
            )));
        }
        if self.max_rounds == 0 {
            return Err(DomainError::InvalidConfig(
                "consensus.max_rounds must be at least 1".to_string(),
            ));
        }
        if self.min_responses == 0 {
            return Err(DomainError::InvalidConfig(
                "consensus.min_responses must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Decide what a round's score means for the request
    pub fn verdict(&self, round: u32, cluster: &QuorumCluster) -> RoundVerdict {
        if cluster.present >= self.min_responses && cluster.score >= self.consensus_threshold {
            RoundVerdict::Consensus
        } else if round + 1 < self.max_rounds {
            RoundVerdict::Negotiate
        } else {
            RoundVerdict::Deadlock
        }
    }
}

/// Outcome of evaluating one round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundVerdict {
    Consensus,
    Negotiate,
    Deadlock,
}

impl std::fmt::Display for RoundVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundVerdict::Consensus => write!(f, "consensus"),
            RoundVerdict::Negotiate => write!(f, "negotiate"),
            RoundVerdict::Deadlock => write!(f, "deadlock"),
        }
    }
}

/// Largest connected component of the similarity graph at τ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuorumCluster {
    /// Cluster members, sorted by id
    pub members: Vec<MemberId>,
    /// Responses present in the round
    pub present: usize,
    /// `members.len() / present` (0 when nothing is present)
    pub score: f64,
}

impl QuorumCluster {
    pub fn empty() -> Self {
        Self {
            members: Vec::new(),
            present: 0,
            score: 0.0,
        }
    }

    pub fn contains(&self, member: &MemberId) -> bool {
        self.members.binary_search(member).is_ok()
    }
}

/// Find the quorum cluster of `matrix` at threshold `tau`.
///
/// Ties between equally large components go to the one with the higher
/// internal similarity sum, then to the one holding the smallest member id.
pub fn quorum_cluster(matrix: &SimilarityMatrix, tau: f64) -> QuorumCluster {
    let n = matrix.len();
    if n == 0 {
        return QuorumCluster::empty();
    }

    let mut parent: Vec<usize> = (0..n).collect();
    for i in 0..n {
        for j in (i + 1)..n {
            if matrix.get(i, j).is_some_and(|s| s >= tau) {
                union(&mut parent, i, j);
            }
        }
    }

    let mut components: Vec<Vec<usize>> = Vec::new();
    let mut root_slot: Vec<Option<usize>> = vec![None; n];
    for i in 0..n {
        let root = find(&mut parent, i);
        match root_slot[root] {
            Some(slot) => components[slot].push(i),
            None => {
                root_slot[root] = Some(components.len());
                components.push(vec![i]);
            }
        }
    }

    let internal_sum = |component: &[usize]| -> f64 {
        let mut sum = 0.0;
        for (k, &i) in component.iter().enumerate() {
            for &j in &component[k + 1..] {
                sum += matrix.get(i, j).unwrap_or(0.0);
            }
        }
        sum
    };
    let smallest_id = |component: &[usize]| -> &MemberId {
        component
            .iter()
            .map(|&i| &matrix.members[i])
            .min()
            .unwrap_or(&matrix.members[component[0]])
    };

    let best = components
        .iter()
        .max_by(|a, b| {
            a.len()
                .cmp(&b.len())
                .then_with(|| internal_sum(a).total_cmp(&internal_sum(b)))
                // smaller id wins, so reverse the comparison
                .then_with(|| smallest_id(b).cmp(smallest_id(a)))
        })
        .cloned()
        .unwrap_or_default();

    let mut members: Vec<MemberId> = best.iter().map(|&i| matrix.members[i].clone()).collect();
    members.sort();

    QuorumCluster {
        score: members.len() as f64 / n as f64,
        members,
        present: n,
    }
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[rb] = ra;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::similarity::SimilarityMethod;

    fn matrix(names: &[&str], pairs: &[(usize, usize, f64)]) -> SimilarityMatrix {
        let mut m = SimilarityMatrix::new(
            names.iter().map(|n| MemberId::new(*n)).collect(),
            SimilarityMethod::Embedding,
        );
        for &(i, j, s) in pairs {
            m.set(i, j, Some(s));
        }
        m
    }

    #[test]
    fn test_three_member_scenario_negotiates() {
        // AB 0.9, AC 0.2, BC 0.3 at tau 0.8 -> {A, B}, 2/3
        let m = matrix(&["a", "b", "c"], &[(0, 1, 0.9), (0, 2, 0.2), (1, 2, 0.3)]);
        let cluster = quorum_cluster(&m, 0.8);
        assert_eq!(cluster.members, vec![MemberId::new("a"), MemberId::new("b")]);
        assert!((cluster.score - 2.0 / 3.0).abs() < 1e-9);

        let policy = ConsensusPolicy::default();
        assert_eq!(policy.verdict(0, &cluster), RoundVerdict::Negotiate);
    }

    #[test]
    fn test_non_transitive_chain_is_one_component() {
        // a~b, b~c, but a !~ c: still connected through b
        let m = matrix(&["a", "b", "c"], &[(0, 1, 0.85), (1, 2, 0.85), (0, 2, 0.1)]);
        let cluster = quorum_cluster(&m, 0.8);
        assert_eq!(cluster.members.len(), 3);
        assert_eq!(cluster.score, 1.0);
    }

    #[test]
    fn test_adding_agreeing_response_never_lowers_score() {
        let before = quorum_cluster(
            &matrix(&["a", "b", "c"], &[(0, 1, 0.9), (0, 2, 0.1), (1, 2, 0.1)]),
            0.8,
        );
        let after = quorum_cluster(
            &matrix(
                &["a", "b", "c", "d"],
                &[
                    (0, 1, 0.9),
                    (0, 2, 0.1),
                    (1, 2, 0.1),
                    (3, 0, 0.95),
                    (3, 1, 0.9),
                    (3, 2, 0.1),
                ],
            ),
            0.8,
        );
        assert!(after.score >= before.score);
        assert_eq!(after.members.len(), 3);
    }

    #[test]
    fn test_excluded_pairs_have_no_edge() {
        let mut m = matrix(&["a", "b"], &[]);
        m.set(0, 1, None);
        let cluster = quorum_cluster(&m, 0.0);
        assert_eq!(cluster.members.len(), 1);
        assert_eq!(cluster.score, 0.5);
    }

    #[test]
    fn test_empty_round_scores_zero() {
        let m = matrix(&[], &[]);
        let cluster = quorum_cluster(&m, 0.8);
        assert_eq!(cluster.score, 0.0);
        assert_eq!(cluster.present, 0);
    }

    #[test]
    fn test_tie_breaks_on_internal_similarity_then_id() {
        let m = matrix(
            &["a", "b", "c", "d"],
            &[(0, 1, 0.81), (2, 3, 0.95)],
        );
        let cluster = quorum_cluster(&m, 0.8);
        assert_eq!(cluster.members, vec![MemberId::new("c"), MemberId::new("d")]);

        let m = matrix(&["a", "b", "c", "d"], &[(0, 1, 0.9), (2, 3, 0.9)]);
        let cluster = quorum_cluster(&m, 0.8);
        assert_eq!(cluster.members, vec![MemberId::new("a"), MemberId::new("b")]);
    }

    #[test]
    fn test_single_response_reaches_consensus_by_default() {
        let m = matrix(&["a"], &[]);
        let cluster = quorum_cluster(&m, 0.8);
        assert_eq!(cluster.score, 1.0);
        assert_eq!(
            ConsensusPolicy::default().verdict(0, &cluster),
            RoundVerdict::Consensus
        );
    }

    #[test]
    fn test_response_floor_blocks_lone_answer() {
        let m = matrix(&["a"], &[]);
        let cluster = quorum_cluster(&m, 0.8);
        let policy = ConsensusPolicy {
            min_responses: 2,
            ..Default::default()
        };
        assert_eq!(policy.verdict(0, &cluster), RoundVerdict::Negotiate);
        assert_eq!(policy.verdict(2, &cluster), RoundVerdict::Deadlock);
    }

    #[test]
    fn test_empty_round_never_reaches_consensus() {
        let empty = QuorumCluster {
            members: Vec::new(),
            present: 0,
            score: 0.0,
        };
        let policy = ConsensusPolicy {
            consensus_threshold: 1.0,
            ..Default::default()
        };
        assert_eq!(policy.verdict(2, &empty), RoundVerdict::Deadlock);
    }

    #[test]
    fn test_verdict_at_last_round() {
        let policy = ConsensusPolicy::default();
        let agreed = QuorumCluster {
            members: vec![MemberId::new("a"), MemberId::new("b"), MemberId::new("c")],
            present: 4,
            score: 0.75,
        };
        assert_eq!(policy.verdict(2, &agreed), RoundVerdict::Consensus);

        let split = QuorumCluster {
            score: 0.5,
            ..agreed
        };
        assert_eq!(policy.verdict(1, &split), RoundVerdict::Negotiate);
        assert_eq!(policy.verdict(2, &split), RoundVerdict::Deadlock);
    }

    #[test]
    fn test_policy_validation() {
        assert!(ConsensusPolicy::default().validate().is_ok());
        let bad = ConsensusPolicy {
            max_rounds: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = ConsensusPolicy {
            similarity_threshold: 1.5,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
