//! Per-member participation across a request's rounds

use serde::{Deserialize, Serialize};

use super::round::ConsensusRound;
use crate::core::member::MemberId;

/// How one member took part in a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberParticipation {
    pub member: MemberId,
    /// Rounds with a successful answer
    pub rounds_responded: u32,
    /// Rounds answered with an explicit provider error
    pub rounds_errored: u32,
    /// Rounds without any slot (timed out or never selected)
    pub rounds_absent: u32,
    /// Part of the quorum cluster of the last evaluated round
    pub in_final_cluster: bool,
    /// Never answered successfully in any round
    pub non_participating: bool,
}

/// Tally participation for `members` over the evaluated `rounds`.
///
/// Members that show up in a round but are not in `members` (for example a
/// replacement picked by the dispatcher) are appended in id order.
pub fn tally(members: &[MemberId], rounds: &[ConsensusRound]) -> Vec<MemberParticipation> {
    let mut all: Vec<MemberId> = members.to_vec();
    let mut extra: Vec<MemberId> = rounds
        .iter()
        .flat_map(|r| r.responses.iter().map(|resp| resp.member.clone()))
        .filter(|m| !members.contains(m))
        .collect();
    extra.sort();
    extra.dedup();
    all.extend(extra);

    let last_cluster = rounds.last().map(|r| &r.cluster);

    all.into_iter()
        .map(|member| {
            let mut responded = 0;
            let mut errored = 0;
            let mut absent = 0;
            for round in rounds {
                match round.responses.iter().find(|r| r.member == member) {
                    Some(r) if r.is_success() => responded += 1,
                    Some(_) => errored += 1,
                    None => absent += 1,
                }
            }
            MemberParticipation {
                in_final_cluster: last_cluster.is_some_and(|c| c.contains(&member)),
                non_participating: responded == 0,
                rounds_responded: responded,
                rounds_errored: errored,
                rounds_absent: absent,
                member,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::quorum::ConsensusPolicy;
    use crate::consensus::similarity::SimilarityMatrix;
    use crate::request::response::MemberResponse;

    fn round(n: u32, responses: Vec<MemberResponse>) -> ConsensusRound {
        let present: Vec<MemberResponse> =
            responses.iter().filter(|r| r.is_success()).cloned().collect();
        let texts: Vec<&str> = present.iter().map(|r| r.content.as_str()).collect();
        let matrix =
            SimilarityMatrix::lexical(present.iter().map(|r| r.member.clone()).collect(), &texts);
        ConsensusRound::evaluate(n, responses, matrix, &ConsensusPolicy::default())
    }

    #[test]
    fn test_silent_member_is_non_participating() {
        let rounds: Vec<ConsensusRound> = (0..3)
            .map(|n| {
                round(
                    n,
                    vec![
                        MemberResponse::success("a", n, "the answer is forty two", 5),
                        MemberResponse::success("b", n, "the answer is forty two", 5),
                    ],
                )
            })
            .collect();
        let members = vec![MemberId::new("a"), MemberId::new("b"), MemberId::new("c")];
        let participation = tally(&members, &rounds);

        let c = participation.iter().find(|p| p.member.as_str() == "c").unwrap();
        assert!(c.non_participating);
        assert_eq!(c.rounds_absent, 3);
        assert!(!c.in_final_cluster);

        let a = participation.iter().find(|p| p.member.as_str() == "a").unwrap();
        assert!(!a.non_participating);
        assert_eq!(a.rounds_responded, 3);
        assert!(a.in_final_cluster);
    }

    #[test]
    fn test_errors_and_replacements_are_counted() {
        let rounds = vec![round(
            0,
            vec![
                MemberResponse::failure("a", 0, "quota exceeded", 5),
                MemberResponse::success("r", 0, "replacement answer", 5),
            ],
        )];
        let participation = tally(&[MemberId::new("a")], &rounds);
        assert_eq!(participation.len(), 2);
        assert_eq!(participation[0].rounds_errored, 1);
        assert!(participation[0].non_participating);
        assert_eq!(participation[1].member.as_str(), "r");
        assert_eq!(participation[1].rounds_responded, 1);
    }
}
