//! Synthesis strategies
//!
//! Once a round reaches consensus, the quorum cluster's answers are turned
//! into a single final answer. `Majority` and `Weighted` are pure and live
//! here; `Moderator` needs a provider call and is driven by the application
//! layer using the prompt from [`crate::prompt::PromptTemplate`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::round::ConsensusRound;
use super::similarity::lexical_similarity;
use crate::core::error::DomainError;
use crate::core::member::MemberId;

/// Two sentences at or above this lexical overlap support each other
pub const SENTENCE_MATCH_THRESHOLD: f64 = 0.6;

/// How a consensus cluster becomes the final answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisStrategy {
    /// Pick the cluster medoid
    #[default]
    Majority,
    /// Sentence-level merge weighted by member vote weight
    Weighted,
    /// Ask a moderator member to compose the answer, citing contributors
    Moderator,
}

impl SynthesisStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisStrategy::Majority => "majority",
            SynthesisStrategy::Weighted => "weighted",
            SynthesisStrategy::Moderator => "moderator",
        }
    }
}

impl std::fmt::Display for SynthesisStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SynthesisStrategy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "majority" | "medoid" => Ok(SynthesisStrategy::Majority),
            "weighted" | "merge" => Ok(SynthesisStrategy::Weighted),
            "moderator" => Ok(SynthesisStrategy::Moderator),
            other => Err(DomainError::InvalidConfig(format!(
                "unknown synthesis strategy '{}' (expected majority, weighted or moderator)",
                other
            ))),
        }
    }
}

/// The composed final answer and who it draws on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synthesis {
    pub strategy: SynthesisStrategy,
    pub content: String,
    /// Members whose answers the content is built from, sorted by id
    pub cited: Vec<MemberId>,
}

/// Vote weight lookup; unknown members weigh 1.0
#[derive(Debug, Clone, Default)]
pub struct MemberWeights(HashMap<MemberId, f64>);

impl MemberWeights {
    pub fn new(weights: HashMap<MemberId, f64>) -> Self {
        Self(weights)
    }

    pub fn of(&self, member: &MemberId) -> f64 {
        self.0.get(member).copied().unwrap_or(1.0)
    }
}

impl FromIterator<(MemberId, f64)> for MemberWeights {
    fn from_iter<T: IntoIterator<Item = (MemberId, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Majority-content selection: the cluster member whose answer has the
/// highest summed similarity to the rest of the cluster.
///
/// Ties go to the higher vote weight, then to the smaller member id.
/// Returns `None` when the cluster is empty.
pub fn majority(round: &ConsensusRound, weights: &MemberWeights) -> Option<Synthesis> {
    let members = &round.cluster.members;
    let centrality = |m: &MemberId| -> f64 {
        members
            .iter()
            .filter(|other| *other != m)
            .filter_map(|other| round.matrix.between(m, other))
            .sum()
    };

    let medoid = members
        .iter()
        .filter(|m| round.response_of(m).is_some())
        .max_by(|a, b| {
            centrality(a)
                .total_cmp(&centrality(b))
                .then_with(|| weights.of(a).total_cmp(&weights.of(b)))
                .then_with(|| b.cmp(a))
        })?;

    let content = round.response_of(medoid)?.content.clone();
    Some(Synthesis {
        strategy: SynthesisStrategy::Majority,
        content,
        cited: members.clone(),
    })
}

/// Sentence-level weighted merge of the cluster's answers.
///
/// Every distinct sentence is supported by the weight of each cluster member
/// whose answer holds a lexically similar sentence. Sentences supported by
/// at least half of the cluster weight are kept, starting with those of the
/// heaviest answer in its own order. With nothing kept the heaviest answer
/// is returned as is.
pub fn weighted_merge(round: &ConsensusRound, weights: &MemberWeights) -> Option<Synthesis> {
    let answers: Vec<(&MemberId, Vec<String>)> = round
        .cluster_responses()
        .into_iter()
        .map(|r| (&r.member, split_sentences(&r.content)))
        .collect();
    if answers.is_empty() {
        return None;
    }

    let total_weight: f64 = answers.iter().map(|(m, _)| weights.of(m)).sum();

    let heaviest = answers
        .iter()
        .max_by(|(a, _), (b, _)| weights.of(a).total_cmp(&weights.of(b)).then_with(|| b.cmp(a)))
        .map(|(m, _)| *m)?;

    // Heaviest answer first so its sentence order wins
    let mut ordered: Vec<&(&MemberId, Vec<String>)> = answers.iter().collect();
    ordered.sort_by_key(|(m, _)| *m != heaviest);

    let mut candidates: Vec<&str> = Vec::new();
    for (_, sentences) in &ordered {
        for sentence in sentences {
            let seen = candidates
                .iter()
                .any(|c| lexical_similarity(c, sentence) >= SENTENCE_MATCH_THRESHOLD);
            if !seen {
                candidates.push(sentence);
            }
        }
    }

    let mut kept = Vec::new();
    let mut cited: Vec<MemberId> = Vec::new();
    for candidate in candidates {
        let supporters: Vec<&MemberId> = answers
            .iter()
            .filter(|(_, sentences)| {
                sentences
                    .iter()
                    .any(|s| lexical_similarity(candidate, s) >= SENTENCE_MATCH_THRESHOLD)
            })
            .map(|(m, _)| *m)
            .collect();
        let support: f64 = supporters.iter().map(|m| weights.of(m)).sum();
        if support * 2.0 >= total_weight {
            kept.push(candidate);
            for m in supporters {
                if !cited.contains(m) {
                    cited.push(m.clone());
                }
            }
        }
    }

    if kept.is_empty() {
        let content = round.response_of(heaviest)?.content.clone();
        return Some(Synthesis {
            strategy: SynthesisStrategy::Weighted,
            content,
            cited: vec![heaviest.clone()],
        });
    }

    cited.sort();
    Some(Synthesis {
        strategy: SynthesisStrategy::Weighted,
        content: kept.join(" "),
        cited,
    })
}

/// Split text into trimmed sentences on terminal punctuation and newlines
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            push_sentence(&mut sentences, &mut current);
            continue;
        }
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_none_or(|n| n.is_whitespace()) {
            push_sentence(&mut sentences, &mut current);
        }
    }
    push_sentence(&mut sentences, &mut current);
    sentences
}

fn push_sentence(sentences: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    current.clear();
}
