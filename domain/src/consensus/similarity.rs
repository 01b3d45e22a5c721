//! Pairwise agreement measures.
//!
//! Two measures are supported:
//!
//! - **Embedding**: cosine similarity of content embeddings, clamped to
//!   `[0, 1]`. A zero vector on either side yields `0`; a dimension mismatch
//!   is an error for that pair only.
//! - **Lexical**: Jaccard overlap of lowercase word sets, ignoring words
//!   shorter than three characters.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::error::DomainError;
use crate::core::member::MemberId;

/// How a round's pairwise agreement was measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMethod {
    Embedding,
    Lexical,
}

impl std::fmt::Display for SimilarityMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimilarityMethod::Embedding => write!(f, "embedding"),
            SimilarityMethod::Lexical => write!(f, "lexical"),
        }
    }
}

/// Cosine similarity normalized to `[0, 1]`.
///
/// Negative cosine (opposed vectors) clamps to 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, DomainError> {
    if a.len() != b.len() {
        return Err(DomainError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    let cosine = dot / (norm_a.sqrt() * norm_b.sqrt());
    if cosine.is_nan() {
        return Ok(0.0);
    }
    Ok(cosine.clamp(0.0, 1.0))
}

/// Lowercase word set, keeping words of at least three characters
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(|w| w.to_lowercase())
        .collect()
}

/// Jaccard overlap of the two texts' word sets (0 when either has no words)
pub fn lexical_similarity(a: &str, b: &str) -> f64 {
    jaccard(&tokenize(a), &tokenize(b))
}

pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Symmetric pairwise similarity over the responses present in a round.
///
/// `None` marks a pair that could not be measured (embedding dimension
/// mismatch); such pairs never contribute an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    pub members: Vec<MemberId>,
    pub method: SimilarityMethod,
    values: Vec<Vec<Option<f64>>>,
}

impl SimilarityMatrix {
    /// Empty matrix with `1.0` on the diagonal
    pub fn new(members: Vec<MemberId>, method: SimilarityMethod) -> Self {
        let n = members.len();
        let mut values = vec![vec![None; n]; n];
        for (i, row) in values.iter_mut().enumerate() {
            row[i] = Some(1.0);
        }
        Self {
            members,
            method,
            values,
        }
    }

    /// Lexical matrix over response texts (parallel to `members`)
    pub fn lexical(members: Vec<MemberId>, texts: &[&str]) -> Self {
        let tokens: Vec<HashSet<String>> = texts.iter().map(|t| tokenize(t)).collect();
        let mut matrix = Self::new(members, SimilarityMethod::Lexical);
        for i in 0..tokens.len() {
            for j in (i + 1)..tokens.len() {
                matrix.set(i, j, Some(jaccard(&tokens[i], &tokens[j])));
            }
        }
        matrix
    }

    /// Embedding matrix over vectors (parallel to `members`).
    ///
    /// Returns the matrix plus the pairs excluded for dimension mismatch.
    pub fn from_embeddings(
        members: Vec<MemberId>,
        vectors: &[Vec<f32>],
    ) -> (Self, Vec<(MemberId, MemberId, DomainError)>) {
        let mut matrix = Self::new(members, SimilarityMethod::Embedding);
        let mut excluded = Vec::new();
        for i in 0..vectors.len() {
            for j in (i + 1)..vectors.len() {
                match cosine_similarity(&vectors[i], &vectors[j]) {
                    Ok(sim) => matrix.set(i, j, Some(sim)),
                    Err(e) => excluded.push((
                        matrix.members[i].clone(),
                        matrix.members[j].clone(),
                        e,
                    )),
                }
            }
        }
        (matrix, excluded)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn set(&mut self, i: usize, j: usize, value: Option<f64>) {
        self.values[i][j] = value;
        self.values[j][i] = value;
    }

    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.values.get(i).and_then(|row| row.get(j)).copied().flatten()
    }

    pub fn index_of(&self, member: &MemberId) -> Option<usize> {
        self.members.iter().position(|m| m == member)
    }

    /// Similarity between two members by id
    pub fn between(&self, a: &MemberId, b: &MemberId) -> Option<f64> {
        self.get(self.index_of(a)?, self.index_of(b)?)
    }
}
