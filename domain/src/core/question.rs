//! Question value object

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Default cap on question length, in characters
pub const DEFAULT_MAX_QUESTION_CHARS: usize = 32_000;

/// A question to be answered by the council (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Question {
    content: String,
}

impl Question {
    /// Validate and create a question under the default length cap
    pub fn try_new(content: impl Into<String>) -> Result<Self, DomainError> {
        Self::try_new_with_limit(content, DEFAULT_MAX_QUESTION_CHARS)
    }

    /// Validate and create a question of at most `max_chars` characters
    pub fn try_new_with_limit(
        content: impl Into<String>,
        max_chars: usize,
    ) -> Result<Self, DomainError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(DomainError::InvalidQuestion(
                "question cannot be empty".to_string(),
            ));
        }
        let question = Self { content };
        question.check_limit(max_chars)?;
        Ok(question)
    }

    /// Reject the question when it is longer than `max_chars` characters
    pub fn check_limit(&self, max_chars: usize) -> Result<(), DomainError> {
        let chars = self.content.chars().count();
        if chars > max_chars {
            return Err(DomainError::InvalidQuestion(format!(
                "question is {} characters, limit is {}",
                chars, max_chars
            )));
        }
        Ok(())
    }

    /// Get the question content
    pub fn content(&self) -> &str {
        &self.content
    }
}

impl std::fmt::Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}

impl TryFrom<String> for Question {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Question::try_new(s)
    }
}

impl From<Question> for String {
    fn from(q: Question) -> Self {
        q.content
    }
}
